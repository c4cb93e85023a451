//! Trigger site updates and wait for them to land.
//!
//! MainWP only *requests* an update from the child site; the dashboard's
//! view of the site changes once the child reports back. Completion is
//! detected by re-reading the site details at a fixed interval.

use std::fmt;
use std::thread::sleep;
use std::time::Instant;

use indicatif::ProgressBar;
use serde_json::Value;

use fleetsync_core::{ApiError, PollSettings, SiteId};

use crate::client::{MainWpClient, SiteStatusSource};
use crate::types::SiteDetails;

/// Which part of a site an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    WordPress,
    Plugins,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateKind::WordPress => write!(f, "wordpress"),
            UpdateKind::Plugins => write!(f, "plugins"),
        }
    }
}

/// What to trigger for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    pub core: bool,
    pub plugins: bool,
}

impl UpdatePlan {
    /// Core is always attempted (MainWP no-ops when nothing is pending);
    /// plugins only when the dashboard lists pending plugin upgrades.
    pub fn for_site(details: &SiteDetails) -> Self {
        Self {
            core: true,
            plugins: details.plugin_update_count() > 0,
        }
    }

    pub fn kinds(&self) -> Vec<UpdateKind> {
        let mut kinds = Vec::new();
        if self.core {
            kinds.push(UpdateKind::WordPress);
        }
        if self.plugins {
            kinds.push(UpdateKind::Plugins);
        }
        kinds
    }
}

/// Result of a single update trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerResult {
    /// The dashboard accepted the request; its response body is kept.
    Sent(Value),
    /// The request failed; the error is rendered for display.
    Failed(String),
    /// Not part of the plan.
    Skipped,
}

impl TriggerResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, TriggerResult::Sent(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub core: TriggerResult,
    pub plugins: TriggerResult,
}

impl UpdateOutcome {
    /// Kinds whose trigger was accepted, in trigger order.
    pub fn sent_kinds(&self) -> Vec<UpdateKind> {
        let mut kinds = Vec::new();
        if self.core.is_sent() {
            kinds.push(UpdateKind::WordPress);
        }
        if self.plugins.is_sent() {
            kinds.push(UpdateKind::Plugins);
        }
        kinds
    }
}

/// Trigger core then plugins. A failed trigger does not stop the other.
pub fn apply(client: &MainWpClient, site_id: &SiteId, plan: UpdatePlan) -> UpdateOutcome {
    let run = |enabled: bool, kind: UpdateKind| {
        if !enabled {
            return TriggerResult::Skipped;
        }
        let result = match kind {
            UpdateKind::WordPress => client.update_wordpress(site_id),
            UpdateKind::Plugins => client.update_plugins(site_id),
        };
        match result {
            Ok(body) => TriggerResult::Sent(body),
            Err(err) => {
                tracing::error!(site_id = %site_id, kind = %kind, error = %err, "update trigger failed");
                TriggerResult::Failed(err.to_string())
            }
        }
    };

    UpdateOutcome {
        core: run(plan.core, UpdateKind::WordPress),
        plugins: run(plan.plugins, UpdateKind::Plugins),
    }
}

/// 100 once the dashboard no longer lists anything pending for `kind`, else 0.
pub fn progress_for(kind: UpdateKind, details: &SiteDetails) -> u64 {
    let done = match kind {
        UpdateKind::WordPress => !details.core_update_pending(),
        UpdateKind::Plugins => details.plugin_update_count() == 0,
    };
    if done {
        100
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed { polls: u32 },
    TimedOut { polls: u32 },
}

/// Poll `source` every `poll.interval` until `kind` is done or `poll.timeout`
/// has elapsed. The bar is driven 0 → 100 and finished on return.
///
/// A failed details fetch ends the wait with that error.
pub fn wait_for_completion<S>(
    source: &S,
    site_id: &SiteId,
    kind: UpdateKind,
    poll: PollSettings,
    bar: &ProgressBar,
) -> Result<WaitOutcome, ApiError>
where
    S: SiteStatusSource + ?Sized,
{
    let started = Instant::now();
    let mut polls = 0u32;
    bar.set_length(100);
    bar.set_position(0);

    loop {
        polls += 1;
        let details = match source.site_details(site_id) {
            Ok(details) => details,
            Err(err) => {
                bar.abandon();
                return Err(err);
            }
        };

        let progress = progress_for(kind, &details);
        bar.set_position(progress);
        tracing::debug!(site_id = %site_id, kind = %kind, polls, progress, "update poll");

        if progress == 100 {
            bar.finish();
            return Ok(WaitOutcome::Completed { polls });
        }
        if started.elapsed() >= poll.timeout {
            bar.abandon();
            tracing::warn!(site_id = %site_id, kind = %kind, polls, "gave up waiting for update");
            return Ok(WaitOutcome::TimedOut { polls });
        }
        sleep(poll.interval);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    /// Replays a fixed sequence of details payloads.
    struct Scripted {
        replies: RefCell<VecDeque<Result<SiteDetails, ApiError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<SiteDetails, ApiError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
            }
        }
    }

    impl SiteStatusSource for Scripted {
        fn site_details(&self, _site_id: &SiteId) -> Result<SiteDetails, ApiError> {
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(SiteDetails::default()))
        }
    }

    fn details(value: Value) -> SiteDetails {
        serde_json::from_value(value).expect("details")
    }

    fn fast_poll() -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn plan_skips_plugins_without_upgrades() {
        let plan = UpdatePlan::for_site(&details(json!({ "plugin_upgrades": "{}" })));
        assert_eq!(plan.kinds(), vec![UpdateKind::WordPress]);

        let plan = UpdatePlan::for_site(&details(json!({ "plugin_upgrades": { "a": {} } })));
        assert_eq!(plan.kinds(), vec![UpdateKind::WordPress, UpdateKind::Plugins]);
    }

    #[test]
    fn progress_is_all_or_nothing() {
        let pending = details(json!({ "wp_core_update": true, "plugin_upgrades": { "a": {} } }));
        assert_eq!(progress_for(UpdateKind::WordPress, &pending), 0);
        assert_eq!(progress_for(UpdateKind::Plugins, &pending), 0);

        let done = SiteDetails::default();
        assert_eq!(progress_for(UpdateKind::WordPress, &done), 100);
        assert_eq!(progress_for(UpdateKind::Plugins, &done), 100);
    }

    #[test]
    fn wait_polls_until_plugins_clear() {
        let source = Scripted::new(vec![
            Ok(details(json!({ "plugin_upgrades": { "a": {}, "b": {} } }))),
            Ok(details(json!({ "plugin_upgrades": { "b": {} } }))),
            Ok(details(json!({ "plugin_upgrades": "[]" }))),
        ]);
        let bar = ProgressBar::hidden();
        let outcome = wait_for_completion(
            &source,
            &SiteId::from("4"),
            UpdateKind::Plugins,
            fast_poll(),
            &bar,
        )
        .expect("wait");
        assert_eq!(outcome, WaitOutcome::Completed { polls: 3 });
        assert_eq!(bar.position(), 100);
    }

    #[test]
    fn wait_gives_up_after_timeout() {
        let pending = || Ok(details(json!({ "wp_core_update": "6.5" })));
        let source = Scripted::new(vec![pending(), pending(), pending()]);
        let poll = PollSettings {
            interval: Duration::from_millis(1),
            timeout: Duration::ZERO,
        };
        let outcome = wait_for_completion(
            &source,
            &SiteId::from("4"),
            UpdateKind::WordPress,
            poll,
            &ProgressBar::hidden(),
        )
        .expect("wait");
        assert_eq!(outcome, WaitOutcome::TimedOut { polls: 1 });
    }

    #[test]
    fn wait_surfaces_fetch_errors() {
        let source = Scripted::new(vec![Err(ApiError::Transport {
            service: "mainwp",
            url: "https://wp.example".into(),
            message: "connection refused".into(),
        })]);
        let err = wait_for_completion(
            &source,
            &SiteId::from("4"),
            UpdateKind::WordPress,
            fast_poll(),
            &ProgressBar::hidden(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn outcome_lists_sent_kinds_in_order() {
        let outcome = UpdateOutcome {
            core: TriggerResult::Failed("boom".into()),
            plugins: TriggerResult::Sent(json!({ "ok": true })),
        };
        assert_eq!(outcome.sent_kinds(), vec![UpdateKind::Plugins]);
    }
}
