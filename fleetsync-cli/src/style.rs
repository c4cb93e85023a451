//! Traffic-light colouring for terminal output.

use std::fmt::Display;

use colored::{ColoredString, Colorize};

use fleetsync_core::Tone;

pub fn paint(text: impl Display, tone: Tone) -> ColoredString {
    let text = text.to_string();
    match tone {
        Tone::Good => text.green(),
        Tone::Warn => text.yellow(),
        Tone::Bad => text.red(),
    }
}

pub fn security(issues: u32) -> ColoredString {
    paint(issues, Tone::for_security_issues(issues))
}

pub fn health(score: u32) -> ColoredString {
    paint(format!("{score}%"), Tone::for_health(score))
}

pub fn core_update(available: bool) -> ColoredString {
    let label = if available { "Available" } else { "Up to date" };
    paint(label, Tone::for_core_update(available))
}

pub fn plugin_updates(count: usize) -> ColoredString {
    paint(count, Tone::for_plugin_updates(count))
}
