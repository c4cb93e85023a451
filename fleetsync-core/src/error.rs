//! Error types shared by every fleetsync crate.

use std::path::PathBuf;

use thiserror::Error;

/// Longest response body excerpt carried inside an [`ApiError::Status`].
const BODY_EXCERPT_CHARS: usize = 500;

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key the current command needs was not set anywhere.
    #[error("missing configuration: set {key} in the environment, .env, or config file")]
    Missing { key: &'static str },

    /// A key was set but its value could not be interpreted.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The config file could not be read, or an explicit one does not exist.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::settings::FileSettings`].
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,
}

/// Errors raised by a remote API call.
///
/// `url` never carries a query string: MainWP authenticates with query
/// parameters, so they are stripped before an error is built.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    #[error("{service} returned HTTP {status} for {url}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        url: String,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("{service} request to {url} failed: {message}")]
    Transport {
        service: &'static str,
        url: String,
        message: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("{service} response from {url} could not be decoded: {message}")]
    Decode {
        service: &'static str,
        url: String,
        message: String,
    },

    /// The service answered 2xx but reported a failure in its payload.
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    /// The HTTP agent itself could not be built.
    #[error("{service} client setup failed: {message}")]
    Setup {
        service: &'static str,
        message: String,
    },
}

impl ApiError {
    /// HTTP status code, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Name of the service the failing call was made to.
    pub fn service(&self) -> &'static str {
        match self {
            ApiError::Status { service, .. }
            | ApiError::Transport { service, .. }
            | ApiError::Decode { service, .. }
            | ApiError::Rejected { service, .. }
            | ApiError::Setup { service, .. } => service,
        }
    }
}

/// Clip a response body for inclusion in an error message.
pub fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Drop the query string (and fragment) from a URL.
pub fn redact_url(url: &str) -> String {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    url[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_strips_credentials_in_query() {
        assert_eq!(
            redact_url("https://wp.example/wp-json/mainwp/v1/site/site?consumer_key=ck&consumer_secret=cs"),
            "https://wp.example/wp-json/mainwp/v1/site/site"
        );
        assert_eq!(redact_url("https://example.com/a#frag"), "https://example.com/a");
        assert_eq!(redact_url("https://example.com/plain"), "https://example.com/plain");
    }

    #[test]
    fn excerpt_clips_long_bodies() {
        let body = "x".repeat(BODY_EXCERPT_CHARS + 20);
        let clipped = excerpt(&body);
        assert_eq!(clipped.chars().count(), BODY_EXCERPT_CHARS + 1);
        assert!(clipped.ends_with('…'));
        assert_eq!(excerpt("  short \n"), "short");
    }

    #[test]
    fn status_accessor() {
        let err = ApiError::Status {
            service: "notion",
            status: 404,
            url: "https://api.notion.com/v1/pages/x".into(),
            body: String::new(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.service(), "notion");
        let err = ApiError::Transport {
            service: "gitlab",
            url: "https://gitlab.com".into(),
            message: "dns".into(),
        };
        assert_eq!(err.status(), None);
    }
}
