use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy shared by both sync jobs.
///
/// Every variant is fatal for the run; malformed field values never surface
/// here because the normalizers absorb them into defaults.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Required configuration is missing or blank.
    #[error("missing required env: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    /// Configuration present but unusable.
    #[error("invalid config {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    /// The auth endpoint answered but did not hand out a token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status that is not worth retrying.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// A retryable status kept coming back until the attempt budget ran out.
    #[error("giving up after {attempts} attempts, last status {last_status} from {url}")]
    RetriesExhausted {
        attempts: u32,
        last_status: StatusCode,
        url: String,
    },

    /// The upstream API reported an error inside a 200 response.
    #[error("{api} API error: {message}")]
    Api { api: &'static str, message: String },

    /// The upstream pagination cursor stopped advancing.
    #[error("pagination cursor repeated: {0}")]
    StuckCursor(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}
