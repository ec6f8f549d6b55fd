//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in the binary (or rely on lazy Once).
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_err() {
            // Fallback to the crate root when run via `cargo run` from elsewhere
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Get optional env var (None if unset or blank).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub(crate) fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("SECRET") || k.contains("TOKEN") || k.contains("PASSWORD") || k.contains("KEY")
    {
        if val.trim().is_empty() {
            return String::new();
        }
        return "***".to_string();
    }
    val.trim().to_string()
}

/// Validate required keys and log a consolidated, redacted snapshot of configuration.
///
/// `lookup` abstracts the environment so callers can feed a fixed map in tests.
/// Returns the list of required keys that are missing or blank.
pub fn preflight_check<F>(title: &str, required: &[&str], lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let mut snapshot: Vec<(String, String)> = Vec::with_capacity(required.len());
    for &k in required {
        let v = lookup(k).filter(|v| !v.trim().is_empty());
        if v.is_none() {
            missing.push(k.to_string());
        }
        snapshot.push((k.to_string(), redact_value(k, v.as_deref().unwrap_or_default())));
    }
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    missing
}
