//! Snapshot file output.
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SyncError};

pub const PARTS_FILE: &str = "parts.json";
pub const COMMERCE_MAP_FILE: &str = "shopify_map.json";

/// Pretty-print `value` as UTF-8 JSON to `path`, creating the parent directory.
///
/// The document is fully serialized before the file is opened, so a
/// serialization error leaves any previous snapshot intact.
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<usize> {
    let bytes = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| SyncError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
    Ok(bytes.len())
}
