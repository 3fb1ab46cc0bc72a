use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::garden::tools::error::{Result, ToolError};
use crate::garden::tools::model::RemoteRecord;

/// On-disk layout of the cache: the records of a complete paginated fetch.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CachedSnapshot {
    records: Vec<RemoteRecord>,
}

/// Persists a fetched snapshot for later read-only runs.
pub fn write_snapshot(path: &Path, records: &[RemoteRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let snapshot = CachedSnapshot {
        records: records.to_vec(),
    };
    fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
    info!(path = %path.display(), records = records.len(), "remote snapshot cached");
    Ok(())
}

/// Reads a snapshot previously written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<Vec<RemoteRecord>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let source = fs::read_to_string(path)?;
    let snapshot: CachedSnapshot = serde_json::from_str(&source)?;
    info!(
        path = %path.display(),
        records = snapshot.records.len(),
        "remote snapshot read from cache"
    );
    Ok(snapshot.records)
}
