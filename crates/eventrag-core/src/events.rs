//! Loading raw event dumps from disk.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::EventRecord;

/// Reads event records from a JSON file holding an array of records, or from
/// every `*.json` file below a directory (in path order).
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("event file {}", path.display())));
    }
    let files = if path.is_dir() { list_json_files(path) } else { vec![path.to_path_buf()] };
    let mut events = Vec::new();
    for file in &files {
        let raw = fs::read_to_string(file)?;
        let mut batch: Vec<EventRecord> = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", file.display(), e)))?;
        debug!(file = %file.display(), events = batch.len(), "loaded event file");
        events.append(&mut batch);
    }
    info!(files = files.len(), events = events.len(), "events loaded from {}", path.display());
    Ok(events)
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}
