use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::rule::RuleRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid rule file {file}: {source}")]
    Parse {
        file: PathBuf,
        source: serde_json::Error,
    },
}

/// Load the Rule Store from a directory of one-JSON-file-per-rule records.
///
/// Files are read in sorted filename order so repeated loads of the same
/// directory yield the same record sequence. Any unreadable or invalid file
/// fails the whole load; no partial batch is returned.
pub fn load_rules_dir(dir: &Path) -> Result<Vec<RuleRecord>, StoreError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "json");
        if path.is_file() && is_json {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let f = fs::File::open(&path)?;
        let record: RuleRecord =
            serde_json::from_reader(f).map_err(|source| StoreError::Parse {
                file: path.clone(),
                source,
            })?;
        records.push(record);
    }

    debug!(count = records.len(), dir = %dir.display(), "loaded rule store");
    Ok(records)
}
