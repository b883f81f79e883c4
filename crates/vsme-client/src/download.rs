use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::client::Report;
use crate::error::SubmitError;

/// Write the report into `dir`, creating the directory if needed. Returns the
/// path of the written file.
pub fn save_report(report: &Report, dir: &Path) -> Result<PathBuf, SubmitError> {
    fs::create_dir_all(dir).map_err(|source| SubmitError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(&report.filename);
    fs::write(&path, &report.bytes).map_err(|source| SubmitError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), bytes = report.bytes.len(), "report saved");
    Ok(path)
}
