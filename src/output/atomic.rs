use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::traits::{SinkError, SinkResult};

/// Writes `contents` to `path` so readers see either the old file or the
/// complete new one
///
/// The data goes to a temporary file in the same directory, is synced,
/// then renamed over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> SinkResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| SinkError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
