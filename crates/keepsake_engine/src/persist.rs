use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the output directory exists; create it (with parents) if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Atomically write `bytes` to `{dir}/{filename}` by writing a temp file then
/// renaming, so no partial file is ever visible at the destination.
pub fn write_bytes(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    // persist() refuses to clobber on some platforms; drop the old file first.
    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
    Ok(target)
}

/// Atomically copy an existing file to `{dir}/{filename}`.
pub fn copy_file(source: &Path, dir: &Path, filename: &str) -> Result<PathBuf, PersistError> {
    let target = dir.join(filename);
    let tmp = NamedTempFile::new_in(dir)?;
    let mut reader = File::open(source)?;
    io::copy(&mut reader, &mut tmp.as_file())?;
    tmp.as_file().sync_all()?;

    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
    Ok(target)
}
