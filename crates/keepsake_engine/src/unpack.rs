use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("archive holds no recognizable base media file")]
    NoBaseMedia,
}

/// Media role of the base file found in a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKind {
    Image,
    Video,
}

/// A bundle extracted into its own scratch directory.
///
/// The directory and everything in it are removed when this is dropped,
/// whether or not the caller got as far as using the files.
#[derive(Debug)]
pub struct ExtractedBundle {
    pub base: PathBuf,
    pub base_kind: BaseKind,
    pub overlay: Option<PathBuf>,
    _dir: TempDir,
}

const IMAGE_BASE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
const VIDEO_BASE_EXTENSIONS: &[&str] = &["mp4", "mov"];
const OVERLAY_EXTENSIONS: &[&str] = &["png"];

/// Extracts a zip bundle into a fresh temp directory and locates the base
/// media file plus an optional overlay image, both identified by extension.
pub fn extract_bundle(bytes: &[u8]) -> Result<ExtractedBundle, UnpackError> {
    let dir = TempDir::new()?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        // Entries are flattened to their filename; bundles are flat in
        // practice and this sidesteps path traversal from hostile archives.
        let Some(filename) = Path::new(entry.name())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
        else {
            continue;
        };
        let dest = dir.path().join(&filename);
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;
    }

    let mut base: Option<(PathBuf, BaseKind)> = None;
    let mut overlay: Option<PathBuf> = None;
    for entry in fs::read_dir(dir.path())? {
        let path = entry?.path();
        let Some(ext) = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        else {
            continue;
        };
        if base.is_none() && IMAGE_BASE_EXTENSIONS.contains(&ext.as_str()) {
            base = Some((path, BaseKind::Image));
        } else if base.is_none() && VIDEO_BASE_EXTENSIONS.contains(&ext.as_str()) {
            base = Some((path, BaseKind::Video));
        } else if overlay.is_none() && OVERLAY_EXTENSIONS.contains(&ext.as_str()) {
            overlay = Some(path);
        }
    }

    let Some((base, base_kind)) = base else {
        return Err(UnpackError::NoBaseMedia);
    };

    Ok(ExtractedBundle {
        base,
        base_kind,
        overlay,
        _dir: dir,
    })
}
