use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::composite::composite_image;
use crate::fetch::Fetcher;
use crate::payload::{classify, PayloadKind};
use crate::persist::{copy_file, write_bytes};
use crate::timestamp::normalize_capture_timestamp;
use crate::types::{JobError, MemoryRecord};
use crate::unpack::{extract_bundle, BaseKind};
use crate::video::{composite_video, VideoToolchain};

/// Per-record worker: fetches the payload and reconstructs the media file.
pub struct Reconstructor {
    fetcher: Arc<dyn Fetcher>,
    tools: VideoToolchain,
}

impl Reconstructor {
    pub fn new(fetcher: Arc<dyn Fetcher>, tools: VideoToolchain) -> Self {
        Self { fetcher, tools }
    }

    /// Runs one record end to end and returns the written path.
    ///
    /// Every failure converts into a [`JobError`] at this boundary; nothing a
    /// single record does may take down sibling jobs.
    pub async fn process(
        &self,
        record: &MemoryRecord,
        output_dir: &Path,
    ) -> Result<PathBuf, JobError> {
        let bytes = self.fetcher.fetch(&record.fetch_url).await?;

        let record = record.clone();
        let output_dir = output_dir.to_path_buf();
        let tools = self.tools.clone();
        // Archive extraction and compositing are blocking work; keep them off
        // the async workers.
        tokio::task::spawn_blocking(move || {
            reconstruct_payload(&bytes, &record, &output_dir, &tools)
        })
        .await
        .map_err(|err| JobError::Worker(err.to_string()))?
    }
}

fn reconstruct_payload(
    bytes: &[u8],
    record: &MemoryRecord,
    output_dir: &Path,
    tools: &VideoToolchain,
) -> Result<PathBuf, JobError> {
    let stem = normalize_capture_timestamp(&record.captured_at);
    match classify(bytes) {
        PayloadKind::ZipArchive => reconstruct_bundle(bytes, &stem, output_dir, tools),
        payload => {
            // The payload's own magic outranks the declared kind when they
            // disagree on the extension.
            let ext = payload
                .extension()
                .unwrap_or_else(|| record.kind.default_extension());
            let path = write_bytes(output_dir, &format!("{stem}.{ext}"), bytes)?;
            log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
            Ok(path)
        }
    }
}

fn reconstruct_bundle(
    bytes: &[u8],
    stem: &str,
    output_dir: &Path,
    tools: &VideoToolchain,
) -> Result<PathBuf, JobError> {
    let bundle = extract_bundle(bytes)?;
    let ext = match bundle.base_kind {
        BaseKind::Image => "jpg",
        BaseKind::Video => "mp4",
    };
    let filename = format!("{stem}.{ext}");
    let target = output_dir.join(&filename);

    if let Some(overlay) = &bundle.overlay {
        let composited = match bundle.base_kind {
            BaseKind::Image => composite_image(&bundle.base, overlay, &target),
            BaseKind::Video => composite_video(&bundle.base, overlay, &target, tools),
        };
        match composited {
            Ok(()) => {
                log::debug!("composited overlay into {}", target.display());
                return Ok(target);
            }
            Err(err) => {
                // A bad overlay must never cost the underlying memory: fall
                // back to the plain base file.
                log::warn!("overlay composite for {filename} failed ({err}); keeping base media");
            }
        }
    }

    let path = copy_file(&bundle.base, output_dir, &filename)?;
    Ok(path)
}
