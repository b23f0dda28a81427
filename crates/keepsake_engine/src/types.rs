use thiserror::Error;

use crate::fetch::FetchError;
use crate::persist::PersistError;
use crate::unpack::UnpackError;

/// Declared media type of a record, as stated by the export's HTML.
///
/// The payload may override this at write time; see [`crate::payload::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Lenient parse of the extractor's kind string. Anything that is not a
    /// video marker counts as an image.
    pub fn from_export_kind(kind: &str) -> Self {
        if kind.trim().eq_ignore_ascii_case("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Output extension used when the payload itself is not recognizable.
    pub fn default_extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Image => "jpg",
        }
    }
}

/// One memory entry from the export: capture time, declared kind, and the
/// time-limited retrieval URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRecord {
    pub captured_at: String,
    pub kind: MediaKind,
    pub fetch_url: String,
}

/// Why a single job failed. Always carries a human-readable reason; a job
/// failure never crosses its own boundary.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("bundle error: {0}")]
    Unpack(#[from] UnpackError),
    #[error("write failed: {0}")]
    Persist(#[from] PersistError),
    #[error("worker crashed: {0}")]
    Worker(String),
}

/// Progress and completion notifications for the Presentation layer.
///
/// Events travel over a channel and are drained on the receiver's own thread;
/// workers never touch Presentation state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Emitted after every finished job, with the run's aggregate counters.
    Progress {
        completed: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
    },
    /// Terminal event for a run that finished all dispatched jobs. A
    /// cancelled run ends without one.
    RunCompleted {
        succeeded: usize,
        failed: usize,
        failed_records: Vec<MemoryRecord>,
    },
}
