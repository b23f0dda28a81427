//! Keepsake engine: the concurrent fetch-and-reconstruct pipeline.
mod composite;
mod coordinator;
mod fetch;
mod payload;
mod persist;
mod reconstruct;
mod timestamp;
mod types;
mod unpack;
mod video;

pub use composite::{composite_image, CompositeError};
pub use coordinator::{Coordinator, CoordinatorError, DownloadSettings, StartError};
pub use fetch::{FetchError, FetchSettings, Fetcher, ReqwestFetcher};
pub use payload::{classify, PayloadKind};
pub use persist::{copy_file, ensure_output_dir, write_bytes, PersistError};
pub use reconstruct::Reconstructor;
pub use timestamp::normalize_capture_timestamp;
pub use types::{JobError, MediaKind, MemoryRecord, PipelineEvent};
pub use unpack::{extract_bundle, BaseKind, ExtractedBundle, UnpackError};
pub use video::{composite_video, VideoToolchain};
