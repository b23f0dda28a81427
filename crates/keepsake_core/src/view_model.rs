use crate::{FailedRow, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadViewModel {
    pub session: SessionState,
    pub paused: bool,
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_rows: Vec<FailedRow>,
    pub can_retry: bool,
}
