#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User chose an export and confirmed the download of `total` records.
    StartRequested { total: usize },
    /// User clicked Pause.
    PauseClicked,
    /// User clicked Resume.
    ResumeClicked,
    /// User clicked Cancel/Reset.
    CancelClicked,
    /// User clicked Retry failed.
    RetryFailedClicked,
    /// Engine aggregate progress after a job finished.
    ProgressReported {
        completed: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
    },
    /// Engine terminal notification for a run.
    RunCompleted {
        succeeded: usize,
        failed: usize,
        failed_rows: Vec<crate::FailedRow>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
