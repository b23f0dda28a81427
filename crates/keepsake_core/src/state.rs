use crate::view_model::DownloadViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Completed,
}

/// One failed record as the Presentation displays it and offers it for retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRow {
    pub captured_at: String,
    pub fetch_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    session: SessionState,
    paused: bool,
    total: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    failed_rows: Vec<FailedRow>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> DownloadViewModel {
        DownloadViewModel {
            session: self.session,
            paused: self.paused,
            completed: self.completed,
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            failed_rows: self.failed_rows.clone(),
            can_retry: self.session == SessionState::Completed && self.failed > 0,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    /// True once something changed since the last call; reading resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_run(&mut self, total: usize) {
        self.session = SessionState::Running;
        self.total = total;
        self.completed = 0;
        self.succeeded = 0;
        self.failed = 0;
        self.failed_rows.clear();
        self.mark_dirty();
    }

    pub(crate) fn apply_progress(
        &mut self,
        completed: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
    ) {
        // Counters only move forward within a run; a stale or reordered
        // message must not roll them back.
        self.completed = self.completed.max(completed);
        self.total = total;
        self.succeeded = self.succeeded.max(succeeded);
        self.failed = self.failed.max(failed);
        self.mark_dirty();
    }

    pub(crate) fn complete_run(
        &mut self,
        succeeded: usize,
        failed: usize,
        failed_rows: Vec<FailedRow>,
    ) {
        self.session = SessionState::Completed;
        self.completed = succeeded + failed;
        self.succeeded = succeeded;
        self.failed = failed;
        self.failed_rows = failed_rows;
        self.mark_dirty();
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.mark_dirty();
    }

    pub(crate) fn reset_to_idle(&mut self) {
        self.session = SessionState::Idle;
        self.mark_dirty();
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
