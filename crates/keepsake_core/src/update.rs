use crate::{AppState, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested { total } => match state.session() {
            SessionState::Running => Vec::new(),
            SessionState::Idle | SessionState::Completed => {
                if total == 0 {
                    Vec::new()
                } else {
                    state.begin_run(total);
                    vec![Effect::StartRun]
                }
            }
        },
        Msg::PauseClicked => {
            if state.session() == SessionState::Running && !state.paused() {
                state.set_paused(true);
                vec![Effect::PauseDownloads]
            } else {
                Vec::new()
            }
        }
        Msg::ResumeClicked => {
            if state.paused() {
                state.set_paused(false);
                vec![Effect::ResumeDownloads]
            } else {
                Vec::new()
            }
        }
        Msg::CancelClicked => {
            if state.session() == SessionState::Running {
                state.reset_to_idle();
                vec![Effect::CancelRun]
            } else {
                Vec::new()
            }
        }
        Msg::RetryFailedClicked => {
            // Retry is only offered once a run finished with failures on
            // record; it scopes the next run to exactly those records.
            if state.session() == SessionState::Completed && state.failed_count() > 0 {
                let total = state.failed_count();
                state.begin_run(total);
                vec![Effect::RetryFailed]
            } else {
                Vec::new()
            }
        }
        Msg::ProgressReported {
            completed,
            total,
            succeeded,
            failed,
        } => {
            state.apply_progress(completed, total, succeeded, failed);
            Vec::new()
        }
        Msg::RunCompleted {
            succeeded,
            failed,
            failed_rows,
        } => {
            state.complete_run(succeeded, failed, failed_rows);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
