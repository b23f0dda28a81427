use pretty_assertions::assert_eq;

use keepsake_core::{update, AppState, Effect, FailedRow, Msg, SessionState};

fn failed_row(n: usize) -> FailedRow {
    FailedRow {
        captured_at: format!("2024-03-{n:02} 10:00:00 UTC"),
        fetch_url: format!("https://export.example.com/media/{n}"),
    }
}

#[test]
fn progress_updates_counters() {
    let state = AppState::new();
    let (state, _) = update(state, Msg::StartRequested { total: 4 });
    let (mut state, effects) = update(
        state,
        Msg::ProgressReported {
            completed: 2,
            total: 4,
            succeeded: 1,
            failed: 1,
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.completed, 2);
    assert_eq!(view.succeeded, 1);
    assert_eq!(view.failed, 1);
    assert!(state.consume_dirty());
}

#[test]
fn stale_progress_never_rolls_counters_back() {
    let state = AppState::new();
    let (state, _) = update(state, Msg::StartRequested { total: 4 });
    let (state, _) = update(
        state,
        Msg::ProgressReported {
            completed: 3,
            total: 4,
            succeeded: 3,
            failed: 0,
        },
    );
    let (state, _) = update(
        state,
        Msg::ProgressReported {
            completed: 2,
            total: 4,
            succeeded: 2,
            failed: 0,
        },
    );

    assert_eq!(state.view().completed, 3);
    assert_eq!(state.view().succeeded, 3);
}

#[test]
fn run_completed_surfaces_failed_rows_and_retry() {
    let state = AppState::new();
    let (state, _) = update(state, Msg::StartRequested { total: 3 });
    let (state, _) = update(
        state,
        Msg::RunCompleted {
            succeeded: 1,
            failed: 2,
            failed_rows: vec![failed_row(1), failed_row(2)],
        },
    );

    let view = state.view();
    assert_eq!(view.session, SessionState::Completed);
    assert_eq!(view.completed, 3);
    assert_eq!(view.failed_rows.len(), 2);
    assert!(view.can_retry);
}

#[test]
fn retry_scopes_the_next_run_to_failed_records() {
    let state = AppState::new();
    let (state, _) = update(state, Msg::StartRequested { total: 5 });
    let (state, _) = update(
        state,
        Msg::RunCompleted {
            succeeded: 3,
            failed: 2,
            failed_rows: vec![failed_row(1), failed_row(2)],
        },
    );

    let (state, effects) = update(state, Msg::RetryFailedClicked);
    assert_eq!(effects, vec![Effect::RetryFailed]);

    let view = state.view();
    assert_eq!(view.session, SessionState::Running);
    assert_eq!(view.total, 2);
    assert_eq!(view.completed, 0);
    assert_eq!(view.failed, 0);
    assert!(view.failed_rows.is_empty());
}

#[test]
fn retry_without_failures_is_ignored() {
    let state = AppState::new();

    // From idle.
    let (state, effects) = update(state, Msg::RetryFailedClicked);
    assert!(effects.is_empty());

    // From a clean completion.
    let (state, _) = update(state, Msg::StartRequested { total: 2 });
    let (state, _) = update(
        state,
        Msg::RunCompleted {
            succeeded: 2,
            failed: 0,
            failed_rows: Vec::new(),
        },
    );
    let (state, effects) = update(state, Msg::RetryFailedClicked);
    assert!(effects.is_empty());
    assert!(!state.view().can_retry);
}

#[test]
fn a_fresh_start_clears_the_previous_runs_failures() {
    let state = AppState::new();
    let (state, _) = update(state, Msg::StartRequested { total: 2 });
    let (state, _) = update(
        state,
        Msg::RunCompleted {
            succeeded: 1,
            failed: 1,
            failed_rows: vec![failed_row(7)],
        },
    );
    let (state, _) = update(state, Msg::StartRequested { total: 8 });

    let view = state.view();
    assert_eq!(view.total, 8);
    assert_eq!(view.failed, 0);
    assert!(view.failed_rows.is_empty());
}
