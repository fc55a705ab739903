//! Production stage workflow tests
//!
//! The stage state machine is closed: every (status, action) pair either
//! yields a known status or an invalid-transition error.

use proptest::prelude::*;
use shared::{can_start_after, progress_percent, StageAction, StageStatus, DEFAULT_STAGE_TEMPLATES};

const STATUSES: [StageStatus; 6] = [
    StageStatus::Pending,
    StageStatus::InProgress,
    StageStatus::RequiresApproval,
    StageStatus::OnHold,
    StageStatus::Completed,
    StageStatus::Skipped,
];

const ACTIONS: [StageAction; 6] = [
    StageAction::Start,
    StageAction::Complete,
    StageAction::Approve,
    StageAction::Hold,
    StageAction::Resume,
    StageAction::Skip,
];

fn status_strategy() -> impl Strategy<Value = StageStatus> {
    prop::sample::select(STATUSES.to_vec())
}

fn action_strategy() -> impl Strategy<Value = StageAction> {
    prop::sample::select(ACTIONS.to_vec())
}

/// Drive a stage through `actions`, skipping the ones that are refused
fn run(requires_approval: bool, actions: &[StageAction]) -> StageStatus {
    let mut status = StageStatus::Pending;
    let mut held_from = None;
    for action in actions {
        if let Ok(next) = status.apply(*action, requires_approval, held_from) {
            held_from = match action {
                StageAction::Hold => Some(status),
                StageAction::Resume => None,
                _ => held_from,
            };
            status = next;
        }
    }
    status
}

#[test]
fn stage_without_approval() {
    let status = run(false, &[StageAction::Start, StageAction::Complete]);
    assert_eq!(status, StageStatus::Completed);
}

#[test]
fn stage_with_approval_waits_for_approve() {
    let waiting = run(true, &[StageAction::Start, StageAction::Complete]);
    assert_eq!(waiting, StageStatus::RequiresApproval);

    let done = run(true, &[StageAction::Start, StageAction::Complete, StageAction::Approve]);
    assert_eq!(done, StageStatus::Completed);
}

#[test]
fn hold_then_resume_returns_to_work() {
    let status = run(false, &[StageAction::Start, StageAction::Hold, StageAction::Resume]);
    assert_eq!(status, StageStatus::InProgress);

    let status = run(false, &[StageAction::Hold, StageAction::Resume]);
    assert_eq!(status, StageStatus::Pending);
}

#[test]
fn held_stage_can_be_skipped() {
    assert_eq!(run(false, &[StageAction::Hold, StageAction::Skip]), StageStatus::Skipped);
}

#[test]
fn approval_needs_approve_permission_and_skip_needs_skip() {
    use shared::Action;
    assert_eq!(StageAction::Approve.required_permission(), Action::Approve);
    assert_eq!(StageAction::Skip.required_permission(), Action::Skip);
    for action in [StageAction::Start, StageAction::Complete, StageAction::Hold, StageAction::Resume] {
        assert_eq!(action.required_permission(), Action::Edit);
    }
}

#[test]
fn later_stage_waits_for_earlier_ones() {
    assert!(can_start_after(&[]));
    assert!(can_start_after(&[StageStatus::Completed, StageStatus::Skipped]));
    assert!(!can_start_after(&[StageStatus::Completed, StageStatus::OnHold]));
    assert!(!can_start_after(&[StageStatus::RequiresApproval]));
}

#[test]
fn default_templates_are_named_and_unique() {
    let mut names: Vec<&str> = DEFAULT_STAGE_TEMPLATES.iter().map(|(name, _)| *name).collect();
    assert!(names.iter().all(|n| !n.trim().is_empty()));
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), DEFAULT_STAGE_TEMPLATES.len());
}

#[test]
fn status_text_round_trips_for_storage() {
    for status in STATUSES {
        assert_eq!(StageStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(StageStatus::from_str("archived"), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Terminal states refuse every action
    #[test]
    fn done_stages_are_terminal(action in action_strategy(), approval in any::<bool>()) {
        prop_assert!(StageStatus::Completed.apply(action, approval, None).is_err());
        prop_assert!(StageStatus::Skipped.apply(action, approval, None).is_err());
    }

    /// Resume only ever restores a pre-hold working state
    #[test]
    fn resume_lands_in_pending_or_in_progress(held_from in status_strategy(), approval in any::<bool>()) {
        let next = StageStatus::OnHold.apply(StageAction::Resume, approval, Some(held_from)).unwrap();
        prop_assert!(matches!(next, StageStatus::Pending | StageStatus::InProgress));
    }

    /// Without an approval flag a stage never reaches requires_approval
    #[test]
    fn no_approval_state_without_flag(actions in prop::collection::vec(action_strategy(), 0..20)) {
        let mut status = StageStatus::Pending;
        let mut held_from = None;
        for action in actions {
            if let Ok(next) = status.apply(action, false, held_from) {
                held_from = if action == StageAction::Hold { Some(status) } else { held_from };
                status = next;
                prop_assert_ne!(status, StageStatus::RequiresApproval);
            }
        }
    }

    /// Progress is bounded and reaches 100 only when every stage is done
    #[test]
    fn progress_is_bounded(statuses in prop::collection::vec(status_strategy(), 0..12)) {
        let pct = progress_percent(&statuses);
        prop_assert!(pct <= 100);
        let all_done = !statuses.is_empty() && statuses.iter().all(StageStatus::is_done);
        prop_assert_eq!(pct == 100, all_done);
    }
}
