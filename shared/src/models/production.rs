//! Production stage checklist
//!
//! Each print job (invoice) walks through the company's stages in order.
//! A stage moves pending -> in_progress -> completed, optionally through
//! requires_approval, and may be put on hold, resumed or skipped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Action;
use crate::error::TransitionError;

/// Status of one production stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    RequiresApproval,
    OnHold,
    Completed,
    Skipped,
}

/// Something a user does to a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    Start,
    Complete,
    Approve,
    Hold,
    Resume,
    Skip,
}

impl StageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageAction::Start => "start",
            StageAction::Complete => "complete",
            StageAction::Approve => "approve",
            StageAction::Hold => "hold",
            StageAction::Resume => "resume",
            StageAction::Skip => "skip",
        }
    }

    /// Permission action (`production:<action>`) a user needs to perform this
    pub fn required_permission(&self) -> Action {
        match self {
            StageAction::Approve => Action::Approve,
            StageAction::Skip => Action::Skip,
            _ => Action::Edit,
        }
    }
}

impl fmt::Display for StageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in_progress",
            StageStatus::RequiresApproval => "requires_approval",
            StageStatus::OnHold => "on_hold",
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StageStatus::Pending),
            "in_progress" => Some(StageStatus::InProgress),
            "requires_approval" => Some(StageStatus::RequiresApproval),
            "on_hold" => Some(StageStatus::OnHold),
            "completed" => Some(StageStatus::Completed),
            "skipped" => Some(StageStatus::Skipped),
            _ => None,
        }
    }

    /// Completed and skipped stages no longer block later stages
    pub fn is_done(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Skipped)
    }

    /// Apply `action` to a stage in this status.
    ///
    /// `requires_approval` is the stage's own flag; `held_from` is the status
    /// remembered when the stage was put on hold.
    pub fn apply(
        &self,
        action: StageAction,
        requires_approval: bool,
        held_from: Option<StageStatus>,
    ) -> Result<StageStatus, TransitionError> {
        use StageAction::*;
        use StageStatus::*;

        let next = match (self, action) {
            (Pending, Start) => InProgress,
            (InProgress, Complete) if requires_approval => RequiresApproval,
            (InProgress, Complete) => Completed,
            (RequiresApproval, Approve) => Completed,
            (Pending | InProgress, Hold) => OnHold,
            (OnHold, Resume) => match held_from {
                Some(previous @ (Pending | InProgress)) => previous,
                _ => Pending,
            },
            (Pending | OnHold, Skip) => Skipped,
            (current, action) => {
                return Err(TransitionError::new("stage", action, current));
            }
        };

        Ok(next)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages seeded for a newly registered company: `(name, requires_approval)`
pub const DEFAULT_STAGE_TEMPLATES: &[(&str, bool)] = &[
    ("Design", true),
    ("Prepress", false),
    ("Printing", false),
    ("Finishing", false),
    ("Quality check", true),
    ("Packing", false),
];

/// A company-wide stage definition copied into every new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTemplate {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub requires_approval: bool,
    pub is_active: bool,
}

/// One stage of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionStage {
    pub id: Uuid,
    pub company_id: Uuid,
    pub invoice_id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub requires_approval: bool,
    pub status: StageStatus,
    pub held_from: Option<StageStatus>,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a stage may start given the statuses of the stages before it
pub fn can_start_after(earlier: &[StageStatus]) -> bool {
    earlier.iter().all(StageStatus::is_done)
}

/// Percentage of stages that are completed or skipped, 0-100
pub fn progress_percent(statuses: &[StageStatus]) -> u8 {
    if statuses.is_empty() {
        return 0;
    }
    let done = statuses.iter().filter(|s| s.is_done()).count();
    ((done * 100) / statuses.len()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use StageAction::*;
    use StageStatus::*;

    #[test]
    fn happy_path_without_approval() {
        let s = Pending.apply(Start, false, None).unwrap();
        assert_eq!(s, InProgress);
        assert_eq!(s.apply(Complete, false, None).unwrap(), Completed);
    }

    #[test]
    fn approval_gate() {
        let s = InProgress.apply(Complete, true, None).unwrap();
        assert_eq!(s, RequiresApproval);
        assert_eq!(s.apply(Approve, true, None).unwrap(), Completed);
        assert!(InProgress.apply(Approve, true, None).is_err());
    }

    #[test]
    fn hold_and_resume_restore_previous_status() {
        let held = InProgress.apply(Hold, false, None).unwrap();
        assert_eq!(held, OnHold);
        assert_eq!(held.apply(Resume, false, Some(InProgress)).unwrap(), InProgress);
        assert_eq!(OnHold.apply(Resume, false, Some(Pending)).unwrap(), Pending);
        assert_eq!(OnHold.apply(Resume, false, None).unwrap(), Pending);
    }

    #[test]
    fn skip_only_before_work_starts() {
        assert_eq!(Pending.apply(Skip, false, None).unwrap(), Skipped);
        assert_eq!(OnHold.apply(Skip, false, None).unwrap(), Skipped);
        assert!(InProgress.apply(Skip, false, None).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        for status in [Completed, Skipped] {
            for action in [Start, Complete, Approve, Hold, Resume, Skip] {
                assert!(status.apply(action, true, None).is_err());
            }
        }
    }

    #[test]
    fn stage_waits_for_earlier_stages() {
        assert!(can_start_after(&[]));
        assert!(can_start_after(&[Completed, Skipped]));
        assert!(!can_start_after(&[Completed, InProgress]));
    }

    #[test]
    fn progress_counts_done_stages() {
        assert_eq!(progress_percent(&[]), 0);
        assert_eq!(progress_percent(&[Completed, Skipped, Pending, InProgress]), 50);
        assert_eq!(progress_percent(&[Completed, Completed, Completed]), 100);
    }

    #[test]
    fn permissions_per_action() {
        assert_eq!(Approve.required_permission(), Action::Approve);
        assert_eq!(Skip.required_permission(), Action::Skip);
        assert_eq!(Hold.required_permission(), Action::Edit);
    }
}
