use serde::{Deserialize, Serialize};

use super::domain::UserRole;
use super::stage::Stage;

/// Writes a user can attempt against an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    CreateDraft,
    EditDraft,
    SubmitAssessment,
    SubmitPeerReview,
    SubmitManagerReview,
    SubmitCommitteeDecision,
}

impl ReviewAction {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::CreateDraft,
            Self::EditDraft,
            Self::SubmitAssessment,
            Self::SubmitPeerReview,
            Self::SubmitManagerReview,
            Self::SubmitCommitteeDecision,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CreateDraft => "Create draft",
            Self::EditDraft => "Edit draft",
            Self::SubmitAssessment => "Submit assessment",
            Self::SubmitPeerReview => "Submit peer review",
            Self::SubmitManagerReview => "Submit manager review",
            Self::SubmitCommitteeDecision => "Submit committee decision",
        }
    }
}

const DRAFT_ONLY: &[Stage] = &[Stage::Draft];
const PEER_REVIEW_OPEN: &[Stage] = &[Stage::Submitted, Stage::PeerReview, Stage::CommitteeReview];
const MANAGER_REVIEW_OPEN: &[Stage] = &[Stage::Submitted, Stage::PeerReview];
const COMMITTEE_ONLY: &[Stage] = &[Stage::CommitteeReview];

/// Stages in which `role` may perform `action`; `None` means never.
pub const fn stage_gate(role: UserRole, action: ReviewAction) -> Option<&'static [Stage]> {
    use ReviewAction::*;
    use UserRole::*;

    match (action, role) {
        (CreateDraft | EditDraft | SubmitAssessment, Employee) => Some(DRAFT_ONLY),
        (SubmitPeerReview, Employee | Manager | Hr | Admin | CommitteeMember) => {
            Some(PEER_REVIEW_OPEN)
        }
        (SubmitManagerReview, Manager | Hr | Admin) => Some(MANAGER_REVIEW_OPEN),
        (SubmitCommitteeDecision, CommitteeMember | Hr | Admin) => Some(COMMITTEE_ONLY),
        _ => None,
    }
}

/// Whether `role` may perform `action` while the assessment sits in `stage`.
pub fn authorize(role: UserRole, action: ReviewAction, stage: Stage) -> bool {
    stage_gate(role, action)
        .map(|stages| stages.contains(&stage))
        .unwrap_or(false)
}

/// Whether `role` may perform `action` in any stage at all.
pub fn role_may(role: UserRole, action: ReviewAction) -> bool {
    stage_gate(role, action).is_some()
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionEntry {
    pub role: UserRole,
    pub action: ReviewAction,
    pub stages: &'static [Stage],
}

/// Every allowed (role, action) pair with its stage gate.
pub fn permission_matrix() -> Vec<PermissionEntry> {
    let mut entries = Vec::new();
    for role in UserRole::ordered() {
        for action in ReviewAction::ordered() {
            if let Some(stages) = stage_gate(role, action) {
                entries.push(PermissionEntry {
                    role,
                    action,
                    stages,
                });
            }
        }
    }
    entries
}
