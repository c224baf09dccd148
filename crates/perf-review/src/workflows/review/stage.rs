use serde::{Deserialize, Serialize};

use super::domain::{Assessment, AssessmentStatus, CommitteeDecision, PeerReview};
use super::policy::LifecyclePolicy;
use super::snapshot::tally_for;

/// Derived lifecycle position of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Submitted,
    PeerReview,
    CommitteeReview,
    Completed,
}

impl Stage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Draft,
            Self::Submitted,
            Self::PeerReview,
            Self::CommitteeReview,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::PeerReview => "Peer Review",
            Self::CommitteeReview => "Committee Review",
            Self::Completed => "Completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Folds an assessment and whatever reviews the caller has into its stage.
///
/// Reviews for other assessments and a decision for another assessment are
/// ignored, so callers may pass whole snapshot collections.
pub fn derive_stage<'a, I>(
    assessment: &Assessment,
    peer_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
    policy: &LifecyclePolicy,
) -> Stage
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    let decided = committee_decision
        .map(|decision| decision.assessment_id == assessment.id)
        .unwrap_or(false);
    if decided {
        return Stage::Completed;
    }

    let tally = tally_for(&assessment.id, peer_reviews);
    if policy.has_quorum(&tally) {
        Stage::CommitteeReview
    } else if tally.total > 0 {
        Stage::PeerReview
    } else if assessment.status == AssessmentStatus::Submitted {
        Stage::Submitted
    } else {
        Stage::Draft
    }
}
