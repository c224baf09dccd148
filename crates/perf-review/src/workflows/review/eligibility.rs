//! Side-effect free queue predicates.
//!
//! Every function takes the snapshot pieces it needs as explicit arguments. Each
//! `*_blocker` returns the first rule an assessment fails; the boolean `is_ready_*`
//! forms are thin wrappers so callers that only filter need not match on reasons.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use super::domain::{
    Assessment, AssessmentId, AssessmentStatus, CommitteeDecision, ManagerReview, PeerReview,
    User, UserId, UserRole,
};
use super::policy::LifecyclePolicy;
use super::snapshot::{tally_for, SnapshotIndex};

/// Why an assessment is not in a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    NotDraft,
    NotSubmitted,
    OwnAssessment,
    AlreadyReviewed,
    AlreadyDecided,
    AwaitingPeerReviews,
    ManagerReviewRecorded,
}

impl Ineligibility {
    pub const fn summary(self) -> &'static str {
        match self {
            Self::NotDraft => "assessment is no longer a draft",
            Self::NotSubmitted => "assessment has not been submitted",
            Self::OwnAssessment => "reviewers cannot act on their own assessment",
            Self::AlreadyReviewed => "reviewer already recorded a review for this assessment",
            Self::AlreadyDecided => "committee decision already recorded",
            Self::AwaitingPeerReviews => "assessment lacks the required confirmed peer reviews",
            Self::ManagerReviewRecorded => "manager review already recorded",
        }
    }
}

pub fn peer_review_blocker<'a, I>(
    actor_id: &UserId,
    assessment: &Assessment,
    peer_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
) -> Option<Ineligibility>
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    if assessment.status != AssessmentStatus::Submitted {
        return Some(Ineligibility::NotSubmitted);
    }
    if &assessment.employee_id == actor_id {
        return Some(Ineligibility::OwnAssessment);
    }
    if decided(assessment, committee_decision) {
        return Some(Ineligibility::AlreadyDecided);
    }

    let already_reviewed = peer_reviews
        .into_iter()
        .any(|review| review.assessment_id == assessment.id && &review.reviewer_id == actor_id);
    if already_reviewed {
        return Some(Ineligibility::AlreadyReviewed);
    }

    None
}

pub fn is_ready_for_peer_review<'a, I>(
    actor_id: &UserId,
    assessment: &Assessment,
    peer_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
) -> bool
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    peer_review_blocker(actor_id, assessment, peer_reviews, committee_decision).is_none()
}

pub fn committee_review_blocker<'a, I>(
    assessment: &Assessment,
    peer_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
    policy: &LifecyclePolicy,
) -> Option<Ineligibility>
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    if assessment.status != AssessmentStatus::Submitted {
        return Some(Ineligibility::NotSubmitted);
    }
    if decided(assessment, committee_decision) {
        return Some(Ineligibility::AlreadyDecided);
    }
    if !policy.has_quorum(&tally_for(&assessment.id, peer_reviews)) {
        return Some(Ineligibility::AwaitingPeerReviews);
    }

    None
}

pub fn is_ready_for_committee_review<'a, I>(
    assessment: &Assessment,
    peer_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
    policy: &LifecyclePolicy,
) -> bool
where
    I: IntoIterator<Item = &'a PeerReview>,
{
    committee_review_blocker(assessment, peer_reviews, committee_decision, policy).is_none()
}

/// A single manager review per assessment; any manager may pick it up.
pub fn manager_review_blocker<'a, I>(
    actor_id: &UserId,
    assessment: &Assessment,
    manager_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
) -> Option<Ineligibility>
where
    I: IntoIterator<Item = &'a ManagerReview>,
{
    if assessment.status != AssessmentStatus::Submitted {
        return Some(Ineligibility::NotSubmitted);
    }
    if &assessment.employee_id == actor_id {
        return Some(Ineligibility::OwnAssessment);
    }
    if decided(assessment, committee_decision) {
        return Some(Ineligibility::AlreadyDecided);
    }

    let recorded = manager_reviews
        .into_iter()
        .any(|review| review.assessment_id == assessment.id);
    if recorded {
        return Some(Ineligibility::ManagerReviewRecorded);
    }

    None
}

pub fn is_ready_for_manager_review<'a, I>(
    actor_id: &UserId,
    assessment: &Assessment,
    manager_reviews: I,
    committee_decision: Option<&CommitteeDecision>,
) -> bool
where
    I: IntoIterator<Item = &'a ManagerReview>,
{
    manager_review_blocker(actor_id, assessment, manager_reviews, committee_decision).is_none()
}

/// Assessments `actor_id` may peer review, in input order.
pub fn list_ready_for_peer_review<'s>(
    actor_id: &UserId,
    assessments: &'s [Assessment],
    peer_reviews: &[PeerReview],
    committee_decisions: &[CommitteeDecision],
) -> Vec<&'s Assessment> {
    let index = SnapshotIndex::build(peer_reviews, committee_decisions, &[]);
    assessments
        .iter()
        .filter(|assessment| {
            is_ready_for_peer_review(
                actor_id,
                assessment,
                index.peer_reviews_for(&assessment.id).iter().copied(),
                index.decision_for(&assessment.id),
            )
        })
        .collect()
}

/// Assessments awaiting a committee ruling, oldest submission first.
///
/// Undated submissions go last. The sort is stable, so ties keep input order.
pub fn list_ready_for_committee_review<'s>(
    assessments: &'s [Assessment],
    peer_reviews: &[PeerReview],
    committee_decisions: &[CommitteeDecision],
    policy: &LifecyclePolicy,
) -> Vec<&'s Assessment> {
    let index = SnapshotIndex::build(peer_reviews, committee_decisions, &[]);
    let mut ready: Vec<&'s Assessment> = assessments
        .iter()
        .filter(|assessment| {
            is_ready_for_committee_review(
                assessment,
                index.peer_reviews_for(&assessment.id).iter().copied(),
                index.decision_for(&assessment.id),
                policy,
            )
        })
        .collect();

    ready.sort_by(|a, b| submission_order(a, b));
    ready
}

pub fn list_ready_for_manager_review<'s>(
    actor_id: &UserId,
    assessments: &'s [Assessment],
    manager_reviews: &[ManagerReview],
    committee_decisions: &[CommitteeDecision],
) -> Vec<&'s Assessment> {
    let index = SnapshotIndex::build(&[], committee_decisions, manager_reviews);
    assessments
        .iter()
        .filter(|assessment| {
            is_ready_for_manager_review(
                actor_id,
                assessment,
                index.manager_reviews_for(&assessment.id).iter().copied(),
                index.decision_for(&assessment.id),
            )
        })
        .collect()
}

/// A peer review written by the actor together with the ruling that closed it, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewedAssessment<'s> {
    pub assessment: &'s Assessment,
    pub review: &'s PeerReview,
    pub decision: Option<&'s CommitteeDecision>,
}

/// The actor's review history. Reviews pointing at unknown assessments are dropped.
pub fn list_reviewed_by<'s>(
    actor_id: &UserId,
    assessments: &'s [Assessment],
    peer_reviews: &'s [PeerReview],
    committee_decisions: &'s [CommitteeDecision],
) -> Vec<ReviewedAssessment<'s>> {
    let index = SnapshotIndex::build(peer_reviews, committee_decisions, &[]);
    assessments
        .iter()
        .filter_map(|assessment| {
            let review = index
                .peer_reviews_for(&assessment.id)
                .iter()
                .copied()
                .find(|review| &review.reviewer_id == actor_id)?;
            Some(ReviewedAssessment {
                assessment,
                review,
                decision: index.decision_for(&assessment.id),
            })
        })
        .collect()
}

/// Order assigned to the next review written against `assessment_id`.
pub fn next_review_order(assessment_id: &AssessmentId, peer_reviews: &[PeerReview]) -> u32 {
    let existing = peer_reviews
        .iter()
        .filter(|review| &review.assessment_id == assessment_id)
        .count();
    u32::try_from(existing).unwrap_or(u32::MAX - 1) + 1
}

/// Assessments written by the manager's direct reports, in input order.
pub fn list_team_assessments<'s>(
    manager_id: &UserId,
    users: &[User],
    assessments: &'s [Assessment],
) -> Vec<&'s Assessment> {
    let team: HashSet<&UserId> = users
        .iter()
        .filter(|user| user.manager_id.as_ref() == Some(manager_id))
        .map(|user| &user.id)
        .collect();

    assessments
        .iter()
        .filter(|assessment| team.contains(&assessment.employee_id))
        .collect()
}

/// Colleagues an employee may nominate as peer reviewers.
pub fn potential_peer_reviewers<'s>(employee_id: &UserId, users: &'s [User]) -> Vec<&'s User> {
    users
        .iter()
        .filter(|user| &user.id != employee_id)
        .filter(|user| matches!(user.role, UserRole::Employee | UserRole::CommitteeMember))
        .collect()
}

fn decided(assessment: &Assessment, committee_decision: Option<&CommitteeDecision>) -> bool {
    committee_decision
        .map(|decision| decision.assessment_id == assessment.id)
        .unwrap_or(false)
}

fn submission_order(a: &Assessment, b: &Assessment) -> Ordering {
    match (a.submitted_at, b.submitted_at) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
