//! Assessment lifecycle: stage derivation, role gates, review queues, and the
//! HTTP surface that plans writes against a store snapshot.

pub mod authorization;
pub mod commands;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod snapshot;
pub mod stage;

#[cfg(test)]
mod tests;

pub use authorization::{authorize, permission_matrix, role_may, PermissionEntry, ReviewAction};
pub use commands::{
    ActionRejected, CommitteeDecisionInput, DraftInput, ManagerReviewInput, PeerReviewInput,
};
pub use domain::{
    AchievementsCategory, Actor, Assessment, AssessmentId, AssessmentStatus, CommitteeDecision,
    CommitteeVerdict, DecisionId, GradeLevel, ManagerReview, ManagerReviewId,
    ManagerReviewStatus, PeerReview, PeerReviewId, PeerReviewStatus, ReviewCycle, ReviewCycleId,
    User, UserId, UserRole,
};
pub use eligibility::{
    is_ready_for_committee_review, is_ready_for_manager_review, is_ready_for_peer_review,
    list_ready_for_committee_review, list_ready_for_manager_review, list_ready_for_peer_review,
    list_reviewed_by, list_team_assessments, next_review_order, potential_peer_reviewers,
    Ineligibility, ReviewedAssessment,
};
pub use engine::{
    AssessmentOverview, DashboardSummary, DecisionCounts, LifecycleEngine, StageCount,
};
pub use policy::{
    LifecyclePolicy, ReviewTally, DEFAULT_MIN_CONFIRMED_REVIEWS, DEFAULT_MIN_PEER_REVIEWS,
};
pub use repository::{ReviewStore, StoreError};
pub use router::{review_router, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use service::{ReviewHistoryEntry, ReviewServiceError, ReviewWorkflowService};
pub use snapshot::{
    effective_decision, tally_for, unique_peer_reviews, ReviewSnapshot, SnapshotIndex,
};
pub use stage::{derive_stage, Stage};
