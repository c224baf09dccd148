use super::domain::{Assessment, CommitteeDecision, ManagerReview, PeerReview};
use super::snapshot::ReviewSnapshot;

/// Boundary to the hosted table store. Reads return the full current set;
/// appends are not coordinated here, so two reviewers racing on the same
/// assessment must be reconciled by the store itself.
pub trait ReviewStore: Send + Sync {
    fn snapshot(&self) -> Result<ReviewSnapshot, StoreError>;
    /// Stores a new assessment. An id already present is a `Conflict`.
    fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment, StoreError>;
    /// Replaces a stored assessment. An unknown id is `NotFound`.
    fn update_assessment(&self, assessment: Assessment) -> Result<Assessment, StoreError>;
    fn append_peer_review(&self, review: PeerReview) -> Result<PeerReview, StoreError>;
    fn append_manager_review(&self, review: ManagerReview) -> Result<ManagerReview, StoreError>;
    fn append_committee_decision(
        &self,
        decision: CommitteeDecision,
    ) -> Result<CommitteeDecision, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
