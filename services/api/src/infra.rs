use metrics_exporter_prometheus::PrometheusHandle;
use perf_review::workflows::import::{SnapshotImportError, SnapshotImporter};
use perf_review::workflows::review::{
    Assessment, CommitteeDecision, ManagerReview, PeerReview, ReviewSnapshot, ReviewStore,
    StoreError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local stand-in for the hosted table store.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewStore {
    tables: Arc<Mutex<ReviewSnapshot>>,
}

impl InMemoryReviewStore {
    pub(crate) fn seeded(snapshot: ReviewSnapshot) -> Self {
        Self {
            tables: Arc::new(Mutex::new(snapshot)),
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, ReviewSnapshot>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("review store mutex poisoned".to_string()))
    }
}

impl ReviewStore for InMemoryReviewStore {
    fn snapshot(&self) -> Result<ReviewSnapshot, StoreError> {
        Ok(self.tables()?.clone())
    }

    fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment, StoreError> {
        let mut guard = self.tables()?;
        if guard
            .assessments
            .iter()
            .any(|existing| existing.id == assessment.id)
        {
            return Err(StoreError::Conflict);
        }
        guard.assessments.push(assessment.clone());
        Ok(assessment)
    }

    fn update_assessment(&self, assessment: Assessment) -> Result<Assessment, StoreError> {
        let mut guard = self.tables()?;
        let existing = guard
            .assessments
            .iter_mut()
            .find(|existing| existing.id == assessment.id)
            .ok_or(StoreError::NotFound)?;
        *existing = assessment.clone();
        Ok(assessment)
    }

    fn append_peer_review(&self, review: PeerReview) -> Result<PeerReview, StoreError> {
        let mut guard = self.tables()?;
        if guard.peer_reviews.iter().any(|existing| existing.id == review.id) {
            return Err(StoreError::Conflict);
        }
        guard.peer_reviews.push(review.clone());
        Ok(review)
    }

    fn append_manager_review(&self, review: ManagerReview) -> Result<ManagerReview, StoreError> {
        let mut guard = self.tables()?;
        if guard
            .manager_reviews
            .iter()
            .any(|existing| existing.id == review.id)
        {
            return Err(StoreError::Conflict);
        }
        guard.manager_reviews.push(review.clone());
        Ok(review)
    }

    fn append_committee_decision(
        &self,
        decision: CommitteeDecision,
    ) -> Result<CommitteeDecision, StoreError> {
        let mut guard = self.tables()?;
        if guard
            .committee_decisions
            .iter()
            .any(|existing| existing.id == decision.id)
        {
            return Err(StoreError::Conflict);
        }
        guard.committee_decisions.push(decision.clone());
        Ok(decision)
    }
}

/// Sample exports shipped with the core crate.
pub(crate) fn default_snapshot_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../crates/perf-review/fixtures/snapshot")
}

pub(crate) fn load_snapshot(dir: Option<&Path>) -> Result<ReviewSnapshot, SnapshotImportError> {
    match dir {
        Some(dir) => SnapshotImporter::from_dir(dir),
        None => SnapshotImporter::from_dir(default_snapshot_dir()),
    }
}
