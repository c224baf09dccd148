use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::authorization::{role_may, ReviewAction};
use super::commands::{
    ActionRejected, CommitteeDecisionInput, DraftInput, ManagerReviewInput, PeerReviewInput,
};
use super::domain::{
    Actor, Assessment, AssessmentId, CommitteeDecision, CommitteeVerdict, DecisionId,
    ManagerReview, ManagerReviewId, PeerReview, PeerReviewId, PeerReviewStatus, UserId,
};
use super::engine::{AssessmentOverview, DashboardSummary, LifecycleEngine};
use super::policy::LifecyclePolicy;
use super::repository::{ReviewStore, StoreError};
use super::snapshot::ReviewSnapshot;
use super::stage::Stage;

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id(prefix: &str) -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// The sequence restarts with the process, so skip ids an earlier run already stored.
fn unused_record_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = next_record_id(prefix);
        if !taken(&id) {
            return id;
        }
    }
}

/// Service composing a store with the lifecycle engine.
///
/// Every call fetches a fresh snapshot, plans against it, and appends the
/// result. Nothing is cached between calls.
pub struct ReviewWorkflowService<S> {
    store: Arc<S>,
    engine: LifecycleEngine,
    clock: fn() -> DateTime<Utc>,
}

impl<S> ReviewWorkflowService<S>
where
    S: ReviewStore + 'static,
{
    pub fn new(store: Arc<S>, policy: LifecyclePolicy) -> Self {
        Self {
            store,
            engine: LifecycleEngine::new(policy),
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock used to stamp new records.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> Result<ReviewSnapshot, ReviewServiceError> {
        Ok(self.store.snapshot()?)
    }

    pub fn overview(&self, actor: &Actor) -> Result<Vec<AssessmentOverview>, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        Ok(self.engine.overview(&snapshot, actor))
    }

    pub fn dashboard(&self, actor: &Actor) -> Result<DashboardSummary, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        Ok(self.engine.dashboard(&snapshot, actor))
    }

    pub fn peer_queue(&self, actor: &Actor) -> Result<Vec<Assessment>, ReviewServiceError> {
        ensure_role(actor, ReviewAction::SubmitPeerReview, Stage::Submitted)?;
        let snapshot = self.snapshot()?;
        let queue: Vec<Assessment> = self
            .engine
            .ready_for_peer_review(&actor.id, &snapshot)
            .into_iter()
            .cloned()
            .collect();
        debug!(actor = %actor.id, size = queue.len(), "peer review queue derived");
        Ok(queue)
    }

    pub fn committee_queue(&self, actor: &Actor) -> Result<Vec<Assessment>, ReviewServiceError> {
        ensure_role(
            actor,
            ReviewAction::SubmitCommitteeDecision,
            Stage::CommitteeReview,
        )?;
        let snapshot = self.snapshot()?;
        let queue: Vec<Assessment> = self
            .engine
            .ready_for_committee_review(&snapshot)
            .into_iter()
            .cloned()
            .collect();
        debug!(actor = %actor.id, size = queue.len(), "committee queue derived");
        Ok(queue)
    }

    pub fn manager_queue(&self, actor: &Actor) -> Result<Vec<Assessment>, ReviewServiceError> {
        ensure_role(actor, ReviewAction::SubmitManagerReview, Stage::Submitted)?;
        let snapshot = self.snapshot()?;
        let queue: Vec<Assessment> = self
            .engine
            .ready_for_manager_review(&actor.id, &snapshot)
            .into_iter()
            .cloned()
            .collect();
        debug!(actor = %actor.id, size = queue.len(), "manager review queue derived");
        Ok(queue)
    }

    /// Stage and available actions for every assessment of the actor's direct reports.
    pub fn team_assessments(
        &self,
        actor: &Actor,
    ) -> Result<Vec<AssessmentOverview>, ReviewServiceError> {
        ensure_role(actor, ReviewAction::SubmitManagerReview, Stage::Submitted)?;
        let snapshot = self.snapshot()?;
        let team = self.engine.team_overview(&snapshot, actor);
        debug!(actor = %actor.id, size = team.len(), "team assessments derived");
        Ok(team)
    }

    /// Peer reviews the actor has written, with the committee verdict once one exists.
    pub fn review_history(
        &self,
        actor: &Actor,
    ) -> Result<Vec<ReviewHistoryEntry>, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        Ok(self
            .engine
            .reviewed_by(&actor.id, &snapshot)
            .into_iter()
            .map(|entry| ReviewHistoryEntry {
                assessment_id: entry.assessment.id.clone(),
                employee_id: entry.assessment.employee_id.clone(),
                order: entry.review.order,
                status: entry.review.status,
                verdict: entry.decision.map(|decision| decision.decision),
            })
            .collect())
    }

    pub fn create_draft(
        &self,
        actor: &Actor,
        input: DraftInput,
    ) -> Result<Assessment, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        let id = AssessmentId(unused_record_id("sa", |id| {
            snapshot.assessments.iter().any(|existing| existing.id.as_str() == id)
        }));
        let draft = self
            .engine
            .plan_draft(&snapshot, actor, input, id, (self.clock)())
            .map_err(|rejected| rejection(actor, rejected))?;

        let stored = self.store.insert_assessment(draft)?;
        info!(actor = %actor.id, assessment = %stored.id, "draft assessment saved");
        Ok(stored)
    }

    pub fn update_draft(
        &self,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: DraftInput,
    ) -> Result<Assessment, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        let updated = self
            .engine
            .plan_draft_update(&snapshot, actor, assessment_id, input, (self.clock)())
            .map_err(|rejected| rejection(actor, rejected))?;

        let stored = self.store.update_assessment(updated)?;
        info!(actor = %actor.id, assessment = %stored.id, "draft assessment updated");
        Ok(stored)
    }

    pub fn submit_assessment(
        &self,
        actor: &Actor,
        assessment_id: &AssessmentId,
    ) -> Result<Assessment, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        let submitted = self
            .engine
            .plan_submission(&snapshot, actor, assessment_id, (self.clock)())
            .map_err(|rejected| rejection(actor, rejected))?;

        let stored = self.store.update_assessment(submitted)?;
        info!(actor = %actor.id, assessment = %stored.id, "assessment submitted for review");
        Ok(stored)
    }

    pub fn submit_peer_review(
        &self,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: PeerReviewInput,
    ) -> Result<PeerReview, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        let id = PeerReviewId(unused_record_id("pr", |id| {
            snapshot.peer_reviews.iter().any(|existing| existing.id.as_str() == id)
        }));
        let review = self
            .engine
            .plan_peer_review(&snapshot, actor, assessment_id, input, id, (self.clock)())
            .map_err(|rejected| rejection(actor, rejected))?;

        let stored = self.store.append_peer_review(review)?;
        info!(
            actor = %actor.id,
            assessment = %stored.assessment_id,
            order = stored.order,
            status = %stored.status,
            "peer review recorded"
        );
        Ok(stored)
    }

    pub fn submit_manager_review(
        &self,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: ManagerReviewInput,
    ) -> Result<ManagerReview, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        let id = ManagerReviewId(unused_record_id("mr", |id| {
            snapshot.manager_reviews.iter().any(|existing| existing.id.as_str() == id)
        }));
        let review = self
            .engine
            .plan_manager_review(&snapshot, actor, assessment_id, input, id)
            .map_err(|rejected| rejection(actor, rejected))?;

        let stored = self.store.append_manager_review(review)?;
        info!(
            actor = %actor.id,
            assessment = %stored.assessment_id,
            status = %stored.status,
            "manager review recorded"
        );
        Ok(stored)
    }

    pub fn submit_committee_decision(
        &self,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: CommitteeDecisionInput,
    ) -> Result<CommitteeDecision, ReviewServiceError> {
        let snapshot = self.snapshot()?;
        let id = DecisionId(unused_record_id("cd", |id| {
            snapshot
                .committee_decisions
                .iter()
                .any(|existing| existing.id.as_str() == id)
        }));
        let decision = self
            .engine
            .plan_committee_decision(&snapshot, actor, assessment_id, input, id, (self.clock)())
            .map_err(|rejected| rejection(actor, rejected))?;

        let stored = self.store.append_committee_decision(decision)?;
        info!(
            actor = %actor.id,
            assessment = %stored.assessment_id,
            decision = %stored.decision,
            final_grade = %stored.final_grade,
            "committee decision recorded"
        );
        Ok(stored)
    }
}

fn ensure_role(actor: &Actor, action: ReviewAction, stage: Stage) -> Result<(), ActionRejected> {
    if role_may(actor.role, action) {
        Ok(())
    } else {
        Err(ActionRejected::NotAuthorized {
            role: actor.role,
            action,
            stage,
        })
    }
}

fn rejection(actor: &Actor, rejected: ActionRejected) -> ReviewServiceError {
    warn!(actor = %actor.id, role = %actor.role, reason = %rejected, "review action rejected");
    ReviewServiceError::Rejected(rejected)
}

/// One row of a reviewer's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewHistoryEntry {
    pub assessment_id: AssessmentId,
    pub employee_id: UserId,
    pub order: u32,
    pub status: PeerReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<CommitteeVerdict>,
}

/// Error raised by the review workflow service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Rejected(#[from] ActionRejected),
    #[error(transparent)]
    Store(#[from] StoreError),
}
