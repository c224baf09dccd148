use serde::Serialize;

use super::authorization::{authorize, role_may, ReviewAction};
use super::domain::{
    Actor, Assessment, AssessmentId, AssessmentStatus, CommitteeDecision, CommitteeVerdict,
    GradeLevel, PeerReview, UserId, UserRole,
};
use super::eligibility::{
    committee_review_blocker, list_ready_for_committee_review, list_ready_for_manager_review,
    list_ready_for_peer_review, list_reviewed_by, list_team_assessments, manager_review_blocker,
    peer_review_blocker, ReviewedAssessment,
};
use super::policy::{LifecyclePolicy, ReviewTally};
use super::snapshot::{tally_for, ReviewSnapshot, SnapshotIndex};
use super::stage::{derive_stage, Stage};

/// Stateless derivation over a snapshot; rebuilt cheaply whenever the policy changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleEngine {
    policy: LifecyclePolicy,
}

impl LifecycleEngine {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub fn derive_stage<'a, I>(
        &self,
        assessment: &Assessment,
        peer_reviews: I,
        committee_decision: Option<&CommitteeDecision>,
    ) -> Stage
    where
        I: IntoIterator<Item = &'a PeerReview>,
    {
        derive_stage(assessment, peer_reviews, committee_decision, &self.policy)
    }

    pub fn stage_of(&self, snapshot: &ReviewSnapshot, id: &AssessmentId) -> Option<Stage> {
        let assessment = snapshot.assessment(id)?;
        let index = snapshot.index();
        Some(self.derive_stage(
            assessment,
            index.peer_reviews_for(id).iter().copied(),
            index.decision_for(id),
        ))
    }

    pub fn ready_for_peer_review<'s>(
        &self,
        actor_id: &UserId,
        snapshot: &'s ReviewSnapshot,
    ) -> Vec<&'s Assessment> {
        list_ready_for_peer_review(
            actor_id,
            &snapshot.assessments,
            &snapshot.peer_reviews,
            &snapshot.committee_decisions,
        )
    }

    pub fn ready_for_committee_review<'s>(
        &self,
        snapshot: &'s ReviewSnapshot,
    ) -> Vec<&'s Assessment> {
        list_ready_for_committee_review(
            &snapshot.assessments,
            &snapshot.peer_reviews,
            &snapshot.committee_decisions,
            &self.policy,
        )
    }

    pub fn ready_for_manager_review<'s>(
        &self,
        actor_id: &UserId,
        snapshot: &'s ReviewSnapshot,
    ) -> Vec<&'s Assessment> {
        list_ready_for_manager_review(
            actor_id,
            &snapshot.assessments,
            &snapshot.manager_reviews,
            &snapshot.committee_decisions,
        )
    }

    pub fn reviewed_by<'s>(
        &self,
        actor_id: &UserId,
        snapshot: &'s ReviewSnapshot,
    ) -> Vec<ReviewedAssessment<'s>> {
        list_reviewed_by(
            actor_id,
            &snapshot.assessments,
            &snapshot.peer_reviews,
            &snapshot.committee_decisions,
        )
    }

    pub fn team_assessments<'s>(
        &self,
        manager_id: &UserId,
        snapshot: &'s ReviewSnapshot,
    ) -> Vec<&'s Assessment> {
        list_team_assessments(manager_id, &snapshot.users, &snapshot.assessments)
    }

    /// Overview rows for the assessments of the actor's direct reports.
    pub fn team_overview(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
    ) -> Vec<AssessmentOverview> {
        let index = snapshot.index();
        self.team_assessments(&actor.id, snapshot)
            .into_iter()
            .map(|assessment| self.overview_for(assessment, &index, actor))
            .collect()
    }

    /// Per-assessment stage plus the actions `actor` may take right now.
    pub fn overview(&self, snapshot: &ReviewSnapshot, actor: &Actor) -> Vec<AssessmentOverview> {
        let index = snapshot.index();
        snapshot
            .assessments
            .iter()
            .map(|assessment| self.overview_for(assessment, &index, actor))
            .collect()
    }

    fn overview_for(
        &self,
        assessment: &Assessment,
        index: &SnapshotIndex<'_>,
        actor: &Actor,
    ) -> AssessmentOverview {
        let reviews = index.peer_reviews_for(&assessment.id);
        let decision = index.decision_for(&assessment.id);
        let stage = self.derive_stage(assessment, reviews.iter().copied(), decision);
        let tally = tally_for(&assessment.id, reviews.iter().copied());

        let actions = if stage.is_terminal() {
            Vec::new()
        } else {
            ReviewAction::ordered()
                .into_iter()
                .filter(|action| *action != ReviewAction::CreateDraft)
                .filter(|action| authorize(actor.role, *action, stage))
                .filter(|action| self.eligible(*action, assessment, index, actor))
                .collect()
        };

        AssessmentOverview {
            assessment_id: assessment.id.clone(),
            employee_id: assessment.employee_id.clone(),
            stage,
            stage_label: stage.label(),
            tally,
            verdict: decision.map(|decision| decision.decision),
            final_grade: decision.map(|decision| decision.final_grade),
            actions,
        }
    }

    fn eligible(
        &self,
        action: ReviewAction,
        assessment: &Assessment,
        index: &SnapshotIndex<'_>,
        actor: &Actor,
    ) -> bool {
        let decision = index.decision_for(&assessment.id);
        match action {
            ReviewAction::CreateDraft => true,
            ReviewAction::EditDraft | ReviewAction::SubmitAssessment => {
                assessment.employee_id == actor.id && assessment.status == AssessmentStatus::Draft
            }
            ReviewAction::SubmitPeerReview => peer_review_blocker(
                &actor.id,
                assessment,
                index.peer_reviews_for(&assessment.id).iter().copied(),
                decision,
            )
            .is_none(),
            ReviewAction::SubmitManagerReview => manager_review_blocker(
                &actor.id,
                assessment,
                index.manager_reviews_for(&assessment.id).iter().copied(),
                decision,
            )
            .is_none(),
            ReviewAction::SubmitCommitteeDecision => committee_review_blocker(
                assessment,
                index.peer_reviews_for(&assessment.id).iter().copied(),
                decision,
                &self.policy,
            )
            .is_none(),
        }
    }

    /// Role-aware counters for the landing page.
    pub fn dashboard(&self, snapshot: &ReviewSnapshot, actor: &Actor) -> DashboardSummary {
        let index = snapshot.index();
        let mut stage_counts: Vec<StageCount> = Stage::ordered()
            .into_iter()
            .map(|stage| StageCount {
                stage,
                stage_label: stage.label(),
                count: 0,
            })
            .collect();

        let mut own_assessments = 0;
        for assessment in &snapshot.assessments {
            let stage = self.derive_stage(
                assessment,
                index.peer_reviews_for(&assessment.id).iter().copied(),
                index.decision_for(&assessment.id),
            );
            if let Some(entry) = stage_counts.iter_mut().find(|entry| entry.stage == stage) {
                entry.count += 1;
            }
            if assessment.employee_id == actor.id {
                own_assessments += 1;
            }
        }

        let peer_queue = if role_may(actor.role, ReviewAction::SubmitPeerReview) {
            self.ready_for_peer_review(&actor.id, snapshot).len()
        } else {
            0
        };
        let manager_queue = if role_may(actor.role, ReviewAction::SubmitManagerReview) {
            self.ready_for_manager_review(&actor.id, snapshot).len()
        } else {
            0
        };
        let committee_queue = if role_may(actor.role, ReviewAction::SubmitCommitteeDecision) {
            self.ready_for_committee_review(snapshot).len()
        } else {
            0
        };

        let mut decisions = DecisionCounts::default();
        for decision in snapshot
            .committee_decisions
            .iter()
            .filter(|decision| decision.committee_member_id == actor.id)
        {
            decisions.recorded += 1;
            match decision.decision {
                CommitteeVerdict::Approved => decisions.approved += 1,
                CommitteeVerdict::Rejected => decisions.rejected += 1,
                _ => {}
            }
        }

        DashboardSummary {
            role: actor.role,
            role_label: actor.role.label(),
            total_assessments: snapshot.assessments.len(),
            own_assessments,
            stage_counts,
            peer_queue,
            manager_queue,
            committee_queue,
            reviews_written: self.reviewed_by(&actor.id, snapshot).len(),
            decisions,
            active_cycle: snapshot.active_cycle().map(|cycle| cycle.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentOverview {
    pub assessment_id: AssessmentId,
    pub employee_id: UserId,
    pub stage: Stage,
    pub stage_label: &'static str,
    pub tally: ReviewTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<CommitteeVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_grade: Option<GradeLevel>,
    pub actions: Vec<ReviewAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCount {
    pub stage: Stage,
    pub stage_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionCounts {
    pub recorded: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub role: UserRole,
    pub role_label: &'static str,
    pub total_assessments: usize,
    pub own_assessments: usize,
    pub stage_counts: Vec<StageCount>,
    pub peer_queue: usize,
    pub manager_queue: usize,
    pub committee_queue: usize,
    pub reviews_written: usize,
    pub decisions: DecisionCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_cycle: Option<String>,
}

impl DashboardSummary {
    pub fn count_for(&self, stage: Stage) -> usize {
        self.stage_counts
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}
