//! Write planning. The engine never touches the store; it validates an intended
//! write against the snapshot and hands back the record the caller should append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::authorization::{authorize, ReviewAction};
use super::domain::{
    AchievementsCategory, Actor, Assessment, AssessmentId, AssessmentStatus, CommitteeDecision,
    CommitteeVerdict, DecisionId, GradeLevel, ManagerReview, ManagerReviewId,
    ManagerReviewStatus, PeerReview, PeerReviewId, PeerReviewStatus, ReviewCycleId, UserRole,
};
use super::eligibility::{
    committee_review_blocker, manager_review_blocker, next_review_order, peer_review_blocker,
    Ineligibility,
};
use super::engine::LifecycleEngine;
use super::snapshot::ReviewSnapshot;
use super::stage::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInput {
    #[serde(default)]
    pub review_cycle_id: Option<ReviewCycleId>,
    pub achievements: String,
    pub category: AchievementsCategory,
    pub self_evaluation: String,
    pub current_grade: GradeLevel,
    pub target_grade: GradeLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerReviewInput {
    pub status: PeerReviewStatus,
    pub feedback: String,
    #[serde(default)]
    pub confirmed_grade: Option<GradeLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerReviewInput {
    pub status: ManagerReviewStatus,
    pub comments: String,
    #[serde(default)]
    pub recommended_grade: Option<GradeLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeDecisionInput {
    pub decision: CommitteeVerdict,
    pub comments: String,
    #[serde(default)]
    pub recommendations: String,
    /// Defaults to the assessment's target grade.
    #[serde(default)]
    pub final_grade: Option<GradeLevel>,
}

impl DraftInput {
    fn validate(&self) -> Result<(), ActionRejected> {
        require_known("category", self.category.is_known())?;
        require_known("current_grade", self.current_grade.is_known())?;
        require_known("target_grade", self.target_grade.is_known())
    }
}

impl PeerReviewInput {
    fn validate(&self) -> Result<(), ActionRejected> {
        require_known("status", self.status.is_known())?;
        require_known(
            "confirmed_grade",
            self.confirmed_grade.map_or(true, GradeLevel::is_known),
        )
    }
}

impl ManagerReviewInput {
    fn validate(&self) -> Result<(), ActionRejected> {
        require_known("status", self.status.is_known())?;
        require_known(
            "recommended_grade",
            self.recommended_grade.map_or(true, GradeLevel::is_known),
        )
    }
}

/// Reason a planned write was refused. Returned, never raised, so callers can render it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejected {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error(
        "role '{role}' may not {} while the assessment is in {}",
        .action.label().to_lowercase(),
        .stage.label()
    )]
    NotAuthorized {
        role: UserRole,
        action: ReviewAction,
        stage: Stage,
    },
    #[error("only the assessment's employee may {}", .action.label().to_lowercase())]
    NotOwner { action: ReviewAction },
    #[error("cannot {}: {}", .action.label().to_lowercase(), .reason.summary())]
    NotEligible {
        action: ReviewAction,
        reason: Ineligibility,
    },
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("{0} has an unrecognized value")]
    InvalidValue(&'static str),
    #[error("no active review cycle is open")]
    NoActiveCycle,
    #[error("record id {0} is already taken")]
    DuplicateId(String),
}

impl LifecycleEngine {
    pub fn plan_draft(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
        input: DraftInput,
        id: AssessmentId,
        now: DateTime<Utc>,
    ) -> Result<Assessment, ActionRejected> {
        gate(actor, ReviewAction::CreateDraft, Stage::Draft)?;
        input.validate()?;
        if snapshot.assessment(&id).is_some() {
            return Err(ActionRejected::DuplicateId(id.0));
        }

        let review_cycle_id = match input.review_cycle_id {
            Some(cycle) => cycle,
            None => snapshot
                .active_cycle()
                .map(|cycle| cycle.id.clone())
                .ok_or(ActionRejected::NoActiveCycle)?,
        };

        Ok(Assessment {
            id,
            employee_id: actor.id.clone(),
            review_cycle_id,
            achievements: input.achievements,
            category: input.category,
            self_evaluation: input.self_evaluation,
            current_grade: input.current_grade,
            target_grade: input.target_grade,
            status: AssessmentStatus::Draft,
            submitted_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn plan_draft_update(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: DraftInput,
        now: DateTime<Utc>,
    ) -> Result<Assessment, ActionRejected> {
        let (assessment, stage) = self.locate(snapshot, assessment_id)?;
        gate(actor, ReviewAction::EditDraft, stage)?;
        ensure_owner(actor, assessment, ReviewAction::EditDraft)?;
        ensure_draft(assessment, ReviewAction::EditDraft)?;
        input.validate()?;

        let mut updated = assessment.clone();
        if let Some(cycle) = input.review_cycle_id {
            updated.review_cycle_id = cycle;
        }
        updated.achievements = input.achievements;
        updated.category = input.category;
        updated.self_evaluation = input.self_evaluation;
        updated.current_grade = input.current_grade;
        updated.target_grade = input.target_grade;
        updated.updated_at = Some(now);
        Ok(updated)
    }

    pub fn plan_submission(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
        assessment_id: &AssessmentId,
        now: DateTime<Utc>,
    ) -> Result<Assessment, ActionRejected> {
        let (assessment, stage) = self.locate(snapshot, assessment_id)?;
        gate(actor, ReviewAction::SubmitAssessment, stage)?;
        ensure_owner(actor, assessment, ReviewAction::SubmitAssessment)?;
        ensure_draft(assessment, ReviewAction::SubmitAssessment)?;
        require_text("achievements", &assessment.achievements)?;
        require_text("self_evaluation", &assessment.self_evaluation)?;

        let mut submitted = assessment.clone();
        submitted.status = AssessmentStatus::Submitted;
        submitted.submitted_at = Some(now);
        submitted.updated_at = Some(now);
        Ok(submitted)
    }

    pub fn plan_peer_review(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: PeerReviewInput,
        id: PeerReviewId,
        now: DateTime<Utc>,
    ) -> Result<PeerReview, ActionRejected> {
        let action = ReviewAction::SubmitPeerReview;
        let (assessment, stage) = self.locate(snapshot, assessment_id)?;
        gate(actor, action, stage)?;

        let decision = snapshot.index().decision_for(assessment_id);
        if let Some(reason) =
            peer_review_blocker(&actor.id, assessment, &snapshot.peer_reviews, decision)
        {
            return Err(ActionRejected::NotEligible { action, reason });
        }
        require_text("feedback", &input.feedback)?;
        input.validate()?;

        Ok(PeerReview {
            id,
            assessment_id: assessment_id.clone(),
            reviewer_id: actor.id.clone(),
            order: next_review_order(assessment_id, &snapshot.peer_reviews),
            status: input.status,
            feedback: input.feedback,
            confirmed_grade: input.confirmed_grade,
            review_date: Some(now),
        })
    }

    pub fn plan_manager_review(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: ManagerReviewInput,
        id: ManagerReviewId,
    ) -> Result<ManagerReview, ActionRejected> {
        let action = ReviewAction::SubmitManagerReview;
        let (assessment, stage) = self.locate(snapshot, assessment_id)?;
        gate(actor, action, stage)?;

        let decision = snapshot.index().decision_for(assessment_id);
        if let Some(reason) =
            manager_review_blocker(&actor.id, assessment, &snapshot.manager_reviews, decision)
        {
            return Err(ActionRejected::NotEligible { action, reason });
        }
        require_text("comments", &input.comments)?;
        input.validate()?;

        Ok(ManagerReview {
            id,
            assessment_id: assessment_id.clone(),
            manager_id: actor.id.clone(),
            status: input.status,
            recommended_grade: input.recommended_grade,
            comments: input.comments,
        })
    }

    pub fn plan_committee_decision(
        &self,
        snapshot: &ReviewSnapshot,
        actor: &Actor,
        assessment_id: &AssessmentId,
        input: CommitteeDecisionInput,
        id: DecisionId,
        now: DateTime<Utc>,
    ) -> Result<CommitteeDecision, ActionRejected> {
        let action = ReviewAction::SubmitCommitteeDecision;
        let (assessment, stage) = self.locate(snapshot, assessment_id)?;
        gate(actor, action, stage)?;

        let decision = snapshot.index().decision_for(assessment_id);
        if let Some(reason) =
            committee_review_blocker(assessment, &snapshot.peer_reviews, decision, self.policy())
        {
            return Err(ActionRejected::NotEligible { action, reason });
        }
        require_text("comments", &input.comments)?;
        require_known("decision", input.decision.is_known())?;
        let final_grade = input.final_grade.unwrap_or(assessment.target_grade);
        require_known("final_grade", final_grade.is_known())?;

        Ok(CommitteeDecision {
            id,
            assessment_id: assessment_id.clone(),
            committee_member_id: actor.id.clone(),
            decision: input.decision,
            final_grade,
            comments: input.comments,
            recommendations: input.recommendations,
            decision_date: Some(now),
        })
    }

    fn locate<'s>(
        &self,
        snapshot: &'s ReviewSnapshot,
        assessment_id: &AssessmentId,
    ) -> Result<(&'s Assessment, Stage), ActionRejected> {
        let assessment = snapshot
            .assessment(assessment_id)
            .ok_or_else(|| ActionRejected::AssessmentNotFound(assessment_id.clone()))?;
        let stage = self
            .stage_of(snapshot, assessment_id)
            .unwrap_or(Stage::Draft);
        Ok((assessment, stage))
    }
}

fn gate(actor: &Actor, action: ReviewAction, stage: Stage) -> Result<(), ActionRejected> {
    if authorize(actor.role, action, stage) {
        Ok(())
    } else {
        Err(ActionRejected::NotAuthorized {
            role: actor.role,
            action,
            stage,
        })
    }
}

fn ensure_owner(
    actor: &Actor,
    assessment: &Assessment,
    action: ReviewAction,
) -> Result<(), ActionRejected> {
    if assessment.employee_id == actor.id {
        Ok(())
    } else {
        Err(ActionRejected::NotOwner { action })
    }
}

fn ensure_draft(assessment: &Assessment, action: ReviewAction) -> Result<(), ActionRejected> {
    if assessment.status == AssessmentStatus::Draft {
        Ok(())
    } else {
        Err(ActionRejected::NotEligible {
            action,
            reason: Ineligibility::NotDraft,
        })
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ActionRejected> {
    if value.trim().is_empty() {
        Err(ActionRejected::MissingField(field))
    } else {
        Ok(())
    }
}

fn require_known(field: &'static str, known: bool) -> Result<(), ActionRejected> {
    if known {
        Ok(())
    } else {
        Err(ActionRejected::InvalidValue(field))
    }
}
