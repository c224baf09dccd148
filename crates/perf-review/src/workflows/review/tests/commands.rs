use super::common::*;

use crate::workflows::review::domain::{
    AchievementsCategory, Actor, AssessmentId, AssessmentStatus, CommitteeVerdict, DecisionId,
    GradeLevel, ManagerReviewId, ManagerReviewStatus, PeerReviewId, PeerReviewStatus, UserRole,
};
use crate::workflows::review::{
    ActionRejected, CommitteeDecisionInput, DraftInput, Ineligibility, LifecycleEngine,
    ManagerReviewInput, PeerReviewInput, ReviewAction, Stage,
};

fn draft_input() -> DraftInput {
    DraftInput {
        review_cycle_id: None,
        achievements: "Led the incident review programme".to_string(),
        category: AchievementsCategory::Leadership,
        self_evaluation: "Operating at the next grade".to_string(),
        current_grade: GradeLevel::L3,
        target_grade: GradeLevel::L4,
    }
}

fn confirm() -> PeerReviewInput {
    PeerReviewInput {
        status: PeerReviewStatus::Confirmed,
        feedback: "Agree with the self evaluation".to_string(),
        confirmed_grade: Some(GradeLevel::L3),
    }
}

fn approve() -> CommitteeDecisionInput {
    CommitteeDecisionInput {
        decision: CommitteeVerdict::Approved,
        comments: "Promotion approved".to_string(),
        recommendations: String::new(),
        final_grade: None,
    }
}

#[test]
fn draft_uses_active_cycle_when_none_given() {
    let engine = LifecycleEngine::default();
    let actor = Actor::new("emp", UserRole::Employee);

    let draft = engine
        .plan_draft(
            &base_snapshot(),
            &actor,
            draft_input(),
            AssessmentId::new("sa-9"),
            fixed_clock(),
        )
        .expect("draft planned");

    assert_eq!(draft.status, AssessmentStatus::Draft);
    assert_eq!(draft.review_cycle_id.as_str(), CYCLE);
    assert_eq!(draft.employee_id.as_str(), "emp");
    assert_eq!(draft.created_at, Some(fixed_clock()));
}

#[test]
fn draft_without_active_cycle_is_rejected() {
    let mut snapshot = base_snapshot();
    snapshot.review_cycles.clear();

    let rejected = LifecycleEngine::default()
        .plan_draft(
            &snapshot,
            &Actor::new("emp", UserRole::Employee),
            draft_input(),
            AssessmentId::new("sa-9"),
            fixed_clock(),
        )
        .expect_err("no cycle open");
    assert_eq!(rejected, ActionRejected::NoActiveCycle);
}

#[test]
fn managers_cannot_create_drafts() {
    let rejected = LifecycleEngine::default()
        .plan_draft(
            &base_snapshot(),
            &Actor::new("mgr", UserRole::Manager),
            draft_input(),
            AssessmentId::new("sa-9"),
            fixed_clock(),
        )
        .expect_err("manager denied");
    assert!(matches!(
        rejected,
        ActionRejected::NotAuthorized {
            action: ReviewAction::CreateDraft,
            ..
        }
    ));
}

#[test]
fn submission_requires_owner_and_content() {
    let mut snapshot = base_snapshot();
    let mut empty = assessment("sa-empty", "emp", AssessmentStatus::Draft);
    empty.self_evaluation = "   ".to_string();
    snapshot.assessments.push(empty);
    snapshot
        .assessments
        .push(assessment("sa-1", "emp", AssessmentStatus::Draft));
    let engine = LifecycleEngine::default();

    let not_owner = engine
        .plan_submission(
            &snapshot,
            &Actor::new("r1", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            fixed_clock(),
        )
        .expect_err("only the owner submits");
    assert!(matches!(not_owner, ActionRejected::NotOwner { .. }));

    let missing = engine
        .plan_submission(
            &snapshot,
            &Actor::new("emp", UserRole::Employee),
            &AssessmentId::new("sa-empty"),
            fixed_clock(),
        )
        .expect_err("self evaluation required");
    assert_eq!(missing, ActionRejected::MissingField("self_evaluation"));

    let submitted = engine
        .plan_submission(
            &snapshot,
            &Actor::new("emp", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            fixed_clock(),
        )
        .expect("owner submits");
    assert_eq!(submitted.status, AssessmentStatus::Submitted);
    assert_eq!(submitted.submitted_at, Some(fixed_clock()));
}

#[test]
fn submitted_assessments_cannot_be_edited() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));

    let rejected = LifecycleEngine::default()
        .plan_draft_update(
            &snapshot,
            &Actor::new("emp", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            draft_input(),
            fixed_clock(),
        )
        .expect_err("stage gate closed");
    assert!(matches!(
        rejected,
        ActionRejected::NotAuthorized {
            stage: Stage::Submitted,
            ..
        }
    ));
}

#[test]
fn peer_review_order_follows_existing_reviews() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));
    snapshot
        .peer_reviews
        .push(peer_review("pr-1", "sa-1", "r1", 1, PeerReviewStatus::Confirmed));

    let review = LifecycleEngine::default()
        .plan_peer_review(
            &snapshot,
            &Actor::new("r2", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            confirm(),
            PeerReviewId::new("pr-2"),
            fixed_clock(),
        )
        .expect("second reviewer accepted");

    assert_eq!(review.order, 2);
    assert_eq!(review.reviewer_id.as_str(), "r2");
    assert_eq!(review.review_date, Some(fixed_clock()));
}

#[test]
fn repeat_and_self_reviews_are_not_eligible() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));
    snapshot
        .peer_reviews
        .push(peer_review("pr-1", "sa-1", "r1", 1, PeerReviewStatus::Rejected));
    let engine = LifecycleEngine::default();

    let repeat = engine
        .plan_peer_review(
            &snapshot,
            &Actor::new("r1", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            confirm(),
            PeerReviewId::new("pr-2"),
            fixed_clock(),
        )
        .expect_err("one review per reviewer");
    assert_eq!(
        repeat,
        ActionRejected::NotEligible {
            action: ReviewAction::SubmitPeerReview,
            reason: Ineligibility::AlreadyReviewed,
        }
    );

    let own = engine
        .plan_peer_review(
            &snapshot,
            &Actor::new("emp", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            confirm(),
            PeerReviewId::new("pr-3"),
            fixed_clock(),
        )
        .expect_err("no self review");
    assert!(matches!(
        own,
        ActionRejected::NotEligible {
            reason: Ineligibility::OwnAssessment,
            ..
        }
    ));
}

#[test]
fn peer_review_feedback_is_required() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));

    let rejected = LifecycleEngine::default()
        .plan_peer_review(
            &snapshot,
            &Actor::new("r1", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            PeerReviewInput {
                feedback: String::new(),
                ..confirm()
            },
            PeerReviewId::new("pr-1"),
            fixed_clock(),
        )
        .expect_err("feedback required");
    assert_eq!(rejected, ActionRejected::MissingField("feedback"));
}

#[test]
fn committee_decision_waits_for_quorum_and_defaults_grade() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));
    snapshot
        .peer_reviews
        .push(peer_review("pr-1", "sa-1", "r1", 1, PeerReviewStatus::Confirmed));
    let engine = LifecycleEngine::default();
    let member = Actor::new("cm", UserRole::CommitteeMember);

    let early = engine
        .plan_committee_decision(
            &snapshot,
            &member,
            &AssessmentId::new("sa-1"),
            approve(),
            DecisionId::new("cd-1"),
            fixed_clock(),
        )
        .expect_err("still in peer review");
    assert!(matches!(
        early,
        ActionRejected::NotAuthorized {
            stage: Stage::PeerReview,
            ..
        }
    ));

    snapshot
        .peer_reviews
        .push(peer_review("pr-2", "sa-1", "r2", 2, PeerReviewStatus::Confirmed));
    let decided = engine
        .plan_committee_decision(
            &snapshot,
            &member,
            &AssessmentId::new("sa-1"),
            approve(),
            DecisionId::new("cd-1"),
            fixed_clock(),
        )
        .expect("quorum reached");
    assert_eq!(decided.final_grade, GradeLevel::L3);
    assert_eq!(decided.decision_date, Some(fixed_clock()));
}

#[test]
fn unrecognized_values_are_refused_on_write() {
    let engine = LifecycleEngine::default();
    let employee = Actor::new("emp", UserRole::Employee);

    let draft = engine
        .plan_draft(
            &base_snapshot(),
            &employee,
            DraftInput {
                target_grade: GradeLevel::parse("L9"),
                ..draft_input()
            },
            AssessmentId::new("sa-9"),
            fixed_clock(),
        )
        .expect_err("grade outside the ladder");
    assert_eq!(draft, ActionRejected::InvalidValue("target_grade"));

    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));
    let review = engine
        .plan_peer_review(
            &snapshot,
            &Actor::new("r1", UserRole::Employee),
            &AssessmentId::new("sa-1"),
            PeerReviewInput {
                status: PeerReviewStatus::parse("confrimed"),
                ..confirm()
            },
            PeerReviewId::new("pr-1"),
            fixed_clock(),
        )
        .expect_err("misspelled status");
    assert_eq!(review, ActionRejected::InvalidValue("status"));

    snapshot
        .peer_reviews
        .push(peer_review("pr-1", "sa-1", "r1", 1, PeerReviewStatus::Confirmed));
    snapshot
        .peer_reviews
        .push(peer_review("pr-2", "sa-1", "r2", 2, PeerReviewStatus::Confirmed));
    let member = Actor::new("cm", UserRole::CommitteeMember);
    let verdict = engine
        .plan_committee_decision(
            &snapshot,
            &member,
            &AssessmentId::new("sa-1"),
            CommitteeDecisionInput {
                decision: CommitteeVerdict::parse("aproved"),
                ..approve()
            },
            DecisionId::new("cd-1"),
            fixed_clock(),
        )
        .expect_err("misspelled verdict");
    assert_eq!(verdict, ActionRejected::InvalidValue("decision"));

    let grade = engine
        .plan_committee_decision(
            &snapshot,
            &member,
            &AssessmentId::new("sa-1"),
            CommitteeDecisionInput {
                final_grade: Some(GradeLevel::parse("L9")),
                ..approve()
            },
            DecisionId::new("cd-1"),
            fixed_clock(),
        )
        .expect_err("grade outside the ladder");
    assert_eq!(grade, ActionRejected::InvalidValue("final_grade"));
    assert_eq!(grade.to_string(), "final_grade has an unrecognized value");
}

#[test]
fn draft_refuses_an_id_already_stored() {
    let mut snapshot = base_snapshot();
    snapshot
        .assessments
        .push(assessment("sa-9", "r1", AssessmentStatus::Submitted));

    let rejected = LifecycleEngine::default()
        .plan_draft(
            &snapshot,
            &Actor::new("emp", UserRole::Employee),
            draft_input(),
            AssessmentId::new("sa-9"),
            fixed_clock(),
        )
        .expect_err("id taken");
    assert_eq!(rejected, ActionRejected::DuplicateId("sa-9".to_string()));
}

#[test]
fn manager_review_is_single_per_assessment() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-1", "emp", 2));
    snapshot
        .manager_reviews
        .push(manager_review("mr-1", "sa-1", "hr"));

    let rejected = LifecycleEngine::default()
        .plan_manager_review(
            &snapshot,
            &Actor::new("mgr", UserRole::Manager),
            &AssessmentId::new("sa-1"),
            ManagerReviewInput {
                status: ManagerReviewStatus::Approved,
                comments: "Agree".to_string(),
                recommended_grade: None,
            },
            ManagerReviewId::new("mr-2"),
        )
        .expect_err("already reviewed");
    assert!(matches!(
        rejected,
        ActionRejected::NotEligible {
            reason: Ineligibility::ManagerReviewRecorded,
            ..
        }
    ));
}

#[test]
fn unknown_assessment_is_reported() {
    let rejected = LifecycleEngine::default()
        .plan_submission(
            &base_snapshot(),
            &Actor::new("emp", UserRole::Employee),
            &AssessmentId::new("sa-missing"),
            fixed_clock(),
        )
        .expect_err("missing");
    assert_eq!(
        rejected,
        ActionRejected::AssessmentNotFound(AssessmentId::new("sa-missing"))
    );
    assert_eq!(rejected.to_string(), "assessment sa-missing not found");
}

#[test]
fn overview_lists_only_actions_the_actor_can_take() {
    let mut snapshot = base_snapshot();
    snapshot
        .assessments
        .push(assessment("sa-draft", "emp", AssessmentStatus::Draft));
    snapshot.assessments.push(submitted("sa-open", "emp", 2));
    let engine = LifecycleEngine::default();

    let owner = engine.overview(&snapshot, &Actor::new("emp", UserRole::Employee));
    assert_eq!(
        owner[0].actions,
        vec![ReviewAction::EditDraft, ReviewAction::SubmitAssessment]
    );
    assert!(owner[1].actions.is_empty());

    let colleague = engine.overview(&snapshot, &Actor::new("r1", UserRole::Employee));
    assert!(colleague[0].actions.is_empty());
    assert_eq!(colleague[1].actions, vec![ReviewAction::SubmitPeerReview]);

    let manager = engine.overview(&snapshot, &Actor::new("mgr", UserRole::Manager));
    assert_eq!(
        manager[1].actions,
        vec![
            ReviewAction::SubmitPeerReview,
            ReviewAction::SubmitManagerReview
        ]
    );
}

#[test]
fn completed_assessments_offer_no_actions() {
    let mut snapshot = base_snapshot();
    snapshot.assessments.push(submitted("sa-done", "emp", 2));
    snapshot
        .committee_decisions
        .push(decision("cd-1", "sa-done", "cm", CommitteeVerdict::Approved));
    let engine = LifecycleEngine::default();

    for actor in [
        Actor::new("cm", UserRole::CommitteeMember),
        Actor::new("mgr", UserRole::Manager),
        Actor::new("r1", UserRole::Employee),
    ] {
        let overview = engine.overview(&snapshot, &actor);
        assert_eq!(overview[0].stage, Stage::Completed);
        assert!(overview[0].actions.is_empty(), "{} still has actions", actor.id);
    }
}

#[test]
fn dashboard_counts_stages_and_role_queues() {
    let mut snapshot = base_snapshot();
    snapshot
        .assessments
        .push(assessment("sa-draft", "emp", AssessmentStatus::Draft));
    snapshot.assessments.push(submitted("sa-ready", "emp", 2));
    snapshot.assessments.push(submitted("sa-done", "r2", 3));
    for (id, reviewer, order) in [("pr-1", "r1", 1), ("pr-2", "r2", 2)] {
        snapshot.peer_reviews.push(peer_review(
            id,
            "sa-ready",
            reviewer,
            order,
            PeerReviewStatus::Confirmed,
        ));
    }
    snapshot
        .committee_decisions
        .push(decision("cd-1", "sa-done", "cm", CommitteeVerdict::Approved));
    let engine = LifecycleEngine::default();

    let committee = engine.dashboard(&snapshot, &Actor::new("cm", UserRole::CommitteeMember));
    assert_eq!(committee.total_assessments, 3);
    assert_eq!(committee.count_for(Stage::Draft), 1);
    assert_eq!(committee.count_for(Stage::CommitteeReview), 1);
    assert_eq!(committee.count_for(Stage::Completed), 1);
    assert_eq!(committee.committee_queue, 1);
    assert_eq!(committee.manager_queue, 0);
    assert_eq!(committee.decisions.recorded, 1);
    assert_eq!(committee.decisions.approved, 1);
    assert_eq!(committee.active_cycle.as_deref(), Some("Spring 2025"));

    let reviewer = engine.dashboard(&snapshot, &Actor::new("r1", UserRole::Employee));
    assert_eq!(reviewer.committee_queue, 0);
    assert_eq!(reviewer.reviews_written, 1);
    assert_eq!(reviewer.peer_queue, 0);
}
