use crate::infra::{load_snapshot, InMemoryReviewStore};
use clap::Args;
use perf_review::error::AppError;
use perf_review::workflows::review::{
    role_may, tally_for, AchievementsCategory, Actor, Assessment, AssessmentId,
    CommitteeDecisionInput, CommitteeVerdict, DraftInput, GradeLevel, LifecyclePolicy,
    ManagerReviewInput, ManagerReviewStatus, PeerReviewInput, PeerReviewStatus, ReviewAction,
    ReviewSnapshot, ReviewWorkflowService, UserId, UserRole,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QueueArgs {
    /// User id whose queues should be listed
    #[arg(long)]
    pub(crate) actor: String,
    /// Directory of CSV table exports (defaults to the bundled fixtures)
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory of CSV table exports (defaults to the bundled fixtures)
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
    /// Override the minimum number of distinct peer reviewers
    #[arg(long)]
    pub(crate) min_peer_reviews: Option<usize>,
    /// Override the minimum number of confirming peer reviews
    #[arg(long)]
    pub(crate) min_confirmed_reviews: Option<usize>,
}

type DemoService = ReviewWorkflowService<InMemoryReviewStore>;

pub(crate) fn run_queue_report(args: QueueArgs) -> Result<(), AppError> {
    let QueueArgs {
        actor,
        snapshot_dir,
    } = args;

    let snapshot = load_snapshot(snapshot_dir.as_deref())?;
    let actor = actor_for(&snapshot, &actor);
    let service = service_over(snapshot, LifecyclePolicy::default());

    render_queue_report(&service, &actor)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        snapshot_dir,
        min_peer_reviews,
        min_confirmed_reviews,
    } = args;

    let defaults = LifecyclePolicy::default();
    let policy = LifecyclePolicy::new(
        min_peer_reviews.unwrap_or(defaults.min_peer_reviews()),
        min_confirmed_reviews.unwrap_or(defaults.min_confirmed_reviews()),
    );
    let snapshot = load_snapshot(snapshot_dir.as_deref())?;
    let service = service_over(snapshot, policy);

    println!("Performance review lifecycle demo");
    println!(
        "Committee quorum: {} reviews, {} confirmed",
        policy.min_peer_reviews(),
        policy.min_confirmed_reviews()
    );

    let employee = Actor::new("u-hana", UserRole::Employee);
    let draft = service.create_draft(
        &employee,
        DraftInput {
            review_cycle_id: None,
            achievements: "Moved nightly ETL to streaming ingestion".to_string(),
            category: AchievementsCategory::Responsibility,
            self_evaluation: "Owning pipeline reliability end to end".to_string(),
            current_grade: GradeLevel::L1,
            target_grade: GradeLevel::L2,
        },
    )?;
    print_stage(&service, &draft.id, "Draft created")?;

    service.submit_assessment(&employee, &draft.id)?;
    print_stage(&service, &draft.id, "Assessment submitted")?;

    // Manager input closes once the committee can rule.
    let manager = Actor::new("u-dmitri", UserRole::Manager);
    service.submit_manager_review(
        &manager,
        &draft.id,
        ManagerReviewInput {
            status: ManagerReviewStatus::Approved,
            comments: "Backs the move to L2".to_string(),
            recommended_grade: Some(GradeLevel::L2),
        },
    )?;
    print_stage(&service, &draft.id, "Manager recommendation recorded")?;

    let reviewers = ["u-anna", "u-clara", "u-boris"];
    for reviewer in reviewers {
        let snapshot = service.snapshot()?;
        let ready = service
            .engine()
            .ready_for_committee_review(&snapshot)
            .iter()
            .any(|assessment| assessment.id == draft.id);
        if ready {
            break;
        }
        let review = service.submit_peer_review(
            &Actor::new(reviewer, UserRole::Employee),
            &draft.id,
            PeerReviewInput {
                status: PeerReviewStatus::Confirmed,
                feedback: format!("{reviewer} confirms the streaming migration impact"),
                confirmed_grade: Some(GradeLevel::L2),
            },
        )?;
        print_stage(
            &service,
            &draft.id,
            &format!("Peer review #{} by {}", review.order, review.reviewer_id),
        )?;
    }

    let committee = Actor::new("u-fyodor", UserRole::CommitteeMember);
    let queue = service.committee_queue(&committee)?;
    println!("\nCommittee queue before the ruling");
    render_assessments(&service.snapshot()?, &queue);

    let decision = service.submit_committee_decision(
        &committee,
        &draft.id,
        CommitteeDecisionInput {
            decision: CommitteeVerdict::Approved,
            comments: "Evidence is consistent across reviewers".to_string(),
            recommendations: "Pair with platform on on-call tooling".to_string(),
            final_grade: None,
        },
    )?;
    print_stage(
        &service,
        &draft.id,
        &format!("Committee {} at {}", decision.decision, decision.final_grade),
    )?;

    println!();
    render_queue_report(&service, &committee)
}

fn service_over(snapshot: ReviewSnapshot, policy: LifecyclePolicy) -> DemoService {
    let store = Arc::new(InMemoryReviewStore::seeded(snapshot));
    ReviewWorkflowService::new(store, policy)
}

fn actor_for(snapshot: &ReviewSnapshot, id: &str) -> Actor {
    let id = UserId::new(id);
    let role = snapshot
        .user(&id)
        .map(|user| user.role)
        .unwrap_or(UserRole::Unknown);
    Actor { id, role }
}

fn print_stage(service: &DemoService, id: &AssessmentId, event: &str) -> Result<(), AppError> {
    let snapshot = service.snapshot()?;
    let stage = service
        .engine()
        .stage_of(&snapshot, id)
        .map(|stage| stage.label())
        .unwrap_or("missing");
    let tally = tally_for(id, &snapshot.peer_reviews);
    println!(
        "- {event}: {id} is {stage} ({}/{} confirmed)",
        tally.confirmed, tally.total
    );
    Ok(())
}

fn render_queue_report(service: &DemoService, actor: &Actor) -> Result<(), AppError> {
    let snapshot = service.snapshot()?;
    let name = snapshot
        .user(&actor.id)
        .map(|user| user.display_name())
        .unwrap_or_else(|| actor.id.to_string());
    println!("Review queues for {name} ({})", actor.role);

    if actor.role == UserRole::Unknown {
        println!("  No recognized role; nothing to review.");
        return Ok(());
    }

    let dashboard = service.dashboard(actor)?;
    if let Some(cycle) = &dashboard.active_cycle {
        println!("Active cycle: {cycle}");
    }
    for entry in &dashboard.stage_counts {
        println!("  {:<17} {}", entry.stage_label, entry.count);
    }

    if role_may(actor.role, ReviewAction::SubmitPeerReview) {
        println!("\nPeer review queue");
        render_assessments(&snapshot, &service.peer_queue(actor)?);
    }
    if role_may(actor.role, ReviewAction::SubmitManagerReview) {
        println!("\nManager review queue");
        render_assessments(&snapshot, &service.manager_queue(actor)?);

        println!("\nTeam assessments");
        let team = service.team_assessments(actor)?;
        if team.is_empty() {
            println!("  (empty)");
        }
        for row in team {
            println!(
                "  {:<8} {:<10} {}",
                row.assessment_id.as_str(),
                row.employee_id.as_str(),
                row.stage_label
            );
        }
    }
    if role_may(actor.role, ReviewAction::SubmitCommitteeDecision) {
        println!("\nCommittee queue");
        render_assessments(&snapshot, &service.committee_queue(actor)?);
    }

    let history = service.review_history(actor)?;
    if !history.is_empty() {
        println!("\nReviews written");
        for entry in history {
            let verdict = entry
                .verdict
                .map(|verdict| verdict.to_string())
                .unwrap_or_else(|| "pending".to_string());
            println!(
                "  {} #{} {} -> {}",
                entry.assessment_id, entry.order, entry.status, verdict
            );
        }
    }

    Ok(())
}

fn render_assessments(snapshot: &ReviewSnapshot, assessments: &[Assessment]) {
    if assessments.is_empty() {
        println!("  (empty)");
        return;
    }

    for assessment in assessments {
        let owner = snapshot
            .user(&assessment.employee_id)
            .map(|user| user.display_name())
            .unwrap_or_else(|| assessment.employee_id.to_string());
        let tally = tally_for(&assessment.id, &snapshot.peer_reviews);
        println!(
            "  {:<8} {:<18} {} -> {}  {}/{} confirmed",
            assessment.id.as_str(),
            owner,
            assessment.current_grade,
            assessment.target_grade,
            tally.confirmed,
            tally.total
        );
    }
}
