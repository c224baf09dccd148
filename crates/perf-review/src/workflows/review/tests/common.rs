use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::Router;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::review::domain::{
    AchievementsCategory, Assessment, AssessmentId, AssessmentStatus, CommitteeDecision,
    CommitteeVerdict, DecisionId, GradeLevel, ManagerReview, ManagerReviewId,
    ManagerReviewStatus, PeerReview, PeerReviewId, PeerReviewStatus, ReviewCycle, ReviewCycleId,
    User, UserId, UserRole,
};
use crate::workflows::review::repository::{ReviewStore, StoreError};
use crate::workflows::review::{
    review_router, LifecyclePolicy, ReviewSnapshot, ReviewWorkflowService,
};

pub(super) const CYCLE: &str = "cycle-2025";

pub(super) fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn fixed_clock() -> DateTime<Utc> {
    at(20)
}

pub(super) fn user(id: &str, role: UserRole) -> User {
    User {
        id: UserId::new(id),
        email: format!("{id}@example.com"),
        first_name: id.to_uppercase(),
        last_name: "Tester".to_string(),
        position: "Engineer".to_string(),
        department: "Platform".to_string(),
        role,
        manager_id: None,
        current_grade: Some(GradeLevel::L2),
    }
}

pub(super) fn cycle() -> ReviewCycle {
    ReviewCycle {
        id: ReviewCycleId::new(CYCLE),
        name: "Spring 2025".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2025, 4, 30).expect("valid date"),
        active: true,
    }
}

pub(super) fn assessment(id: &str, employee: &str, status: AssessmentStatus) -> Assessment {
    Assessment {
        id: AssessmentId::new(id),
        employee_id: UserId::new(employee),
        review_cycle_id: ReviewCycleId::new(CYCLE),
        achievements: "Shipped the billing migration".to_string(),
        category: AchievementsCategory::Responsibility,
        self_evaluation: "Ready for the next level".to_string(),
        current_grade: GradeLevel::L2,
        target_grade: GradeLevel::L3,
        status,
        submitted_at: None,
        created_at: Some(at(1)),
        updated_at: Some(at(1)),
    }
}

pub(super) fn submitted(id: &str, employee: &str, day: u32) -> Assessment {
    Assessment {
        submitted_at: Some(at(day)),
        ..assessment(id, employee, AssessmentStatus::Submitted)
    }
}

pub(super) fn peer_review(
    id: &str,
    assessment_id: &str,
    reviewer: &str,
    order: u32,
    status: PeerReviewStatus,
) -> PeerReview {
    PeerReview {
        id: PeerReviewId::new(id),
        assessment_id: AssessmentId::new(assessment_id),
        reviewer_id: UserId::new(reviewer),
        order,
        status,
        feedback: "Consistent delivery".to_string(),
        confirmed_grade: Some(GradeLevel::L3),
        review_date: Some(at(10 + order)),
    }
}

pub(super) fn decision(
    id: &str,
    assessment_id: &str,
    member: &str,
    verdict: CommitteeVerdict,
) -> CommitteeDecision {
    CommitteeDecision {
        id: DecisionId::new(id),
        assessment_id: AssessmentId::new(assessment_id),
        committee_member_id: UserId::new(member),
        decision: verdict,
        final_grade: GradeLevel::L3,
        comments: "Meets the bar".to_string(),
        recommendations: String::new(),
        decision_date: Some(at(18)),
    }
}

pub(super) fn manager_review(id: &str, assessment_id: &str, manager: &str) -> ManagerReview {
    ManagerReview {
        id: ManagerReviewId::new(id),
        assessment_id: AssessmentId::new(assessment_id),
        manager_id: UserId::new(manager),
        status: ManagerReviewStatus::Approved,
        recommended_grade: Some(GradeLevel::L3),
        comments: "Supports the promotion".to_string(),
    }
}

/// Points the `manager_id` of each listed user at `manager`.
pub(super) fn report_to(snapshot: &mut ReviewSnapshot, manager: &str, reports: &[&str]) {
    for user in snapshot
        .users
        .iter_mut()
        .filter(|user| reports.contains(&user.id.as_str()))
    {
        user.manager_id = Some(UserId::new(manager));
    }
}

/// Users: `emp` (employee), `r1`/`r2` (employees), `mgr`, `hr`, `cm` (committee member).
pub(super) fn base_snapshot() -> ReviewSnapshot {
    ReviewSnapshot {
        users: vec![
            user("emp", UserRole::Employee),
            user("r1", UserRole::Employee),
            user("r2", UserRole::Employee),
            user("mgr", UserRole::Manager),
            user("hr", UserRole::Hr),
            user("cm", UserRole::CommitteeMember),
        ],
        review_cycles: vec![cycle()],
        ..ReviewSnapshot::default()
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<ReviewSnapshot>,
}

impl MemoryStore {
    pub(super) fn seeded(snapshot: ReviewSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    pub(super) fn current(&self) -> ReviewSnapshot {
        self.state.lock().expect("store mutex poisoned").clone()
    }
}

impl ReviewStore for MemoryStore {
    fn snapshot(&self) -> Result<ReviewSnapshot, StoreError> {
        Ok(self.current())
    }

    fn insert_assessment(&self, assessment: Assessment) -> Result<Assessment, StoreError> {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        if guard.assessments.iter().any(|existing| existing.id == assessment.id) {
            return Err(StoreError::Conflict);
        }
        guard.assessments.push(assessment.clone());
        Ok(assessment)
    }

    fn update_assessment(&self, assessment: Assessment) -> Result<Assessment, StoreError> {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        let existing = guard
            .assessments
            .iter_mut()
            .find(|existing| existing.id == assessment.id)
            .ok_or(StoreError::NotFound)?;
        *existing = assessment.clone();
        Ok(assessment)
    }

    fn append_peer_review(&self, review: PeerReview) -> Result<PeerReview, StoreError> {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        guard.peer_reviews.push(review.clone());
        Ok(review)
    }

    fn append_manager_review(&self, review: ManagerReview) -> Result<ManagerReview, StoreError> {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        guard.manager_reviews.push(review.clone());
        Ok(review)
    }

    fn append_committee_decision(
        &self,
        decision: CommitteeDecision,
    ) -> Result<CommitteeDecision, StoreError> {
        let mut guard = self.state.lock().expect("store mutex poisoned");
        guard.committee_decisions.push(decision.clone());
        Ok(decision)
    }
}

/// Reads succeed from a fixed snapshot; every write fails.
pub(super) struct UnavailableStore(pub(super) ReviewSnapshot);

impl ReviewStore for UnavailableStore {
    fn snapshot(&self) -> Result<ReviewSnapshot, StoreError> {
        Ok(self.0.clone())
    }

    fn insert_assessment(&self, _assessment: Assessment) -> Result<Assessment, StoreError> {
        Err(StoreError::Unavailable("table store offline".to_string()))
    }

    fn update_assessment(&self, _assessment: Assessment) -> Result<Assessment, StoreError> {
        Err(StoreError::Unavailable("table store offline".to_string()))
    }

    fn append_peer_review(&self, _review: PeerReview) -> Result<PeerReview, StoreError> {
        Err(StoreError::Unavailable("table store offline".to_string()))
    }

    fn append_manager_review(&self, _review: ManagerReview) -> Result<ManagerReview, StoreError> {
        Err(StoreError::Unavailable("table store offline".to_string()))
    }

    fn append_committee_decision(
        &self,
        _decision: CommitteeDecision,
    ) -> Result<CommitteeDecision, StoreError> {
        Err(StoreError::Unavailable("table store offline".to_string()))
    }
}

pub(super) fn build_service(
    snapshot: ReviewSnapshot,
) -> (ReviewWorkflowService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::seeded(snapshot));
    let service = ReviewWorkflowService::new(store.clone(), LifecyclePolicy::default())
        .with_clock(fixed_clock);
    (service, store)
}

pub(super) fn router_with_snapshot(snapshot: ReviewSnapshot) -> (Router, Arc<MemoryStore>) {
    let (service, store) = build_service(snapshot);
    (review_router(Arc::new(service)), store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
