use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::authorization::permission_matrix;
use super::commands::{
    ActionRejected, CommitteeDecisionInput, DraftInput, ManagerReviewInput, PeerReviewInput,
};
use super::domain::{Actor, AssessmentId, UserRole};
use super::repository::{ReviewStore, StoreError};
use super::service::{ReviewServiceError, ReviewWorkflowService};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

type SharedService<S> = Arc<ReviewWorkflowService<S>>;

/// Router exposing queue views and lifecycle writes.
pub fn review_router<S>(service: SharedService<S>) -> Router
where
    S: ReviewStore + 'static,
{
    Router::new()
        .route("/api/v1/reviews/overview", get(overview_handler::<S>))
        .route("/api/v1/reviews/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/reviews/history", get(history_handler::<S>))
        .route("/api/v1/reviews/queues/peer", get(peer_queue_handler::<S>))
        .route(
            "/api/v1/reviews/queues/committee",
            get(committee_queue_handler::<S>),
        )
        .route(
            "/api/v1/reviews/queues/manager",
            get(manager_queue_handler::<S>),
        )
        .route("/api/v1/reviews/queues/team", get(team_handler::<S>))
        .route("/api/v1/reviews/permissions", get(permissions_handler))
        .route(
            "/api/v1/reviews/assessments",
            post(create_draft_handler::<S>),
        )
        .route(
            "/api/v1/reviews/assessments/:assessment_id",
            put(update_draft_handler::<S>),
        )
        .route(
            "/api/v1/reviews/assessments/:assessment_id/submit",
            post(submit_assessment_handler::<S>),
        )
        .route(
            "/api/v1/reviews/assessments/:assessment_id/peer-reviews",
            post(peer_review_handler::<S>),
        )
        .route(
            "/api/v1/reviews/assessments/:assessment_id/manager-reviews",
            post(manager_review_handler::<S>),
        )
        .route(
            "/api/v1/reviews/assessments/:assessment_id/committee-decisions",
            post(committee_decision_handler::<S>),
        )
        .with_state(service)
}

/// HTTP status for a failed workflow call.
pub(crate) fn status_for(error: &ReviewServiceError) -> StatusCode {
    match error {
        ReviewServiceError::Rejected(rejected) => match rejected {
            ActionRejected::AssessmentNotFound(_) => StatusCode::NOT_FOUND,
            ActionRejected::NotAuthorized { .. } | ActionRejected::NotOwner { .. } => {
                StatusCode::FORBIDDEN
            }
            ActionRejected::NotEligible { .. } | ActionRejected::DuplicateId(_) => {
                StatusCode::CONFLICT
            }
            ActionRejected::MissingField(_)
            | ActionRejected::InvalidValue(_)
            | ActionRejected::NoActiveCycle => StatusCode::UNPROCESSABLE_ENTITY,
        },
        ReviewServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        ReviewServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ReviewServiceError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Reads the acting user from request headers. A missing role reads as `Unknown`.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing {ACTOR_ID_HEADER} header"),
            });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })?;

    let role = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(UserRole::parse)
        .unwrap_or(UserRole::Unknown);

    Ok(Actor::new(id, role))
}

fn respond<T: Serialize>(result: Result<T, ReviewServiceError>, success: StatusCode) -> Response {
    match result {
        Ok(body) => (success, Json(body)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (status_for(&error), Json(payload)).into_response()
        }
    }
}

pub(crate) async fn overview_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.overview(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn dashboard_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.dashboard(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn history_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.review_history(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn peer_queue_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.peer_queue(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn committee_queue_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.committee_queue(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn manager_queue_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.manager_queue(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn team_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.team_assessments(&actor), StatusCode::OK),
        Err(response) => response,
    }
}

async fn permissions_handler() -> Response {
    (StatusCode::OK, Json(permission_matrix())).into_response()
}

pub(crate) async fn create_draft_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Json(input): Json<DraftInput>,
) -> Response
where
    S: ReviewStore + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.create_draft(&actor, input), StatusCode::CREATED),
        Err(response) => response,
    }
}

pub(crate) async fn update_draft_handler<S>(
    State(service): State<SharedService<S>>,
    Path(assessment_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<DraftInput>,
) -> Response
where
    S: ReviewStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.update_draft(&actor, &id, input), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn submit_assessment_handler<S>(
    State(service): State<SharedService<S>>,
    Path(assessment_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match actor_from_headers(&headers) {
        Ok(actor) => respond(service.submit_assessment(&actor, &id), StatusCode::OK),
        Err(response) => response,
    }
}

pub(crate) async fn peer_review_handler<S>(
    State(service): State<SharedService<S>>,
    Path(assessment_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<PeerReviewInput>,
) -> Response
where
    S: ReviewStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match actor_from_headers(&headers) {
        Ok(actor) => respond(
            service.submit_peer_review(&actor, &id, input),
            StatusCode::CREATED,
        ),
        Err(response) => response,
    }
}

pub(crate) async fn manager_review_handler<S>(
    State(service): State<SharedService<S>>,
    Path(assessment_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ManagerReviewInput>,
) -> Response
where
    S: ReviewStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match actor_from_headers(&headers) {
        Ok(actor) => respond(
            service.submit_manager_review(&actor, &id, input),
            StatusCode::CREATED,
        ),
        Err(response) => response,
    }
}

pub(crate) async fn committee_decision_handler<S>(
    State(service): State<SharedService<S>>,
    Path(assessment_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<CommitteeDecisionInput>,
) -> Response
where
    S: ReviewStore + 'static,
{
    let id = AssessmentId(assessment_id);
    match actor_from_headers(&headers) {
        Ok(actor) => respond(
            service.submit_committee_decision(&actor, &id, input),
            StatusCode::CREATED,
        ),
        Err(response) => response,
    }
}
