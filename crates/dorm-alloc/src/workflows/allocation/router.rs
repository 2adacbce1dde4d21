use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{BedId, FeedbackSubmission, StudentId};
use super::service::{AllocationServiceError, DormitoryAllocationService};

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
}

#[derive(Debug, Deserialize)]
pub struct ChooseBedRequest {
    pub student_id: StudentId,
    pub bed_id: BedId,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub student_id: StudentId,
}

/// Router builder exposing allocation, suggestion and feedback endpoints.
pub fn allocation_router(service: Arc<DormitoryAllocationService>) -> Router {
    Router::new()
        .route("/api/v1/allocation/allocate", post(allocate_handler))
        .route(
            "/api/v1/allocation/suggestions/:student_id",
            get(suggestions_handler),
        )
        .route("/api/v1/allocation/feedback", post(feedback_handler))
        .route(
            "/api/v1/allocation/feedback/student/:student_id",
            get(student_feedback_handler),
        )
        .route("/api/v1/allocation/statistics", get(statistics_handler))
        .route("/api/v1/allocation/beds/choose", post(choose_bed_handler))
        .route("/api/v1/allocation/checkout", post(checkout_handler))
        .with_state(service)
}

pub(crate) async fn allocate_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
    Json(request): Json<AllocateRequest>,
) -> Response {
    if request.student_ids.is_empty() {
        let payload = json!({
            "error": "student_ids must not be empty",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }

    match service.allocate(&request.student_ids) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn suggestions_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
    Path(student_id): Path<String>,
) -> Response {
    match service.suggest(&StudentId(student_id)) {
        Ok(suggestions) => (StatusCode::OK, Json(suggestions)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn feedback_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
    Json(submission): Json<FeedbackSubmission>,
) -> Response {
    match service.submit_feedback(submission) {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_feedback_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
    Path(student_id): Path<String>,
) -> Response {
    match service.list_feedback_by_student(&StudentId(student_id)) {
        Ok(feedback) => (StatusCode::OK, Json(feedback)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn statistics_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
) -> Response {
    match service.statistics() {
        Ok(statistics) => (StatusCode::OK, Json(statistics)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn choose_bed_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
    Json(request): Json<ChooseBedRequest>,
) -> Response {
    match service.choose_bed(&request.student_id, &request.bed_id) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn checkout_handler(
    State(service): State<Arc<DormitoryAllocationService>>,
    Json(request): Json<CheckoutRequest>,
) -> Response {
    match service.checkout(&request.student_id) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: AllocationServiceError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (err.status_code(), Json(payload)).into_response()
}
