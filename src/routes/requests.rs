use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use validator::Validate;
use crate::error::ServiceError;
use crate::models::{FindMatchesResponse, MatchOutcome, RespondRequest, SubmitRequestRequest, SubmitRequestResponse};
use crate::routes::AppState;

/// Configure parent request routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/requests", web::post().to(submit_request))
        .route("/requests", web::get().to(list_my_requests))
        .route("/requests/pending", web::get().to(list_pending_requests))
        .route("/requests/{id}/find-matches", web::post().to(find_matches))
        .route("/requests/{id}/matches", web::get().to(list_request_matches))
        .route("/requests/{id}/respond", web::post().to(respond_to_request));
}

/// 200 when every match insert went through, 207 when some failed
fn outcome_status(outcome: &MatchOutcome, success: StatusCode) -> StatusCode {
    if outcome.is_complete() {
        success
    } else {
        StatusCode::MULTI_STATUS
    }
}

/// Submit a tutoring request and match it right away
///
/// POST /api/v1/requests
///
/// Request body:
/// ```json
/// {
///   "grade_level": "string",
///   "subjects": ["string"],
///   "budget_min": 8000,
///   "budget_max": 16000,
///   "location": "string",
///   "requirements": "string"
/// }
/// ```
async fn submit_request(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<SubmitRequestRequest>,
) -> Result<HttpResponse, ServiceError> {
    req.validate()?;
    let session = state.sessions.from_request(&http_req).await?;

    let submitted = state.service.submit_request(&session, req.into_inner()).await?;
    let status = outcome_status(&submitted.outcome, StatusCode::CREATED);

    Ok(HttpResponse::build(status).json(SubmitRequestResponse {
        request: submitted.request,
        matches: FindMatchesResponse::from(submitted.outcome),
    }))
}

/// GET /api/v1/requests
async fn list_my_requests(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;
    let requests = state.service.list_my_requests(&session).await?;

    Ok(HttpResponse::Ok().json(requests))
}

/// GET /api/v1/requests/pending
async fn list_pending_requests(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;
    let requests = state.service.list_pending_requests(&session).await?;

    Ok(HttpResponse::Ok().json(requests))
}

/// Re-run the match finder
///
/// POST /api/v1/requests/{id}/find-matches
///
/// Answers 409 once the request is matched or rejected.
async fn find_matches(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;

    let outcome = state.service.find_matches(&session, &path).await?;
    let status = outcome_status(&outcome, StatusCode::OK);

    Ok(HttpResponse::build(status).json(FindMatchesResponse::from(outcome)))
}

/// GET /api/v1/requests/{id}/matches
async fn list_request_matches(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;
    let matches = state.service.list_request_matches(&session, &path).await?;

    Ok(HttpResponse::Ok().json(matches))
}

/// A tutor answers a request directly
///
/// POST /api/v1/requests/{id}/respond
///
/// Request body:
/// ```json
/// { "decision": "accept|reject" }
/// ```
async fn respond_to_request(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    path: web::Path<String>,
    req: web::Json<RespondRequest>,
) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;

    let answered = state
        .service
        .respond_to_request(&session, &path, req.decision)
        .await?;

    Ok(HttpResponse::Ok().json(answered))
}
