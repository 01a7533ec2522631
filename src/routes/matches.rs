use actix_web::{web, HttpRequest, HttpResponse};
use crate::error::ServiceError;
use crate::models::RespondRequest;
use crate::routes::AppState;

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/matches", web::get().to(list_tutor_matches))
        .route("/matches/{id}/respond", web::post().to(respond_to_match));
}

/// GET /api/v1/matches
async fn list_tutor_matches(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;
    let matches = state.service.list_tutor_matches(&session).await?;

    Ok(HttpResponse::Ok().json(matches))
}

/// Accept or reject a match
///
/// POST /api/v1/matches/{id}/respond
///
/// Request body:
/// ```json
/// { "decision": "accept|reject" }
/// ```
///
/// Answers 409 when the request was already matched or rejected.
async fn respond_to_match(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    path: web::Path<String>,
    req: web::Json<RespondRequest>,
) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;

    let answered = state
        .service
        .respond_to_match(&session, &path, req.decision)
        .await?;

    tracing::info!("Tutor {} answered match {}: {}", session.user_id, answered.id, answered.status);

    Ok(HttpResponse::Ok().json(answered))
}
