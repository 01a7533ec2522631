use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;
use crate::error::ServiceError;
use crate::models::{ProfileResponse, RegisterProfileRequest, TutorProfileResponse, UpsertTutorProfileRequest};
use crate::routes::AppState;

/// Configure profile routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/profiles", web::post().to(register_profile))
        .route("/profiles/me", web::get().to(my_profile))
        .route("/tutors/me", web::get().to(my_tutor_profile))
        .route("/tutors/me", web::put().to(upsert_tutor_profile));
}

/// Register the caller's profile
///
/// POST /api/v1/profiles
///
/// Request body:
/// ```json
/// { "role": "tutor|parent", "full_name": "string", "email": "string", "location": "string" }
/// ```
async fn register_profile(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<RegisterProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    req.validate()?;
    let session = state.sessions.from_request(&http_req).await?;

    let profile = state.service.register_profile(&session, req.into_inner()).await?;
    state.sessions.forget(&session.user_id).await;

    Ok(HttpResponse::Created().json(profile))
}

/// GET /api/v1/profiles/me
async fn my_profile(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;
    let profile = state.service.my_profile(&session).await?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        setup_required: profile.is_none(),
        profile,
    }))
}

/// GET /api/v1/tutors/me
async fn my_tutor_profile(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let session = state.sessions.from_request(&http_req).await?;
    let tutor_profile = state.service.my_tutor_profile(&session).await?;

    Ok(HttpResponse::Ok().json(TutorProfileResponse {
        setup_required: tutor_profile.is_none(),
        tutor_profile,
    }))
}

/// Create or edit the caller's tutor profile
///
/// PUT /api/v1/tutors/me
///
/// Request body:
/// ```json
/// { "subjects": ["Math"], "hourly_rate": 2500, "qualifications": [], "bio": "string", "location": "string" }
/// ```
async fn upsert_tutor_profile(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<UpsertTutorProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    req.validate()?;
    let session = state.sessions.from_request(&http_req).await?;

    let tutor_profile = state.service.upsert_tutor_profile(&session, req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(tutor_profile))
}
