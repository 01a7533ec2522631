//! Role-gated operations over the data store.
//!
//! Every operation takes the caller's [`Session`] explicitly; nothing here
//! reads ambient login state.

use crate::core::lifecycle::LifecycleError;
use crate::core::matcher::MatchFinder;
use crate::error::ServiceError;
use crate::models::{
    Decision, Match, MatchOutcome, MatchResponse, ParentRequest, Profile, RegisterProfileRequest,
    RequestStatus, Role, Session, SubmitRequestRequest, TutorProfile, UpsertTutorProfileRequest,
};
use crate::services::store::{decode_first, decode_rows, DataStore, Filter, Table};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// A submitted request together with the matches found for it
#[derive(Debug, Clone)]
pub struct Submitted {
    pub request: ParentRequest,
    pub outcome: MatchOutcome,
}

pub struct TutoringService {
    store: Arc<dyn DataStore>,
    finder: MatchFinder,
}

fn require_role(session: &Session, role: Role) -> Result<(), ServiceError> {
    if session.has_role(role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("{} role required", role)))
    }
}

impl TutoringService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            finder: MatchFinder::new(store.clone()),
            store,
        }
    }

    async fn profile_of(&self, user_id: &str) -> Result<Option<Profile>, ServiceError> {
        let rows = self
            .store
            .query(Table::Profiles, &[Filter::eq("id", user_id)])
            .await?;
        Ok(decode_first(Table::Profiles, rows)?)
    }

    /// Register the caller's profile. Repeating with the same role is a no-op.
    pub async fn register_profile(
        &self,
        session: &Session,
        req: RegisterProfileRequest,
    ) -> Result<Profile, ServiceError> {
        if let Some(existing) = self.profile_of(&session.user_id).await? {
            if existing.role != req.role {
                return Err(ServiceError::Conflict(format!(
                    "profile already registered as {}",
                    existing.role
                )));
            }
            return Ok(existing);
        }

        let now = Utc::now();
        let profile = Profile {
            id: session.user_id.clone(),
            role: req.role,
            full_name: req.full_name,
            email: req.email,
            phone: req.phone,
            location: req.location,
            created_at: now,
            updated_at: now,
        };

        let record = serde_json::to_value(&profile)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        self.store.create(Table::Profiles, record).await?;

        tracing::info!("Registered {} profile {}", profile.role, profile.id);

        Ok(profile)
    }

    /// The caller's profile, `None` when setup is not finished
    pub async fn my_profile(&self, session: &Session) -> Result<Option<Profile>, ServiceError> {
        self.profile_of(&session.user_id).await
    }

    /// The caller's tutor profile, `None` when not created yet
    pub async fn my_tutor_profile(&self, session: &Session) -> Result<Option<TutorProfile>, ServiceError> {
        require_role(session, Role::Tutor)?;

        let rows = self
            .store
            .query(Table::TutorProfiles, &[Filter::eq("id", session.user_id.as_str())])
            .await?;
        Ok(decode_first(Table::TutorProfiles, rows)?)
    }

    /// Create or edit the caller's tutor profile
    pub async fn upsert_tutor_profile(
        &self,
        session: &Session,
        req: UpsertTutorProfileRequest,
    ) -> Result<TutorProfile, ServiceError> {
        require_role(session, Role::Tutor)?;

        if !(req.hourly_rate.is_finite() && req.hourly_rate > 0.0) {
            return Err(ServiceError::Validation("hourly_rate must be a positive number".into()));
        }

        let location = match req.location.filter(|l| !l.is_empty()) {
            Some(location) => location,
            None => self
                .profile_of(&session.user_id)
                .await?
                .and_then(|p| p.location)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| ServiceError::Validation("location is required".into()))?,
        };

        let now = Utc::now();

        match self.my_tutor_profile(session).await? {
            Some(existing) => {
                let updated = TutorProfile {
                    subjects: req.subjects,
                    hourly_rate: req.hourly_rate,
                    qualifications: req.qualifications,
                    bio: req.bio,
                    location,
                    updated_at: now,
                    ..existing
                };
                let patch = json!({
                    "subjects": updated.subjects,
                    "hourly_rate": updated.hourly_rate,
                    "qualifications": updated.qualifications,
                    "bio": updated.bio,
                    "location": updated.location,
                    "updated_at": updated.updated_at,
                });
                self.store.update(Table::TutorProfiles, &updated.id, patch).await?;

                tracing::info!("Updated tutor profile {}", updated.id);
                Ok(updated)
            }
            None => {
                let created = TutorProfile {
                    id: session.user_id.clone(),
                    subjects: req.subjects,
                    hourly_rate: req.hourly_rate,
                    qualifications: req.qualifications,
                    bio: req.bio,
                    location,
                    created_at: now,
                    updated_at: now,
                };
                let record = serde_json::to_value(&created)
                    .map_err(|e| ServiceError::Validation(e.to_string()))?;
                self.store.create(Table::TutorProfiles, record).await?;

                tracing::info!("Created tutor profile {}", created.id);
                Ok(created)
            }
        }
    }

    /// Store a new parent request, then run the match finder on it.
    ///
    /// A failure while finding matches does not undo the stored request; the
    /// parent can re-run the finder later.
    pub async fn submit_request(
        &self,
        session: &Session,
        req: SubmitRequestRequest,
    ) -> Result<Submitted, ServiceError> {
        require_role(session, Role::Parent)?;

        let request = ParentRequest {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id: session.user_id.clone(),
            grade_level: req.grade_level,
            subjects: req.subjects,
            budget_min: req.budget_min,
            budget_max: req.budget_max,
            location: req.location,
            requirements: req.requirements,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };

        let record = serde_json::to_value(&request)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        self.store.create(Table::ParentRequests, record).await?;

        tracing::info!("Parent {} submitted request {}", request.parent_id, request.id);

        let outcome = self.finder.find_matches(&request).await?;

        Ok(Submitted { request, outcome })
    }

    async fn request_by_id(&self, request_id: &str) -> Result<ParentRequest, ServiceError> {
        let rows = self
            .store
            .query(Table::ParentRequests, &[Filter::eq("id", request_id)])
            .await?;
        decode_first(Table::ParentRequests, rows)?
            .ok_or_else(|| ServiceError::NotFound(format!("parent request {}", request_id)))
    }

    async fn owned_request(&self, session: &Session, request_id: &str) -> Result<ParentRequest, ServiceError> {
        require_role(session, Role::Parent)?;

        let request = self.request_by_id(request_id).await?;
        if request.parent_id != session.user_id {
            return Err(ServiceError::Forbidden("request belongs to another parent".into()));
        }
        Ok(request)
    }

    /// Re-run the match finder for one of the caller's requests.
    ///
    /// A matched or rejected request takes no new matches.
    pub async fn find_matches(&self, session: &Session, request_id: &str) -> Result<MatchOutcome, ServiceError> {
        let request = self.owned_request(session, request_id).await?;
        if request.status.is_terminal() {
            return Err(ServiceError::Conflict(
                LifecycleError::RequestClosed(request.status).to_string(),
            ));
        }

        Ok(self.finder.find_matches(&request).await?)
    }

    /// Pending requests tutors can respond to
    pub async fn list_pending_requests(&self, session: &Session) -> Result<Vec<ParentRequest>, ServiceError> {
        require_role(session, Role::Tutor)?;

        let rows = self
            .store
            .query(Table::ParentRequests, &[Filter::eq("status", RequestStatus::Pending.as_str())])
            .await?;
        Ok(decode_rows(Table::ParentRequests, rows)?)
    }

    /// The caller's own requests
    pub async fn list_my_requests(&self, session: &Session) -> Result<Vec<ParentRequest>, ServiceError> {
        require_role(session, Role::Parent)?;

        let rows = self
            .store
            .query(Table::ParentRequests, &[Filter::eq("parent_id", session.user_id.as_str())])
            .await?;
        Ok(decode_rows(Table::ParentRequests, rows)?)
    }

    /// Matches addressed to the calling tutor
    pub async fn list_tutor_matches(&self, session: &Session) -> Result<Vec<Match>, ServiceError> {
        require_role(session, Role::Tutor)?;

        let rows = self
            .store
            .query(Table::Matches, &[Filter::eq("tutor_id", session.user_id.as_str())])
            .await?;
        Ok(decode_rows(Table::Matches, rows)?)
    }

    /// Matches of one of the caller's requests
    pub async fn list_request_matches(&self, session: &Session, request_id: &str) -> Result<Vec<Match>, ServiceError> {
        let request = self.owned_request(session, request_id).await?;

        let rows = self
            .store
            .query(Table::Matches, &[Filter::eq("request_id", request.id.as_str())])
            .await?;
        Ok(decode_rows(Table::Matches, rows)?)
    }

    /// The tutor named on a match accepts or rejects it
    pub async fn respond_to_match(
        &self,
        session: &Session,
        match_id: &str,
        decision: Decision,
    ) -> Result<Match, ServiceError> {
        require_role(session, Role::Tutor)?;

        let rows = self
            .store
            .query(Table::Matches, &[Filter::eq("id", match_id)])
            .await?;
        let found: Match = decode_first(Table::Matches, rows)?
            .ok_or_else(|| ServiceError::NotFound(format!("match {}", match_id)))?;

        if found.tutor_id != session.user_id {
            return Err(ServiceError::Forbidden("match belongs to another tutor".into()));
        }

        let response = MatchResponse {
            request_id: found.request_id,
            tutor_id: found.tutor_id,
            match_id: Some(found.id),
            decision,
        };

        Ok(self.store.apply_response(&response).await?)
    }

    /// A tutor answers a pending request directly.
    ///
    /// Reuses the tutor's existing match for the request when there is one.
    pub async fn respond_to_request(
        &self,
        session: &Session,
        request_id: &str,
        decision: Decision,
    ) -> Result<Match, ServiceError> {
        require_role(session, Role::Tutor)?;

        let request = self.request_by_id(request_id).await?;

        let rows = self
            .store
            .query(
                Table::Matches,
                &[
                    Filter::eq("request_id", request.id.as_str()),
                    Filter::eq("tutor_id", session.user_id.as_str()),
                ],
            )
            .await?;
        let existing: Option<Match> = decode_first(Table::Matches, rows)?;

        let response = MatchResponse {
            request_id: request.id,
            tutor_id: session.user_id.clone(),
            match_id: existing.map(|m| m.id),
            decision,
        };

        Ok(self.store.apply_response(&response).await?)
    }
}
