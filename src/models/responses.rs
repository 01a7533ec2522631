use serde::{Deserialize, Serialize};
use crate::models::domain::{Match, ParentRequest, Profile, TutorProfile};

/// A match creation attempt that did not go through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedMatch {
    #[serde(rename = "tutorId")]
    pub tutor_id: String,
    pub reason: String,
}

/// Result of one run of the match finder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub created: Vec<Match>,
    pub failed: Vec<FailedMatch>,
}

impl MatchOutcome {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    /// True when every attempted creation went through (including zero attempts)
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Response for the find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    pub created: Vec<Match>,
    pub failed: Vec<FailedMatch>,
    #[serde(rename = "createdCount")]
    pub created_count: usize,
    #[serde(rename = "failedCount")]
    pub failed_count: usize,
}

impl From<MatchOutcome> for FindMatchesResponse {
    fn from(outcome: MatchOutcome) -> Self {
        Self {
            created_count: outcome.created.len(),
            failed_count: outcome.failed.len(),
            created: outcome.created,
            failed: outcome.failed,
        }
    }
}

/// Response for a submitted parent request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequestResponse {
    pub request: ParentRequest,
    pub matches: FindMatchesResponse,
}

/// Profile lookup where a missing profile is a normal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: Option<Profile>,
    #[serde(rename = "setupRequired")]
    pub setup_required: bool,
}

/// Tutor profile lookup where a missing profile is a normal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorProfileResponse {
    #[serde(rename = "tutorProfile")]
    pub tutor_profile: Option<TutorProfile>,
    #[serde(rename = "setupRequired")]
    pub setup_required: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
