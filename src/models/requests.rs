use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{Decision, Role};

/// Request to register the caller's profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterProfileRequest {
    pub role: Role,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Request to create or edit the caller's tutor profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertTutorProfileRequest {
    #[validate(length(min = 1))]
    pub subjects: Vec<String>,
    #[serde(alias = "hourlyRate")]
    pub hourly_rate: f64,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Falls back to the profile location when omitted
    #[serde(default)]
    pub location: Option<String>,
}

/// Request submitted by a parent looking for a tutor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequestRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "gradeLevel")]
    pub grade_level: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(alias = "budgetMin")]
    pub budget_min: f64,
    #[serde(alias = "budgetMax")]
    pub budget_max: f64,
    #[validate(length(min = 1))]
    pub location: String,
    #[serde(default)]
    pub requirements: Option<String>,
}

/// A tutor's accept/reject answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RespondRequest {
    pub decision: Decision,
}
