use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role, fixed when the profile is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tutor,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tutor => "tutor",
            Role::Parent => "parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account profile with contact data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tutor's offering, one-to-one with a tutor profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorProfile {
    pub id: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub hourly_rate: f64,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a parent request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Matched,
    Rejected,
}

/// Lifecycle state of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A tutor's answer to a request or match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Matched => "matched",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
        }
    }
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Reject => "reject",
        }
    }
}

/// Error returned when a status string is not one of the known values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "matched" => Ok(RequestStatus::Matched),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "accepted" => Ok(MatchStatus::Accepted),
            "rejected" => Ok(MatchStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parent's tutoring need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRequest {
    pub id: String,
    pub parent_id: String,
    pub grade_level: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub location: String,
    #[serde(default)]
    pub requirements: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Proposed pairing of a parent request with a tutor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub request_id: String,
    pub tutor_id: String,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

/// A tutor's decision addressed to the store as one joint write
///
/// `match_id` is `None` when the tutor answers a request they were never
/// matched to; the store then creates the match in its decided state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResponse {
    pub request_id: String,
    pub tutor_id: String,
    pub match_id: Option<String>,
    pub decision: Decision,
}

/// Identity of the caller, passed explicitly into role-gated operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    /// `None` until the caller has registered a profile
    pub role: Option<Role>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}
