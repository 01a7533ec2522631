// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Decision, Match, MatchResponse, MatchStatus, ParentRequest, Profile, RequestStatus, Role, Session, TutorProfile, UnknownStatus};
pub use requests::{RegisterProfileRequest, RespondRequest, SubmitRequestRequest, UpsertTutorProfileRequest};
pub use responses::{ErrorResponse, FailedMatch, FindMatchesResponse, HealthResponse, MatchOutcome, ProfileResponse, SubmitRequestResponse, TutorProfileResponse};
