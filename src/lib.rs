//! Tutor Match - matching service for parent tutoring requests
//!
//! Parents submit tutoring requests, tutors publish profiles, and the match
//! finder links each request to every tutor that teaches a requested subject,
//! charges within the budget and works in the same location.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{eligible, MatchFinder, TutoringService};
pub use error::ServiceError;
pub use models::{Match, MatchOutcome, ParentRequest, Profile, Session, TutorProfile};
pub use services::{DataStore, MemoryStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        assert_eq!(core::SESSIONS_PER_MONTH, 4.0);
        assert_eq!(MemoryStore::new().backend(), "memory");
    }
}
