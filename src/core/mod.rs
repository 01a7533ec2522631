// Core algorithm exports
pub mod eligibility;
pub mod lifecycle;
pub mod matcher;
pub mod tutoring;

pub use eligibility::{eligible, eligible_tutors, hourly_rate_range, tutor_pool_filters, SESSIONS_PER_MONTH};
pub use lifecycle::{plan, JointTransition, LifecycleError};
pub use matcher::MatchFinder;
pub use tutoring::{Submitted, TutoringService};
