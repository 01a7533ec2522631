use crate::models::{ParentRequest, TutorProfile};
use crate::services::store::Filter;

/// Sessions a parent's monthly budget is assumed to pay for.
///
/// A monthly budget of `b` buys an hourly rate of at most `b / 4`.
pub const SESSIONS_PER_MONTH: f64 = 4.0;

/// Hourly rate range `[min, max]` a request's monthly budget covers
#[inline]
pub fn hourly_rate_range(request: &ParentRequest) -> (f64, f64) {
    (
        request.budget_min / SESSIONS_PER_MONTH,
        request.budget_max / SESSIONS_PER_MONTH,
    )
}

/// True when the tutor teaches at least one requested subject.
///
/// An empty request subject list shares nothing with anyone.
#[inline]
pub fn shares_subject(tutor: &TutorProfile, request: &ParentRequest) -> bool {
    tutor
        .subjects
        .iter()
        .any(|subject| request.subjects.contains(subject))
}

/// True when the tutor's hourly rate lies inside the budget range, bounds included
#[inline]
pub fn within_budget(tutor: &TutorProfile, request: &ParentRequest) -> bool {
    let (min_rate, max_rate) = hourly_rate_range(request);
    tutor.hourly_rate >= min_rate && tutor.hourly_rate <= max_rate
}

/// Exact location comparison. "Delhi" and "New Delhi" are different places here.
#[inline]
pub fn same_location(tutor: &TutorProfile, request: &ParentRequest) -> bool {
    tutor.location == request.location
}

/// Eligibility predicate: a tutor is a candidate for a request when
/// subjects overlap, the rate fits the budget and the location is identical.
#[inline]
pub fn eligible(request: &ParentRequest, tutor: &TutorProfile) -> bool {
    shares_subject(tutor, request) && within_budget(tutor, request) && same_location(tutor, request)
}

/// Keep only the tutors eligible for `request`
pub fn eligible_tutors(request: &ParentRequest, candidates: Vec<TutorProfile>) -> Vec<TutorProfile> {
    candidates
        .into_iter()
        .filter(|tutor| eligible(request, tutor))
        .collect()
}

/// Store-side pre-filter for the tutor pool.
///
/// Narrows the query; [`eligible`] stays the deciding check.
pub fn tutor_pool_filters(request: &ParentRequest) -> Vec<Filter> {
    let (min_rate, max_rate) = hourly_rate_range(request);
    vec![
        Filter::eq("location", request.location.as_str()),
        Filter::Gte("hourly_rate".to_string(), min_rate),
        Filter::Lte("hourly_rate".to_string(), max_rate),
    ]
}
