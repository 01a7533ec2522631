// Unit tests for Tutor Match

use chrono::Utc;
use tutor_match::core::{eligible, eligible_tutors, hourly_rate_range, plan, SESSIONS_PER_MONTH};
use tutor_match::models::{Decision, MatchStatus, ParentRequest, RequestStatus, TutorProfile};

fn create_tutor(id: &str, subjects: &[&str], hourly_rate: f64, location: &str) -> TutorProfile {
    TutorProfile {
        id: id.to_string(),
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        hourly_rate,
        qualifications: vec!["B.Sc".to_string()],
        bio: Some(format!("Tutor {}", id)),
        location: location.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_request(subjects: &[&str], budget_min: f64, budget_max: f64, location: &str) -> ParentRequest {
    ParentRequest {
        id: "request".to_string(),
        parent_id: "parent".to_string(),
        grade_level: "9".to_string(),
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        budget_min,
        budget_max,
        location: location.to_string(),
        requirements: Some("Weekends only".to_string()),
        status: RequestStatus::Pending,
        created_at: Utc::now(),
    }
}

#[test]
fn test_pune_scenario_single_match() {
    let request = create_request(&["Math"], 8000.0, 16000.0, "Pune");
    let tutors = vec![
        create_tutor("t1", &["Math", "Physics"], 2500.0, "Pune"),
        create_tutor("t2", &["English"], 3000.0, "Pune"),
    ];

    let selected = eligible_tutors(&request, tutors);

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, "t1");
}

#[test]
fn test_pune_scenario_location_mismatch() {
    let request = create_request(&["Math"], 8000.0, 16000.0, "Pune");
    let tutors = vec![
        create_tutor("t1", &["Math", "Physics"], 2500.0, "Mumbai"),
        create_tutor("t2", &["English"], 3000.0, "Pune"),
    ];

    assert!(eligible_tutors(&request, tutors).is_empty());
}

#[test]
fn test_empty_subjects_match_nobody() {
    let request = create_request(&[], 0.0, 1_000_000.0, "Pune");
    let tutors = vec![
        create_tutor("t1", &["Math"], 2500.0, "Pune"),
        create_tutor("t2", &[], 2500.0, "Pune"),
    ];

    assert!(eligible_tutors(&request, tutors).is_empty());
}

#[test]
fn test_empty_pool() {
    let request = create_request(&["Math"], 8000.0, 16000.0, "Pune");
    assert!(eligible_tutors(&request, vec![]).is_empty());
}

#[test]
fn test_predicate_is_conjunction_of_three_rules() {
    let subjects = [vec!["Math"], vec!["Art"]];
    let rates = [1000.0, 2000.0, 3000.0, 4000.0, 5000.0];
    let locations = ["Pune", "Pune ", "Mumbai"];

    let request = create_request(&["Math", "Science"], 8000.0, 16000.0, "Pune");
    let (min_rate, max_rate) = hourly_rate_range(&request);

    for s in &subjects {
        for &rate in &rates {
            for location in &locations {
                let tutor = create_tutor("t", s, rate, location);
                let expected = s.iter().any(|x| request.subjects.iter().any(|r| r == x))
                    && rate >= min_rate
                    && rate <= max_rate
                    && *location == request.location;
                assert_eq!(
                    eligible(&request, &tutor),
                    expected,
                    "subjects={:?} rate={} location={:?}",
                    s,
                    rate,
                    location
                );
            }
        }
    }
}

#[test]
fn test_budget_divisor_is_four_sessions() {
    assert_eq!(SESSIONS_PER_MONTH, 4.0);
    let request = create_request(&["Math"], 5000.0, 27000.0, "Pune");
    assert_eq!(hourly_rate_range(&request), (1250.0, 6750.0));
}

#[test]
fn test_inverted_budget_matches_nobody() {
    // min > max is not rejected, it just leaves an empty rate range
    let request = create_request(&["Math"], 16000.0, 8000.0, "Pune");
    assert!(!eligible(&request, &create_tutor("t1", &["Math"], 3000.0, "Pune")));
}

#[test]
fn test_joint_transition_accept_and_reject() {
    let accepted = plan(RequestStatus::Pending, Some(MatchStatus::Pending), Decision::Accept).unwrap();
    assert_eq!((accepted.request, accepted.matched), (RequestStatus::Matched, MatchStatus::Accepted));

    let rejected = plan(RequestStatus::Pending, Some(MatchStatus::Pending), Decision::Reject).unwrap();
    assert_eq!((rejected.request, rejected.matched), (RequestStatus::Rejected, MatchStatus::Rejected));
}

#[test]
fn test_statuses_serialize_lowercase() {
    assert_eq!(serde_json::to_value(RequestStatus::Matched).unwrap(), "matched");
    assert_eq!(serde_json::to_value(MatchStatus::Accepted).unwrap(), "accepted");
    assert_eq!(serde_json::to_value(Decision::Reject).unwrap(), "reject");
    assert_eq!("pending".parse::<MatchStatus>().unwrap(), MatchStatus::Pending);
}
