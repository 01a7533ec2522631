// Criterion benchmarks for Tutor Match

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tutor_match::core::{eligible, eligible_tutors, MatchFinder};
use tutor_match::models::{ParentRequest, RequestStatus, TutorProfile};
use tutor_match::services::{DataStore, MemoryStore, Table};

const SUBJECTS: [&str; 6] = ["Math", "Physics", "Chemistry", "English", "Biology", "History"];
const CITIES: [&str; 4] = ["Pune", "Mumbai", "Nagpur", "Nashik"];

fn create_tutor(id: usize) -> TutorProfile {
    TutorProfile {
        id: format!("tutor-{}", id),
        subjects: vec![
            SUBJECTS[id % SUBJECTS.len()].to_string(),
            SUBJECTS[(id / 2) % SUBJECTS.len()].to_string(),
        ],
        hourly_rate: 1000.0 + (id % 40) as f64 * 100.0,
        qualifications: vec!["B.Ed".to_string()],
        bio: None,
        location: CITIES[id % CITIES.len()].to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_request() -> ParentRequest {
    ParentRequest {
        id: "bench-request".to_string(),
        parent_id: "bench-parent".to_string(),
        grade_level: "10".to_string(),
        subjects: vec!["Math".to_string(), "Physics".to_string()],
        budget_min: 8000.0,
        budget_max: 16000.0,
        location: "Pune".to_string(),
        requirements: None,
        status: RequestStatus::Pending,
        created_at: Utc::now(),
    }
}

fn bench_predicate(c: &mut Criterion) {
    let request = create_request();
    let tutor = create_tutor(4);

    c.bench_function("eligible_single_tutor", |b| {
        b.iter(|| eligible(black_box(&request), black_box(&tutor)));
    });
}

fn bench_eligible_tutors(c: &mut Criterion) {
    let request = create_request();
    let mut group = c.benchmark_group("eligibility");

    for tutor_count in [10, 100, 1000, 10000].iter() {
        let tutors: Vec<TutorProfile> = (0..*tutor_count).map(create_tutor).collect();

        group.bench_with_input(
            BenchmarkId::new("eligible_tutors", tutor_count),
            tutor_count,
            |b, _| {
                b.iter(|| eligible_tutors(black_box(&request), black_box(tutors.clone())));
            },
        );
    }

    group.finish();
}

fn bench_candidate_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_store");

    for tutor_count in [100, 1000].iter() {
        let store = Arc::new(MemoryStore::new());
        tokio_test::block_on(async {
            for i in 0..*tutor_count {
                let record = serde_json::to_value(create_tutor(i)).unwrap();
                store.create(Table::TutorProfiles, record).await.unwrap();
            }
        });

        let finder = MatchFinder::new(store);
        let request = create_request();

        group.bench_with_input(
            BenchmarkId::new("candidate_tutors", tutor_count),
            tutor_count,
            |b, _| {
                b.iter(|| tokio_test::block_on(finder.candidate_tutors(black_box(&request))).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_predicate, bench_eligible_tutors, bench_candidate_query);
criterion_main!(benches);
