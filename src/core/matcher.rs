use crate::core::eligibility::{eligible_tutors, tutor_pool_filters};
use crate::models::{FailedMatch, Match, MatchOutcome, MatchStatus, ParentRequest, TutorProfile};
use crate::services::store::{decode_rows, DataStore, Filter, StoreResult, Table};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Match finder: turns a parent request into pending matches
///
/// # Pipeline Stages
/// 1. Query the tutor pool (store pre-filters on location and rate)
/// 2. Eligibility predicate, in process
/// 3. Skip tutors already matched to this request
/// 4. One independent `pending` match insert per remaining tutor
#[derive(Clone)]
pub struct MatchFinder {
    store: Arc<dyn DataStore>,
}

impl MatchFinder {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Tutor pool narrowed for `request`. Rows that fail to decode are skipped.
    pub async fn candidate_tutors(&self, request: &ParentRequest) -> StoreResult<Vec<TutorProfile>> {
        let rows = self
            .store
            .query(Table::TutorProfiles, &tutor_pool_filters(request))
            .await?;
        let total = rows.len();

        let tutors: Vec<TutorProfile> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(tutor) => Some(tutor),
                Err(e) => {
                    tracing::warn!("Skipping malformed tutor profile: {}", e);
                    None
                }
            })
            .collect();

        tracing::debug!("Tutor pool for request {}: {} of {} rows usable", request.id, tutors.len(), total);

        Ok(tutors)
    }

    /// Find eligible tutors for `request` and create a pending match for each.
    ///
    /// Fetch failures abort the run. Insert failures do not: each insert is an
    /// independent attempt and failed ones are listed in the outcome.
    pub async fn find_matches(&self, request: &ParentRequest) -> StoreResult<MatchOutcome> {
        let candidates = self.candidate_tutors(request).await?;
        let total_candidates = candidates.len();
        let eligible = eligible_tutors(request, candidates);

        let existing: Vec<Match> = decode_rows(
            Table::Matches,
            self.store
                .query(Table::Matches, &[Filter::eq("request_id", request.id.as_str())])
                .await?,
        )?;
        let already_matched: HashSet<&str> = existing.iter().map(|m| m.tutor_id.as_str()).collect();

        let mut outcome = MatchOutcome::default();

        for tutor in eligible.iter().filter(|t| !already_matched.contains(t.id.as_str())) {
            match self.create_pending(request, tutor).await {
                Ok(created) => outcome.created.push(created),
                Err(e) => {
                    tracing::warn!(
                        "Failed to create match for request {} and tutor {}: {}",
                        request.id,
                        tutor.id,
                        e
                    );
                    outcome.failed.push(FailedMatch {
                        tutor_id: tutor.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Request {}: {} candidates, {} eligible, {} matches created, {} failed",
            request.id,
            total_candidates,
            eligible.len(),
            outcome.created.len(),
            outcome.failed.len()
        );

        Ok(outcome)
    }

    async fn create_pending(&self, request: &ParentRequest, tutor: &TutorProfile) -> StoreResult<Match> {
        let created = Match {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            tutor_id: tutor.id.clone(),
            status: MatchStatus::Pending,
            created_at: Utc::now(),
        };

        let record: Value = json!({
            "id": created.id,
            "request_id": created.request_id,
            "tutor_id": created.tutor_id,
            "status": created.status,
            "created_at": created.created_at,
        });

        let id = self.store.create(Table::Matches, record).await?;

        Ok(Match { id, ..created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestStatus;
    use crate::services::MemoryStore;

    fn request(location: &str) -> ParentRequest {
        ParentRequest {
            id: "r1".to_string(),
            parent_id: "p1".to_string(),
            grade_level: "10".to_string(),
            subjects: vec!["Math".to_string()],
            budget_min: 8000.0,
            budget_max: 16000.0,
            location: location.to_string(),
            requirements: None,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    async fn add_tutor(store: &MemoryStore, id: &str, subjects: &[&str], rate: f64, location: &str) {
        store
            .create(
                Table::TutorProfiles,
                json!({
                    "id": id, "subjects": subjects, "hourly_rate": rate, "qualifications": [],
                    "location": location, "created_at": Utc::now(), "updated_at": Utc::now(),
                }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_find_matches_basic() {
        let store = Arc::new(MemoryStore::new());
        add_tutor(&store, "t1", &["Math", "Physics"], 2500.0, "Pune").await;
        add_tutor(&store, "t2", &["English"], 3000.0, "Pune").await;

        let finder = MatchFinder::new(store.clone());
        let outcome = finder.find_matches(&request("Pune")).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.created_count(), 1);
        assert_eq!(outcome.created[0].tutor_id, "t1");
        assert_eq!(outcome.created[0].status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate() {
        let store = Arc::new(MemoryStore::new());
        add_tutor(&store, "t1", &["Math"], 2500.0, "Pune").await;

        let finder = MatchFinder::new(store.clone());
        assert_eq!(finder.find_matches(&request("Pune")).await.unwrap().created_count(), 1);
        assert_eq!(finder.find_matches(&request("Pune")).await.unwrap().created_count(), 0);
        assert_eq!(store.len(Table::Matches).await, 1);
    }

    #[tokio::test]
    async fn test_malformed_tutor_rows_skipped() {
        let store = Arc::new(MemoryStore::new());
        add_tutor(&store, "t1", &["Math"], 2500.0, "Pune").await;
        store
            .create(Table::TutorProfiles, json!({"id": "broken", "location": "Pune", "hourly_rate": 2500.0}))
            .await
            .unwrap();

        let finder = MatchFinder::new(store);
        let tutors = finder.candidate_tutors(&request("Pune")).await.unwrap();
        assert_eq!(tutors.len(), 1);
    }
}
