//! Integration tests for the stock planning service.
//!
//! The router is driven in-process: planning reads come from a
//! [`PlanningSnapshot`] and records are kept in a [`MemoryStore`], so no
//! database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stockplan-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;

use stockplan_admin::config::PlanningConfig;
use stockplan_admin::db::RepositoryError;
use stockplan_admin::models::{
    CommitOutcome, NewReplenishmentRecord, RecordPage, ReplenishmentRecord,
};
use stockplan_admin::routes;
use stockplan_admin::services::{PlanningSnapshot, ReplenishmentStore, SnapshotSource};
use stockplan_admin::state::AppState;
use stockplan_core::replenishment::{BreakLine, ReplenishmentLine, StoreDemandSegment};
use stockplan_core::types::ReplenishmentId;

/// Largest response body the helpers read.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

struct StoredRecord {
    record: NewReplenishmentRecord,
    created_at: DateTime<Utc>,
}

/// [`ReplenishmentStore`] kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<ReplenishmentId, StoredRecord>>,
}

impl MemoryStore {
    fn records(&self) -> MutexGuard<'_, HashMap<ReplenishmentId, StoredRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records().len()
    }
}

#[async_trait]
impl ReplenishmentStore for MemoryStore {
    async fn save(&self, record: &NewReplenishmentRecord) -> Result<CommitOutcome, RepositoryError> {
        let mut records = self.records();
        if records.contains_key(&record.id) {
            return Ok(CommitOutcome::AlreadyExists(record.id));
        }
        records.insert(
            record.id,
            StoredRecord {
                record: record.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(CommitOutcome::Created(record.id))
    }

    async fn list(&self, query: &str, page: u32, limit: u32) -> Result<RecordPage, RepositoryError> {
        let query = query.trim().to_uppercase();
        let records = self.records();

        let mut matching: Vec<ReplenishmentRecord> = records
            .values()
            .map(|stored| stored.record.header(stored.created_at))
            .filter(|header| {
                header.id.to_string().to_uppercase().contains(&query)
                    || header
                        .selected_deliveries
                        .iter()
                        .any(|d| d.as_str().to_uppercase().contains(&query))
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_count = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let skip = (page.max(1) - 1) as usize * limit as usize;
        Ok(RecordPage {
            records: matching.into_iter().skip(skip).take(limit as usize).collect(),
            total_count,
        })
    }

    async fn get(&self, id: ReplenishmentId) -> Result<ReplenishmentRecord, RepositoryError> {
        self.records()
            .get(&id)
            .map(|stored| stored.record.header(stored.created_at))
            .ok_or(RepositoryError::NotFound)
    }

    async fn lines(&self, id: ReplenishmentId) -> Result<Vec<ReplenishmentLine>, RepositoryError> {
        let mut lines = self
            .records()
            .get(&id)
            .map(|stored| stored.record.lines.clone())
            .unwrap_or_default();
        lines.sort_by(|a, b| (&a.sku, &a.store).cmp(&(&b.sku, &b.store)));
        Ok(lines)
    }

    async fn breaks(&self, id: ReplenishmentId) -> Result<Vec<BreakLine>, RepositoryError> {
        let mut breaks = self
            .records()
            .get(&id)
            .map(|stored| stored.record.breaks.clone())
            .unwrap_or_default();
        breaks.sort_by(|a, b| (&a.sku, &a.store).cmp(&(&b.sku, &b.store)));
        Ok(breaks)
    }

    async fn segmentation(
        &self,
        id: ReplenishmentId,
    ) -> Result<Vec<StoreDemandSegment>, RepositoryError> {
        let mut segments = self
            .records()
            .get(&id)
            .map(|stored| stored.record.segments.clone())
            .unwrap_or_default();
        segments.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(segments)
    }

    async fn delete(&self, id: ReplenishmentId) -> Result<(), RepositoryError> {
        self.records()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// The service router over in-memory collaborators.
pub struct TestApp {
    router: Router,
    /// Records committed through the router.
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Build the app over a snapshot with default planning settings.
    #[must_use]
    pub fn new(snapshot: PlanningSnapshot) -> Self {
        Self::with_planning(snapshot, PlanningConfig::default())
    }

    /// Build the app with explicit planning settings.
    #[must_use]
    pub fn with_planning(snapshot: PlanningSnapshot, planning: PlanningConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::new(
            planning,
            Arc::new(SnapshotSource::new(snapshot)),
            Arc::clone(&store) as Arc<dyn ReplenishmentStore>,
        );
        Self {
            router: routes::routes().with_state(state),
            store,
        }
    }

    /// Send a request and return the status with the body parsed as JSON
    /// (`Value::Null` for an empty body, a string for a non-JSON body).
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, value) = self.send_with_headers(method, uri, body).await;
        (status, value)
    }

    /// [`send`](Self::send), also returning the response headers.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, headers, value)
    }

    /// `GET` helper.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    /// `POST` helper with a JSON body.
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// `PUT` helper with a JSON body.
    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    /// `DELETE` helper.
    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }
}

/// Snapshot with one SKU, two stores and ten central units.
///
/// Store A wants 6 and store B wants 6 (targets dominate sales), so serving
/// A first leaves B with 4 and a break of 2.
///
/// # Panics
///
/// Panics if the fixture is not a valid snapshot.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn two_store_snapshot() -> PlanningSnapshot {
    serde_json::from_value(serde_json::json!({
        "sales": [{ "SKU": "S1", "A": 2, "B": 1 }],
        "centralStock": [{ "SKU": "S1", "STOCKERP": 12, "STOCKWMS": 10, "MINSTOCK": 10 }],
        "storeStock": [{
            "SKU": "S1",
            "STORES": {
                "A": { "AVAILABLE": 0, "ORDERED": 0 },
                "B": { "AVAILABLE": 0, "ORDERED": 0 }
            }
        }],
        "segments": [{ "SKU": "S1", "DELIVERY": "D1", "A": 6, "B": 6 }]
    }))
    .unwrap()
}
