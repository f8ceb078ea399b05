//! Shared test fixtures: fake connectors and executors, and a seeded backend

use crate::config::AppConfig;
use crate::db::sqlite::SqliteBackend;
use crate::db::{QueryExecutor, Row};
use crate::error::{AppError, Result};
use crate::platforms::types::{Platform, SpendRecord};
use crate::platforms::{AdPlatform, PlatformRegistry};
use crate::state::AppState;
use crate::window::DateWindow;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Ad Platforms
// ============================================================================

enum Behavior {
    Return(Vec<SpendRecord>),
    Fail,
    Stall,
}

/// Connector serving canned records inside the requested window
pub struct FakePlatform {
    platform: Platform,
    behavior: Behavior,
}

impl FakePlatform {
    pub fn returning(platform: Platform, records: Vec<SpendRecord>) -> Arc<dyn AdPlatform> {
        Arc::new(Self {
            platform,
            behavior: Behavior::Return(records),
        })
    }

    pub fn failing(platform: Platform) -> Arc<dyn AdPlatform> {
        Arc::new(Self {
            platform,
            behavior: Behavior::Fail,
        })
    }

    pub fn stalled(platform: Platform) -> Arc<dyn AdPlatform> {
        Arc::new(Self {
            platform,
            behavior: Behavior::Stall,
        })
    }
}

#[async_trait]
impl AdPlatform for FakePlatform {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_campaign_data(&self, window: &DateWindow) -> Result<Vec<SpendRecord>> {
        match &self.behavior {
            Behavior::Return(records) => Ok(records
                .iter()
                .filter(|r| window.contains(r.date))
                .cloned()
                .collect()),
            Behavior::Fail => Err(AppError::Platform("upstream unavailable".to_string())),
            Behavior::Stall => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Spend record with zeroed delivery counters
pub fn spend(source: Platform, date: &str, content: &str, amount: f64) -> SpendRecord {
    SpendRecord {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        source,
        campaign_id: format!("{}-{}", source, content),
        campaign_name: format!("Campaign {}", content),
        utm_content: content.to_string(),
        spend: amount,
        impressions: 0,
        clicks: 0,
        conversions: 0,
    }
}

// ============================================================================
// Executors
// ============================================================================

pub struct FailingExecutor;

impl QueryExecutor for FailingExecutor {
    fn execute_query(&self, _sql: &str, _params: &[String]) -> Result<Vec<Row>> {
        Err(AppError::Internal("backend unavailable".to_string()))
    }
}

/// Serves the same rows for every query
pub struct RowsExecutor {
    rows: Vec<Row>,
}

impl RowsExecutor {
    pub fn new(rows: Vec<serde_json::Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|row| row.as_object().cloned())
                .collect(),
        }
    }
}

impl QueryExecutor for RowsExecutor {
    fn execute_query(&self, _sql: &str, _params: &[String]) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

pub struct EmptyExecutor;

impl QueryExecutor for EmptyExecutor {
    fn execute_query(&self, _sql: &str, _params: &[String]) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// State
// ============================================================================

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|_| None).unwrap()
}

pub fn state_with(
    backend: Arc<dyn QueryExecutor>,
    platforms: Vec<Arc<dyn AdPlatform>>,
) -> AppState {
    AppState::from_parts(
        test_config(),
        backend,
        Arc::new(PlatformRegistry::from_platforms(platforms)),
    )
}

/// State with the given connectors and an empty backend
pub fn test_state(platforms: Vec<Arc<dyn AdPlatform>>) -> AppState {
    state_with(Arc::new(EmptyExecutor), platforms)
}

/// State with the given backend and no connectors
pub fn test_state_with_backend(backend: Arc<dyn QueryExecutor>) -> AppState {
    state_with(backend, Vec::new())
}

/// State over a seeded on-disk backend
pub fn seeded_state_with(platforms: Vec<Arc<dyn AdPlatform>>) -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.database.path = dir.path().join("backend.db");
    config.database.init_schema = true;

    let backend = SqliteBackend::new(&config.database).unwrap();
    backend.execute_batch(SEED).unwrap();

    let state = AppState::from_parts(
        config,
        Arc::new(backend),
        Arc::new(PlatformRegistry::from_platforms(platforms)),
    );
    (dir, state)
}

pub fn seeded_state() -> (tempfile::TempDir, AppState) {
    seeded_state_with(Vec::new())
}

/// Backend fixture for the first week of March 2024
///
/// Leads in window: google/A members 1 and 2 (member 1 twice), facebook/B
/// member 3, facebook with no content member 4, google/C member 5.
/// Paid new-sale orders in window: member 1 300 (google/A), member 3 110
/// (facebook/B), member 8 150 (google/D, lead in February), member 9 200
/// (tied latest leads, facebook/E2 has the higher id).
pub const SEED: &str = r#"
INSERT INTO MemberForm (Id, MemberId, BrandId, UtmSource, UtmMedium, UtmContent, CreateDate) VALUES
    (1, 1, 1, 'google', 'cpc', 'A', '2024-03-01 09:00:00'),
    (2, 1, 1, 'google', 'cpc', 'A', '2024-03-03 10:00:00'),
    (3, 2, 1, 'google', 'cpc', 'A', '2024-03-07 18:30:00'),
    (4, 3, 1, 'facebook', 'paid', 'B', '2024-03-02 12:00:00'),
    (5, 4, 1, 'facebook', 'paid', NULL, '2024-03-04 08:00:00'),
    (6, 5, 1, 'google', 'cpc', 'C', '2024-03-05 11:00:00'),
    (7, 6, 2, 'google', 'cpc', 'other-brand', '2024-03-02 13:00:00'),
    (8, 7, 1, 'newsletter', 'email', 'X', '2024-03-02 14:00:00'),
    (9, 8, 1, 'google', 'cpc', 'D', '2024-02-20 09:00:00'),
    (10, 9, 1, 'google', 'cpc', 'E1', '2024-02-15 10:00:00'),
    (11, 9, 1, 'facebook', 'paid', 'E2', '2024-02-15 10:00:00');

INSERT INTO Member (ID) VALUES (1), (2), (3), (5), (8), (9);

INSERT INTO EmployeeMember (MemberId, EmployeeId, EmployeeTypeId, Status) VALUES
    (1, 100, 4, 1),
    (3, 101, 4, 1),
    (8, 102, 4, 0),
    (9, 103, 3, 1);

INSERT INTO Product (ID, Title) VALUES (1, 'English A1');

INSERT INTO Term (ID, MemberId, ProductId, StudentName, StudentNo, SalesType) VALUES
    (1, 1, 1, 'Ada', 'S-1', 1),
    (2, 3, 1, 'Grace', 'S-3', 1),
    (3, 2, 1, 'Alan', 'S-2', 2),
    (4, 5, 1, 'Edsger', 'S-5', 1),
    (5, 8, 1, 'Barbara', 'S-8', 1),
    (6, 9, 1, 'Ken', 'S-9', 1);

INSERT INTO "Order" (Id, Price, TotalPrice, CreateDate) VALUES
    (1, 300, 300, '2024-03-04 14:00:00'),
    (2, 110, 110, '2024-03-05 15:00:00'),
    (3, 500, 500, '2024-03-05 16:00:00'),
    (4, 220, 220, '2024-03-06 09:00:00'),
    (5, 0, 0, '2024-03-06 10:00:00'),
    (6, 100, 100, '2024-03-20 10:00:00'),
    (7, 150, 150, '2024-03-03 11:00:00'),
    (8, 200, 200, '2024-03-06 12:00:00');

INSERT INTO OrderTermDetail (OrderId, TermId) VALUES
    (1, 1), (2, 2), (3, 3), (4, 4), (5, 1), (6, 1), (7, 5), (8, 6);

INSERT INTO Payment (OrderId, Status) VALUES
    (1, 1), (2, 1), (3, 1), (4, 0), (5, 1), (6, 1), (7, 1), (8, 1);
"#;
