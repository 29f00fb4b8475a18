//! In-memory clinical data source
//!
//! Backs tests and the demo CLI path. Records are seeded explicitly or via
//! `seed_sample`, and failure injection per user supports exercising the
//! error-handling workflow deterministically.

use crate::adapters::source::traits::{ClinicalDataSource, ClinicalRecord};
use crate::domain::ids::UserId;
use crate::domain::request::{DataCategory, DateRange};
use crate::domain::{BeingError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Clinical data source holding records in memory
#[derive(Default)]
pub struct InMemoryDataSource {
    records: RwLock<Vec<ClinicalRecord>>,
    fail_users: RwLock<HashSet<UserId>>,
}

impl InMemoryDataSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single record
    pub async fn add_record(&self, record: ClinicalRecord) {
        self.records.write().await.push(record);
    }

    /// Seed one record per day for the last `days` days in each category
    pub async fn seed_sample(&self, user_id: &UserId, categories: &[DataCategory], days: i64) {
        let mut records = self.records.write().await;
        let now = Utc::now();
        for category in categories {
            for day in 0..days {
                let recorded_at = now - Duration::days(day) - Duration::minutes(17);
                records.push(
                    ClinicalRecord::new(
                        format!("{category}-{day}"),
                        user_id.clone(),
                        *category,
                        recorded_at,
                        format!("{category} entry for day -{day}"),
                    )
                    .with_details(serde_json::json!({ "day_offset": day })),
                );
            }
        }
    }

    /// Make every fetch for this user fail (failure injection for tests)
    pub async fn fail_for(&self, user_id: &UserId) {
        self.fail_users.write().await.insert(user_id.clone());
    }

    /// Stop failing fetches for this user
    pub async fn recover_for(&self, user_id: &UserId) {
        self.fail_users.write().await.remove(user_id);
    }

    /// Total records held
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ClinicalDataSource for InMemoryDataSource {
    async fn fetch_records(
        &self,
        user_id: &UserId,
        categories: &[DataCategory],
        range: &DateRange,
    ) -> Result<Vec<ClinicalRecord>> {
        if self.fail_users.read().await.contains(user_id) {
            return Err(BeingError::Process(format!(
                "Data source unavailable for user {user_id}"
            )));
        }

        let records = self.records.read().await;
        let mut matched: Vec<ClinicalRecord> = records
            .iter()
            .filter(|r| {
                &r.user_id == user_id
                    && categories.contains(&r.category)
                    && range.contains(r.recorded_at)
            })
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.recorded_at);
        Ok(matched)
    }
}
