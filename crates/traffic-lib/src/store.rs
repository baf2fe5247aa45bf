//! Rule record storage
//!
//! The store is an explicit boundary: the API layer only depends on the
//! [`RuleStore`] trait, and the in-memory implementation can be swapped for
//! a database-backed one without touching the handlers.

use crate::rule::TrafficRule;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("rule {0} not found")]
    NotFound(String),
}

/// Persistence operations for traffic rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Persist a new rule record.
    async fn insert(&self, rule: TrafficRule);

    /// Fetch one rule by id.
    async fn get(&self, id: &str) -> Option<TrafficRule>;

    /// All rules, newest first.
    async fn list(&self) -> Vec<TrafficRule>;

    /// Overwrite an existing rule record.
    async fn replace(&self, rule: TrafficRule) -> Result<(), StoreError>;

    /// Remove a rule record.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Stamp the time of the last successful deployment.
    async fn set_deployed_at(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Number of stored rules.
    async fn count(&self) -> usize;
}

/// In-memory rule store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rules: DashMap<String, TrafficRule>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn insert(&self, rule: TrafficRule) {
        self.rules.insert(rule.id.clone(), rule);
    }

    async fn get(&self, id: &str) -> Option<TrafficRule> {
        self.rules.get(id).map(|entry| entry.value().clone())
    }

    async fn list(&self) -> Vec<TrafficRule> {
        let mut rules: Vec<TrafficRule> =
            self.rules.iter().map(|entry| entry.value().clone()).collect();
        // newest first, id as a stable tie-break
        rules.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        rules
    }

    async fn replace(&self, rule: TrafficRule) -> Result<(), StoreError> {
        if !self.rules.contains_key(&rule.id) {
            return Err(StoreError::NotFound(rule.id));
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.rules
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_deployed_at(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut entry = self
            .rules
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.value_mut().deployed_at = Some(at);
        Ok(())
    }

    async fn count(&self) -> usize {
        self.rules.len()
    }
}
