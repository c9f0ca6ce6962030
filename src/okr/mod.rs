//! OKR (Objectives and Key Results) domain models
//!
//! This module provides the OKR entities tracked next to the board:
//! - `Goal` - An objective with an ordered list of key results
//! - `KeyResult` - A quantified outcome (current vs. target)
//! - `progress` - Percent-complete aggregation
//! - `linkage` - Task transitions feeding key result values

pub mod linkage;
pub mod progress;

pub use linkage::{apply_task_transition, contribution_delta, reverse_for_deletion};
pub use progress::{goal_progress, key_result_percent};

use crate::error::ValidationError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A high-level objective with associated key results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Unique identifier for this objective
    pub id: String,

    /// Human-readable title of the objective
    pub title: String,

    /// What this objective aims to achieve
    #[serde(default)]
    pub description: String,

    /// Target completion date
    #[serde(with = "chrono::serde::ts_milliseconds", default = "utc_now")]
    pub deadline: DateTime<Utc>,

    /// Key results that measure success, in insertion order
    #[serde(default)]
    pub key_results: Vec<KeyResult>,

    /// Derived 0-100 progress, recomputed whenever a key result changes
    #[serde(default)]
    pub progress: u8,

    /// Creation timestamp
    #[serde(with = "chrono::serde::ts_milliseconds", default = "utc_now")]
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Create a new objective with a generated id
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            deadline: deadline.trunc_subsecs(3),
            key_results: Vec::new(),
            progress: 0,
            created_at: utc_now(),
        }
    }

    /// Builder form of [`Goal::add_key_result`]
    pub fn with_key_result(mut self, kr: KeyResult) -> Self {
        self.add_key_result(kr);
        self
    }

    /// Append a key result and refresh progress
    pub fn add_key_result(&mut self, kr: KeyResult) {
        self.key_results.push(kr);
        self.recompute_progress();
    }

    /// Validate the objective structure
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyGoalTitle);
        }
        let mut seen = HashSet::new();
        for kr in &self.key_results {
            kr.validate()?;
            if !seen.insert(kr.id.as_str()) {
                return Err(ValidationError::DuplicateKeyResult(kr.id.clone()));
            }
        }
        Ok(())
    }

    /// Re-derive `progress` from the key results
    pub fn recompute_progress(&mut self) {
        self.progress = goal_progress(&self.key_results);
    }

    pub fn key_result(&self, id: &str) -> Option<&KeyResult> {
        self.key_results.iter().find(|kr| kr.id == id)
    }

    pub fn contains_key_result(&self, id: &str) -> bool {
        self.key_results.iter().any(|kr| kr.id == id)
    }

    /// Copy of this objective with `delta` added to one key result.
    ///
    /// Other key results are cloned untouched; progress is recomputed.
    pub fn with_contribution(&self, key_result_id: &str, delta: f64) -> Goal {
        let key_results = self
            .key_results
            .iter()
            .map(|kr| {
                if kr.id == key_result_id {
                    KeyResult {
                        current_value: kr.current_value + delta,
                        ..kr.clone()
                    }
                } else {
                    kr.clone()
                }
            })
            .collect::<Vec<_>>();
        Goal {
            progress: goal_progress(&key_results),
            key_results,
            ..self.clone()
        }
    }

    /// All key results at or past target
    pub fn is_achieved(&self) -> bool {
        self.progress >= 100
    }

    /// Past the deadline without being achieved
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now && !self.is_achieved()
    }

    /// Whole days until the deadline, rounded up; negative once past
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        let ms = (self.deadline - now).num_milliseconds();
        (ms as f64 / 86_400_000.0).ceil() as i64
    }
}

/// A measurable key result within an objective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResult {
    /// Unique identifier, immutable once created
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Accumulated value; may be negative or exceed the target
    #[serde(default)]
    pub current_value: f64,

    /// Target value; zero is allowed and reads as 0%
    pub target_value: f64,

    /// Display-only unit (e.g. "%", "deals", "users")
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl KeyResult {
    /// Create a new key result starting at zero
    pub fn new(title: impl Into<String>, target_value: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            current_value: 0.0,
            target_value,
            unit: unit.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_current(mut self, current_value: f64) -> Self {
        self.current_value = current_value;
        self
    }

    /// Validate the key result
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyKeyResultTitle);
        }
        Ok(())
    }

    /// Percent complete, clamped to 0..=100
    pub fn percent(&self) -> f64 {
        key_result_percent(self)
    }
}

/// Current UTC time at the millisecond precision it is stored with
fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Default unit value
fn default_unit() -> String {
    "%".to_string()
}
