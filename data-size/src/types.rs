use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::topology::WorkflowType;

/// Object-store prefix result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeInfo {
    pub size: u64,
    pub file_count: u64,
    pub max_file_size: u64,
}

impl SizeInfo {
    pub fn add(&mut self, bytes: u64) {
        self.size += bytes;
        self.file_count += 1;
        self.max_file_size = self.max_file_size.max(bytes);
    }
}

/// Table result. Serialized with the same field names as `SizeInfo` so the
/// breakdown entries share one wire shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSizeInfo {
    #[serde(rename = "size")]
    pub estimated_size: u64,
    #[serde(rename = "file_count")]
    pub record_count: u64,
    #[serde(rename = "max_file_size")]
    pub max_record_size: u64,
}

impl TableSizeInfo {
    pub fn add(&mut self, bytes: u64) {
        self.estimated_size += bytes;
        self.record_count += 1;
        self.max_record_size = self.max_record_size.max(bytes);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorEstimate {
    pub vector_count: u64,
    pub estimated_size: u64,
    pub size_per_vector: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BreakdownEntry {
    Objects(SizeInfo),
    Records(TableSizeInfo),
    Vectors(VectorEstimate),
}

impl BreakdownEntry {
    pub fn size(&self) -> u64 {
        match self {
            BreakdownEntry::Objects(s) => s.size,
            BreakdownEntry::Records(t) => t.estimated_size,
            BreakdownEntry::Vectors(v) => v.estimated_size,
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            BreakdownEntry::Objects(s) => s.file_count,
            BreakdownEntry::Records(t) => t.record_count,
            BreakdownEntry::Vectors(v) => v.vector_count,
        }
    }
}

/// Result of one sub-computation: either a measurement or a logged failure
/// that callers sum as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Measured(T),
    Failed { reason: String },
}

impl<T> Outcome<T> {
    pub fn failed(err: anyhow::Error) -> Self {
        Outcome::Failed { reason: format!("{err:#}") }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Measured(v) => Outcome::Measured(f(v)),
            Outcome::Failed { reason } => Outcome::Failed { reason },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl<T: Default> Outcome<T> {
    pub fn into_value(self) -> T {
        match self {
            Outcome::Measured(v) => v,
            Outcome::Failed { .. } => T::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFailure {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub task_id: String,
    pub workflow_type: WorkflowType,
    pub total_size: u64,
    pub total_files: u64,
    pub data_breakdown: BTreeMap<String, BreakdownEntry>,
    #[serde(skip)]
    pub failures: Vec<ComponentFailure>,
}

impl AggregateResult {
    pub fn new(task_id: impl Into<String>, workflow_type: WorkflowType) -> Self {
        Self {
            task_id: task_id.into(),
            workflow_type,
            total_size: 0,
            total_files: 0,
            data_breakdown: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Folds one sub-result into the running totals. Zero-count entries and
    /// failures never reach the breakdown.
    pub fn record(&mut self, label: String, outcome: Outcome<BreakdownEntry>) {
        let entry = match outcome {
            Outcome::Measured(entry) => entry,
            Outcome::Failed { reason } => {
                self.failures.push(ComponentFailure { label, reason });
                return;
            }
        };
        if entry.count() == 0 {
            return;
        }
        self.total_size += entry.size();
        self.total_files += entry.count();
        self.data_breakdown.insert(label, entry);
    }
}
