use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::SizeError;
use crate::sizing;
use crate::storage_core::{ObjectStore, RecordTable};
use crate::topology::{self, PrefixKind, WorkflowTopology};
use crate::types::{AggregateResult, BreakdownEntry, Outcome};

pub const VECTOR_LABEL: &str = "s3_vectors";
pub const TABLE_LABEL_PREFIX: &str = "dynamodb_";

struct SubResult {
    label: String,
    outcome: Outcome<BreakdownEntry>,
}

/// Sizes one task's data across the bucket, its tables and the vector estimate.
pub struct Aggregator {
    objects: Arc<dyn ObjectStore>,
    tables: Arc<dyn RecordTable>,
    settings: Settings,
}

impl Aggregator {
    pub fn new(objects: Arc<dyn ObjectStore>, tables: Arc<dyn RecordTable>, settings: Settings) -> Self {
        Self { objects, tables, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fails only on request-level problems. A sub-scan that errors is logged
    /// and contributes nothing; the deadline covers the whole request and a
    /// timed-out request returns no totals at all.
    pub async fn aggregate(&self, task_id: Option<&str>, workflow_type: &str) -> Result<AggregateResult, SizeError> {
        // 공백만 있는 id 는 누락 취급, 그 외엔 받은 그대로 사용
        let task_id = task_id
            .filter(|t| !t.trim().is_empty())
            .ok_or(SizeError::MissingTaskId)?;
        let bucket = self.settings.bucket()?;
        let topology = topology::resolve(workflow_type, task_id, &self.settings.tables)?;

        let deadline = self.settings.timeout;
        let started = Instant::now();
        let result = tokio::time::timeout(deadline, self.collect(task_id, bucket, &topology))
            .await
            .map_err(|_| {
                warn!(task_id, workflow = %topology.workflow, ?deadline, "data size calculation timed out");
                SizeError::DeadlineExceeded(deadline)
            })?;

        info!(
            task_id,
            workflow = %topology.workflow,
            total_size = result.total_size,
            total_files = result.total_files,
            entries = result.data_breakdown.len(),
            failed = result.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "data size calculated"
        );
        Ok(result)
    }

    async fn collect(&self, task_id: &str, bucket: &str, topology: &WorkflowTopology) -> AggregateResult {
        let jobs = self.plan(task_id, bucket, topology);
        let mut result = AggregateResult::new(task_id, topology.workflow);

        let mut pending = stream::iter(jobs).buffer_unordered(self.settings.concurrency.max(1));
        while let Some(sub) = pending.next().await {
            result.record(sub.label, sub.outcome);
        }
        result
    }

    fn plan<'a>(
        &'a self,
        task_id: &'a str,
        bucket: &'a str,
        topology: &'a WorkflowTopology,
    ) -> Vec<BoxFuture<'a, SubResult>> {
        let mut jobs: Vec<BoxFuture<'a, SubResult>> = Vec::new();

        for slot in &topology.prefixes {
            jobs.push(
                async move {
                    let outcome = sizing::scan_prefix(self.objects.as_ref(), bucket, &slot.key).await;
                    SubResult {
                        label: slot.label.to_string(),
                        outcome: outcome.map(BreakdownEntry::Objects),
                    }
                }
                .boxed(),
            );
        }

        for slot in &topology.tables {
            let Some(table) = slot.name.as_deref() else {
                debug!(label = slot.label, "table not configured, skipping");
                continue;
            };
            let key_attr = self.settings.partition_key.as_str();
            jobs.push(
                async move {
                    let outcome = sizing::scan_table(self.tables.as_ref(), table, key_attr, task_id).await;
                    SubResult {
                        label: format!("{TABLE_LABEL_PREFIX}{}", slot.label),
                        outcome: outcome.map(BreakdownEntry::Records),
                    }
                }
                .boxed(),
            );
        }

        if let Some(spec) = topology.vector_spec {
            match topology.prefix(spec.prefix_label) {
                Some(slot) => {
                    let per_item = slot.kind == PrefixKind::PerItemVectors;
                    jobs.push(
                        async move {
                            let outcome = sizing::estimate_vectors(
                                self.objects.as_ref(),
                                bucket,
                                &slot.key,
                                per_item,
                                spec.dimension,
                            )
                            .await;
                            SubResult {
                                label: VECTOR_LABEL.to_string(),
                                outcome: outcome.map(BreakdownEntry::Vectors),
                            }
                        }
                        .boxed(),
                    );
                }
                None => warn!(label = spec.prefix_label, "vector prefix missing from topology"),
            }
        }

        jobs
    }
}
