//! Vector storage estimate.
//!
//! The vector index has no size API, so the estimate is derived from the raw
//! embedding artifacts the producers leave in the bucket. Each producer
//! format has its own counting rule; rules are tried in order and the first
//! match wins. Keys matching no rule are ignored.
//!
//! | rule | key | counted as |
//! |---|---|---|
//! | JSON Lines | `*.jsonl` | non-blank lines |
//! | combined output | `*output.json` | entries of the top-level `data` array |
//! | per-item JSON | `*.json` under a per-item vector prefix | 1 each, not fetched |
//!
//! A new producer format gets its own rule here rather than a looser suffix match.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::storage_core::ObjectStore;
use crate::types::{Outcome, VectorEstimate};

pub const COMBINED_OUTPUT_SUFFIX: &str = "output.json";
pub const COMBINED_OUTPUT_FIELD: &str = "data";

const FLOAT32_BYTES: u64 = 4;
const METADATA_OVERHEAD_BYTES: u64 = 100;

pub fn size_per_vector(dimension: u32) -> u64 {
    u64::from(dimension) * FLOAT32_BYTES + METADATA_OVERHEAD_BYTES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    JsonLines,
    CombinedOutput,
    PerItemJson,
}

struct VectorRule {
    format: VectorFormat,
    matches: fn(key: &str, per_item_prefix: bool) -> bool,
}

const RULES: &[VectorRule] = &[
    VectorRule {
        format: VectorFormat::JsonLines,
        matches: |key, _| key.ends_with(".jsonl"),
    },
    VectorRule {
        format: VectorFormat::CombinedOutput,
        matches: |key, _| key.ends_with(COMBINED_OUTPUT_SUFFIX),
    },
    // every .json here counts, embedding or not
    VectorRule {
        format: VectorFormat::PerItemJson,
        matches: |key, per_item_prefix| per_item_prefix && key.ends_with(".json"),
    },
];

pub fn classify(key: &str, per_item_prefix: bool) -> Option<VectorFormat> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(key, per_item_prefix))
        .map(|rule| rule.format)
}

impl VectorFormat {
    fn needs_body(self) -> bool {
        !matches!(self, VectorFormat::PerItemJson)
    }

    pub fn count(self, body: &[u8]) -> Result<u64> {
        match self {
            VectorFormat::JsonLines => count_jsonl_vectors(body),
            VectorFormat::CombinedOutput => count_combined_vectors(body),
            VectorFormat::PerItemJson => Ok(1),
        }
    }
}

pub fn count_jsonl_vectors(body: &[u8]) -> Result<u64> {
    let text = std::str::from_utf8(body).context("embedding file is not UTF-8")?;
    Ok(text.lines().filter(|l| !l.trim().is_empty()).count() as u64)
}

pub fn count_combined_vectors(body: &[u8]) -> Result<u64> {
    let parsed: Value = serde_json::from_slice(body).context("combined output is not valid JSON")?;
    let Value::Object(fields) = parsed else {
        bail!("combined output is not a JSON object");
    };
    Ok(fields
        .get(COMBINED_OUTPUT_FIELD)
        .and_then(Value::as_array)
        .map_or(0, |entries| entries.len() as u64))
}

/// Counts vectors under `prefix` and converts them to bytes. Any listing or
/// parsing failure fails the whole estimate, so a partial count is never
/// reported.
pub async fn estimate_vectors(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    per_item_prefix: bool,
    dimension: u32,
) -> Outcome<VectorEstimate> {
    match count_vectors(store, bucket, prefix, per_item_prefix).await {
        Ok(vector_count) => {
            let per_vector = size_per_vector(dimension);
            Outcome::Measured(VectorEstimate {
                vector_count,
                estimated_size: vector_count * per_vector,
                size_per_vector: per_vector,
            })
        }
        Err(e) => {
            warn!(backend = store.name(), bucket, prefix, error = ?e, "vector estimate failed");
            Outcome::failed(e)
        }
    }
}

async fn count_vectors(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    per_item_prefix: bool,
) -> Result<u64> {
    let mut total = 0u64;
    let mut next: Option<String> = None;

    loop {
        let page = store
            .list_page(bucket, prefix, next.take())
            .await
            .with_context(|| format!("listing s3://{bucket}/{prefix}"))?;

        for obj in &page.objects {
            let Some(format) = classify(&obj.key, per_item_prefix) else {
                continue;
            };
            let n = if format.needs_body() {
                let body = store
                    .get_object(bucket, &obj.key)
                    .await
                    .with_context(|| format!("fetching s3://{bucket}/{}", obj.key))?;
                format
                    .count(&body)
                    .with_context(|| format!("counting vectors in {}", obj.key))?
            } else {
                format.count(&[])?
            };
            debug!(key = %obj.key, ?format, vectors = n, "counted");
            total += n;
        }

        next = page.next_token;
        if next.is_none() {
            break;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryObjectStore;
    use rstest::rstest;

    const DIM: u32 = 1024;

    #[rstest]
    #[case("tasks/t/nova-mme/embedding-0.jsonl", false, Some(VectorFormat::JsonLines))]
    #[case("tasks/t/shot_vector/embedding-0.jsonl", true, Some(VectorFormat::JsonLines))]
    #[case("tasks/t/tlabs/output.json", false, Some(VectorFormat::CombinedOutput))]
    #[case("tasks/t/shot_vector/output.json", true, Some(VectorFormat::CombinedOutput))]
    #[case("tasks/t/shot_vector/shot_0001.json", true, Some(VectorFormat::PerItemJson))]
    #[case("tasks/t/nova-mme/manifest.json", false, None)]
    #[case("tasks/t/shot_vector/clip.mp4", true, None)]
    fn classification(#[case] key: &str, #[case] per_item: bool, #[case] expected: Option<VectorFormat>) {
        assert_eq!(classify(key, per_item), expected);
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let body = b"{\"e\":[1]}\n{\"e\":[2]}\n\n{\"e\":[3]}\n{\"e\":[4]}\n{\"e\":[5]}\n";
        assert_eq!(count_jsonl_vectors(body).unwrap(), 5);
        assert_eq!(count_jsonl_vectors(b"{}\r\n   \r\n{}").unwrap(), 2);
        assert_eq!(count_jsonl_vectors(b"").unwrap(), 0);
    }

    #[test]
    fn combined_output_counts_data_entries() {
        assert_eq!(count_combined_vectors(br#"{"data":[{"e":[1]},{"e":[2]},{"e":[3]}]}"#).unwrap(), 3);
        assert_eq!(count_combined_vectors(br#"{"status":"ready"}"#).unwrap(), 0);
        assert_eq!(count_combined_vectors(br#"{"data":"oops"}"#).unwrap(), 0);
        assert!(count_combined_vectors(b"[1,2]").is_err());
        assert!(count_combined_vectors(b"not json").is_err());
    }

    #[test]
    fn size_per_vector_is_float32_plus_overhead() {
        assert_eq!(size_per_vector(1024), 4196);
        assert_eq!(size_per_vector(3), 112);
    }

    #[tokio::test]
    async fn jsonl_file_yields_line_count() {
        let mut store = MemoryObjectStore::new();
        store.insert("b", "tasks/t/nova-mme/embedding-a.jsonl", "{}\n{}\n{}\n\n{}\n{}\n");
        store.insert("b", "tasks/t/nova-mme/manifest.json", "{\"x\":1}");

        let est = estimate_vectors(&store, "b", "tasks/t/nova-mme/", false, DIM).await.into_value();
        assert_eq!(est.vector_count, 5);
        assert_eq!(est.size_per_vector, 4196);
        assert_eq!(est.estimated_size, 5 * 4196);
    }

    #[tokio::test]
    async fn combined_output_yields_array_length() {
        let mut store = MemoryObjectStore::new();
        let entries: Vec<String> = (0..7).map(|i| format!("{{\"start\":{i}}}")).collect();
        store.insert("b", "tasks/t/tlabs/output.json", format!("{{\"data\":[{}]}}", entries.join(",")));

        let est = estimate_vectors(&store, "b", "tasks/t/tlabs/", false, DIM).await.into_value();
        assert_eq!(est.vector_count, 7);
        assert_eq!(est.estimated_size, 7 * size_per_vector(DIM));
    }

    #[tokio::test]
    async fn per_item_json_counts_files_without_reading_them() {
        let mut store = MemoryObjectStore::new().with_page_size(2);
        for i in 0..5 {
            let key = format!("tasks/t/shot_vector/shot_{i:04}.json");
            store.insert_sized("b", &key, 8_000);
            store.fail_get(&key);
        }
        store.insert_sized("b", "tasks/t/shot_vector/preview.png", 100);

        let est = estimate_vectors(&store, "b", "tasks/t/shot_vector/", true, DIM).await.into_value();
        assert_eq!(est.vector_count, 5);
        assert_eq!(est.estimated_size, 5 * size_per_vector(DIM));
    }

    #[tokio::test]
    async fn unreadable_embedding_fails_whole_estimate() {
        let mut store = MemoryObjectStore::new();
        store.insert("b", "tasks/t/nova-mme/a.jsonl", "{}\n{}\n");
        store.insert("b", "tasks/t/nova-mme/b.jsonl", "{}\n");
        store.fail_get("tasks/t/nova-mme/b.jsonl");

        let out = estimate_vectors(&store, "b", "tasks/t/nova-mme/", false, DIM).await;
        assert!(out.is_failed());
        assert_eq!(out.into_value(), VectorEstimate::default());
    }

    #[tokio::test]
    async fn nothing_recognised_is_zero_vectors() {
        let mut store = MemoryObjectStore::new();
        store.insert_sized("b", "tasks/t/tlabs/video.mp4", 1_000);

        let est = estimate_vectors(&store, "b", "tasks/t/tlabs/", false, DIM).await.into_value();
        assert_eq!(est.vector_count, 0);
        assert_eq!(est.estimated_size, 0);
    }
}
