use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::storage_core::{AttrValue, Record, RecordTable};
use crate::types::{Outcome, TableSizeInfo};

// list / map: 3 bytes + 1 byte per element
const CONTAINER_OVERHEAD: u64 = 3;
const ELEMENT_OVERHEAD: u64 = 1;

/// Queries every record in `table` whose `key_attr` equals `task_id` and
/// estimates their serialized size. Counts are exact; bytes are an estimate.
pub async fn scan_table(
    tables: &dyn RecordTable,
    table: &str,
    key_attr: &str,
    task_id: &str,
) -> Outcome<TableSizeInfo> {
    match drain_partition(tables, table, key_attr, task_id).await {
        Ok(info) => Outcome::Measured(info),
        Err(e) => {
            warn!(backend = tables.name(), table, task_id, error = ?e, "table scan failed");
            Outcome::failed(e)
        }
    }
}

async fn drain_partition(
    tables: &dyn RecordTable,
    table: &str,
    key_attr: &str,
    task_id: &str,
) -> Result<TableSizeInfo> {
    let mut info = TableSizeInfo::default();
    let mut start: Option<Record> = None;
    let mut pages = 0usize;

    loop {
        let page = tables
            .query_page(table, key_attr, task_id, start.take())
            .await
            .with_context(|| format!("querying {table} where {key_attr} = {task_id}"))?;
        pages += 1;

        for record in &page.records {
            info.add(estimate_record_size(record));
        }

        start = page.last_key;
        if start.is_none() {
            break;
        }
    }

    debug!(table, task_id, pages, records = info.record_count, bytes = info.estimated_size, "partition drained");
    Ok(info)
}

/// Approximate stored size of one record: attribute name bytes plus value bytes.
pub fn estimate_record_size(record: &Record) -> u64 {
    record
        .iter()
        .map(|(name, value)| name.len() as u64 + value_size(value))
        .sum()
}

fn value_size(value: &AttrValue) -> u64 {
    match value {
        AttrValue::S(s) => s.len() as u64,
        AttrValue::N(n) => number_size(n),
        AttrValue::B(b) => b.len() as u64,
        AttrValue::Bool(_) | AttrValue::Null(_) => 1,
        AttrValue::L(items) => {
            CONTAINER_OVERHEAD
                + items
                    .iter()
                    .map(|v| value_size(v) + ELEMENT_OVERHEAD)
                    .sum::<u64>()
        }
        AttrValue::M(fields) => {
            CONTAINER_OVERHEAD
                + fields
                    .iter()
                    .map(|(k, v)| k.len() as u64 + value_size(v) + ELEMENT_OVERHEAD)
                    .sum::<u64>()
        }
        AttrValue::Ss(items) => items.iter().map(|s| s.len() as u64).sum(),
        AttrValue::Ns(items) => items.iter().map(|n| number_size(n)).sum(),
        AttrValue::Bs(items) => items.iter().map(|b| b.len() as u64).sum(),
    }
}

// 1 byte per two significant digits, plus 1
fn number_size(raw: &str) -> u64 {
    let unsigned = raw.trim().trim_start_matches(['+', '-']);
    let mantissa = unsigned.split(['e', 'E']).next().unwrap_or_default();
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let significant = digits.trim_start_matches('0').trim_end_matches('0').len().max(1) as u64;
    significant.div_ceil(2) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryRecordTable;
    use std::collections::HashMap;

    fn frame(task: &str, idx: u32, summary: &str) -> Record {
        HashMap::from([
            ("task_id".to_string(), AttrValue::S(task.to_string())),
            ("frame_index".to_string(), AttrValue::N(idx.to_string())),
            ("summary".to_string(), AttrValue::S(summary.to_string())),
        ])
    }

    #[test]
    fn number_sizes_follow_significant_digits() {
        assert_eq!(number_size("0"), 2);
        assert_eq!(number_size("7"), 2);
        assert_eq!(number_size("12"), 2);
        assert_eq!(number_size("123"), 3);
        assert_eq!(number_size("-1500"), 2);
        assert_eq!(number_size("0.00125"), 3);
        assert_eq!(number_size("1.5E+10"), 2);
    }

    #[test]
    fn record_size_counts_names_and_values() {
        let record = HashMap::from([
            ("id".to_string(), AttrValue::S("abc".into())),   // 2 + 3
            ("ok".to_string(), AttrValue::Bool(true)),         // 2 + 1
            ("blob".to_string(), AttrValue::B(vec![0; 10])),   // 4 + 10
        ]);
        assert_eq!(estimate_record_size(&record), 22);
    }

    #[test]
    fn nested_containers_carry_overhead() {
        let inner = HashMap::from([("k".to_string(), AttrValue::S("vv".into()))]);
        let record = HashMap::from([
            ("m".to_string(), AttrValue::M(inner)),                                   // 1 + 3 + (1 + 2 + 1)
            ("l".to_string(), AttrValue::L(vec![AttrValue::Null(true), AttrValue::S("x".into())])), // 1 + 3 + (1+1) + (1+1)
            ("ss".to_string(), AttrValue::Ss(vec!["ab".into(), "c".into()])),         // 2 + 3
        ]);
        assert_eq!(estimate_record_size(&record), 8 + 8 + 5);
    }

    #[tokio::test]
    async fn no_matching_records_is_zero() {
        let mut t = MemoryRecordTable::new();
        t.insert("frames", frame("other", 1, "x"));
        let out = scan_table(&t, "frames", "task_id", "mine").await;
        assert_eq!(out, Outcome::Measured(TableSizeInfo::default()));
    }

    #[tokio::test]
    async fn record_count_is_exact_across_pages() {
        let mut t = MemoryRecordTable::new().with_page_size(3);
        for i in 0..7 {
            t.insert("frames", frame("mine", i, "short"));
        }
        t.insert("frames", frame("mine", 99, "a much longer summary of the frame"));
        t.insert("frames", frame("other", 1, "ignored"));

        let info = scan_table(&t, "frames", "task_id", "mine").await.into_value();
        assert_eq!(info.record_count, 8);

        let big = estimate_record_size(&frame("mine", 99, "a much longer summary of the frame"));
        assert_eq!(info.max_record_size, big);
        let small = estimate_record_size(&frame("mine", 1, "short"));
        assert_eq!(info.estimated_size, small * 7 + big);
    }

    #[tokio::test]
    async fn query_failure_is_absorbed() {
        let mut t = MemoryRecordTable::new();
        t.insert("frames", frame("mine", 1, "x"));
        t.fail_table("frames");

        let out = scan_table(&t, "frames", "task_id", "mine").await;
        assert!(out.is_failed());
        assert_eq!(out.into_value(), TableSizeInfo::default());
    }
}
