//! In-memory backends. Used by the test-suite and by `MOCK_MODE`, where a
//! JSON fixture stands in for the bucket and tables.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::storage_core::{AttrValue, ObjectInfo, ObjectPage, ObjectStore, Record, RecordPage, RecordTable};
use crate::thumbnails::UrlPresigner;

const DEFAULT_PAGE_SIZE: usize = 1000;
const OFFSET_ATTR: &str = "__offset";

#[derive(Debug, Clone)]
struct StoredObject {
    size: u64,
    body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    page_size: usize,
    failing_prefixes: HashSet<String>,
    failing_keys: HashSet<String>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            failing_prefixes: HashSet::new(),
            failing_keys: HashSet::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn insert(&mut self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let body = body.into();
        let size = body.len() as u64;
        self.bucket_mut(bucket).insert(key.to_string(), StoredObject { size, body });
    }

    /// Lists with `size` bytes but has no readable content.
    pub fn insert_sized(&mut self, bucket: &str, key: &str, size: u64) {
        self.bucket_mut(bucket)
            .insert(key.to_string(), StoredObject { size, body: Vec::new() });
    }

    pub fn fail_listing(&mut self, prefix: &str) {
        self.failing_prefixes.insert(prefix.to_string());
    }

    pub fn fail_get(&mut self, key: &str) {
        self.failing_keys.insert(key.to_string());
    }

    fn bucket_mut(&mut self, bucket: &str) -> &mut BTreeMap<String, StoredObject> {
        self.buckets.entry(bucket.to_string()).or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory-objects"
    }

    // token = 직전 페이지의 마지막 키 (exclusive)
    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<String>) -> Result<ObjectPage> {
        if self.failing_prefixes.contains(prefix) {
            bail!("access denied listing s3://{bucket}/{prefix}");
        }
        let Some(objects) = self.buckets.get(bucket) else {
            return Ok(ObjectPage::default());
        };

        let mut matching = objects
            .range::<String, _>(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| token.as_ref().map_or(true, |t| *k > t))
            .map(|(k, o)| ObjectInfo { key: k.clone(), size: o.size });

        let page: Vec<ObjectInfo> = matching.by_ref().take(self.page_size).collect();
        let next_token = match matching.next() {
            Some(_) => page.last().map(|o| o.key.clone()),
            None => None,
        };
        Ok(ObjectPage { objects: page, next_token })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        if self.failing_keys.contains(key) {
            bail!("read timed out for s3://{bucket}/{key}");
        }
        self.buckets
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.body.clone())
            .ok_or_else(|| anyhow!("NoSuchKey: s3://{bucket}/{key}"))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRecordTable {
    tables: HashMap<String, Vec<Record>>,
    page_size: usize,
    failing_tables: HashSet<String>,
}

impl Default for MemoryRecordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordTable {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            failing_tables: HashSet::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn insert(&mut self, table: &str, record: Record) {
        self.tables.entry(table.to_string()).or_default().push(record);
    }

    pub fn fail_table(&mut self, table: &str) {
        self.failing_tables.insert(table.to_string());
    }
}

#[async_trait]
impl RecordTable for MemoryRecordTable {
    fn name(&self) -> &'static str {
        "memory-records"
    }

    async fn query_page(
        &self,
        table: &str,
        key_attr: &str,
        key_value: &str,
        start: Option<Record>,
    ) -> Result<RecordPage> {
        if self.failing_tables.contains(table) {
            bail!("ResourceNotFoundException: table {table}");
        }
        let Some(records) = self.tables.get(table) else {
            bail!("ResourceNotFoundException: table {table}");
        };

        let wanted = AttrValue::S(key_value.to_string());
        let matching: Vec<&Record> = records.iter().filter(|r| r.get(key_attr) == Some(&wanted)).collect();

        let skip = match &start {
            Some(key) => match key.get(OFFSET_ATTR) {
                Some(AttrValue::N(n)) => n.parse::<usize>().context("malformed exclusive start key")?,
                _ => bail!("exclusive start key has no {OFFSET_ATTR}"),
            },
            None => 0,
        };

        let page: Vec<Record> = matching.iter().skip(skip).take(self.page_size).map(|r| (*r).clone()).collect();
        let consumed = skip + page.len();
        // 실제 LastEvaluatedKey 처럼 키 속성만 담음
        let last_key = (consumed < matching.len()).then(|| {
            HashMap::from([
                (key_attr.to_string(), wanted.clone()),
                (OFFSET_ATTR.to_string(), AttrValue::N(consumed.to_string())),
            ])
        });
        Ok(RecordPage { records: page, last_key })
    }
}

/// Presigner that never talks to AWS; URLs are deterministic for a given input.
#[derive(Debug, Clone, Default)]
pub struct StaticPresigner;

#[async_trait]
impl UrlPresigner for StaticPresigner {
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "https://{bucket}.s3.mock.local/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}

#[derive(Debug, Deserialize)]
struct FixtureObject {
    key: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct Fixture {
    #[serde(default)]
    objects: HashMap<String, Vec<FixtureObject>>,
    #[serde(default)]
    tables: HashMap<String, Vec<Record>>,
}

// MOCK_MODE: mocks/storage.json 을 읽어 백엔드 구성
pub async fn load_fixture(path: &Path) -> Result<(MemoryObjectStore, MemoryRecordTable)> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading mock storage fixture {}", path.display()))?;
    parse_fixture(&data)
}

fn parse_fixture(data: &str) -> Result<(MemoryObjectStore, MemoryRecordTable)> {
    let parsed: Fixture = serde_json::from_str(data).context("parsing mock storage fixture")?;

    let mut objects = MemoryObjectStore::new();
    for (bucket, items) in parsed.objects {
        for item in items {
            match (item.body, item.size) {
                (Some(body), _) => objects.insert(&bucket, &item.key, body),
                (None, Some(size)) => objects.insert_sized(&bucket, &item.key, size),
                (None, None) => objects.insert_sized(&bucket, &item.key, 0),
            }
        }
    }

    let mut tables = MemoryRecordTable::new();
    for (table, records) in parsed.tables {
        for record in records {
            tables.insert(&table, record);
        }
    }
    Ok((objects, tables))
}
