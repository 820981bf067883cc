use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use async_trait::async_trait;
use anyhow::Result;

/// One listed object: key plus the size the store declares for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// A single page of a prefix listing. `next_token` is `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectInfo>,
    pub next_token: Option<String>,
}

// DynamoDB-style attribute values, so fixtures can be written in the same JSON shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    S(String),
    N(String),
    B(Vec<u8>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    L(Vec<AttrValue>),
    M(HashMap<String, AttrValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<Vec<u8>>),
}

pub type Record = HashMap<String, AttrValue>;

/// A single page of a partition query. `last_key` feeds the next request's start key.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub last_key: Option<Record>,
}

// 오브젝트 스토어 인터페이스 (S3 / in-memory)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ObjectPage>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

// 레코드 테이블 인터페이스 (DynamoDB / in-memory)
#[async_trait]
pub trait RecordTable: Send + Sync {
    fn name(&self) -> &'static str;

    async fn query_page(
        &self,
        table: &str,
        key_attr: &str,
        key_value: &str,
        start: Option<Record>,
    ) -> Result<RecordPage>;
}
