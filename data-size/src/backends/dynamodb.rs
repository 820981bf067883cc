use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::storage_core::{AttrValue, Record, RecordPage, RecordTable};

pub struct DynamoTables {
    client: ddb::Client,
}

impl DynamoTables {
    pub fn new(conf: &aws_config::SdkConfig) -> Self {
        Self { client: ddb::Client::new(conf) }
    }
}

#[async_trait]
impl RecordTable for DynamoTables {
    fn name(&self) -> &'static str { "dynamodb" }

    // scan 이 아니라 partition key 로 query
    async fn query_page(
        &self,
        table: &str,
        key_attr: &str,
        key_value: &str,
        start: Option<Record>,
    ) -> Result<RecordPage> {
        let resp = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", key_attr)
            .expression_attribute_values(":pk", AttributeValue::S(key_value.to_string()))
            .set_exclusive_start_key(start.map(|r| to_sdk_record(&r)))
            .send()
            .await?;

        let records = resp.items().iter().map(from_sdk_record).collect();
        let last_key = resp
            .last_evaluated_key()
            .filter(|k| !k.is_empty())
            .map(from_sdk_record);
        Ok(RecordPage { records, last_key })
    }
}

fn from_sdk_record(item: &HashMap<String, AttributeValue>) -> Record {
    item.iter().map(|(k, v)| (k.clone(), from_sdk_value(v))).collect()
}

fn from_sdk_value(v: &AttributeValue) -> AttrValue {
    match v {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::B(b) => AttrValue::B(b.as_ref().to_vec()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::Null(b) => AttrValue::Null(*b),
        AttributeValue::L(items) => AttrValue::L(items.iter().map(from_sdk_value).collect()),
        AttributeValue::M(fields) => AttrValue::M(from_sdk_record(fields)),
        AttributeValue::Ss(items) => AttrValue::Ss(items.clone()),
        AttributeValue::Ns(items) => AttrValue::Ns(items.clone()),
        AttributeValue::Bs(items) => AttrValue::Bs(items.iter().map(|b| b.as_ref().to_vec()).collect()),
        // SDK 신규 타입: 크기 1 로 취급
        _ => AttrValue::Null(true),
    }
}

fn to_sdk_record(record: &Record) -> HashMap<String, AttributeValue> {
    record.iter().map(|(k, v)| (k.clone(), to_sdk_value(v))).collect()
}

fn to_sdk_value(v: &AttrValue) -> AttributeValue {
    match v {
        AttrValue::S(s) => AttributeValue::S(s.clone()),
        AttrValue::N(n) => AttributeValue::N(n.clone()),
        AttrValue::B(b) => AttributeValue::B(Blob::new(b.clone())),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Null(b) => AttributeValue::Null(*b),
        AttrValue::L(items) => AttributeValue::L(items.iter().map(to_sdk_value).collect()),
        AttrValue::M(fields) => AttributeValue::M(to_sdk_record(fields)),
        AttrValue::Ss(items) => AttributeValue::Ss(items.clone()),
        AttrValue::Ns(items) => AttributeValue::Ns(items.clone()),
        AttrValue::Bs(items) => AttributeValue::Bs(items.iter().map(|b| Blob::new(b.clone())).collect()),
    }
}
