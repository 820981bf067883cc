use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;

use crate::storage_core::{ObjectInfo, ObjectPage, ObjectStore};
use crate::thumbnails::UrlPresigner;

pub struct S3Store {
    client: s3::Client,
}

impl S3Store {
    pub fn new(conf: &aws_config::SdkConfig) -> Self {
        Self { client: s3::Client::new(conf) }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str { "s3" }

    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<String>) -> Result<ObjectPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(token)
            .send()
            .await?;

        // 키 없는 항목은 건너뜀
        let objects = resp
            .contents()
            .iter()
            .filter_map(|o| {
                let key = o.key()?;
                Some(ObjectInfo {
                    key: key.to_string(),
                    size: o.size().unwrap_or_default().max(0) as u64,
                })
            })
            .collect();

        let next_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(|s| s.to_string())
        } else {
            None
        };
        Ok(ObjectPage { objects, next_token })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let resp = self.client.get_object().bucket(bucket).key(key).send().await?;
        let data = resp.body.collect().await?;
        Ok(data.into_bytes().to_vec())
    }
}

#[async_trait]
impl UrlPresigner for S3Store {
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .response_cache_control("no-cache")
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;
        Ok(presigned.uri().to_string())
    }
}
