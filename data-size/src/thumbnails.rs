//! Thumbnail URL refresh: re-issues time-limited GET URLs for stored thumbnails.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::handler::Response;

#[async_trait]
pub trait UrlPresigner: Send + Sync {
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String>;
}

#[derive(Debug, Default, Deserialize)]
struct RefreshRequest {
    #[serde(rename = "Thumbnails", default)]
    thumbnails: Vec<ThumbnailRef>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailRef {
    #[serde(rename = "S3Bucket", default)]
    bucket: Option<String>,
    #[serde(rename = "S3Key", default)]
    key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailUrl {
    #[serde(rename = "S3Bucket")]
    pub bucket: String,
    #[serde(rename = "S3Key")]
    pub key: String,
    #[serde(rename = "ThumbnailUrl", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accepts either the raw event or an API-gateway style event whose `body`
/// is a JSON string. The response body is the result array, serialized.
pub async fn refresh_thumbnail_urls(presigner: &dyn UrlPresigner, event: &Value, expiry: Duration) -> Response {
    let request = match parse_request(event) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "rejecting thumbnail refresh request");
            return Response::bad_request(format!("Invalid request body: {e}"));
        }
    };

    let mut out = Vec::with_capacity(request.thumbnails.len());
    for thumb in request.thumbnails {
        // 버킷/키 둘 다 있어야 처리
        let (Some(bucket), Some(key)) = (thumb.bucket, thumb.key) else { continue; };
        if bucket.is_empty() || key.is_empty() {
            continue;
        }
        let entry = match presigner.presign_get(&bucket, &key, expiry).await {
            Ok(url) => ThumbnailUrl { bucket, key, url: Some(url), error: None },
            Err(e) => {
                warn!(%bucket, %key, error = ?e, "presign failed");
                ThumbnailUrl { bucket, key, url: None, error: Some(e.to_string()) }
            }
        };
        out.push(entry);
    }

    info!(count = out.len(), "thumbnail urls refreshed");
    match serde_json::to_string(&out) {
        Ok(body) => Response::ok(Value::String(body)),
        Err(e) => Response::internal(e.to_string()),
    }
}

fn parse_request(event: &Value) -> serde_json::Result<RefreshRequest> {
    match event.get("body") {
        Some(Value::String(raw)) => serde_json::from_str(raw),
        _ => RefreshRequest::deserialize(event),
    }
}
