use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::storage_core::ObjectStore;
use crate::types::{Outcome, SizeInfo};

/// Sums declared object sizes under `prefix`. Listing failures are logged and
/// come back as `Outcome::Failed`; object content is never read.
pub async fn scan_prefix(store: &dyn ObjectStore, bucket: &str, prefix: &str) -> Outcome<SizeInfo> {
    match drain_prefix(store, bucket, prefix).await {
        Ok(info) => Outcome::Measured(info),
        Err(e) => {
            warn!(backend = store.name(), bucket, prefix, error = ?e, "prefix scan failed");
            Outcome::failed(e)
        }
    }
}

async fn drain_prefix(store: &dyn ObjectStore, bucket: &str, prefix: &str) -> Result<SizeInfo> {
    let mut info = SizeInfo::default();
    let mut next: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list_page(bucket, prefix, next.take())
            .await
            .with_context(|| format!("listing s3://{bucket}/{prefix}"))?;
        pages += 1;

        for obj in &page.objects {
            info.add(obj.size);
        }

        next = page.next_token;
        if next.is_none() {
            break;
        }
    }

    debug!(bucket, prefix, pages, files = info.file_count, bytes = info.size, "prefix drained");
    Ok(info)
}
