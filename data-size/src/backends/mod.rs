mod dynamodb;
mod s3;

use anyhow::Result;
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::mock;
use crate::storage_core::{ObjectStore, RecordTable};
use crate::thumbnails::UrlPresigner;

pub use dynamodb::DynamoTables;
pub use s3::S3Store;

pub struct Backends {
    pub objects: Arc<dyn ObjectStore>,
    pub tables: Arc<dyn RecordTable>,
    pub presigner: Arc<dyn UrlPresigner>,
}

/// AWS clients for the configured region, or the JSON fixture in mock mode.
pub async fn build_backends(settings: &Settings) -> Result<Backends> {
    if let Some(path) = &settings.mock_storage {
        info!(fixture = %path.display(), "MOCK_MODE: serving storage from fixture");
        let (objects, tables) = mock::load_fixture(path).await?;
        return Ok(Backends {
            objects: Arc::new(objects),
            tables: Arc::new(tables),
            presigner: Arc::new(mock::StaticPresigner),
        });
    }

    let conf = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .load()
        .await;

    let s3 = Arc::new(S3Store::new(&conf));
    Ok(Backends {
        objects: s3.clone(),
        tables: Arc::new(DynamoTables::new(&conf)),
        presigner: s3,
    })
}
