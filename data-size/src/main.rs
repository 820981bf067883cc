use anyhow::Context;
use data_size::backends::build_backends;
use data_size::config::env_or;
use data_size::out::{self, OutMode};
use data_size::thumbnails::refresh_thumbnail_urls;
use data_size::{get_data_size, Aggregator, DataSizeRequest, Settings};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

const THUMBNAILS_FLAG: &str = "--thumbnails";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // 사용법: data-size [--thumbnails] ['<event json>']   (인자 없으면 stdin)
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let thumbnails = match args.iter().position(|a| a == THUMBNAILS_FLAG) {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    };
    let event = read_event(args.first().map(String::as_str)).await?;

    let settings = Settings::from_env();
    let mode = OutMode::parse(&env_or("OUT_FORMAT", "pretty"));
    let backends = build_backends(&settings).await?;

    let response = if thumbnails {
        refresh_thumbnail_urls(backends.presigner.as_ref(), &event, settings.presign_expiry).await
    } else {
        let aggregator = Aggregator::new(backends.objects, backends.tables, settings);
        get_data_size(&aggregator, DataSizeRequest::from_event(&event)).await
    };

    out::emit_stdout(&response, mode)
}

async fn read_event(arg: Option<&str>) -> anyhow::Result<Value> {
    let raw = match arg {
        Some(s) => s.to_string(),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&raw).context("event is not valid JSON")
}
