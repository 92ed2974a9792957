use anyhow::{bail, Context, Result};
use estatjp::{export, Config, EstatClient, Query};
use std::{env, path::PathBuf};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,estatjp=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) arguments & config ───────────────────────────────────────
    let mut args = env::args().skip(1);
    let Some(stats_data_id) = args.next() else {
        bail!("usage: estatjp <statsDataId> [output.parquet]");
    };
    let out_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.parquet", stats_data_id)));

    let config = match env::var("ESTATJP_CONFIG") {
        Ok(path) => Config::from_yaml_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::default(),
    };
    info!(cache = %config.cache_dir.display(), "config loaded");

    // ─── 3) fetch & reshape ──────────────────────────────────────────
    let client = EstatClient::new(&config).context("creating e-Stat client")?;
    let query = Query::new(&stats_data_id).api_version(&config.api_version);
    let start = Instant::now();
    let table = client
        .fetch_table(&query, &config.options)
        .await
        .with_context(|| format!("fetching table {}", stats_data_id))?;
    info!(
        columns = table.schema().len(),
        elapsed = ?start.elapsed(),
        "table ready"
    );

    // ─── 4) export ───────────────────────────────────────────────────
    let rows = export::write_parquet(&table, &out_path)?;
    info!(rows, path = %out_path.display(), "all done");
    Ok(())
}
