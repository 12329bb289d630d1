use anyhow::{Context, Result};
use clap::Parser;
use fishhunt_execution::{Clock, EconomyConfig, Engine, SystemClock};
use fishhunt_server::{Api, Fixtures, RedisCache, SqliteLedger};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite ledger (created when missing).
    #[arg(long, default_value = "fishhunt.db")]
    ledger_path: PathBuf,

    #[arg(long, default_value = "redis://127.0.0.1/")]
    redis_url: String,

    /// Prepended to every cache key.
    #[arg(long, default_value = "fishhunt:")]
    redis_prefix: String,

    /// YAML economy config. Omitted fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// YAML buoys, rods and players registered at startup when absent.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EconomyConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EconomyConfig::default(),
    };
    config.validate().context("invalid economy config")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = load_config(args.config.as_deref())?;
    let clock = Arc::new(SystemClock);

    let mut ledger = SqliteLedger::open(&args.ledger_path)
        .with_context(|| format!("failed to open ledger {}", args.ledger_path.display()))?;
    if let Some(path) = &args.fixtures {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures {}", path.display()))?;
        let written = ledger
            .register(Fixtures::from_yaml(&raw)?, clock.now_ms())
            .await?;
        info!(written, "fixtures registered");
    }

    let cache = RedisCache::new(&args.redis_url, args.redis_prefix.clone())
        .context("invalid redis url")?;
    let engine = Arc::new(Engine::new(ledger, cache, clock, config));
    let app = Api::new(engine).router();

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
