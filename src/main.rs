//! Tuplaus API Server Binary

use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tuplaus::{
    api::{AppState, ApiServer},
    games::{OsCardSource, SettlementEngine},
    ledger::{LedgerRepository, MemoryLedger, RocksLedger},
    metrics::SettlementMetrics,
    storage::LedgerStorage,
    TuplausConfig,
};

#[derive(Parser, Debug)]
#[command(name = "tuplaus")]
#[command(about = "Tuplaus double-or-nothing settlement service", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start from the development preset (in-memory ledger, debug routes)
    #[arg(long)]
    dev: bool,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Ledger database directory
    #[arg(long)]
    db_path: Option<String>,

    /// Keep the ledger in memory
    #[arg(long)]
    in_memory: bool,

    /// Expose the debug admin routes
    #[arg(long)]
    debug_routes: bool,
}

impl Args {
    fn apply(&self, config: &mut TuplausConfig) {
        if let Some(host) = &self.host {
            config.api.host = host.clone();
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }
        if let Some(db_path) = &self.db_path {
            config.storage.data_directory = db_path.clone();
        }
        if self.in_memory {
            config.storage.in_memory = true;
        }
        if self.debug_routes {
            config.api.enable_debug_routes = true;
        }
    }
}

fn open_ledger(config: &TuplausConfig) -> Result<Arc<dyn LedgerRepository>, Box<dyn std::error::Error>> {
    if config.storage.in_memory {
        info!("Using in-memory ledger");
        return Ok(Arc::new(MemoryLedger::new()));
    }

    info!("Opening ledger database: {}", config.storage.data_directory);
    let storage = LedgerStorage::new_with_config(&config.storage)?;
    let ledger = RocksLedger::open(storage)?;
    info!("Ledger opened successfully");
    Ok(Arc::new(ledger))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = if args.dev && args.config.is_none() {
        TuplausConfig::development()
    } else {
        TuplausConfig::load(args.config.as_deref())?
    };
    args.apply(&mut config);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.monitoring.log_filter.clone().into()),
        )
        .init();

    info!("Starting Tuplaus settlement service v{}", env!("CARGO_PKG_VERSION"));

    let ledger = open_ledger(&config)?;
    let metrics = if config.monitoring.enable_metrics {
        Some(SettlementMetrics::new()?)
    } else {
        None
    };

    let mut engine = SettlementEngine::new(ledger.clone(), Arc::new(OsCardSource), config.game.clone());
    if let Some(metrics) = &metrics {
        engine = engine.with_metrics(metrics.clone());
    }

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
        ledger,
        metrics,
    });

    ApiServer::new(config.api, state).run().await?;
    Ok(())
}
