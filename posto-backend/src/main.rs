use posto_backend::cli::{self, Cli};
use posto_backend::config::PostoConfig;
use posto_backend::logging;
use posto_backend::store::{BoxKeyValueStore, FileStore};
use posto_backend::{FuelService, StationRegistry};

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

fn main() -> Result<()> {
    let args = Cli::parse();
    cli::validate(&args.command)?;

    // Load configuration
    let config = PostoConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config {:?}", args.config))?;

    // Initialize logging
    let _logging_guard = logging::init_logging(&config.log_dir, "posto", &config.log_level)?;

    tracing::debug!("Using data directory {:?}, namespace {}", config.data_dir, config.namespace);

    let store: BoxKeyValueStore = Arc::new(
        FileStore::open(&config.data_dir, &config.namespace)
            .context("Failed to open station store")?,
    );
    let registry = Arc::new(StationRegistry::new(store));
    let service = FuelService::new(registry);

    let stdout = std::io::stdout();
    cli::run(&service, args.command, &mut stdout.lock())
}
