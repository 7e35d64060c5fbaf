use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shuttle_eta::config::Config;
use shuttle_eta::notify::BroadcastNotifier;
use shuttle_eta::service::TrackingService;
use shuttle_eta::store::MemoryStore;
use shuttle_eta::worker::EtaWorker;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = match &config.snapshot {
        Some(path) => match MemoryStore::load(path, &config.store).await {
            Ok(store) => {
                info!(path = %path.display(), "Loaded fleet snapshot");
                store
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load fleet snapshot");
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("SHUTTLE_SNAPSHOT not set, starting with an empty fleet");
            MemoryStore::new(&config.store)
        }
    };

    let notifier = BroadcastNotifier::default();
    let service = Arc::new(TrackingService::new(store, notifier, &config));
    let worker = EtaWorker::new(service, config.worker.clone());

    worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        })
        .await;

    ExitCode::SUCCESS
}
