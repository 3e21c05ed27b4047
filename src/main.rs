use order_service::config::{ConfigLoader, IngestSource};
use order_service::http::HttpBinding;
use order_service::ingest::{LineSource, MessageSource};
use order_service::lifecycle::{setup_tracing, OrderSystem};
use order_service::store::{DurableStore, FileStore, MemoryStore};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    setup_tracing();

    let config = ConfigLoader::new().load()?;
    info!(?config, "Starting order service");

    let store: Arc<dyn DurableStore> = match &config.store.dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => {
            info!("No store directory configured, orders are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let source: Box<dyn MessageSource> = match config.ingest.source() {
        IngestSource::Stdin => Box::new(LineSource::stdin()),
        IngestSource::File(path) => Box::new(LineSource::open(&path).await?),
    };

    let binding = HttpBinding::Addr(config.http.addr.clone());
    let (system, _service) = OrderSystem::start(&config, store, source, binding).await;
    let report = system.run().await;

    match report.first_error {
        Some(failure) => {
            error!(%failure, "Exiting with failure");
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}
