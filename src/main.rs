use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use reviewboard::api;
use reviewboard::config::Config;
use reviewboard::db::ReviewStore;
use reviewboard::persist::{Persister, SnapshotFiles};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const WRITER_DRAIN: Duration = Duration::from_secs(5);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    // Load persisted state; corrupt or missing files start empty
    let files = SnapshotFiles::new(config.reviews_path(), config.ledger_path());
    let snapshot = files.load().await;
    let (persister, writer) = Persister::spawn(files);
    let store = Arc::new(ReviewStore::new(snapshot, config.limits, persister));

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Server started at http://localhost:{}", config.port);

    let static_dir = config.static_dir.clone();
    let index_path = config.index_path();
    let server_store = store.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            // Share the store with every worker
            .app_data(web::Data::new(server_store.clone()))
            .configure(api::configure(static_dir.clone(), index_path.clone()))
    })
    .bind(&addr)?
    .run()
    .await?;
    drop(store);

    // Workers are gone and their store handles with them; let queued snapshots land
    match tokio::time::timeout(WRITER_DRAIN, writer).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!("Snapshot writer ended abnormally: {}", err),
        Err(_) => warn!("Snapshot writer still busy after {:?}, exiting", WRITER_DRAIN),
    }
    info!("Server shut down");
    Ok(())
}
