use crate::cli::ServeArgs;
use crate::infra::{AppState, StoreHandle};
use crate::routes::with_directory_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hospital_directory::config::AppConfig;
use hospital_directory::directory::{DirectoryService, DirectoryStore};
use hospital_directory::error::AppError;
use hospital_directory::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = StoreHandle::open(&config.store)?;
    let result = match &store {
        StoreHandle::Sqlite(store) => serve(&config, store.clone()).await,
        StoreHandle::Memory(store) => serve(&config, store.clone()).await,
    };
    store.close()?;
    result
}

async fn serve<S>(config: &AppConfig, store: Arc<S>) -> Result<(), AppError>
where
    S: DirectoryStore + 'static,
{
    let service = Arc::new(DirectoryService::new(store, config.directory.policy()));
    let policy = service.policy();
    if config.directory.seed_sample_data {
        service.seed_sample_hospitals()?;
    }

    let admin_key = config.directory.admin_api_key.clone();
    if admin_key.is_none() {
        warn!("ADMIN_API_KEY is not set; /admin routes are open to anyone");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_directory_routes(service, admin_key)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        reject_policy = policy.reject.label(),
        unique_email = policy.email.is_enforced(),
        "hospital directory ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await?;
    info!("hospital directory stopped");
    Ok(())
}

async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown signal received; draining connections");
}
