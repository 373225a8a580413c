use crate::cli::ServeArgs;
use crate::infra::{agent_transport, AppState, SeedCatalog};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::telemetry;
use hireflow::workflows::hiring::HiringService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(agent_url) = args.agent_url.take() {
        config.agent.base_url = agent_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = SeedCatalog::load(args.seed.as_deref())?;
    let (candidates, jobs) = (catalog.candidates.len(), catalog.jobs.len());
    let repository = Arc::new(catalog.into_repository()?);
    let transport = Arc::new(agent_transport(&config.agent)?);
    let hiring_service = Arc::new(HiringService::new(
        repository,
        transport,
        config.hiring_settings(),
    ));

    let app = with_platform_routes(hiring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        agent_base_url = %config.agent.base_url,
        agent_timeout_ms = config.agent.timeout.as_millis() as u64,
        candidates,
        jobs,
        "hiring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
