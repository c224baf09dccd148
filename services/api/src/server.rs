use crate::cli::ServeArgs;
use crate::infra::{load_snapshot, AppState, InMemoryReviewStore};
use crate::routes::with_review_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use perf_review::config::AppConfig;
use perf_review::error::AppError;
use perf_review::telemetry;
use perf_review::workflows::review::{LifecyclePolicy, ReviewWorkflowService};
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let snapshot = load_snapshot(args.snapshot_dir.as_deref())?;
    let store = Arc::new(InMemoryReviewStore::seeded(snapshot));
    let policy = LifecyclePolicy::from(&config.review);
    let review_service = Arc::new(ReviewWorkflowService::new(store, policy));

    let app = with_review_routes(review_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        min_peer_reviews = policy.min_peer_reviews(),
        min_confirmed_reviews = policy.min_confirmed_reviews(),
        "performance review service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
