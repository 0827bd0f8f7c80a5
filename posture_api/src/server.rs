use crate::{
    client::PoseClient,
    config::Config,
    routes::{healthcheck, metrics_handler, pose_stream, process_image},
    telemetry::Metrics,
};
use axum::{
    routing::{get, post},
    Router,
};
use axum_otel_metrics::HttpMetricsLayerBuilder;
use posture_core::PosturePolicy;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct SharedState {
    pub pose_client: Arc<PoseClient>,
    pub policy: PosturePolicy,
    pub metrics: Arc<Metrics>,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(pose_client: Arc<PoseClient>, config: &Config) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics = Arc::new(Metrics::new());
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState {
            pose_client,
            policy: config.posture.policy()?,
            metrics,
        };

        let router = Router::new()
            .route("/", get(healthcheck))
            .route("/api/process-image", post(process_image))
            .route("/api/pose-stream", get(pose_stream))
            .route("/metrics", get(metrics_handler))
            .nest_service("/app", ServeDir::new(&config.static_assets.dir))
            .with_state(app_state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", &self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
