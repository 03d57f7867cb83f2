//! Admission webhook server.
//!
//! Serves every admission route plus the probe and metrics endpoints on one
//! TLS listener.
//!
//! To enable the webhook in a cluster:
//! 1. Issue a serving certificate for the webhook Service (e.g. cert-manager)
//! 2. Mount it into the pod at /etc/webhook/certs/ (or point the flags elsewhere)
//! 3. Create a MutatingWebhookConfiguration targeting the routes below with
//!    `admissionReviewVersions: ["v1", "v1beta1"]`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::decision::Admit;
use crate::dispatcher::{Dispatcher, admission_handler};
use crate::error::StartupError;
use crate::health::{Metrics, create_health_router};
use crate::mutators::{MutatePods, MutatePodsSidecar};
use crate::tls::TlsMaterialSource;

/// Route for init container injection
pub const MUTATE_PODS_PATH: &str = "/mutating-pods";
/// Route for sidecar injection
pub const MUTATE_PODS_SIDECAR_PATH: &str = "/mutating-pods-sidecar";

/// Builder binding admission routes to decision functions.
pub struct WebhookRoutes {
    metrics: Arc<Metrics>,
    router: Router,
}

impl WebhookRoutes {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            router: Router::new(),
        }
    }

    /// Serve `decision` on `POST path`.
    pub fn route(mut self, path: &str, decision: impl Admit) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            path,
            Arc::new(decision),
            self.metrics.clone(),
        ));
        debug!(route = dispatcher.route(), "Registered admission route");
        self.router = self
            .router
            .route(path, post(admission_handler).with_state(dispatcher));
        self
    }

    /// Finish the router, adding probes, metrics and the body limit.
    pub fn into_router(self, max_body_bytes: usize) -> Router {
        self.router
            .merge(create_health_router(self.metrics))
            .layer(DefaultBodyLimit::max(max_body_bytes))
    }
}

/// Create the webhook router with the pod mutation routes
pub fn create_webhook_router(config: &Config, metrics: Arc<Metrics>) -> Router {
    if config.sidecar_image.is_empty() {
        warn!("--sidecar-image is empty, {} will deny every request", MUTATE_PODS_SIDECAR_PATH);
    }

    WebhookRoutes::new(metrics)
        .route(
            MUTATE_PODS_PATH,
            MutatePods::new(config.init_container_image.clone()),
        )
        .route(
            MUTATE_PODS_SIDECAR_PATH,
            MutatePodsSidecar::new(config.sidecar_image.clone()),
        )
        .into_router(config.max_body_bytes)
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0 on the configured port. Any error returned here is a
/// startup failure; the caller is expected to exit.
///
/// # Arguments
/// * `config` - Process configuration
/// * `tls` - Source of the certificate and key
pub async fn run_server<S: TlsMaterialSource>(config: Config, tls: &S) -> Result<(), StartupError> {
    config.validate()?;

    let material = tls.load()?;
    let tls_config = RustlsConfig::from_pem(material.cert_pem, material.key_pem)
        .await
        .map_err(|e| StartupError::TlsConfig(e.to_string()))?;

    let metrics = Arc::new(Metrics::new());
    let app = create_webhook_router(&config, metrics);

    let handle = Handle::new();
    tokio::spawn(drain_on_signal(handle.clone(), config.shutdown_grace()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(StartupError::Server)?;

    info!("Webhook server stopped");
    Ok(())
}

/// Stop accepting connections on SIGTERM/SIGINT and drain in-flight requests.
async fn drain_on_signal(handle: Handle, grace: Duration) {
    shutdown_signal().await;
    info!(
        grace_secs = grace.as_secs(),
        "Received shutdown signal, draining in-flight requests"
    );
    handle.graceful_shutdown(Some(grace));
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the server cannot shut down
/// gracefully without them.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
