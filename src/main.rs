//! admission-dispatch - mutating admission webhook serving AdmissionReview
//! v1 and v1beta1.
//!
//! This is the main entry point that:
//! - Parses flags and environment into a `Config`
//! - Initializes structured logging
//! - Loads TLS material and runs the webhook server until SIGTERM/SIGINT

use clap::Parser;
use tracing::{error, info};

use admission_dispatch::{Config, PemFiles, run_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("admission_dispatch=info".parse()?),
        )
        .json()
        .init();

    info!(
        port = config.port,
        cert_file = %config.cert_file.display(),
        key_file = %config.key_file.display(),
        sidecar_image = %config.sidecar_image,
        "Starting admission-dispatch"
    );

    let tls = PemFiles::new(config.cert_file.clone(), config.key_file.clone());
    if let Err(e) = run_server(config, &tls).await {
        // No degraded mode without a listener and TLS identity
        error!(error = %e, "Webhook server failed");
        return Err(e.into());
    }

    info!("admission-dispatch stopped");
    Ok(())
}
