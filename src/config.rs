//! Process configuration.
//!
//! Parsed once in `main` and handed to the server by value.

use std::time::Duration;

use clap::Parser;

use crate::error::StartupError;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 443;
/// Image used for the injected init container unless overridden
pub const DEFAULT_INIT_CONTAINER_IMAGE: &str = "webhook-added-image";

/// Multi-version admission webhook for pod mutation
#[derive(Parser, Clone, Debug)]
#[command(name = "admission-dispatch", version, about, long_about = None)]
pub struct Config {
    /// File containing the x509 certificate for HTTPS (CA cert, if any,
    /// concatenated after the server cert)
    #[arg(long = "tls-cert-file", env = "WEBHOOK_TLS_CERT_FILE", default_value = WEBHOOK_CERT_PATH)]
    pub cert_file: std::path::PathBuf,

    /// File containing the x509 private key matching --tls-cert-file
    #[arg(
        long = "tls-private-key-file",
        env = "WEBHOOK_TLS_KEY_FILE",
        default_value = WEBHOOK_KEY_PATH
    )]
    pub key_file: std::path::PathBuf,

    /// Secure port that the webhook listens on
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = WEBHOOK_PORT)]
    pub port: u16,

    /// Image to be used as the injected sidecar
    #[arg(long, env = "WEBHOOK_SIDECAR_IMAGE", default_value = "")]
    pub sidecar_image: String,

    /// Image to be used as the injected init container
    #[arg(
        long,
        env = "WEBHOOK_INIT_CONTAINER_IMAGE",
        default_value = DEFAULT_INIT_CONTAINER_IMAGE
    )]
    pub init_container_image: String,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "WEBHOOK_MAX_BODY_BYTES", default_value_t = 8 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Seconds to drain in-flight requests after a shutdown signal
    #[arg(long, env = "WEBHOOK_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    pub shutdown_grace_secs: u64,
}

impl Config {
    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.port == 0 {
            return Err(StartupError::InvalidConfig(
                "--port must be between 1 and 65535".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(StartupError::InvalidConfig(
                "--max-body-bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
