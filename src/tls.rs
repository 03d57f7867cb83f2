//! TLS certificate and key material.
//!
//! The service only needs PEM bytes; where they come from is up to the
//! [`TlsMaterialSource`] passed to the server.

use std::path::PathBuf;

use crate::error::StartupError;

/// PEM encoded certificate chain and private key
#[derive(Clone)]
pub struct TlsMaterial {
    /// Server certificate, optionally followed by intermediates
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Provider of [`TlsMaterial`], consulted once at startup.
pub trait TlsMaterialSource {
    fn load(&self) -> Result<TlsMaterial, StartupError>;
}

/// Material read from a certificate file and a key file.
#[derive(Clone, Debug)]
pub struct PemFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl PemFiles {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }
}

impl TlsMaterialSource for PemFiles {
    fn load(&self) -> Result<TlsMaterial, StartupError> {
        let cert_pem = std::fs::read(&self.cert_path).map_err(StartupError::TlsMaterial)?;
        let key_pem = std::fs::read(&self.key_path).map_err(StartupError::TlsMaterial)?;
        Ok(TlsMaterial { cert_pem, key_pem })
    }
}

/// Material already held in memory, e.g. fetched from a secret store.
impl TlsMaterialSource for TlsMaterial {
    fn load(&self) -> Result<TlsMaterial, StartupError> {
        Ok(self.clone())
    }
}
