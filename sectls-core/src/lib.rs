//! # SecTLS Core
//!
//! Secure-transport core for an embeddable HTTP server.
//!
//! This crate provides:
//! - The connection record state machine that demultiplexes a TLS byte stream
//! - The record layer and alert protocol
//! - X.509 chain verification with PKCS#1 v1.5 RSA signatures
//! - The length-prefixed hello extension codec
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Public API (sectls)             │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │       sectls-core (this crate)          │
//! │  ┌──────────────────────────────────┐   │
//! │  │   Connection State Machine       │   │
//! │  ├──────────────────────────────────┤   │
//! │  │   Record Layer / Alerts          │   │
//! │  ├──────────────────────────────────┤   │
//! │  │   Chain Verifier / Signatures    │   │
//! │  ├──────────────────────────────────┤   │
//! │  │   Extension Codec                │   │
//! │  └──────────────────────────────────┘   │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │     sectls-crypto (trait interface)     │
//! └─────────────────────────────────────────┘
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]
#![forbid(unsafe_code)]

use std::time::Duration;

// Re-export crypto interface
pub use sectls_crypto;

// Core modules
pub mod alert;
pub mod certificate_validator;
pub mod connection;
pub mod der;
pub mod error;
pub mod extensions;
pub mod handshake;
pub mod opaque_prf_input;
pub mod protocol;
pub mod record;
pub mod session;
pub mod signature_verify;
pub mod state;
pub mod transport;
pub mod x509;

// Re-exports
pub use certificate_validator::{
    verify_chain, CertificateStatus, ChainVerifier, CrlList, CrlLookup, TrustStore,
    VerificationOutcome, VerifyFlags,
};
pub use connection::{Connection, HttpLayer, TerminationCode};
pub use error::{Error, Result};
pub use extensions::Extensions;
pub use protocol::{ContentType, ProtocolVersion};
pub use session::TlsSession;
pub use state::{ConnectionState, Role};
pub use transport::Transport;
pub use x509::Certificate;

/// Connection configuration.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use sectls_core::{Config, VerifyFlags};
///
/// let config = Config::builder()
///     .with_timeout(Duration::from_secs(30))
///     .with_verify_flags(VerifyFlags::ALLOW_X509_V1_CA_CRT)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Idle timeout; zero never expires
    pub timeout: Duration,

    /// Certificate verification policy
    pub verify_flags: VerifyFlags,

    /// Maximum fragment length (default: 16384)
    pub max_fragment_length: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            verify_flags: VerifyFlags::empty(),
            max_fragment_length: 16384,
        }
    }
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Configuration builder.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the idle timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set certificate verification flags.
    pub fn with_verify_flags(mut self, flags: VerifyFlags) -> Self {
        self.config.verify_flags = flags;
        self
    }

    /// Set maximum fragment length.
    pub fn with_max_fragment_length(mut self, length: u16) -> Self {
        self.config.max_fragment_length = length;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<Config> {
        if self.config.max_fragment_length == 0 {
            return Err(Error::InvalidConfig("Max fragment length is zero".into()));
        }

        if self.config.max_fragment_length as usize > record::MAX_FRAGMENT_SIZE {
            return Err(Error::InvalidConfig("Max fragment length too large".into()));
        }

        Ok(self.config)
    }
}
