//! # SecTLS
//!
//! Secure-transport layer for an embeddable HTTP server.
//!
//! SecTLS drives one TLS connection per client socket: it demultiplexes
//! records, runs a pluggable handshake engine, verifies peer certificate
//! chains and hands decrypted application data to the HTTP layer.
//!
//! ## Server Example
//!
//! ```rust,no_run
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//! use sectls::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .with_timeout(Duration::from_secs(30))
//!     .with_trust_anchors(vec![/* DER client CA certificates */])
//!     .build()?;
//!
//! // For every accepted socket:
//! // let mut conn = config.accept(stream, engine, http);
//! // conn.on_readable()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Verifying a chain on its own
//!
//! ```rust,no_run
//! # fn example(root: &[u8], chain: &[Vec<u8>]) -> sectls::Result<()> {
//! use sectls::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .with_root_certificates(vec![root.to_vec()])
//!     .build()?;
//! let outcome = config.verifier().verify_der(chain)?;
//! println!("chain status: {}", outcome.status());
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]
#![forbid(unsafe_code)]

// Re-export core types
pub use sectls_core::{
    self, certificate_validator, connection, error, extensions, protocol, CertificateStatus,
    Config, Connection, ConnectionState, Error, HttpLayer, ProtocolVersion, Result,
    TerminationCode, Transport, VerifyFlags,
};

// Re-export crypto interface
pub use sectls_crypto;
pub use sectls_crypto_rustcrypto::RustCryptoProvider;

// Public modules
pub mod client;
pub mod server;

// Re-exports
pub use client::ClientConfig;
pub use server::ServerConfig;

/// SecTLS version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the SecTLS version.
pub fn version() -> &'static str {
    VERSION
}
