//! Record protection interface.
//!
//! The handshake engine negotiates keys and hands the record layer a
//! [`RecordProtection`] for each direction. The record layer itself never
//! sees key material.

use crate::Result;

/// Seals or opens record fragments for one direction of a connection.
///
/// Implementations track their own sequence numbers. `content_type` is the
/// outer record type and may be bound into the MAC or AEAD associated data.
pub trait RecordProtection: Send + std::fmt::Debug {
    /// Protect an outgoing fragment.
    fn seal(&mut self, content_type: u8, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Remove protection from an incoming fragment.
    fn open(&mut self, content_type: u8, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Human-readable cipher name, for logging.
    fn name(&self) -> &'static str;
}

/// The initial `TLS_NULL_WITH_NULL_NULL` state: fragments pass unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProtection;

impl RecordProtection for NullProtection {
    fn seal(&mut self, _content_type: u8, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn open(&mut self, _content_type: u8, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }

    fn name(&self) -> &'static str {
        "NULL"
    }
}
