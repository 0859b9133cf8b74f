//! # sectls Cryptographic Provider Interface
//!
//! Trait-based interface that keeps the protocol core independent of any
//! particular cryptographic library.
//!
//! ## Architecture
//!
//! ```text
//! CryptoProvider (main trait)
//! ├── Hash (MD2, MD5, SHA-1, SHA-2 family)
//! ├── RSA public-key operation with PKCS#1 v1.5 type-1 unpadding
//! └── RecordProtection (per-direction record seal/open, supplied by the handshake)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use sectls_crypto::{CryptoProvider, HashAlgorithm};
//!
//! fn digest(provider: &dyn CryptoProvider, data: &[u8]) -> sectls_crypto::Result<Vec<u8>> {
//!     let mut hash = provider.hash(HashAlgorithm::Sha256)?;
//!     hash.update(data);
//!     Ok(hash.finalize())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

pub mod error;
pub mod hash;
pub mod protection;
pub mod rsa;

pub use error::{Error, Result};
pub use hash::{Hash, HashAlgorithm};
pub use protection::{NullProtection, RecordProtection};
pub use rsa::RsaPublicKey;

use zeroize::Zeroizing;

/// The main cryptographic provider trait.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`: a single provider is shared by
/// every connection and by the certificate verifier.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Create a new instance of the crypto provider.
    fn new() -> Self
    where
        Self: Sized;

    /// Get a hash function instance.
    ///
    /// # Returns
    ///
    /// A hash function instance, or an error if the algorithm is not supported.
    fn hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>>;

    /// Apply the RSA public-key operation to `signature` and strip the
    /// PKCS#1 v1.5 block-type-1 padding.
    ///
    /// # Arguments
    ///
    /// * `key` - The signer's public key
    /// * `signature` - Signature bytes, exactly `key.modulus_len()` long
    ///
    /// # Returns
    ///
    /// The bytes following the `0x00` separator (normally an encoded
    /// DigestInfo). Padding or length violations are errors.
    fn rsa_public_decrypt(
        &self,
        key: &RsaPublicKey,
        signature: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Check if a hash algorithm is supported.
    fn supports_hash(&self, algorithm: HashAlgorithm) -> bool {
        self.hash(algorithm).is_ok()
    }

    /// Hash `data` in one call.
    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        let mut hash = self.hash(algorithm)?;
        hash.update(data);
        Ok(hash.finalize())
    }
}
