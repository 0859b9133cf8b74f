//! # RustCrypto-based Cryptography Provider for sectls
//!
//! Implements [`sectls_crypto::CryptoProvider`] with the RustCrypto digest
//! crates and `num-bigint` modular exponentiation.
//!
//! ## Supported Algorithms
//!
//! - **Hash**: MD2, MD5, SHA-1, SHA-224, SHA-256, SHA-384, SHA-512
//! - **RSA**: public-key operation with PKCS#1 v1.5 type-1 unpadding
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sectls_crypto::CryptoProvider;
//! use sectls_crypto_rustcrypto::RustCryptoProvider;
//!
//! let provider = RustCryptoProvider::new();
//! assert!(provider.supports_hash(sectls_crypto::HashAlgorithm::Sha256));
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

use sectls_crypto::{CryptoProvider, Hash, HashAlgorithm, Result, RsaPublicKey};
use zeroize::Zeroizing;

pub mod hash;
mod rsa;

/// Cryptography provider using RustCrypto implementations.
///
/// This provider is stateless, `Send + Sync`, and can be shared across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn new() -> Self {
        RustCryptoProvider
    }

    fn hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
        hash::create_hash(algorithm)
    }

    fn rsa_public_decrypt(
        &self,
        key: &RsaPublicKey,
        signature: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        rsa::public_decrypt(key, signature)
    }
}
