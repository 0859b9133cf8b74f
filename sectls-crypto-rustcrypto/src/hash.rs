//! Hash function implementations using the RustCrypto digest crates.

use digest::Digest;
use sectls_crypto::{Hash, HashAlgorithm, Result};

/// Create a hash instance for the specified algorithm.
pub fn create_hash(algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
    let hash: Box<dyn Hash> = match algorithm {
        HashAlgorithm::Md2 => Box::new(DigestHash::<md2::Md2>::new(algorithm)),
        HashAlgorithm::Md5 => Box::new(DigestHash::<md5::Md5>::new(algorithm)),
        HashAlgorithm::Sha1 => Box::new(DigestHash::<sha1::Sha1>::new(algorithm)),
        HashAlgorithm::Sha224 => Box::new(DigestHash::<sha2::Sha224>::new(algorithm)),
        HashAlgorithm::Sha256 => Box::new(DigestHash::<sha2::Sha256>::new(algorithm)),
        HashAlgorithm::Sha384 => Box::new(DigestHash::<sha2::Sha384>::new(algorithm)),
        HashAlgorithm::Sha512 => Box::new(DigestHash::<sha2::Sha512>::new(algorithm)),
    };
    Ok(hash)
}

/// Adapter from any RustCrypto [`Digest`] to the provider [`Hash`] trait.
struct DigestHash<D> {
    hasher: D,
    algorithm: HashAlgorithm,
}

impl<D: Digest> DigestHash<D> {
    fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hasher: D::new(),
            algorithm,
        }
    }
}

impl<D: Digest + Send> Hash for DigestHash<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.hasher, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.hasher.finalize().to_vec()
    }

    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}
