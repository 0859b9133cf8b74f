//! RSA public key material.

/// An RSA public key as big-endian unsigned integers.
///
/// Leading zero bytes are stripped on construction so that
/// [`modulus_len`](RsaPublicKey::modulus_len) reports the true key size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl RsaPublicKey {
    /// Create a key from big-endian modulus and exponent bytes.
    pub fn new(modulus: &[u8], exponent: &[u8]) -> Self {
        Self {
            modulus: strip_leading_zeros(modulus).to_vec(),
            exponent: strip_leading_zeros(exponent).to_vec(),
        }
    }

    /// Big-endian modulus `n`.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Big-endian public exponent `e`.
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Size of the modulus in bytes (`k` in PKCS#1).
    pub fn modulus_len(&self) -> usize {
        self.modulus.len()
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
