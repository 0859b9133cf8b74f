//! Hash function interface.

/// Hash algorithms that may appear in a PKCS#1 v1.5 DigestInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD2 (16 bytes output). Broken; accepted only under explicit policy.
    Md2,
    /// MD5 (16 bytes output). Broken; accepted only under explicit policy.
    Md5,
    /// SHA-1 (20 bytes output)
    Sha1,
    /// SHA-224 (28 bytes output)
    Sha224,
    /// SHA-256 (32 bytes output)
    Sha256,
    /// SHA-384 (48 bytes output)
    Sha384,
    /// SHA-512 (64 bytes output)
    Sha512,
}

const OID_MD2: &[u32] = &[1, 2, 840, 113549, 2, 2];
const OID_MD5: &[u32] = &[1, 2, 840, 113549, 2, 5];
const OID_SHA1: &[u32] = &[1, 3, 14, 3, 2, 26];
const OID_SHA224: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 4];
const OID_SHA256: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_SHA384: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
const OID_SHA512: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];

impl HashAlgorithm {
    /// Get the output size in bytes for this hash algorithm.
    pub const fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Md2 | HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Get the name of this algorithm.
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md2 => "MD2",
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha224 => "SHA-224",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Object identifier arcs of this algorithm.
    pub const fn oid(self) -> &'static [u32] {
        match self {
            HashAlgorithm::Md2 => OID_MD2,
            HashAlgorithm::Md5 => OID_MD5,
            HashAlgorithm::Sha1 => OID_SHA1,
            HashAlgorithm::Sha224 => OID_SHA224,
            HashAlgorithm::Sha256 => OID_SHA256,
            HashAlgorithm::Sha384 => OID_SHA384,
            HashAlgorithm::Sha512 => OID_SHA512,
        }
    }

    /// Look up an algorithm by its object identifier arcs.
    pub fn from_oid(oid: &[u32]) -> Option<Self> {
        [
            HashAlgorithm::Md2,
            HashAlgorithm::Md5,
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|alg| alg.oid() == oid)
    }

    /// Whether this digest is considered too weak for certificate signatures.
    pub const fn is_insecure(self) -> bool {
        matches!(self, HashAlgorithm::Md2 | HashAlgorithm::Md5)
    }
}

/// Hash function trait.
///
/// # Example
///
/// ```rust,ignore
/// use sectls_crypto::Hash;
///
/// fn hash_example(mut hash: Box<dyn Hash>) -> Vec<u8> {
///     hash.update(b"Hello, ");
///     hash.update(b"world!");
///     hash.finalize()
/// }
/// ```
pub trait Hash: Send {
    /// Update the hash state with more data.
    fn update(&mut self, data: &[u8]);

    /// Finalize the hash and return the digest.
    ///
    /// This consumes the hash state.
    fn finalize(self: Box<Self>) -> Vec<u8>;

    /// Get the output size in bytes for this hash function.
    fn output_size(&self) -> usize {
        self.algorithm().output_size()
    }

    /// Get the algorithm this hash implements.
    fn algorithm(&self) -> HashAlgorithm;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_lookup() {
        assert_eq!(
            HashAlgorithm::from_oid(&[2, 16, 840, 1, 101, 3, 4, 2, 1]),
            Some(HashAlgorithm::Sha256)
        );
        assert_eq!(
            HashAlgorithm::from_oid(&[1, 3, 14, 3, 2, 26]),
            Some(HashAlgorithm::Sha1)
        );
        assert_eq!(HashAlgorithm::from_oid(&[1, 2, 3]), None);
    }

    #[test]
    fn test_output_sizes() {
        assert_eq!(HashAlgorithm::Md5.output_size(), 16);
        assert_eq!(HashAlgorithm::Sha1.output_size(), 20);
        assert_eq!(HashAlgorithm::Sha224.output_size(), 28);
        assert_eq!(HashAlgorithm::Sha512.output_size(), 64);
    }

    #[test]
    fn test_insecure_digests() {
        assert!(HashAlgorithm::Md2.is_insecure());
        assert!(HashAlgorithm::Md5.is_insecure());
        assert!(!HashAlgorithm::Sha1.is_insecure());
    }
}
