//! RSA PKCS#1 v1.5 signature verification.
//!
//! A certificate signature is checked by recovering the signer's DigestInfo
//! and comparing its digest with a fresh hash of the signed bytes:
//!
//! ```text
//! DigestInfo ::= SEQUENCE {
//!     digestAlgorithm  AlgorithmIdentifier,   -- parameters absent or NULL
//!     digest           OCTET STRING }
//! ```
//!
//! # Outcomes
//!
//! `Ok(false)` means the signature was well formed but does not match.
//! Every `Err` means the input could not even be interpreted:
//!
//! | error | cause |
//! |---|---|
//! | [`Error::UnsupportedAlgorithm`] | issuer key is not RSA |
//! | [`Error::DecryptionFailed`] | RSA operation or block-type-1 padding failed |
//! | [`Error::MalformedDigestInfo`] | DER structure wrong, or parameters other than `05 00` |
//! | [`Error::UnknownDigestAlgorithm`] | digest OID not recognised |
//! | [`Error::DigestLengthMismatch`] | digest size differs from the algorithm's output size |

use sectls_crypto::{CryptoProvider, HashAlgorithm};
use subtle::ConstantTimeEq;

use crate::der::{encode_oid, oid_to_string, tag, write_tlv, DerDecoder};
use crate::error::{Error, Result};
use crate::x509::{Certificate, PublicKey};

/// The only parameters encoding accepted besides absence.
const NULL_PARAMETERS: [u8; 2] = [tag::NULL, 0x00];

/// Decode a DigestInfo into its hash algorithm and digest.
pub fn decode_digest_info(blob: &[u8]) -> Result<(HashAlgorithm, &[u8])> {
    let malformed = |what: &str| Error::MalformedDigestInfo(what.to_string());

    let mut outer = DerDecoder::new(blob);
    let mut info = outer.read_sequence().map_err(|e| malformed(&e.to_string()))?;
    if !outer.is_empty() {
        return Err(malformed("trailing data"));
    }

    let mut algorithm = info.read_sequence().map_err(|e| malformed(&e.to_string()))?;
    let oid = algorithm.read_oid().map_err(|e| malformed(&e.to_string()))?;
    if !algorithm.is_empty() && algorithm.remaining() != NULL_PARAMETERS {
        return Err(malformed("algorithm parameters must be absent or NULL"));
    }

    let digest = info
        .read_octet_string()
        .map_err(|e| malformed(&e.to_string()))?;
    if !info.is_empty() {
        return Err(malformed("unexpected field after digest"));
    }

    let hash_algorithm = HashAlgorithm::from_oid(&oid)
        .ok_or_else(|| Error::UnknownDigestAlgorithm(oid_to_string(&oid)))?;

    if digest.len() != hash_algorithm.output_size() {
        return Err(Error::DigestLengthMismatch {
            expected: hash_algorithm.output_size(),
            actual: digest.len(),
        });
    }

    Ok((hash_algorithm, digest))
}

/// Encode a DigestInfo with NULL parameters.
///
/// This is the payload a PKCS#1 v1.5 signer pads and exponentiates.
pub fn encode_digest_info(algorithm: HashAlgorithm, digest: &[u8]) -> Vec<u8> {
    let mut alg_id = Vec::new();
    write_tlv(&mut alg_id, tag::OID, &encode_oid(algorithm.oid()));
    alg_id.extend_from_slice(&NULL_PARAMETERS);

    let mut body = Vec::new();
    write_tlv(&mut body, tag::SEQUENCE, &alg_id);
    write_tlv(&mut body, tag::OCTET_STRING, digest);

    let mut out = Vec::new();
    write_tlv(&mut out, tag::SEQUENCE, &body);
    out
}

/// Verify `signature` over `signed` with the issuer's public key.
///
/// # Arguments
///
/// * `provider` - Crypto provider for the RSA operation and hashing
/// * `signed` - The exact bytes that were signed
/// * `signature` - Raw signature value
/// * `issuer_key` - Public key of the purported signer
pub fn verify_signature(
    provider: &dyn CryptoProvider,
    signed: &[u8],
    signature: &[u8],
    issuer_key: &PublicKey,
) -> Result<bool> {
    let key = match issuer_key {
        PublicKey::Rsa(key) => key,
        PublicKey::Unsupported(oid) => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "public key algorithm {}",
                oid_to_string(oid)
            )))
        },
    };

    let blob = provider.rsa_public_decrypt(key, signature).map_err(|e| {
        tracing::debug!(error = %e, "RSA signature recovery failed");
        Error::DecryptionFailed
    })?;

    let (hash_algorithm, expected) = decode_digest_info(&blob)?;
    let actual = provider.digest(hash_algorithm, signed)?;

    Ok(bool::from(actual.as_slice().ct_eq(expected)))
}

/// Verify that `issuer` signed `cert`.
pub fn verify_certificate_signature(
    provider: &dyn CryptoProvider,
    cert: &Certificate,
    issuer: &Certificate,
) -> Result<bool> {
    verify_signature(provider, cert.tbs(), cert.signature(), issuer.public_key())
}
