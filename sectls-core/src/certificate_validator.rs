//! X.509 certificate chain verification.
//!
//! Walks a peer's chain (leaf first) against a set of trust anchors:
//!
//! 1. The last chain certificate must name an issuer present in the trust
//!    store, that issuer must be allowed to sign (CA bit, or byte-identical
//!    to the certificate), and its signature must verify.
//! 2. Every certificate is looked up in the CRL collaborator.
//! 3. A trailing self-signed certificate is dropped from the walk; trust
//!    comes from the store, not from the peer.
//! 4. Each remaining certificate is checked against the one after it, with
//!    version 1 issuers refused unless [`VerifyFlags::ALLOW_ANY_X509_V1_CA_CRT`]
//!    is set.
//!
//! The result is a [`VerificationOutcome`]; any status bit means failure.
//! Hard errors are reserved for unusable input (an empty chain).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use sectls_crypto::CryptoProvider;

use crate::error::{Error, Result};
use crate::signature_verify::verify_certificate_signature;
use crate::x509::{Certificate, SignatureAlgorithm};

/// Caller-supplied verification policy bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VerifyFlags(u32);

impl VerifyFlags {
    /// Do not require issuers to be CAs.
    pub const DISABLE_CA_SIGN: VerifyFlags = VerifyFlags(1);
    /// Accept a version 1 trust anchor as a CA.
    pub const ALLOW_X509_V1_CA_CRT: VerifyFlags = VerifyFlags(2);
    /// Do not accept a certificate just because it equals its trust anchor.
    pub const DO_NOT_ALLOW_SAME: VerifyFlags = VerifyFlags(4);
    /// Accept version 1 CAs anywhere in the chain.
    pub const ALLOW_ANY_X509_V1_CA_CRT: VerifyFlags = VerifyFlags(8);
    /// Accept RSA-MD2 signatures.
    pub const ALLOW_SIGN_RSA_MD2: VerifyFlags = VerifyFlags(16);
    /// Accept RSA-MD5 signatures.
    pub const ALLOW_SIGN_RSA_MD5: VerifyFlags = VerifyFlags(32);

    const ALL: u32 = 0x3f;

    /// No flags.
    pub const fn empty() -> Self {
        VerifyFlags(0)
    }

    /// Build from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        VerifyFlags(bits & Self::ALL)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `other` is set.
    pub const fn contains(self, other: VerifyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: VerifyFlags) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: VerifyFlags) {
        self.0 &= !other.0;
    }

    /// Flags for a step inside the peer-supplied chain.
    fn for_chain_step(self) -> Self {
        let mut flags = self;
        if self.contains(VerifyFlags::ALLOW_ANY_X509_V1_CA_CRT) {
            flags.insert(VerifyFlags::ALLOW_X509_V1_CA_CRT);
        } else {
            flags.remove(VerifyFlags::ALLOW_X509_V1_CA_CRT);
        }
        flags
    }
}

impl BitOr for VerifyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        VerifyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for VerifyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Verification status bits. Empty means trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CertificateStatus(u32);

impl CertificateStatus {
    /// The certificate is not trusted.
    pub const INVALID: CertificateStatus = CertificateStatus(1 << 1);
    /// A certificate is on a revocation list.
    pub const REVOKED: CertificateStatus = CertificateStatus(1 << 5);
    /// No issuer was found.
    pub const SIGNER_NOT_FOUND: CertificateStatus = CertificateStatus(1 << 6);
    /// The issuer is not allowed to sign certificates.
    pub const SIGNER_NOT_CA: CertificateStatus = CertificateStatus(1 << 7);
    /// The signature uses a disallowed digest.
    pub const INSECURE_ALGORITHM: CertificateStatus = CertificateStatus(1 << 8);

    /// No bits.
    pub const fn empty() -> Self {
        CertificateStatus(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if every bit of `other` is set.
    pub const fn contains(self, other: CertificateStatus) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CertificateStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        CertificateStatus(self.0 | rhs.0)
    }
}

impl BitOrAssign for CertificateStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(CertificateStatus, &str); 5] = [
            (CertificateStatus::INVALID, "INVALID"),
            (CertificateStatus::REVOKED, "REVOKED"),
            (CertificateStatus::SIGNER_NOT_FOUND, "SIGNER_NOT_FOUND"),
            (CertificateStatus::SIGNER_NOT_CA, "SIGNER_NOT_CA"),
            (CertificateStatus::INSECURE_ALGORITHM, "INSECURE_ALGORITHM"),
        ];

        if self.is_empty() {
            return write!(f, "OK");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Result of verifying a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationOutcome {
    status: CertificateStatus,
}

impl VerificationOutcome {
    fn from_status(status: CertificateStatus) -> Self {
        Self { status }
    }

    /// Status bits accumulated before verification stopped.
    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    /// True when the chain leads to a trust anchor with no objections.
    pub fn is_success(&self) -> bool {
        self.status.is_empty()
    }
}

/// Ordered set of trust anchors. First subject match wins.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: Vec<Certificate>,
}

impl TrustStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            anchors: Vec::new(),
        }
    }

    /// Append an anchor. Duplicates are kept.
    pub fn add(&mut self, anchor: Certificate) {
        self.anchors.push(anchor);
    }

    /// Decode and append a DER anchor.
    pub fn add_der(&mut self, der: &[u8]) -> Result<()> {
        self.add(Certificate::from_der(der)?);
        Ok(())
    }

    /// Anchors in search order.
    pub fn anchors(&self) -> &[Certificate] {
        &self.anchors
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// First anchor whose subject is `cert`'s issuer.
    pub fn find_issuer(&self, cert: &Certificate) -> Option<&Certificate> {
        find_issuer(cert, &self.anchors)
    }
}

impl From<Vec<Certificate>> for TrustStore {
    fn from(anchors: Vec<Certificate>) -> Self {
        Self { anchors }
    }
}

/// Revocation lookup collaborator.
pub trait CrlLookup: Send + Sync + fmt::Debug {
    /// Whether the certificate with `serial` issued by `issuer_dn` is revoked.
    fn is_revoked(&self, serial: &[u8], issuer_dn: &[u8]) -> bool;
}

/// In-memory list of revoked (issuer, serial) pairs.
#[derive(Debug, Clone, Default)]
pub struct CrlList {
    revoked: Vec<(Vec<u8>, Vec<u8>)>,
}

impl CrlList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            revoked: Vec::new(),
        }
    }

    /// Mark `serial` from `issuer_dn` as revoked.
    pub fn revoke(&mut self, issuer_dn: &[u8], serial: &[u8]) {
        self.revoked.push((issuer_dn.to_vec(), serial.to_vec()));
    }

    /// Mark `cert` as revoked.
    pub fn revoke_certificate(&mut self, cert: &Certificate) {
        self.revoke(cert.issuer_dn(), cert.serial());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

impl CrlLookup for CrlList {
    fn is_revoked(&self, serial: &[u8], issuer_dn: &[u8]) -> bool {
        self.revoked
            .iter()
            .any(|(issuer, revoked)| issuer == issuer_dn && revoked == serial)
    }
}

/// Whether `issuer`'s subject is `cert`'s issuer.
pub fn check_issuer(cert: &Certificate, issuer: &Certificate) -> bool {
    cert.is_issued_by(issuer)
}

fn find_issuer<'a>(cert: &Certificate, candidates: &'a [Certificate]) -> Option<&'a Certificate> {
    candidates.iter().find(|candidate| cert.is_issued_by(candidate))
}

/// May `issuer` sign `cert`?
fn issuer_may_sign(cert: &Certificate, issuer: &Certificate, flags: VerifyFlags) -> bool {
    if !flags.contains(VerifyFlags::DO_NOT_ALLOW_SAME)
        && cert.tbs() == issuer.tbs()
        && cert.signature() == issuer.signature()
    {
        return true;
    }

    issuer.is_ca()
}

fn is_insecure_algorithm(cert: &Certificate, flags: VerifyFlags) -> bool {
    match cert.signature_algorithm() {
        SignatureAlgorithm::RsaMd2 => !flags.contains(VerifyFlags::ALLOW_SIGN_RSA_MD2),
        SignatureAlgorithm::RsaMd5 => !flags.contains(VerifyFlags::ALLOW_SIGN_RSA_MD5),
        _ => false,
    }
}

/// Verify one certificate against a list of candidate issuers.
fn verify_one(
    provider: &dyn CryptoProvider,
    cert: &Certificate,
    issuers: &[Certificate],
    flags: VerifyFlags,
) -> CertificateStatus {
    let issuer = match find_issuer(cert, issuers) {
        Some(issuer) => issuer,
        None => {
            tracing::debug!("Issuer not found");
            return CertificateStatus::SIGNER_NOT_FOUND | CertificateStatus::INVALID;
        },
    };

    let v1_exempt = flags.contains(VerifyFlags::ALLOW_X509_V1_CA_CRT) && issuer.version() == 1;
    if !flags.contains(VerifyFlags::DISABLE_CA_SIGN)
        && !v1_exempt
        && !issuer_may_sign(cert, issuer, flags)
    {
        tracing::debug!(version = issuer.version(), "Issuer is not a CA");
        return CertificateStatus::SIGNER_NOT_CA | CertificateStatus::INVALID;
    }

    let mut status = CertificateStatus::empty();
    match verify_certificate_signature(provider, cert, issuer) {
        Ok(true) => {},
        Ok(false) => {
            tracing::debug!("Certificate signature mismatch");
            status |= CertificateStatus::INVALID;
        },
        Err(e) => {
            tracing::warn!(error = %e, "Certificate signature could not be checked");
            status |= CertificateStatus::INVALID;
        },
    }

    if !cert.is_self_signed() && is_insecure_algorithm(cert, flags) {
        tracing::debug!(algorithm = ?cert.signature_algorithm(), "Insecure signature algorithm");
        status |= CertificateStatus::INSECURE_ALGORITHM | CertificateStatus::INVALID;
    }

    status
}

/// Verify a single certificate directly against `trusted`.
pub fn verify_certificate(
    provider: &dyn CryptoProvider,
    cert: &Certificate,
    trusted: &TrustStore,
    flags: VerifyFlags,
) -> VerificationOutcome {
    VerificationOutcome::from_status(verify_one(provider, cert, trusted.anchors(), flags))
}

/// Verify `chain` (leaf first) against `trust_store`.
///
/// # Errors
///
/// [`Error::NoCertificate`] if `chain` is empty. Every verification failure
/// is reported through the returned outcome instead.
pub fn verify_chain(
    provider: &dyn CryptoProvider,
    chain: &[Certificate],
    trust_store: &TrustStore,
    crl: &dyn CrlLookup,
    flags: VerifyFlags,
) -> Result<VerificationOutcome> {
    let last = chain.last().ok_or(Error::NoCertificate)?;

    let status = verify_one(provider, last, trust_store.anchors(), flags);
    if !status.is_empty() {
        tracing::info!(%status, "Chain does not lead to a trust anchor");
        return Ok(VerificationOutcome::from_status(
            status | CertificateStatus::INVALID,
        ));
    }

    let mut revoked = false;
    for cert in chain {
        revoked |= crl.is_revoked(cert.serial(), cert.issuer_dn());
    }
    if revoked {
        tracing::info!("Chain contains a revoked certificate");
        return Ok(VerificationOutcome::from_status(
            CertificateStatus::REVOKED | CertificateStatus::INVALID,
        ));
    }

    // The trust decision for a self-signed tail was made above; it is not
    // re-checked as the issuer of its predecessor.
    let walk_len = if last.is_self_signed() {
        chain.len() - 1
    } else {
        chain.len()
    };

    let step_flags = flags.for_chain_step();
    for i in (1..walk_len).rev() {
        let status = verify_one(provider, &chain[i - 1], &chain[i..=i], step_flags);
        if !status.is_empty() {
            // Link-level reasons stay in the log; the outcome only says INVALID.
            tracing::info!(%status, depth = i - 1, "Chain link failed");
            return Ok(VerificationOutcome::from_status(CertificateStatus::INVALID));
        }
    }

    tracing::debug!(length = chain.len(), "Chain verified");
    Ok(VerificationOutcome::from_status(CertificateStatus::empty()))
}

/// Bundles the trust configuration a handshake needs to verify peers.
#[derive(Clone)]
pub struct ChainVerifier {
    provider: Arc<dyn CryptoProvider>,
    trust_store: Arc<TrustStore>,
    crl: Arc<dyn CrlLookup>,
    flags: VerifyFlags,
}

impl fmt::Debug for ChainVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainVerifier")
            .field("anchors", &self.trust_store.len())
            .field("crl", &self.crl)
            .field("flags", &self.flags)
            .finish()
    }
}

impl ChainVerifier {
    /// Create a verifier.
    pub fn new(
        provider: Arc<dyn CryptoProvider>,
        trust_store: Arc<TrustStore>,
        crl: Arc<dyn CrlLookup>,
        flags: VerifyFlags,
    ) -> Self {
        Self {
            provider,
            trust_store,
            crl,
            flags,
        }
    }

    /// Trust anchors.
    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Policy flags.
    pub fn flags(&self) -> VerifyFlags {
        self.flags
    }

    /// Verify a decoded chain, leaf first.
    pub fn verify(&self, chain: &[Certificate]) -> Result<VerificationOutcome> {
        verify_chain(
            self.provider.as_ref(),
            chain,
            &self.trust_store,
            self.crl.as_ref(),
            self.flags,
        )
    }

    /// Decode and verify a DER chain as carried in a Certificate message.
    pub fn verify_der<B: AsRef<[u8]>>(&self, chain: &[B]) -> Result<VerificationOutcome> {
        let decoded = chain
            .iter()
            .map(|der| Certificate::from_der(der.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.verify(&decoded)
    }
}
