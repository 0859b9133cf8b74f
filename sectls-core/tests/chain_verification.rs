//! Chain verification against real RSA-signed certificates.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use sectls_core::certificate_validator::{
    check_issuer, verify_certificate, verify_chain, CertificateStatus, CrlList, CrlLookup,
    TrustStore, VerifyFlags,
};
use sectls_core::{Certificate, Error};
use sectls_crypto::{CryptoProvider, HashAlgorithm};
use sectls_crypto_rustcrypto::RustCryptoProvider;

fn verify(chain: &[Certificate], store: &TrustStore, flags: VerifyFlags) -> CertificateStatus {
    init_tracing();
    verify_chain(
        &RustCryptoProvider::new(),
        chain,
        store,
        &CrlList::new(),
        flags,
    )
    .unwrap()
    .status()
}

const INVALID: CertificateStatus = CertificateStatus::INVALID;

/// leaf -> intermediate -> root, root trusted.
#[test]
fn test_three_certificate_chain() {
    let chain = [leaf(), intermediate(), root()];
    assert_eq!(
        verify(&chain, &trust_root(), VerifyFlags::empty()),
        CertificateStatus::empty()
    );
}

/// The root may be left out of the chain the peer sends.
#[test]
fn test_chain_without_root() {
    let chain = [leaf(), intermediate()];
    assert_eq!(
        verify(&chain, &trust_root(), VerifyFlags::empty()),
        CertificateStatus::empty()
    );
}

#[test]
fn test_empty_chain_is_an_error() {
    let result = verify_chain(
        &RustCryptoProvider::new(),
        &[],
        &trust_root(),
        &CrlList::new(),
        VerifyFlags::empty(),
    );
    assert_eq!(result, Err(Error::NoCertificate));
}

#[test]
fn test_empty_trust_store() {
    let chain = [leaf(), intermediate(), root()];
    assert_eq!(
        verify(&chain, &TrustStore::new(), VerifyFlags::empty()),
        CertificateStatus::SIGNER_NOT_FOUND | INVALID
    );
}

/// A certificate identical to its trust entry needs no CA bit.
#[test]
fn test_identical_trust_entry() {
    let server = CertBuilder::new("self.example.test", "self.example.test", &LEAF_KEY)
        .ca(false)
        .build(&LEAF_KEY);
    let store = TrustStore::from(vec![server.clone()]);

    assert_eq!(
        verify(&[server.clone()], &store, VerifyFlags::empty()),
        CertificateStatus::empty()
    );
    assert_eq!(
        verify(&[server], &store, VerifyFlags::DO_NOT_ALLOW_SAME),
        CertificateStatus::SIGNER_NOT_CA | INVALID
    );
}

#[test]
fn test_corrupted_signature_byte() {
    let mut der = CertBuilder::new("www.example.test", "Test Intermediate", &LEAF_KEY)
        .serial(&[0x77])
        .sign(&INTERMEDIATE_KEY);
    let last = der.len() - 1;
    der[last] ^= 0x01;
    let corrupted = Certificate::from_der(&der).unwrap();

    assert_eq!(
        verify(&[leaf(), intermediate()], &trust_root(), VerifyFlags::empty()),
        CertificateStatus::empty()
    );
    assert_eq!(
        verify(&[corrupted, intermediate()], &trust_root(), VerifyFlags::empty()),
        INVALID
    );
}

/// Changing a signed byte leaves a well-formed signature that no longer matches.
#[test]
fn test_tampered_tbs() {
    let mut der = CertBuilder::new("www.example.test", "Test Intermediate", &LEAF_KEY)
        .serial(&[0x77])
        .sign(&INTERMEDIATE_KEY);
    let pos = der
        .windows(3)
        .position(|w| w == [0x02, 0x01, 0x77])
        .unwrap();
    der[pos + 2] = 0x78;
    let tampered = Certificate::from_der(&der).unwrap();

    assert_eq!(
        verify(&[tampered, intermediate()], &trust_root(), VerifyFlags::empty()),
        INVALID
    );
}

/// Inside the walk only INVALID is reported, whatever the link's reason.
#[test]
fn test_md5_leaf_rejected_unless_allowed() {
    let md5_leaf = CertBuilder::new("www.example.test", "Test Intermediate", &LEAF_KEY)
        .hash(HashAlgorithm::Md5)
        .build(&INTERMEDIATE_KEY);
    let chain = [md5_leaf, intermediate(), root()];

    assert_eq!(verify(&chain, &trust_root(), VerifyFlags::empty()), INVALID);
    assert_eq!(
        verify(&chain, &trust_root(), VerifyFlags::ALLOW_SIGN_RSA_MD5),
        CertificateStatus::empty()
    );
}

#[test]
fn test_md2_on_anchor_step() {
    let md2_intermediate = CertBuilder::new("Test Intermediate", "Test Root", &INTERMEDIATE_KEY)
        .ca(true)
        .hash(HashAlgorithm::Md2)
        .build(&ROOT_KEY);

    assert_eq!(
        verify(&[md2_intermediate.clone()], &trust_root(), VerifyFlags::empty()),
        CertificateStatus::INSECURE_ALGORITHM | INVALID
    );
    assert_eq!(
        verify(&[md2_intermediate], &trust_root(), VerifyFlags::ALLOW_SIGN_RSA_MD2),
        CertificateStatus::empty()
    );
}

/// Self-signed certificates are exempt from the digest policy.
#[test]
fn test_md5_self_signed_root() {
    let md5_root = CertBuilder::new("Test Root", "Test Root", &ROOT_KEY)
        .ca(true)
        .hash(HashAlgorithm::Md5)
        .build(&ROOT_KEY);
    let store = TrustStore::from(vec![md5_root.clone()]);

    assert_eq!(
        verify(&[intermediate(), md5_root], &store, VerifyFlags::empty()),
        CertificateStatus::empty()
    );
}

/// A trailing self-signed certificate is trusted through the store and is
/// not re-checked as the issuer of its predecessor, so an intermediate
/// signed by an unrelated key still passes when followed by the root.
#[test]
fn test_trailing_root_is_not_rechecked() {
    let forged = CertBuilder::new("Test Intermediate", "Test Root", &INTERMEDIATE_KEY)
        .ca(true)
        .build(&ROGUE_KEY);

    assert_eq!(
        verify(
            &[leaf(), forged.clone(), root()],
            &trust_root(),
            VerifyFlags::empty()
        ),
        CertificateStatus::empty()
    );
    assert_eq!(
        verify(&[leaf(), forged], &trust_root(), VerifyFlags::empty()),
        INVALID
    );
}

#[test]
fn test_signer_not_found_mid_chain() {
    let stranger = CertBuilder::new("www.example.test", "Some Other CA", &LEAF_KEY)
        .build(&ROGUE_KEY);
    assert_eq!(
        verify(&[stranger, intermediate()], &trust_root(), VerifyFlags::empty()),
        INVALID
    );
}

#[test]
fn test_issuer_without_ca_bit() {
    let not_ca = CertBuilder::new("Test Intermediate", "Test Root", &INTERMEDIATE_KEY)
        .ca(false)
        .build(&ROOT_KEY);
    let chain = [leaf(), not_ca];

    assert_eq!(verify(&chain, &trust_root(), VerifyFlags::empty()), INVALID);
    assert_eq!(
        verify(&chain, &trust_root(), VerifyFlags::DISABLE_CA_SIGN),
        CertificateStatus::empty()
    );
}

#[test]
fn test_version1_trust_anchor() {
    let v1_root = CertBuilder::new("Test Root", "Test Root", &ROOT_KEY)
        .version(1)
        .build(&ROOT_KEY);
    assert_eq!(v1_root.version(), 1);
    assert!(!v1_root.is_ca());
    let store = TrustStore::from(vec![v1_root]);

    assert_eq!(
        verify(&[intermediate()], &store, VerifyFlags::empty()),
        CertificateStatus::SIGNER_NOT_CA | INVALID
    );
    assert_eq!(
        verify(&[intermediate()], &store, VerifyFlags::ALLOW_X509_V1_CA_CRT),
        CertificateStatus::empty()
    );
}

/// The "any" flag governs links inside the chain, not the trust anchor.
#[test]
fn test_version1_anchor_needs_its_own_flag() {
    let v1_root = CertBuilder::new("Test Root", "Test Root", &ROOT_KEY)
        .version(1)
        .build(&ROOT_KEY);
    let store = TrustStore::from(vec![v1_root]);

    assert_eq!(
        verify(&[intermediate()], &store, VerifyFlags::ALLOW_ANY_X509_V1_CA_CRT),
        CertificateStatus::SIGNER_NOT_CA | INVALID
    );
    assert_eq!(
        verify(
            &[leaf(), intermediate()],
            &store,
            VerifyFlags::ALLOW_ANY_X509_V1_CA_CRT
        ),
        CertificateStatus::SIGNER_NOT_CA | INVALID
    );
    assert_eq!(
        verify(
            &[intermediate()],
            &store,
            VerifyFlags::ALLOW_ANY_X509_V1_CA_CRT | VerifyFlags::ALLOW_X509_V1_CA_CRT
        ),
        CertificateStatus::empty()
    );
}

/// Version 1 issuers inside the chain need the "any" flag.
#[test]
fn test_version1_intermediate() {
    let v1_intermediate = CertBuilder::new("Test Intermediate", "Test Root", &INTERMEDIATE_KEY)
        .version(1)
        .build(&ROOT_KEY);
    let chain = [leaf(), v1_intermediate];

    assert_eq!(
        verify(&chain, &trust_root(), VerifyFlags::ALLOW_X509_V1_CA_CRT),
        INVALID
    );
    assert_eq!(
        verify(&chain, &trust_root(), VerifyFlags::ALLOW_ANY_X509_V1_CA_CRT),
        CertificateStatus::empty()
    );
}

#[test]
fn test_revoked_intermediate() {
    let mut crl = CrlList::new();
    crl.revoke_certificate(&intermediate());

    let outcome = verify_chain(
        &RustCryptoProvider::new(),
        &[leaf(), intermediate(), root()],
        &trust_root(),
        &crl,
        VerifyFlags::empty(),
    )
    .unwrap();
    assert!(!outcome.is_success());
    assert_eq!(outcome.status(), CertificateStatus::REVOKED | INVALID);
}

#[derive(Debug, Default)]
struct CountingCrl {
    calls: AtomicUsize,
}

impl CrlLookup for CountingCrl {
    fn is_revoked(&self, _serial: &[u8], _issuer_dn: &[u8]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }
}

#[test]
fn test_crl_consulted_once_per_certificate() {
    let crl = CountingCrl::default();
    let outcome = verify_chain(
        &RustCryptoProvider::new(),
        &[leaf(), intermediate(), root()],
        &trust_root(),
        &crl,
        VerifyFlags::empty(),
    )
    .unwrap();
    assert!(outcome.is_success());
    assert_eq!(crl.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_verify_single_certificate() {
    let provider = RustCryptoProvider::new();
    assert!(verify_certificate(&provider, &intermediate(), &trust_root(), VerifyFlags::empty())
        .is_success());
    assert_eq!(
        verify_certificate(&provider, &leaf(), &trust_root(), VerifyFlags::empty()).status(),
        CertificateStatus::SIGNER_NOT_FOUND | INVALID
    );
}

#[test]
fn test_check_issuer() {
    assert!(check_issuer(&leaf(), &intermediate()));
    assert!(check_issuer(&intermediate(), &root()));
    assert!(!check_issuer(&leaf(), &root()));
}

/// First matching anchor wins even when a later one would verify.
#[test]
fn test_first_matching_anchor_wins() {
    let impostor = CertBuilder::new("Test Root", "Test Root", &ROGUE_KEY)
        .ca(true)
        .build(&ROGUE_KEY);
    let store = TrustStore::from(vec![impostor, root()]);

    assert_eq!(
        verify(&[intermediate()], &store, VerifyFlags::empty()),
        INVALID
    );
}

#[test]
fn test_chain_verifier_from_der() {
    let verifier = verifier(trust_root(), VerifyFlags::empty());
    let chain = vec![
        leaf().der().to_vec(),
        intermediate().der().to_vec(),
        root().der().to_vec(),
    ];
    assert!(verifier.verify_der(&chain).unwrap().is_success());

    let garbage = vec![vec![0x30, 0x00]];
    assert!(matches!(
        verifier.verify_der(&garbage),
        Err(Error::InvalidCertificate(_))
    ));
}

#[test]
fn test_chain_verifier_shares_store() {
    let store = Arc::new(trust_root());
    let verifier = sectls_core::ChainVerifier::new(
        Arc::new(RustCryptoProvider::new()),
        Arc::clone(&store),
        Arc::new(CrlList::new()),
        VerifyFlags::empty(),
    );
    assert_eq!(verifier.trust_store().len(), 1);
    assert_eq!(Arc::strong_count(&store), 2);
    assert!(verifier.verify(&[leaf(), intermediate()]).unwrap().is_success());
}

const SERVER_DER: &[u8] = include_bytes!("data/chain/server.der");
const INTERMEDIATE_DER: &[u8] = include_bytes!("data/chain/intermediate-ca.der");
const ROOT_DER: &[u8] = include_bytes!("data/chain/root-ca.der");

/// 2048-bit chain with the usual extensions, as produced by common tooling.
#[test]
fn test_externally_issued_chain() {
    init_tracing();
    let mut store = TrustStore::new();
    store.add_der(ROOT_DER).unwrap();
    let verifier = verifier(store, VerifyFlags::empty());

    let root = Certificate::from_der(ROOT_DER).unwrap();
    let intermediate = Certificate::from_der(INTERMEDIATE_DER).unwrap();
    let server = Certificate::from_der(SERVER_DER).unwrap();
    assert!(root.is_ca() && root.is_self_signed());
    assert!(intermediate.is_ca());
    assert!(!server.is_ca());

    assert!(verifier
        .verify_der(&[SERVER_DER, INTERMEDIATE_DER, ROOT_DER])
        .unwrap()
        .is_success());
    assert!(verifier
        .verify_der(&[SERVER_DER, INTERMEDIATE_DER])
        .unwrap()
        .is_success());
    assert_eq!(
        verifier.verify_der(&[SERVER_DER]).unwrap().status(),
        CertificateStatus::SIGNER_NOT_FOUND | INVALID
    );
}
