//! Handshake engine interface.
//!
//! Key exchange and handshake message processing live outside this crate.
//! A connection feeds every handshake-phase record to a [`HandshakeEngine`]
//! one step at a time, through a [`HandshakeContext`] that exposes the
//! session's collaborators:
//!
//! ```text
//! Connection ──record──▶ HandshakeEngine::step(ctx, type, fragment)
//!                              │
//!                              ├─ ctx.provider()     hashing, RSA
//!                              ├─ ctx.verifier()     peer chain verification
//!                              ├─ ctx.extensions()   hello extension codec
//!                              └─ ctx.send(..)       queue outgoing records
//! ```
//!
//! When the engine returns [`HandshakeStep::Complete`] the connection
//! installs the negotiated parameters and record protection.

use std::fmt;

use sectls_crypto::{CryptoProvider, RecordProtection};
use zeroize::Zeroizing;

use crate::certificate_validator::{ChainVerifier, VerificationOutcome};
use crate::error::{Error, ProtocolError, Result};
use crate::extensions::Extensions;
use crate::protocol::ContentType;
use crate::state::{Role, SecurityParameters};

/// Largest certificate_list a Certificate message may carry (2^24 - 1).
const MAX_CERTIFICATE_LIST: usize = 0x00ff_ffff;

/// Result of one engine step.
#[derive(Debug)]
pub enum HandshakeStep {
    /// More handshake records are needed
    InProgress,

    /// Handshake finished
    Complete(Box<HandshakeOutcome>),
}

/// What a finished handshake hands the connection.
#[derive(Debug)]
pub struct HandshakeOutcome {
    /// Negotiated parameters
    pub parameters: SecurityParameters,

    /// Protection for incoming records
    pub read_protection: Box<dyn RecordProtection>,

    /// Protection for outgoing records
    pub write_protection: Box<dyn RecordProtection>,
}

/// An external handshake implementation driven one record at a time.
pub trait HandshakeEngine: Send + fmt::Debug {
    /// Process one record of `content_type` (Handshake, or ChangeCipherSpec
    /// while the handshake is running).
    fn step(
        &mut self,
        ctx: &mut HandshakeContext<'_>,
        content_type: ContentType,
        fragment: &[u8],
    ) -> Result<HandshakeStep>;
}

/// Collaborators visible to the engine during one step.
pub struct HandshakeContext<'a> {
    role: Role,
    provider: &'a dyn CryptoProvider,
    verifier: Option<&'a ChainVerifier>,
    extensions: &'a mut Extensions,
    transcript: &'a mut Zeroizing<Vec<u8>>,
    outgoing: Vec<(ContentType, Vec<u8>)>,
}

impl fmt::Debug for HandshakeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("role", &self.role)
            .field("verifier", &self.verifier)
            .field("extensions", &self.extensions)
            .field("transcript_len", &self.transcript.len())
            .field("outgoing", &self.outgoing.len())
            .finish()
    }
}

impl<'a> HandshakeContext<'a> {
    /// Create a context for one step.
    pub fn new(
        role: Role,
        provider: &'a dyn CryptoProvider,
        verifier: Option<&'a ChainVerifier>,
        extensions: &'a mut Extensions,
        transcript: &'a mut Zeroizing<Vec<u8>>,
    ) -> Self {
        Self {
            role,
            provider,
            verifier,
            extensions,
            transcript,
            outgoing: Vec::new(),
        }
    }

    /// Our role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Crypto provider.
    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider
    }

    /// Chain verifier, if peer authentication is configured.
    pub fn verifier(&self) -> Option<&ChainVerifier> {
        self.verifier
    }

    /// The session's extension registry.
    pub fn extensions(&mut self) -> &mut Extensions {
        &mut *self.extensions
    }

    /// Handshake bytes seen so far in both directions.
    pub fn transcript(&self) -> &[u8] {
        self.transcript.as_slice()
    }

    /// Append handshake bytes to the transcript.
    pub fn add_to_transcript(&mut self, data: &[u8]) {
        self.transcript.extend_from_slice(data);
    }

    /// Queue a record for the peer. Handshake records also enter the transcript.
    pub fn send(&mut self, content_type: ContentType, data: &[u8]) {
        if content_type == ContentType::Handshake {
            self.transcript.extend_from_slice(data);
        }
        self.outgoing.push((content_type, data.to_vec()));
    }

    /// Verify a peer Certificate message body against the configured trust.
    ///
    /// Without a configured verifier the peer cannot be authenticated and
    /// the result is a `CertificateUnknown` protocol error.
    pub fn verify_peer_certificates(&self, body: &[u8]) -> Result<VerificationOutcome> {
        let verifier = self
            .verifier
            .ok_or(Error::ProtocolError(ProtocolError::CertificateUnknown))?;
        let chain = decode_certificate_list(body)?;
        verifier.verify_der(chain.as_slice())
    }

    /// Drain the queued outgoing records.
    pub fn take_outgoing(&mut self) -> Vec<(ContentType, Vec<u8>)> {
        std::mem::take(&mut self.outgoing)
    }
}

/// Split a Certificate handshake message body into DER certificates.
///
/// ```text
/// opaque ASN.1Cert<1..2^24-1>;
/// struct {
///     ASN.1Cert certificate_list<0..2^24-1>;
/// } Certificate;
/// ```
pub fn decode_certificate_list(body: &[u8]) -> Result<Vec<&[u8]>> {
    let (total, mut rest) = read_u24(body)?;
    if total != rest.len() {
        return Err(Error::UnexpectedLength {
            declared: total,
            actual: rest.len(),
        });
    }

    let mut certificates = Vec::new();
    while !rest.is_empty() {
        let (len, tail) = read_u24(rest)?;
        if len == 0 || len > tail.len() {
            return Err(Error::UnexpectedLength {
                declared: len,
                actual: tail.len(),
            });
        }
        certificates.push(&tail[..len]);
        rest = &tail[len..];
    }
    Ok(certificates)
}

/// Build a Certificate handshake message body from DER certificates.
pub fn encode_certificate_list<B: AsRef<[u8]>>(chain: &[B]) -> Result<Vec<u8>> {
    let total: usize = chain.iter().map(|cert| 3 + cert.as_ref().len()).sum();
    if total > MAX_CERTIFICATE_LIST {
        return Err(Error::PayloadTooLarge(total));
    }

    let mut out = Vec::with_capacity(3 + total);
    put_u24(&mut out, total);
    for cert in chain {
        put_u24(&mut out, cert.as_ref().len());
        out.extend_from_slice(cert.as_ref());
    }
    Ok(out)
}

fn read_u24(data: &[u8]) -> Result<(usize, &[u8])> {
    if data.len() < 3 {
        return Err(Error::UnexpectedLength {
            declared: 3,
            actual: data.len(),
        });
    }
    let len = (data[0] as usize) << 16 | (data[1] as usize) << 8 | data[2] as usize;
    Ok((len, &data[3..]))
}

fn put_u24(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&[(value >> 16) as u8, (value >> 8) as u8, value as u8]);
}
