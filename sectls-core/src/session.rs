//! Per-connection TLS session state.

use std::fmt;
use std::sync::Arc;

use sectls_crypto::CryptoProvider;
use zeroize::{Zeroize, Zeroizing};

use crate::certificate_validator::ChainVerifier;
use crate::error::Result;
use crate::extensions::Extensions;
use crate::handshake::{HandshakeContext, HandshakeEngine, HandshakeOutcome, HandshakeStep};
use crate::protocol::{
    CertificateType, CipherSuite, CompressionMethod, ContentType, MacAlgorithm, ProtocolVersion,
};
use crate::record::RecordLayer;
use crate::state::{Role, SecurityParameters};

/// Session state owned by one connection.
pub struct TlsSession {
    params: SecurityParameters,
    extensions: Extensions,
    record_layer: RecordLayer,
    transcript: Zeroizing<Vec<u8>>,
    engine: Box<dyn HandshakeEngine>,
    provider: Arc<dyn CryptoProvider>,
    verifier: Option<ChainVerifier>,
    resumable: bool,
    valid: bool,
    read_eof: bool,
}

impl fmt::Debug for TlsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSession")
            .field("params", &self.params)
            .field("extensions", &self.extensions)
            .field("record_layer", &self.record_layer)
            .field("engine", &self.engine)
            .field("verifier", &self.verifier)
            .field("resumable", &self.resumable)
            .field("valid", &self.valid)
            .field("read_eof", &self.read_eof)
            .finish()
    }
}

impl TlsSession {
    /// Create a session for `role`.
    pub fn new(
        role: Role,
        engine: Box<dyn HandshakeEngine>,
        provider: Arc<dyn CryptoProvider>,
        verifier: Option<ChainVerifier>,
        extensions: Extensions,
    ) -> Self {
        let params = SecurityParameters::initial(role);
        Self {
            record_layer: RecordLayer::new(params.version),
            params,
            extensions,
            transcript: Zeroizing::new(Vec::new()),
            engine,
            provider,
            verifier,
            resumable: true,
            valid: true,
            read_eof: false,
        }
    }

    /// Our role.
    pub fn role(&self) -> Role {
        self.params.role
    }

    /// Negotiated parameters (initial values before the handshake completes).
    pub fn parameters(&self) -> &SecurityParameters {
        &self.params
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> ProtocolVersion {
        self.params.version
    }

    /// Negotiated cipher suite.
    pub fn cipher_suite(&self) -> CipherSuite {
        self.params.cipher_suite
    }

    /// Negotiated record MAC.
    pub fn mac_algorithm(&self) -> MacAlgorithm {
        self.params.mac_algorithm
    }

    /// Negotiated compression method.
    pub fn compression_method(&self) -> CompressionMethod {
        self.params.compression_method
    }

    /// Negotiated certificate type.
    pub fn certificate_type(&self) -> CertificateType {
        self.params.certificate_type
    }

    /// Hello extension registry.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable hello extension registry.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Record layer.
    pub fn record_layer(&self) -> &RecordLayer {
        &self.record_layer
    }

    /// Mutable record layer.
    pub fn record_layer_mut(&mut self) -> &mut RecordLayer {
        &mut self.record_layer
    }

    /// Whether the session may be resumed.
    pub fn is_resumable(&self) -> bool {
        self.resumable
    }

    /// Whether the session is still usable.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the peer has closed its write side.
    pub fn is_read_eof(&self) -> bool {
        self.read_eof
    }

    /// Record that the peer closed its write side.
    pub fn mark_read_eof(&mut self) {
        self.read_eof = true;
    }

    /// Mark the session unresumable and invalid.
    pub fn invalidate(&mut self) {
        self.resumable = false;
        self.valid = false;
    }

    /// Run one handshake step for a record of `content_type`.
    ///
    /// Records the engine emits are queued on the record layer under the
    /// current protection. Returns `true` once the handshake has completed.
    pub fn step_handshake(&mut self, content_type: ContentType, fragment: &[u8]) -> Result<bool> {
        if content_type == ContentType::Handshake {
            self.transcript.extend_from_slice(fragment);
        }

        let mut ctx = HandshakeContext::new(
            self.params.role,
            self.provider.as_ref(),
            self.verifier.as_ref(),
            &mut self.extensions,
            &mut self.transcript,
        );
        let step = self.engine.step(&mut ctx, content_type, fragment);
        let outgoing = ctx.take_outgoing();

        for (content_type, data) in outgoing {
            self.record_layer.queue(content_type, &data)?;
        }

        match step? {
            HandshakeStep::InProgress => Ok(false),
            HandshakeStep::Complete(outcome) => {
                self.install(*outcome);
                Ok(true)
            },
        }
    }

    fn install(&mut self, outcome: HandshakeOutcome) {
        let HandshakeOutcome {
            parameters,
            read_protection,
            write_protection,
        } = outcome;

        self.record_layer.set_version(parameters.version);
        self.record_layer
            .set_max_fragment_length(parameters.max_record_send_size);
        self.record_layer
            .install_protection(read_protection, write_protection);
        self.params = parameters;
        self.transcript.zeroize();
    }

    /// Wipe handshake scratch state and drop buffered records.
    pub fn teardown(&mut self) {
        self.transcript.zeroize();
        self.record_layer.clear();
    }
}
