//! Client configuration and connection setup.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sectls_core::certificate_validator::{ChainVerifier, CrlList, CrlLookup, TrustStore, VerifyFlags};
use sectls_core::handshake::HandshakeEngine;
use sectls_core::opaque_prf_input::OpaquePrfInput;
use sectls_core::{
    Config, Connection, Error, Extensions, HttpLayer, Result, Role, TlsSession, Transport,
};
use sectls_crypto::CryptoProvider;
use sectls_crypto_rustcrypto::RustCryptoProvider;

/// Client-side settings.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base connection configuration
    pub config: Config,

    /// Trusted root certificates
    root_store: Arc<TrustStore>,

    /// Revocation source for server chains
    crl: Arc<dyn CrlLookup>,

    /// Verify server certificate
    pub verify_server_certificates: bool,

    /// Our opaque PRF input contribution; empty offers nothing
    pub opaque_prf_input: Vec<u8>,

    provider: Arc<dyn CryptoProvider>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("config", &self.config)
            .field("roots", &self.root_store.len())
            .field("crl", &self.crl)
            .field("verify_server_certificates", &self.verify_server_certificates)
            .field("opaque_prf_input", &self.opaque_prf_input.len())
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Trusted roots.
    pub fn root_store(&self) -> &TrustStore {
        &self.root_store
    }

    /// Chain verifier over the configured roots.
    pub fn verifier(&self) -> ChainVerifier {
        ChainVerifier::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.root_store),
            Arc::clone(&self.crl),
            self.config.verify_flags,
        )
    }

    /// Fresh extension registry for one connection.
    pub fn extensions(&self) -> Extensions {
        let mut extensions = Extensions::new();
        if !self.opaque_prf_input.is_empty() {
            extensions.register(Box::new(OpaquePrfInput::client(
                self.opaque_prf_input.clone(),
            )));
        }
        extensions
    }

    /// Wrap a connected transport in a client connection.
    pub fn connect<T: Transport, H: HttpLayer>(
        &self,
        transport: T,
        engine: Box<dyn HandshakeEngine>,
        http: H,
    ) -> Connection<T, H> {
        let verifier = self.verify_server_certificates.then(|| self.verifier());
        let mut session = TlsSession::new(
            Role::Client,
            engine,
            Arc::clone(&self.provider),
            verifier,
            self.extensions(),
        );
        session
            .record_layer_mut()
            .set_max_fragment_length(self.config.max_fragment_length as usize);

        Connection::new(transport, session, http, self.config.timeout)
    }
}

/// Builder for client configuration.
pub struct ClientConfigBuilder {
    config: Option<Config>,
    root_certificates: Vec<Vec<u8>>,
    crl: Option<Arc<dyn CrlLookup>>,
    verify_server_certificates: bool,
    opaque_prf_input: Vec<u8>,
    provider: Option<Arc<dyn CryptoProvider>>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            config: None,
            root_certificates: Vec::new(),
            crl: None,
            verify_server_certificates: true,
            opaque_prf_input: Vec::new(),
            provider: None,
        }
    }
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("config", &self.config)
            .field("root_certificates", &self.root_certificates.len())
            .field("crl", &self.crl)
            .field("verify_server_certificates", &self.verify_server_certificates)
            .finish()
    }
}

impl ClientConfigBuilder {
    /// Replace the base configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the idle timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut config = self.config.unwrap_or_default();
        config.timeout = timeout;
        self.config = Some(config);
        self
    }

    /// Set server certificate verification flags.
    pub fn with_verify_flags(mut self, flags: VerifyFlags) -> Self {
        let mut config = self.config.unwrap_or_default();
        config.verify_flags = flags;
        self.config = Some(config);
        self
    }

    /// Set trusted root certificates (DER-encoded).
    pub fn with_root_certificates(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.root_certificates = certs;
        self
    }

    /// Set the revocation source.
    pub fn with_crl(mut self, crl: Arc<dyn CrlLookup>) -> Self {
        self.crl = Some(crl);
        self
    }

    /// Enable or disable server certificate verification.
    pub fn with_server_verification(mut self, verify: bool) -> Self {
        self.verify_server_certificates = verify;
        self
    }

    /// Offer an opaque PRF input contribution.
    pub fn with_opaque_prf_input(mut self, contribution: Vec<u8>) -> Self {
        self.opaque_prf_input = contribution;
        self
    }

    /// Use a different crypto provider.
    pub fn with_crypto_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> Result<ClientConfig> {
        let base = self.config.unwrap_or_default();
        let config = Config::builder()
            .with_timeout(base.timeout)
            .with_verify_flags(base.verify_flags)
            .with_max_fragment_length(base.max_fragment_length)
            .build()?;

        if self.verify_server_certificates && self.root_certificates.is_empty() {
            return Err(Error::InvalidConfig(
                "Server verification enabled but no root certificates provided".into(),
            ));
        }

        if self.opaque_prf_input.len() > u16::MAX as usize {
            return Err(Error::PayloadTooLarge(self.opaque_prf_input.len()));
        }

        let mut root_store = TrustStore::new();
        for der in &self.root_certificates {
            root_store.add_der(der)?;
        }

        Ok(ClientConfig {
            config,
            root_store: Arc::new(root_store),
            crl: self.crl.unwrap_or_else(|| Arc::new(CrlList::new())),
            verify_server_certificates: self.verify_server_certificates,
            opaque_prf_input: self.opaque_prf_input,
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(RustCryptoProvider::new())),
        })
    }
}
