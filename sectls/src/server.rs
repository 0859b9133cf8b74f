//! Server configuration and connection setup.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sectls_core::certificate_validator::{ChainVerifier, CrlLookup, TrustStore, VerifyFlags};
use sectls_core::handshake::HandshakeEngine;
use sectls_core::opaque_prf_input::{OpaquePrfInput, PrfInputCallback};
use sectls_core::{
    Config, Connection, Error, Extensions, HttpLayer, Result, Role, TlsSession, Transport,
};
use sectls_crypto::CryptoProvider;
use sectls_crypto_rustcrypto::RustCryptoProvider;

/// Server-side settings shared by every accepted connection.
#[derive(Clone)]
pub struct ServerConfig {
    /// Base connection configuration
    pub config: Config,

    /// Client certificate trust anchors; empty disables client verification
    trust_store: Arc<TrustStore>,

    /// Revocation source used with `trust_store`
    crl: Option<Arc<dyn CrlLookup>>,

    /// Producer of the server's opaque PRF input contribution
    opaque_prf_input: Option<PrfInputCallback>,

    provider: Arc<dyn CryptoProvider>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("config", &self.config)
            .field("trust_anchors", &self.trust_store.len())
            .field("crl", &self.crl)
            .field("opaque_prf_input", &self.opaque_prf_input.is_some())
            .finish()
    }
}

impl ServerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Client certificate trust anchors.
    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Whether client certificate chains are verified.
    pub fn verifies_clients(&self) -> bool {
        !self.trust_store.is_empty()
    }

    /// Build the chain verifier for client certificates, if enabled.
    pub fn verifier(&self) -> Option<ChainVerifier> {
        if !self.verifies_clients() {
            return None;
        }

        let crl: Arc<dyn CrlLookup> = match &self.crl {
            Some(crl) => Arc::clone(crl),
            None => Arc::new(sectls_core::CrlList::new()),
        };
        Some(ChainVerifier::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.trust_store),
            crl,
            self.config.verify_flags,
        ))
    }

    /// Fresh extension registry for one connection.
    pub fn extensions(&self) -> Extensions {
        let mut extensions = Extensions::new();
        if let Some(callback) = &self.opaque_prf_input {
            extensions.register(Box::new(OpaquePrfInput::server(Arc::clone(callback))));
        }
        extensions
    }

    /// Wrap an accepted transport in a server connection.
    ///
    /// The connection starts in `Init`; feed it readiness events with
    /// [`Connection::on_readable`] and [`Connection::on_idle`].
    pub fn accept<T: Transport, H: HttpLayer>(
        &self,
        transport: T,
        engine: Box<dyn HandshakeEngine>,
        http: H,
    ) -> Connection<T, H> {
        let mut session = TlsSession::new(
            Role::Server,
            engine,
            Arc::clone(&self.provider),
            self.verifier(),
            self.extensions(),
        );
        session
            .record_layer_mut()
            .set_max_fragment_length(self.config.max_fragment_length as usize);

        Connection::new(transport, session, http, self.config.timeout)
    }
}

/// Builder for server configuration.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: Option<Config>,
    trust_anchors: Vec<Vec<u8>>,
    crl: Option<Arc<dyn CrlLookup>>,
    opaque_prf_input: Option<PrfInputCallback>,
    provider: Option<Arc<dyn CryptoProvider>>,
}

impl fmt::Debug for ServerConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfigBuilder")
            .field("config", &self.config)
            .field("trust_anchors", &self.trust_anchors.len())
            .field("crl", &self.crl)
            .field("opaque_prf_input", &self.opaque_prf_input.is_some())
            .finish()
    }
}

impl ServerConfigBuilder {
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

    /// Set client certificate verification flags.
    pub fn with_verify_flags(mut self, flags: VerifyFlags) -> Self {
        let mut config = self.config.unwrap_or_default();
        config.verify_flags = flags;
        self.config = Some(config);
        self
    }

    /// Set the maximum outgoing fragment length.
    pub fn with_max_fragment_length(mut self, length: u16) -> Self {
        let mut config = self.config.unwrap_or_default();
        config.max_fragment_length = length;
        self.config = Some(config);
        self
    }

    /// Set trusted client CA certificates (DER-encoded).
    pub fn with_trust_anchors(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.trust_anchors = certs;
        self
    }

    /// Set the revocation source.
    pub fn with_crl(mut self, crl: Arc<dyn CrlLookup>) -> Self {
        self.crl = Some(crl);
        self
    }

    /// Enable the opaque PRF input extension.
    pub fn with_opaque_prf_input(mut self, callback: PrfInputCallback) -> Self {
        self.opaque_prf_input = Some(callback);
        self
    }

    /// Use a different crypto provider.
    pub fn with_crypto_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> Result<ServerConfig> {
        let base = self.config.unwrap_or_default();
        let config = Config::builder()
            .with_timeout(base.timeout)
            .with_verify_flags(base.verify_flags)
            .with_max_fragment_length(base.max_fragment_length)
            .build()?;

        if self.crl.is_some() && self.trust_anchors.is_empty() {
            return Err(Error::InvalidConfig(
                "Revocation list set but no trust anchors provided".into(),
            ));
        }

        let mut trust_store = TrustStore::new();
        for der in &self.trust_anchors {
            trust_store.add_der(der)?;
        }
        tracing::debug!(anchors = trust_store.len(), "Built server configuration");

        Ok(ServerConfig {
            config,
            trust_store: Arc::new(trust_store),
            crl: self.crl,
            opaque_prf_input: self.opaque_prf_input,
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(RustCryptoProvider::new())),
        })
    }
}
