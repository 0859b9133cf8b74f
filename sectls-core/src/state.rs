//! TLS connection state management.

use crate::protocol::{
    CertificateType, CipherSuite, CompressionMethod, MacAlgorithm, ProtocolVersion,
};
use crate::record::MAX_FRAGMENT_SIZE;

/// Connection role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Client
    Client,

    /// Server
    Server,
}

/// Connection lifecycle state.
///
/// ```text
/// Init ──handshake ok──▶ HandshakeComplete ──close──▶ Closed
///   │                          │
///   └──handshake error──▶ HandshakeFailed     (fatal alert / timeout) ──▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, handshake records still being exchanged
    Init,

    /// Handshake finished; application data may flow
    HandshakeComplete,

    /// Handshake failed (terminal)
    HandshakeFailed,

    /// Connection closed (terminal)
    Closed,
}

impl ConnectionState {
    /// Check if the state is terminal.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionState::HandshakeFailed | ConnectionState::Closed
        )
    }

    /// Check if the connection is established.
    pub const fn is_connected(self) -> bool {
        matches!(self, ConnectionState::HandshakeComplete)
    }
}

/// Parameters negotiated by the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityParameters {
    /// Connection role (client or server)
    pub role: Role,

    /// Negotiated protocol version
    pub version: ProtocolVersion,

    /// Negotiated cipher suite
    pub cipher_suite: CipherSuite,

    /// Record MAC algorithm
    pub mac_algorithm: MacAlgorithm,

    /// Record compression method
    pub compression_method: CompressionMethod,

    /// Peer certificate type
    pub certificate_type: CertificateType,

    /// Largest plaintext fragment we send
    pub max_record_send_size: usize,

    /// Largest plaintext fragment we accept
    pub max_record_recv_size: usize,
}

impl SecurityParameters {
    /// Parameters in effect before any handshake has completed.
    pub fn initial(role: Role) -> Self {
        Self {
            role,
            version: ProtocolVersion::Tls12,
            cipher_suite: CipherSuite::NULL_WITH_NULL_NULL,
            mac_algorithm: MacAlgorithm::Null,
            compression_method: CompressionMethod::Null,
            certificate_type: CertificateType::X509,
            max_record_send_size: MAX_FRAGMENT_SIZE,
            max_record_recv_size: MAX_FRAGMENT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ConnectionState::Init.is_terminal());
        assert!(!ConnectionState::HandshakeComplete.is_terminal());
        assert!(ConnectionState::HandshakeFailed.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::HandshakeComplete.is_connected());
    }

    #[test]
    fn test_initial_parameters() {
        let params = SecurityParameters::initial(Role::Server);
        assert_eq!(params.cipher_suite, CipherSuite::NULL_WITH_NULL_NULL);
        assert_eq!(params.mac_algorithm, MacAlgorithm::Null);
        assert_eq!(params.max_record_recv_size, 16384);
    }
}
