//! Error types for sectls core.

use core::fmt;

/// Result type for sectls operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur in sectls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid configuration
    InvalidConfig(String),

    /// Protocol error
    ProtocolError(ProtocolError),

    /// Cryptographic error reported by the provider
    CryptoError(String),

    /// I/O error
    IoError(String),

    /// Handshake failure
    HandshakeFailure(String),

    /// Fatal alert received from peer
    AlertReceived(AlertDescription),

    /// Record arrived in a state where it is not allowed
    UnexpectedMessage(String),

    /// Invalid message format
    InvalidMessage(String),

    /// Length header disagrees with the bytes that follow it
    UnexpectedLength {
        /// Length announced by the header
        declared: usize,
        /// Bytes actually present after the header
        actual: usize,
    },

    /// Destination buffer cannot hold the encoding
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// Payload cannot be expressed with a 16-bit length header
    PayloadTooLarge(usize),

    /// Application extension callback returned an error code
    CallbackFailed(i32),

    /// Certificate chain was empty
    NoCertificate,

    /// Certificate could not be decoded
    InvalidCertificate(String),

    /// Public-key or signature algorithm this core does not handle
    UnsupportedAlgorithm(String),

    /// Decryption failure (record protection or RSA signature recovery)
    DecryptionFailed,

    /// DigestInfo structure is not well formed
    MalformedDigestInfo(String),

    /// DigestInfo names a hash algorithm we do not know
    UnknownDigestAlgorithm(String),

    /// Recovered digest has the wrong size for its algorithm
    DigestLengthMismatch {
        /// Output size of the identified algorithm
        expected: usize,
        /// Size of the recovered digest
        actual: usize,
    },

    /// Connection has no open transport
    ConnectionClosed,

    /// Idle timeout expired
    Timeout,

    /// Internal error
    InternalError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::ProtocolError(e) => write!(f, "Protocol error: {:?}", e),
            Error::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            Error::IoError(msg) => write!(f, "I/O error: {}", msg),
            Error::HandshakeFailure(msg) => write!(f, "Handshake failure: {}", msg),
            Error::AlertReceived(desc) => write!(f, "Alert received: {:?}", desc),
            Error::UnexpectedMessage(msg) => write!(f, "Unexpected message: {}", msg),
            Error::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            Error::UnexpectedLength { declared, actual } => write!(
                f,
                "Unexpected length: header says {} bytes, {} present",
                declared, actual
            ),
            Error::BufferTooSmall { needed, available } => write!(
                f,
                "Buffer too small: need {} bytes, have {}",
                needed, available
            ),
            Error::PayloadTooLarge(len) => write!(f, "Payload too large: {} bytes", len),
            Error::CallbackFailed(code) => write!(f, "Extension callback failed: {}", code),
            Error::NoCertificate => write!(f, "No certificate supplied"),
            Error::InvalidCertificate(msg) => write!(f, "Invalid certificate: {}", msg),
            Error::UnsupportedAlgorithm(msg) => write!(f, "Unsupported algorithm: {}", msg),
            Error::DecryptionFailed => write!(f, "Decryption failed"),
            Error::MalformedDigestInfo(msg) => write!(f, "Malformed DigestInfo: {}", msg),
            Error::UnknownDigestAlgorithm(oid) => write!(f, "Unknown digest algorithm: {}", oid),
            Error::DigestLengthMismatch { expected, actual } => write!(
                f,
                "Digest length mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            Error::ConnectionClosed => write!(f, "Connection closed"),
            Error::Timeout => write!(f, "Idle timeout expired"),
            Error::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<sectls_crypto::Error> for Error {
    fn from(e: sectls_crypto::Error) -> Self {
        match e {
            sectls_crypto::Error::DecryptionFailed => Error::DecryptionFailed,
            sectls_crypto::Error::UnsupportedAlgorithm(name) => Error::UnsupportedAlgorithm(name),
            other => Error::CryptoError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::ProtocolError(e)
    }
}

impl Error {
    /// Alert to send to the peer when this error terminates a connection.
    pub fn alert_description(&self) -> AlertDescription {
        match self {
            Error::ProtocolError(e) => e.alert_description(),
            Error::UnexpectedMessage(_) => AlertDescription::UnexpectedMessage,
            Error::InvalidMessage(_)
            | Error::UnexpectedLength { .. }
            | Error::MalformedDigestInfo(_) => AlertDescription::DecodeError,
            Error::DecryptionFailed => AlertDescription::BadRecordMac,
            Error::InvalidCertificate(_) | Error::NoCertificate => {
                AlertDescription::BadCertificate
            },
            Error::UnsupportedAlgorithm(_) | Error::UnknownDigestAlgorithm(_) => {
                AlertDescription::UnsupportedCertificate
            },
            Error::DigestLengthMismatch { .. } => AlertDescription::DecryptError,
            _ => AlertDescription::HandshakeFailure,
        }
    }
}

/// Protocol-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolError {
    /// Decode error
    DecodeError,

    /// Unexpected message type
    UnexpectedMessage,

    /// Bad record MAC
    BadRecordMac,

    /// Record overflow
    RecordOverflow,

    /// Handshake failure
    HandshakeFailure,

    /// Bad certificate
    BadCertificate,

    /// Unsupported certificate
    UnsupportedCertificate,

    /// Certificate revoked
    CertificateRevoked,

    /// Certificate unknown
    CertificateUnknown,

    /// Illegal parameter
    IllegalParameter,

    /// Unknown CA
    UnknownCa,

    /// Decrypt error
    DecryptError,

    /// Protocol version not supported
    ProtocolVersion,

    /// Internal error
    InternalError,

    /// Unsupported extension
    UnsupportedExtension,
}

impl ProtocolError {
    /// Alert description matching this error.
    pub const fn alert_description(self) -> AlertDescription {
        match self {
            ProtocolError::DecodeError => AlertDescription::DecodeError,
            ProtocolError::UnexpectedMessage => AlertDescription::UnexpectedMessage,
            ProtocolError::BadRecordMac => AlertDescription::BadRecordMac,
            ProtocolError::RecordOverflow => AlertDescription::RecordOverflow,
            ProtocolError::HandshakeFailure => AlertDescription::HandshakeFailure,
            ProtocolError::BadCertificate => AlertDescription::BadCertificate,
            ProtocolError::UnsupportedCertificate => AlertDescription::UnsupportedCertificate,
            ProtocolError::CertificateRevoked => AlertDescription::CertificateRevoked,
            ProtocolError::CertificateUnknown => AlertDescription::CertificateUnknown,
            ProtocolError::IllegalParameter => AlertDescription::IllegalParameter,
            ProtocolError::UnknownCa => AlertDescription::UnknownCa,
            ProtocolError::DecryptError => AlertDescription::DecryptError,
            ProtocolError::ProtocolVersion => AlertDescription::ProtocolVersion,
            ProtocolError::InternalError => AlertDescription::InternalError,
            ProtocolError::UnsupportedExtension => AlertDescription::UnsupportedExtension,
        }
    }
}

/// TLS alert descriptions (RFC 5246 Section 7.2, plus the TLS/IA codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertDescription {
    /// Close notify
    CloseNotify = 0,

    /// Unexpected message
    UnexpectedMessage = 10,

    /// Bad record MAC
    BadRecordMac = 20,

    /// Decryption failed (reserved since TLS 1.1)
    DecryptionFailed = 21,

    /// Record overflow
    RecordOverflow = 22,

    /// Decompression failure
    DecompressionFailure = 30,

    /// Handshake failure
    HandshakeFailure = 40,

    /// No certificate (SSLv3 only)
    NoCertificate = 41,

    /// Bad certificate
    BadCertificate = 42,

    /// Unsupported certificate
    UnsupportedCertificate = 43,

    /// Certificate revoked
    CertificateRevoked = 44,

    /// Certificate expired
    CertificateExpired = 45,

    /// Certificate unknown
    CertificateUnknown = 46,

    /// Illegal parameter
    IllegalParameter = 47,

    /// Unknown CA
    UnknownCa = 48,

    /// Access denied
    AccessDenied = 49,

    /// Decode error
    DecodeError = 50,

    /// Decrypt error
    DecryptError = 51,

    /// Export restriction
    ExportRestriction = 60,

    /// Protocol version
    ProtocolVersion = 70,

    /// Insufficient security
    InsufficientSecurity = 71,

    /// Internal error
    InternalError = 80,

    /// User canceled
    UserCanceled = 90,

    /// No renegotiation
    NoRenegotiation = 100,

    /// Unsupported extension
    UnsupportedExtension = 110,

    /// Inner application failure (TLS/IA)
    InnerApplicationFailure = 208,

    /// Inner application verification (TLS/IA)
    InnerApplicationVerification = 209,

    /// A description code this crate does not name, kept as received
    Unknown(u8),
}

impl AlertDescription {
    /// Convert from wire format (u8).
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AlertDescription::CloseNotify),
            10 => Some(AlertDescription::UnexpectedMessage),
            20 => Some(AlertDescription::BadRecordMac),
            21 => Some(AlertDescription::DecryptionFailed),
            22 => Some(AlertDescription::RecordOverflow),
            30 => Some(AlertDescription::DecompressionFailure),
            40 => Some(AlertDescription::HandshakeFailure),
            41 => Some(AlertDescription::NoCertificate),
            42 => Some(AlertDescription::BadCertificate),
            43 => Some(AlertDescription::UnsupportedCertificate),
            44 => Some(AlertDescription::CertificateRevoked),
            45 => Some(AlertDescription::CertificateExpired),
            46 => Some(AlertDescription::CertificateUnknown),
            47 => Some(AlertDescription::IllegalParameter),
            48 => Some(AlertDescription::UnknownCa),
            49 => Some(AlertDescription::AccessDenied),
            50 => Some(AlertDescription::DecodeError),
            51 => Some(AlertDescription::DecryptError),
            60 => Some(AlertDescription::ExportRestriction),
            70 => Some(AlertDescription::ProtocolVersion),
            71 => Some(AlertDescription::InsufficientSecurity),
            80 => Some(AlertDescription::InternalError),
            90 => Some(AlertDescription::UserCanceled),
            100 => Some(AlertDescription::NoRenegotiation),
            110 => Some(AlertDescription::UnsupportedExtension),
            208 => Some(AlertDescription::InnerApplicationFailure),
            209 => Some(AlertDescription::InnerApplicationVerification),
            _ => None,
        }
    }

    /// Convert to wire format (u8).
    pub const fn to_u8(self) -> u8 {
        match self {
            AlertDescription::CloseNotify => 0,
            AlertDescription::UnexpectedMessage => 10,
            AlertDescription::BadRecordMac => 20,
            AlertDescription::DecryptionFailed => 21,
            AlertDescription::RecordOverflow => 22,
            AlertDescription::DecompressionFailure => 30,
            AlertDescription::HandshakeFailure => 40,
            AlertDescription::NoCertificate => 41,
            AlertDescription::BadCertificate => 42,
            AlertDescription::UnsupportedCertificate => 43,
            AlertDescription::CertificateRevoked => 44,
            AlertDescription::CertificateExpired => 45,
            AlertDescription::CertificateUnknown => 46,
            AlertDescription::IllegalParameter => 47,
            AlertDescription::UnknownCa => 48,
            AlertDescription::AccessDenied => 49,
            AlertDescription::DecodeError => 50,
            AlertDescription::DecryptError => 51,
            AlertDescription::ExportRestriction => 60,
            AlertDescription::ProtocolVersion => 70,
            AlertDescription::InsufficientSecurity => 71,
            AlertDescription::InternalError => 80,
            AlertDescription::UserCanceled => 90,
            AlertDescription::NoRenegotiation => 100,
            AlertDescription::UnsupportedExtension => 110,
            AlertDescription::InnerApplicationFailure => 208,
            AlertDescription::InnerApplicationVerification => 209,
            AlertDescription::Unknown(code) => code,
        }
    }

    /// Like [`from_u8`](Self::from_u8), but an unnamed code comes back as
    /// [`AlertDescription::Unknown`].
    pub const fn from_u8_lossless(value: u8) -> Self {
        match Self::from_u8(value) {
            Some(description) => description,
            None => AlertDescription::Unknown(value),
        }
    }

    /// Check if this description may be sent at warning level.
    ///
    /// In TLS 1.2 the level byte decides fatality; these are the
    /// descriptions a peer legitimately sends as warnings.
    pub const fn is_warning_capable(self) -> bool {
        matches!(
            self,
            AlertDescription::CloseNotify
                | AlertDescription::UserCanceled
                | AlertDescription::NoRenegotiation
                | AlertDescription::NoCertificate
                | AlertDescription::BadCertificate
                | AlertDescription::UnsupportedCertificate
                | AlertDescription::CertificateRevoked
                | AlertDescription::CertificateExpired
                | AlertDescription::CertificateUnknown
        )
    }
}
