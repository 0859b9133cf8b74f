//! Error types for the cryptographic provider.

use std::fmt;

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested algorithm is not supported by this provider.
    UnsupportedAlgorithm(String),

    /// Invalid public key.
    InvalidPublicKey,

    /// Signature representative is not smaller than the modulus, or has the wrong size.
    InvalidSignature,

    /// The recovered block does not carry valid PKCS#1 v1.5 type-1 padding.
    InvalidPadding,

    /// Record protection could not seal the fragment.
    EncryptionFailed,

    /// Record protection rejected the fragment.
    DecryptionFailed,

    /// General cryptographic error with a message.
    CryptoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedAlgorithm(s) => write!(f, "Algorithm not supported: {}", s),
            Error::InvalidPublicKey => write!(f, "Invalid public key"),
            Error::InvalidSignature => write!(f, "Invalid signature representative"),
            Error::InvalidPadding => write!(f, "Invalid PKCS#1 padding"),
            Error::EncryptionFailed => write!(f, "Encryption failed"),
            Error::DecryptionFailed => write!(f, "Decryption failed"),
            Error::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
