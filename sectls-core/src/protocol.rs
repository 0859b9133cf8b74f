//! TLS protocol constants and types.

/// TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ProtocolVersion {
    /// SSL 3.0 - Legacy, accepted only in record headers of early ClientHellos
    Ssl30 = 0x0300,

    /// TLS 1.0 (RFC 2246)
    Tls10 = 0x0301,

    /// TLS 1.1 (RFC 4346)
    Tls11 = 0x0302,

    /// TLS 1.2 (RFC 5246)
    Tls12 = 0x0303,
}

impl ProtocolVersion {
    /// Create from wire format (u16 big-endian).
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0300 => Some(ProtocolVersion::Ssl30),
            0x0301 => Some(ProtocolVersion::Tls10),
            0x0302 => Some(ProtocolVersion::Tls11),
            0x0303 => Some(ProtocolVersion::Tls12),
            _ => None,
        }
    }

    /// Convert to wire format (u16 big-endian).
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Get the protocol name.
    pub const fn name(self) -> &'static str {
        match self {
            ProtocolVersion::Ssl30 => "SSL 3.0",
            ProtocolVersion::Tls10 => "TLS 1.0",
            ProtocolVersion::Tls11 => "TLS 1.1",
            ProtocolVersion::Tls12 => "TLS 1.2",
        }
    }
}

/// TLS record content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    /// Change cipher spec (20)
    ChangeCipherSpec = 20,

    /// Alert (21)
    Alert = 21,

    /// Handshake (22)
    Handshake = 22,

    /// Application data (23)
    ApplicationData = 23,

    /// Inner application (24) - TLS/IA, reserved and never interpreted
    InnerApplication = 24,
}

impl ContentType {
    /// Create from wire format (u8).
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(ContentType::ChangeCipherSpec),
            21 => Some(ContentType::Alert),
            22 => Some(ContentType::Handshake),
            23 => Some(ContentType::ApplicationData),
            24 => Some(ContentType::InnerApplication),
            _ => None,
        }
    }

    /// Convert to wire format (u8).
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Hello extension types known to this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ExtensionType {
    /// server_name (0)
    ServerName = 0,

    /// max_fragment_length (1)
    MaxFragmentLength = 1,

    /// cert_type (9) - RFC 6091
    CertType = 9,

    /// srp (12) - RFC 5054
    Srp = 12,

    /// opaque_prf_input - draft-rescorla-tls-opaque-prf-input, no IANA code point
    OpaquePrfInput = 0xBBAA,

    /// inner_application (37703) - TLS/IA draft
    InnerApplication = 37703,
}

impl ExtensionType {
    /// Create from wire format (u16).
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ExtensionType::ServerName),
            1 => Some(ExtensionType::MaxFragmentLength),
            9 => Some(ExtensionType::CertType),
            12 => Some(ExtensionType::Srp),
            0xBBAA => Some(ExtensionType::OpaquePrfInput),
            37703 => Some(ExtensionType::InnerApplication),
            _ => None,
        }
    }

    /// Convert to wire format (u16).
    pub const fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Cipher suite identifier as negotiated in the ServerHello.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    /// TLS_NULL_WITH_NULL_NULL, in effect until the first ChangeCipherSpec.
    pub const NULL_WITH_NULL_NULL: CipherSuite = CipherSuite(0x0000);

    /// TLS_RSA_WITH_AES_128_CBC_SHA
    pub const RSA_WITH_AES_128_CBC_SHA: CipherSuite = CipherSuite(0x002F);

    /// TLS_RSA_WITH_AES_256_CBC_SHA
    pub const RSA_WITH_AES_256_CBC_SHA: CipherSuite = CipherSuite(0x0035);

    /// TLS_DHE_RSA_WITH_AES_128_CBC_SHA
    pub const DHE_RSA_WITH_AES_128_CBC_SHA: CipherSuite = CipherSuite(0x0033);

    /// TLS_RSA_WITH_AES_128_GCM_SHA256
    pub const RSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0x009C);
}

/// Record MAC algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlgorithm {
    /// No MAC (initial state, or AEAD suites)
    Null,
    /// HMAC-MD5
    HmacMd5,
    /// HMAC-SHA1
    HmacSha1,
    /// HMAC-SHA256
    HmacSha256,
    /// HMAC-SHA384
    HmacSha384,
}

/// Record compression method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionMethod {
    /// No compression
    Null = 0,
    /// DEFLATE (RFC 3749)
    Deflate = 1,
}

impl CompressionMethod {
    /// Create from wire format (u8).
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionMethod::Null),
            1 => Some(CompressionMethod::Deflate),
            _ => None,
        }
    }
}

/// Peer certificate type (RFC 6091).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CertificateType {
    /// X.509 certificates
    X509 = 1,
    /// OpenPGP keys
    OpenPgp = 2,
}

impl CertificateType {
    /// Create from wire format (u8).
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(CertificateType::X509),
            2 => Some(CertificateType::OpenPgp),
            _ => None,
        }
    }
}
