//! X.509 certificate field extraction.
//!
//! Decodes only what chain verification needs: version, serial number, raw
//! issuer and subject names, the RSA public key, the signature algorithm and
//! value, the basicConstraints CA bit, and the exact to-be-signed bytes.
//! Names are kept as raw DER and compared byte for byte; nothing here
//! interprets them.
//!
//! ```text
//! Certificate ::= SEQUENCE {
//!     tbsCertificate       TBSCertificate,
//!     signatureAlgorithm   AlgorithmIdentifier,
//!     signatureValue       BIT STRING }
//! ```

use sectls_crypto::{HashAlgorithm, RsaPublicKey};

use crate::der::{oid_to_string, tag, DerDecoder, DerError};
use crate::error::{Error, Result};

const OID_RSA_ENCRYPTION: &[u32] = &[1, 2, 840, 113549, 1, 1, 1];
const OID_MD2_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 2];
const OID_MD5_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 4];
const OID_SHA1_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 5];
const OID_SHA256_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 11];
const OID_SHA384_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 12];
const OID_SHA512_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 13];
const OID_SHA224_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 14];
const OID_BASIC_CONSTRAINTS: &[u32] = &[2, 5, 29, 19];

/// Certificate signature algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// md2WithRSAEncryption
    RsaMd2,
    /// md5WithRSAEncryption
    RsaMd5,
    /// sha1WithRSAEncryption
    RsaSha1,
    /// sha224WithRSAEncryption
    RsaSha224,
    /// sha256WithRSAEncryption
    RsaSha256,
    /// sha384WithRSAEncryption
    RsaSha384,
    /// sha512WithRSAEncryption
    RsaSha512,
    /// Anything else, by OID
    Unknown(Vec<u32>),
}

impl SignatureAlgorithm {
    /// Map an AlgorithmIdentifier OID.
    pub fn from_oid(oid: &[u32]) -> Self {
        match oid {
            OID_MD2_WITH_RSA => SignatureAlgorithm::RsaMd2,
            OID_MD5_WITH_RSA => SignatureAlgorithm::RsaMd5,
            OID_SHA1_WITH_RSA => SignatureAlgorithm::RsaSha1,
            OID_SHA224_WITH_RSA => SignatureAlgorithm::RsaSha224,
            OID_SHA256_WITH_RSA => SignatureAlgorithm::RsaSha256,
            OID_SHA384_WITH_RSA => SignatureAlgorithm::RsaSha384,
            OID_SHA512_WITH_RSA => SignatureAlgorithm::RsaSha512,
            other => SignatureAlgorithm::Unknown(other.to_vec()),
        }
    }

    /// OID arcs of this algorithm.
    pub fn oid(&self) -> &[u32] {
        match self {
            SignatureAlgorithm::RsaMd2 => OID_MD2_WITH_RSA,
            SignatureAlgorithm::RsaMd5 => OID_MD5_WITH_RSA,
            SignatureAlgorithm::RsaSha1 => OID_SHA1_WITH_RSA,
            SignatureAlgorithm::RsaSha224 => OID_SHA224_WITH_RSA,
            SignatureAlgorithm::RsaSha256 => OID_SHA256_WITH_RSA,
            SignatureAlgorithm::RsaSha384 => OID_SHA384_WITH_RSA,
            SignatureAlgorithm::RsaSha512 => OID_SHA512_WITH_RSA,
            SignatureAlgorithm::Unknown(oid) => oid,
        }
    }

    /// Digest used by this algorithm, if it is an RSA PKCS#1 v1.5 one.
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            SignatureAlgorithm::RsaMd2 => Some(HashAlgorithm::Md2),
            SignatureAlgorithm::RsaMd5 => Some(HashAlgorithm::Md5),
            SignatureAlgorithm::RsaSha1 => Some(HashAlgorithm::Sha1),
            SignatureAlgorithm::RsaSha224 => Some(HashAlgorithm::Sha224),
            SignatureAlgorithm::RsaSha256 => Some(HashAlgorithm::Sha256),
            SignatureAlgorithm::RsaSha384 => Some(HashAlgorithm::Sha384),
            SignatureAlgorithm::RsaSha512 => Some(HashAlgorithm::Sha512),
            SignatureAlgorithm::Unknown(_) => None,
        }
    }
}

/// Subject public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA modulus and exponent
    Rsa(RsaPublicKey),
    /// Any other algorithm, by OID
    Unsupported(Vec<u32>),
}

/// Decoded certificate fields, for building a [`Certificate`] without DER.
#[derive(Debug, Clone)]
pub struct CertificateFields {
    /// X.509 version, 1-based (1 = v1, 3 = v3)
    pub version: u8,
    /// Serial number content bytes
    pub serial: Vec<u8>,
    /// Raw DER issuer Name
    pub issuer_dn: Vec<u8>,
    /// Raw DER subject Name
    pub subject_dn: Vec<u8>,
    /// Subject public key
    pub public_key: PublicKey,
    /// Outer signature algorithm
    pub signature_algorithm: SignatureAlgorithm,
    /// Signature value
    pub signature: Vec<u8>,
    /// basicConstraints cA
    pub is_ca: bool,
    /// Raw DER TBSCertificate
    pub tbs: Vec<u8>,
}

/// An imported certificate. Immutable.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    fields: CertificateFields,
}

impl Certificate {
    /// Decode a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let fields = parse_certificate(der).map_err(|e| Error::InvalidCertificate(e.to_string()))?;
        Ok(Self {
            der: der.to_vec(),
            fields,
        })
    }

    /// Build from already decoded fields.
    pub fn from_parts(fields: CertificateFields) -> Self {
        Self {
            der: Vec::new(),
            fields,
        }
    }

    /// Encoded certificate; empty when built with [`from_parts`](Self::from_parts).
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// X.509 version, 1-based.
    pub fn version(&self) -> u8 {
        self.fields.version
    }

    /// Serial number content bytes.
    pub fn serial(&self) -> &[u8] {
        &self.fields.serial
    }

    /// Raw DER issuer Name.
    pub fn issuer_dn(&self) -> &[u8] {
        &self.fields.issuer_dn
    }

    /// Raw DER subject Name.
    pub fn subject_dn(&self) -> &[u8] {
        &self.fields.subject_dn
    }

    /// Subject public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.fields.public_key
    }

    /// Outer signature algorithm.
    pub fn signature_algorithm(&self) -> &SignatureAlgorithm {
        &self.fields.signature_algorithm
    }

    /// Signature value.
    pub fn signature(&self) -> &[u8] {
        &self.fields.signature
    }

    /// Whether basicConstraints marks this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        self.fields.is_ca
    }

    /// Exact bytes covered by the signature.
    pub fn tbs(&self) -> &[u8] {
        &self.fields.tbs
    }

    /// Whether `issuer`'s subject names our issuer (raw DN comparison).
    pub fn is_issued_by(&self, issuer: &Certificate) -> bool {
        self.fields.issuer_dn == issuer.fields.subject_dn
    }

    /// Whether issuer and subject names are identical.
    pub fn is_self_signed(&self) -> bool {
        self.fields.issuer_dn == self.fields.subject_dn
    }
}

fn parse_certificate(der: &[u8]) -> core::result::Result<CertificateFields, DerError> {
    let mut outer = DerDecoder::new(der);
    let mut cert = outer.read_sequence()?;
    if !outer.is_empty() {
        return Err(DerError::InvalidData("Trailing data after certificate".into()));
    }

    let (tbs_contents, tbs_raw) = cert.read_tagged_raw(tag::SEQUENCE)?;
    let signature_algorithm = read_algorithm_identifier(&mut cert)?;
    let signature = cert.read_bit_string()?.to_vec();

    let mut tbs = DerDecoder::new(tbs_contents);

    let version = match tbs.read_optional(tag::CONTEXT_0)? {
        Some(explicit) => {
            let raw = DerDecoder::new(explicit).read_integer_u32()?;
            if raw > 2 {
                return Err(DerError::InvalidData(format!("Unknown version {}", raw)));
            }
            raw as u8 + 1
        },
        None => 1,
    };

    let serial = tbs.read_integer_bytes()?.to_vec();
    let _inner_signature = read_algorithm_identifier(&mut tbs)?;
    let (_, issuer_dn) = tbs.read_tagged_raw(tag::SEQUENCE)?;
    let _validity = tbs.read_sequence()?;
    let (_, subject_dn) = tbs.read_tagged_raw(tag::SEQUENCE)?;
    let public_key = read_subject_public_key_info(&mut tbs)?;

    let mut is_ca = false;
    while !tbs.is_empty() {
        let (element_tag, contents, _) = tbs.read_any()?;
        if element_tag == tag::CONTEXT_3 {
            is_ca = read_basic_constraints_ca(contents)?;
        }
    }

    Ok(CertificateFields {
        version,
        serial,
        issuer_dn: issuer_dn.to_vec(),
        subject_dn: subject_dn.to_vec(),
        public_key,
        signature_algorithm,
        signature,
        is_ca,
        tbs: tbs_raw.to_vec(),
    })
}

fn read_algorithm_identifier(
    dec: &mut DerDecoder<'_>,
) -> core::result::Result<SignatureAlgorithm, DerError> {
    let mut alg = dec.read_sequence()?;
    let oid = alg.read_oid()?;
    Ok(SignatureAlgorithm::from_oid(&oid))
}

fn read_subject_public_key_info(
    dec: &mut DerDecoder<'_>,
) -> core::result::Result<PublicKey, DerError> {
    let mut spki = dec.read_sequence()?;
    let mut alg = spki.read_sequence()?;
    let oid = alg.read_oid()?;
    let key_bits = spki.read_bit_string()?;

    if oid != OID_RSA_ENCRYPTION {
        tracing::debug!(oid = %oid_to_string(&oid), "Non-RSA subject public key");
        return Ok(PublicKey::Unsupported(oid));
    }

    let mut rsa = DerDecoder::new(key_bits).read_sequence()?;
    let modulus = rsa.read_unsigned_integer()?;
    let exponent = rsa.read_unsigned_integer()?;
    Ok(PublicKey::Rsa(RsaPublicKey::new(modulus, exponent)))
}

/// Scan `[3] EXPLICIT Extensions` for basicConstraints.
fn read_basic_constraints_ca(explicit: &[u8]) -> core::result::Result<bool, DerError> {
    let mut extensions = DerDecoder::new(explicit).read_sequence()?;

    while !extensions.is_empty() {
        let mut extension = extensions.read_sequence()?;
        let oid = extension.read_oid()?;
        if extension.peek_tag() == Some(tag::BOOLEAN) {
            extension.read_boolean()?;
        }
        let value = extension.read_octet_string()?;

        if oid == OID_BASIC_CONSTRAINTS {
            let mut constraints = DerDecoder::new(value).read_sequence()?;
            if constraints.peek_tag() == Some(tag::BOOLEAN) {
                return constraints.read_boolean();
            }
            return Ok(false);
        }
    }

    Ok(false)
}
