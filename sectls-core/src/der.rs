//! Minimal DER (Distinguished Encoding Rules) reader.
//!
//! Just enough ASN.1 to pull the verification fields out of an X.509
//! certificate and to decode a PKCS#1 DigestInfo. Elements can be read
//! either as their contents or as raw TLV bytes, because distinguished
//! names and the to-be-signed block are compared and hashed verbatim.

/// DER parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerError {
    /// Unexpected end of input
    UnexpectedEof,
    /// Invalid tag encountered
    InvalidTag {
        /// Expected tag value
        expected: u8,
        /// Actual tag value found
        got: u8,
    },
    /// Invalid length encoding
    InvalidLength,
    /// Unsupported or invalid data
    InvalidData(String),
}

impl std::fmt::Display for DerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DerError::UnexpectedEof => write!(f, "Unexpected end of DER data"),
            DerError::InvalidTag { expected, got } => {
                write!(f, "Invalid DER tag: expected 0x{:02x}, got 0x{:02x}", expected, got)
            },
            DerError::InvalidLength => write!(f, "Invalid DER length encoding"),
            DerError::InvalidData(msg) => write!(f, "Invalid DER data: {}", msg),
        }
    }
}

impl std::error::Error for DerError {}

/// Result type for DER parsing operations
pub type Result<T> = std::result::Result<T, DerError>;

/// ASN.1 tag values
pub mod tag {
    /// BOOLEAN
    pub const BOOLEAN: u8 = 0x01;
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// BIT STRING
    pub const BIT_STRING: u8 = 0x03;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL
    pub const NULL: u8 = 0x05;
    /// OBJECT IDENTIFIER
    pub const OID: u8 = 0x06;
    /// SEQUENCE
    pub const SEQUENCE: u8 = 0x30;
    /// `[0]` constructed, context-specific
    pub const CONTEXT_0: u8 = 0xa0;
    /// `[3]` constructed, context-specific
    pub const CONTEXT_3: u8 = 0xa3;
}

/// DER decoder with position tracking
#[derive(Debug, Clone)]
pub struct DerDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerDecoder<'a> {
    /// Create a new DER decoder
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if we've consumed all data
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Peek at the next tag without consuming it
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek_tag().ok_or(DerError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(DerError::InvalidLength)?;
        if end > self.data.len() {
            return Err(DerError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_length(&mut self) -> Result<usize> {
        let first_byte = self.read_byte()?;

        if first_byte < 0x80 {
            Ok(first_byte as usize)
        } else if first_byte == 0x80 {
            // Indefinite form: not allowed in DER
            Err(DerError::InvalidLength)
        } else {
            let num_length_bytes = (first_byte & 0x7f) as usize;
            if num_length_bytes > 4 {
                return Err(DerError::InvalidLength);
            }

            let length_bytes = self.read_bytes(num_length_bytes)?;
            if length_bytes[0] == 0 {
                return Err(DerError::InvalidLength);
            }
            let mut length = 0usize;
            for &byte in length_bytes {
                length = length
                    .checked_shl(8)
                    .and_then(|l| l.checked_add(byte as usize))
                    .ok_or(DerError::InvalidLength)?;
            }

            // DER requires shortest form encoding
            if length < 0x80 {
                return Err(DerError::InvalidLength);
            }

            Ok(length)
        }
    }

    /// Read any element, returning `(tag, contents, raw TLV bytes)`.
    pub fn read_any(&mut self) -> Result<(u8, &'a [u8], &'a [u8])> {
        let start = self.pos;
        let tag = self.read_byte()?;
        let length = self.read_length()?;
        let contents = self.read_bytes(length)?;
        Ok((tag, contents, &self.data[start..self.pos]))
    }

    /// Read and verify a tag, then return the contents
    pub fn read_tagged(&mut self, expected_tag: u8) -> Result<&'a [u8]> {
        Ok(self.read_tagged_raw(expected_tag)?.0)
    }

    /// Read and verify a tag, returning `(contents, raw TLV bytes)`
    pub fn read_tagged_raw(&mut self, expected_tag: u8) -> Result<(&'a [u8], &'a [u8])> {
        let checkpoint = self.pos;
        let (tag, contents, raw) = self.read_any()?;
        if tag != expected_tag {
            self.pos = checkpoint;
            return Err(DerError::InvalidTag {
                expected: expected_tag,
                got: tag,
            });
        }
        Ok((contents, raw))
    }

    /// Read an element only if it carries `tag`.
    pub fn read_optional(&mut self, tag: u8) -> Result<Option<&'a [u8]>> {
        if self.peek_tag() == Some(tag) {
            self.read_tagged(tag).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read a SEQUENCE and return a decoder for its contents
    pub fn read_sequence(&mut self) -> Result<DerDecoder<'a>> {
        let contents = self.read_tagged(tag::SEQUENCE)?;
        Ok(DerDecoder::new(contents))
    }

    /// Read an INTEGER as its big-endian two's-complement content bytes
    pub fn read_integer_bytes(&mut self) -> Result<&'a [u8]> {
        let bytes = self.read_tagged(tag::INTEGER)?;
        if bytes.is_empty() {
            return Err(DerError::InvalidData("Empty INTEGER".to_string()));
        }
        Ok(bytes)
    }

    /// Read a non-negative INTEGER as unsigned magnitude bytes
    pub fn read_unsigned_integer(&mut self) -> Result<&'a [u8]> {
        let bytes = self.read_integer_bytes()?;
        if bytes[0] & 0x80 != 0 {
            return Err(DerError::InvalidData("Negative INTEGER".to_string()));
        }
        let start = if bytes.len() > 1 && bytes[0] == 0 { 1 } else { 0 };
        Ok(&bytes[start..])
    }

    /// Read an INTEGER and expect it to be a small unsigned value
    pub fn read_integer_u32(&mut self) -> Result<u32> {
        let bytes = self.read_unsigned_integer()?;

        if bytes.len() > 4 {
            return Err(DerError::InvalidData("INTEGER too large for u32".to_string()));
        }

        let mut result = 0u32;
        for &byte in bytes {
            result = (result << 8) | (byte as u32);
        }
        Ok(result)
    }

    /// Read a BOOLEAN
    pub fn read_boolean(&mut self) -> Result<bool> {
        match self.read_tagged(tag::BOOLEAN)? {
            [0x00] => Ok(false),
            [0xff] => Ok(true),
            _ => Err(DerError::InvalidData("Invalid BOOLEAN".to_string())),
        }
    }

    /// Read an OCTET STRING
    pub fn read_octet_string(&mut self) -> Result<&'a [u8]> {
        self.read_tagged(tag::OCTET_STRING)
    }

    /// Read a BIT STRING with no unused bits
    pub fn read_bit_string(&mut self) -> Result<&'a [u8]> {
        let contents = self.read_tagged(tag::BIT_STRING)?;

        if contents.is_empty() {
            return Err(DerError::InvalidData("Empty BIT STRING".to_string()));
        }

        if contents[0] != 0 {
            return Err(DerError::InvalidData(
                "BIT STRING with unused bits not supported".to_string(),
            ));
        }

        Ok(&contents[1..])
    }

    /// Read a NULL
    pub fn read_null(&mut self) -> Result<()> {
        let contents = self.read_tagged(tag::NULL)?;
        if !contents.is_empty() {
            return Err(DerError::InvalidData("NULL with content".to_string()));
        }
        Ok(())
    }

    /// Read an OID (Object Identifier) as its arcs
    pub fn read_oid(&mut self) -> Result<Vec<u32>> {
        let bytes = self.read_tagged(tag::OID)?;
        parse_oid(bytes)
    }
}

fn parse_oid(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() {
        return Err(DerError::InvalidData("Empty OID".to_string()));
    }

    let mut arcs = Vec::new();
    let mut value = 0u32;
    let mut first = true;

    for (i, &byte) in bytes.iter().enumerate() {
        value = value
            .checked_shl(7)
            .and_then(|v| v.checked_add((byte & 0x7f) as u32))
            .ok_or_else(|| DerError::InvalidData("OID component overflow".to_string()))?;

        if byte & 0x80 != 0 {
            if i + 1 == bytes.len() {
                return Err(DerError::InvalidData("Incomplete OID component".to_string()));
            }
            continue;
        }

        if first {
            let top = (value / 40).min(2);
            arcs.push(top);
            arcs.push(value - top * 40);
            first = false;
        } else {
            arcs.push(value);
        }
        value = 0;
    }

    Ok(arcs)
}

/// Append a TLV element, choosing the short or long length form as DER requires.
pub fn write_tlv(out: &mut Vec<u8>, tag: u8, contents: &[u8]) {
    out.push(tag);
    let len = contents.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(contents);
}

/// Encode OID arcs as the contents of an OBJECT IDENTIFIER.
///
/// The first two arcs share one subidentifier, which may itself need
/// several base-128 bytes (e.g. `2.999`).
pub fn encode_oid(arcs: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    let first = match arcs {
        [top, second, ..] => u64::from(*top) * 40 + u64::from(*second),
        [top] => u64::from(*top) * 40,
        [] => return out,
    };
    write_base128(&mut out, first);
    for &arc in arcs.iter().skip(2) {
        write_base128(&mut out, u64::from(arc));
    }
    out
}

fn write_base128(out: &mut Vec<u8>, value: u64) {
    let mut groups = 1;
    while groups < 10 && value >> (7 * groups) != 0 {
        groups += 1;
    }
    for i in (0..groups).rev() {
        let septet = ((value >> (7 * i)) & 0x7f) as u8;
        out.push(if i == 0 { septet } else { septet | 0x80 });
    }
}

/// Render OID arcs in dotted form, for messages.
pub fn oid_to_string(arcs: &[u32]) -> String {
    arcs.iter()
        .map(|arc| arc.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
