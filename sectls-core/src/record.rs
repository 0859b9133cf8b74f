//! TLS record layer.
//!
//! Buffers raw transport bytes, frames them into records and applies the
//! installed record protection in both directions.
//!
//! # Record Structure
//!
//! ```text
//! struct {
//!     ContentType type;
//!     ProtocolVersion version;
//!     uint16 length;
//!     opaque fragment[TLSCiphertext.length];
//! } TLSCiphertext;
//! ```
//!
//! Reads are split in two so the connection can dispatch on the content
//! type before anything is consumed: [`RecordLayer::poll_record`] makes sure
//! a whole record is buffered and returns its header, then
//! [`RecordLayer::take_record`] consumes and opens it.

use std::fmt;
use std::io;

use bytes::{Buf, BufMut, BytesMut};
use sectls_crypto::{NullProtection, RecordProtection};

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::{ContentType, ProtocolVersion};
use crate::transport::Transport;

/// Maximum plaintext fragment size (2^14).
pub const MAX_FRAGMENT_SIZE: usize = 16384;

/// Maximum expansion added by record protection.
pub const MAX_CIPHERTEXT_EXPANSION: usize = 2048;

/// Largest fragment accepted off the wire.
pub const MAX_RECORD_PAYLOAD: usize = MAX_FRAGMENT_SIZE + MAX_CIPHERTEXT_EXPANSION;

/// TLS record header size (5 bytes).
pub const RECORD_HEADER_SIZE: usize = 5;

const READ_CHUNK: usize = 4096;

/// Header of a buffered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Raw content-type byte (not validated)
    pub content_type: u8,

    /// Raw record version
    pub version: u16,

    /// Fragment length
    pub length: usize,
}

impl RecordHeader {
    /// Decode a header from the start of `data`.
    ///
    /// Returns `Ok(None)` when fewer than five bytes are available.
    pub fn decode(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < RECORD_HEADER_SIZE {
            return Ok(None);
        }

        let version = u16::from_be_bytes([data[1], data[2]]);
        if data[1] != 3 {
            return Err(Error::ProtocolError(ProtocolError::ProtocolVersion));
        }

        let length = u16::from_be_bytes([data[3], data[4]]) as usize;
        if length > MAX_RECORD_PAYLOAD {
            return Err(Error::ProtocolError(ProtocolError::RecordOverflow));
        }

        Ok(Some(Self {
            content_type: data[0],
            version,
            length,
        }))
    }

    /// Header plus fragment length.
    pub fn record_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.length
    }
}

/// A consumed, unprotected record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw content-type byte
    pub content_type: u8,

    /// Plaintext fragment
    pub fragment: Vec<u8>,
}

/// Outcome of [`RecordLayer::poll_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRead {
    /// A complete record is buffered
    Ready(RecordHeader),

    /// Not enough bytes yet; try again when readable
    WouldBlock,

    /// Peer closed the transport
    Eof,
}

/// Outcome of [`RecordLayer::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Everything queued has been written
    Done,

    /// The transport would block; bytes remain queued
    WouldBlock,
}

/// Record layer state.
pub struct RecordLayer {
    version: ProtocolVersion,
    max_fragment_length: usize,
    incoming: BytesMut,
    outgoing: BytesMut,
    read_protection: Box<dyn RecordProtection>,
    write_protection: Box<dyn RecordProtection>,
}

impl fmt::Debug for RecordLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordLayer")
            .field("version", &self.version)
            .field("max_fragment_length", &self.max_fragment_length)
            .field("incoming", &self.incoming.len())
            .field("outgoing", &self.outgoing.len())
            .field("read_protection", &self.read_protection.name())
            .field("write_protection", &self.write_protection.name())
            .finish()
    }
}

impl RecordLayer {
    /// Create a record layer with null protection.
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            max_fragment_length: MAX_FRAGMENT_SIZE,
            incoming: BytesMut::with_capacity(READ_CHUNK),
            outgoing: BytesMut::new(),
            read_protection: Box::new(NullProtection),
            write_protection: Box::new(NullProtection),
        }
    }

    /// Record version written on outgoing records.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Set the record version written on outgoing records.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    /// Set the maximum plaintext fragment length for outgoing records.
    pub fn set_max_fragment_length(&mut self, length: usize) {
        self.max_fragment_length = length.clamp(1, MAX_FRAGMENT_SIZE);
    }

    /// Maximum plaintext fragment length for outgoing records.
    pub fn max_fragment_length(&self) -> usize {
        self.max_fragment_length
    }

    /// Install new record protection in both directions.
    pub fn install_protection(
        &mut self,
        read: Box<dyn RecordProtection>,
        write: Box<dyn RecordProtection>,
    ) {
        tracing::debug!(
            read = read.name(),
            write = write.name(),
            "Installing record protection"
        );
        self.read_protection = read;
        self.write_protection = write;
    }

    /// Feed raw bytes as if read from the transport.
    pub fn feed(&mut self, data: &[u8]) {
        self.incoming.extend_from_slice(data);
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.incoming.len()
    }

    /// Header of the next buffered record, without consuming anything.
    pub fn peek_header(&self) -> Result<Option<RecordHeader>> {
        RecordHeader::decode(&self.incoming)
    }

    /// Make sure a whole record is buffered, reading from `transport` as
    /// needed. Nothing is consumed.
    pub fn poll_record<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<RecordRead> {
        loop {
            if let Some(header) = self.peek_header()? {
                if self.incoming.len() >= header.record_len() {
                    return Ok(RecordRead::Ready(header));
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            match transport.read(&mut chunk) {
                Ok(0) => return Ok(RecordRead::Eof),
                Ok(n) => self.incoming.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(RecordRead::WouldBlock)
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Consume the next buffered record and remove its protection.
    pub fn take_record(&mut self) -> Result<Record> {
        let header = match self.peek_header()? {
            Some(header) if self.incoming.len() >= header.record_len() => header,
            _ => return Err(Error::InternalError("No complete record buffered".into())),
        };

        self.incoming.advance(RECORD_HEADER_SIZE);
        let ciphertext = self.incoming.split_to(header.length);

        let fragment = self
            .read_protection
            .open(header.content_type, &ciphertext)
            .map_err(|e| {
                tracing::debug!(error = %e, "Record open failed");
                Error::ProtocolError(ProtocolError::BadRecordMac)
            })?;

        if fragment.len() > MAX_FRAGMENT_SIZE {
            return Err(Error::ProtocolError(ProtocolError::RecordOverflow));
        }

        Ok(Record {
            content_type: header.content_type,
            fragment,
        })
    }

    /// Protect `data` and queue it as one or more records.
    pub fn queue(&mut self, content_type: ContentType, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return self.queue_fragment(content_type, data);
        }

        for chunk in data.chunks(self.max_fragment_length) {
            self.queue_fragment(content_type, chunk)?;
        }
        Ok(())
    }

    fn queue_fragment(&mut self, content_type: ContentType, fragment: &[u8]) -> Result<()> {
        let protected = self.write_protection.seal(content_type.to_u8(), fragment)?;
        if protected.len() > MAX_RECORD_PAYLOAD {
            return Err(Error::ProtocolError(ProtocolError::RecordOverflow));
        }

        self.outgoing.reserve(RECORD_HEADER_SIZE + protected.len());
        self.outgoing.put_u8(content_type.to_u8());
        self.outgoing.put_u16(self.version.to_u16());
        self.outgoing.put_u16(protected.len() as u16);
        self.outgoing.put_slice(&protected);
        Ok(())
    }

    /// Whether queued output remains.
    pub fn has_pending_output(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Write queued records to `transport`.
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<FlushStatus> {
        while !self.outgoing.is_empty() {
            match transport.write(&self.outgoing) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => self.outgoing.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(FlushStatus::WouldBlock)
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(FlushStatus::Done)
    }

    /// Drop every buffered byte in both directions.
    pub fn clear(&mut self) {
        self.incoming.clear();
        self.outgoing.clear();
    }
}
