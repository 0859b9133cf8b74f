//! Hello extension codec and per-session extension registry.
//!
//! Extension bodies handled here are a single length-prefixed opaque blob:
//!
//! ```text
//! struct {
//!     uint16 length;
//!     opaque payload[length];
//! } OpaqueExtensionBody;
//! ```
//!
//! The length must account for every remaining byte of the extension body.
//! Trailing or missing bytes are [`Error::UnexpectedLength`], which aborts the
//! enclosing handshake message.

use std::any::Any;
use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::ExtensionType;
use crate::state::Role;

/// Size of the big-endian length header.
pub const LENGTH_HEADER_SIZE: usize = 2;

/// Largest payload a 16-bit header can describe.
pub const MAX_OPAQUE_PAYLOAD: usize = u16::MAX as usize;

/// Decode a length-prefixed opaque payload.
///
/// The returned slice borrows from `data`.
pub fn decode_opaque(data: &[u8]) -> Result<&[u8]> {
    if data.len() < LENGTH_HEADER_SIZE {
        return Err(Error::UnexpectedLength {
            declared: LENGTH_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let declared = u16::from_be_bytes([data[0], data[1]]) as usize;
    let body = &data[LENGTH_HEADER_SIZE..];
    if body.len() != declared {
        return Err(Error::UnexpectedLength {
            declared,
            actual: body.len(),
        });
    }

    Ok(body)
}

/// Encode `payload` with its length header into `out`.
///
/// Returns the number of bytes written. Nothing is written on error.
pub fn encode_opaque(payload: &[u8], out: &mut [u8]) -> Result<usize> {
    if payload.len() > MAX_OPAQUE_PAYLOAD {
        return Err(Error::PayloadTooLarge(payload.len()));
    }

    let needed = LENGTH_HEADER_SIZE + payload.len();
    if out.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    out[..LENGTH_HEADER_SIZE].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    out[LENGTH_HEADER_SIZE..needed].copy_from_slice(payload);
    Ok(needed)
}

/// A hello extension negotiated by a session.
///
/// `receive` and `send` are called with the local role. A handler that has
/// nothing to contribute returns `Ok(0)` from `send`, and the extension is
/// left out of the hello entirely.
pub trait ExtensionHandler: Send + fmt::Debug {
    /// Extension code point handled.
    fn extension_type(&self) -> ExtensionType;

    /// Process the peer's extension body.
    fn receive(&mut self, role: Role, data: &[u8]) -> Result<()>;

    /// Write our extension body into `out`, returning the bytes written.
    fn send(&mut self, role: Role, out: &mut [u8]) -> Result<usize>;

    /// Downcast support for [`Extensions::get`].
    fn as_any(&self) -> &dyn Any;
}

/// Scratch size used when asking a handler for its body.
const SEND_SCRATCH_SIZE: usize = LENGTH_HEADER_SIZE + MAX_OPAQUE_PAYLOAD;

/// Extension registry owned by one session.
#[derive(Debug, Default)]
pub struct Extensions {
    handlers: Vec<Box<dyn ExtensionHandler>>,
}

impl Extensions {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: Box<dyn ExtensionHandler>) {
        let ext_type = handler.extension_type();
        self.handlers.retain(|h| h.extension_type() != ext_type);
        self.handlers.push(handler);
    }

    /// Check if a handler is registered.
    pub fn has(&self, ext_type: ExtensionType) -> bool {
        self.handlers.iter().any(|h| h.extension_type() == ext_type)
    }

    /// Borrow a registered handler by its concrete type.
    pub fn get<T: ExtensionHandler + 'static>(&self) -> Option<&T> {
        self.handlers.iter().find_map(|h| h.as_any().downcast_ref::<T>())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch one peer extension body.
    ///
    /// Code points with no registered handler are accepted and ignored.
    pub fn receive(&mut self, role: Role, ext_type: u16, data: &[u8]) -> Result<()> {
        let handler = self
            .handlers
            .iter_mut()
            .find(|h| h.extension_type().to_u16() == ext_type);

        match handler {
            Some(handler) => handler.receive(role, data),
            None => {
                tracing::trace!(ext_type, "Ignoring unhandled extension");
                Ok(())
            },
        }
    }

    /// Ask the handler for `ext_type` to write its body into `out`.
    ///
    /// Unregistered types write nothing.
    pub fn send(&mut self, role: Role, ext_type: ExtensionType, out: &mut [u8]) -> Result<usize> {
        match self
            .handlers
            .iter_mut()
            .find(|h| h.extension_type() == ext_type)
        {
            Some(handler) => handler.send(role, out),
            None => Ok(0),
        }
    }

    /// Parse a hello `extensions` block and dispatch each entry.
    ///
    /// ```text
    /// uint16 total_length;
    /// { uint16 type; uint16 length; opaque data[length]; } entries[..];
    /// ```
    pub fn receive_block(&mut self, role: Role, block: &[u8]) -> Result<()> {
        let entries = decode_opaque(block)?;
        let mut offset = 0;

        while offset < entries.len() {
            if entries.len() - offset < 4 {
                return Err(Error::InvalidMessage("Truncated extension header".into()));
            }
            let ext_type = u16::from_be_bytes([entries[offset], entries[offset + 1]]);
            let length =
                u16::from_be_bytes([entries[offset + 2], entries[offset + 3]]) as usize;
            offset += 4;

            if entries.len() - offset < length {
                return Err(Error::InvalidMessage("Incomplete extension data".into()));
            }
            self.receive(role, ext_type, &entries[offset..offset + length])?;
            offset += length;
        }

        Ok(())
    }

    /// Build a hello `extensions` block from every handler with something to say.
    ///
    /// Returns an empty vector when no handler contributed.
    pub fn send_block(&mut self, role: Role) -> Result<Vec<u8>> {
        let mut entries = Vec::new();
        let mut scratch = vec![0u8; SEND_SCRATCH_SIZE];

        for handler in self.handlers.iter_mut() {
            let written = handler.send(role, &mut scratch)?;
            if written == 0 {
                continue;
            }
            let length = u16::try_from(written).map_err(|_| Error::PayloadTooLarge(written))?;
            entries.extend_from_slice(&handler.extension_type().to_u16().to_be_bytes());
            entries.extend_from_slice(&length.to_be_bytes());
            entries.extend_from_slice(&scratch[..written]);
        }

        if entries.is_empty() {
            return Ok(entries);
        }

        let mut block = vec![0u8; LENGTH_HEADER_SIZE + entries.len()];
        encode_opaque(&entries, &mut block)?;
        Ok(block)
    }
}
