//! Opaque PRF input hello extension (draft-rescorla-tls-opaque-prf-input).
//!
//! The client offers an opaque contribution. A server with a registered
//! callback answers with a contribution of the same length, produced by the
//! callback from the client's bytes. Both contributions are kept on the
//! session for the key schedule.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ProtocolError, Result};
use crate::extensions::{decode_opaque, encode_opaque, ExtensionHandler};
use crate::protocol::ExtensionType;
use crate::state::Role;

/// Server-side callback: fill the output slice (same length as the client
/// contribution) or fail with an application error code.
pub type PrfInputCallback =
    Arc<dyn Fn(&[u8], &mut [u8]) -> core::result::Result<(), i32> + Send + Sync>;

/// Per-session state of the opaque PRF input extension.
#[derive(Default)]
pub struct OpaquePrfInput {
    callback: Option<PrfInputCallback>,
    client_data: Option<Vec<u8>>,
    server_data: Option<Vec<u8>>,
}

impl fmt::Debug for OpaquePrfInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaquePrfInput")
            .field("callback", &self.callback.is_some())
            .field("client_len", &self.client_data.as_ref().map(Vec::len))
            .field("server_len", &self.server_data.as_ref().map(Vec::len))
            .finish()
    }
}

impl OpaquePrfInput {
    /// Server half: answer client offers through `callback`.
    pub fn server(callback: PrfInputCallback) -> Self {
        Self {
            callback: Some(callback),
            ..Self::default()
        }
    }

    /// Client half: offer `contribution`. An empty contribution offers nothing.
    pub fn client(contribution: Vec<u8>) -> Self {
        Self {
            client_data: (!contribution.is_empty()).then_some(contribution),
            ..Self::default()
        }
    }

    /// The client's contribution, if one was offered or received.
    pub fn client_data(&self) -> Option<&[u8]> {
        self.client_data.as_deref()
    }

    /// The server's contribution, if one was produced or received.
    pub fn server_data(&self) -> Option<&[u8]> {
        self.server_data.as_deref()
    }

    fn receive_as_server(&mut self, data: &[u8]) -> Result<()> {
        if self.callback.is_none() {
            return Ok(());
        }

        let payload = decode_opaque(data)?;
        self.client_data = Some(payload.to_vec());
        Ok(())
    }

    fn receive_as_client(&mut self, data: &[u8]) -> Result<()> {
        let offered = match &self.client_data {
            Some(offered) => offered.len(),
            None => return Ok(()),
        };

        let payload = decode_opaque(data)?;
        if payload.len() != offered {
            tracing::warn!(
                offered,
                received = payload.len(),
                "Server opaque PRF input length differs from ours"
            );
            return Err(Error::ProtocolError(ProtocolError::IllegalParameter));
        }

        self.server_data = Some(payload.to_vec());
        Ok(())
    }

    fn send_as_server(&mut self, out: &mut [u8]) -> Result<usize> {
        let (client, callback) = match (&self.client_data, &self.callback) {
            (Some(client), Some(callback)) => (client, callback),
            _ => return Ok(0),
        };

        self.server_data = None;
        let mut server = vec![0u8; client.len()];
        if let Err(code) = (**callback)(client, &mut server) {
            tracing::debug!(code, "Opaque PRF input callback failed");
            return Err(Error::CallbackFailed(code));
        }

        let written = encode_opaque(&server, out)?;
        self.server_data = Some(server);
        Ok(written)
    }

    fn send_as_client(&self, out: &mut [u8]) -> Result<usize> {
        match &self.client_data {
            Some(client) => encode_opaque(client, out),
            None => Ok(0),
        }
    }
}

impl ExtensionHandler for OpaquePrfInput {
    fn extension_type(&self) -> ExtensionType {
        ExtensionType::OpaquePrfInput
    }

    fn receive(&mut self, role: Role, data: &[u8]) -> Result<()> {
        match role {
            Role::Server => self.receive_as_server(data),
            Role::Client => self.receive_as_client(data),
        }
    }

    fn send(&mut self, role: Role, out: &mut [u8]) -> Result<usize> {
        match role {
            Role::Server => self.send_as_server(out),
            Role::Client => self.send_as_client(out),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
