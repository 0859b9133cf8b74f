//! Connection record state machine.
//!
//! A [`Connection`] owns one accepted transport and the TLS session running
//! over it. The daemon calls [`Connection::on_readable`],
//! [`Connection::on_writable`] and [`Connection::on_idle`]; each call
//! inspects the content type of the next buffered record and routes it:
//!
//! | content type | `Init` | `HandshakeComplete` |
//! |---|---|---|
//! | ChangeCipherSpec | handshake engine | ignored until application data flows, then fatal |
//! | Alert | close_notify / warning / fatal | same |
//! | Handshake | handshake engine | refused with a `no_renegotiation` warning |
//! | ApplicationData | fatal `unexpected_message` | delivered to the HTTP layer |
//! | InnerApplication | discarded | discarded |
//! | anything else | fatal `unexpected_message` | same |
//!
//! The transport is released exactly once. The HTTP layer learns how the
//! connection ended through [`HttpLayer::on_terminate`].

use std::fmt;
use std::time::{Duration, Instant};

use crate::alert::{Alert, AlertLevel};
use crate::error::{AlertDescription, Error, ProtocolError, Result};
use crate::protocol::{
    CertificateType, CipherSuite, CompressionMethod, ContentType, MacAlgorithm,
};
use crate::record::{FlushStatus, RecordHeader, RecordRead};
use crate::session::TlsSession;
use crate::state::{ConnectionState, SecurityParameters};
use crate::transport::Transport;

/// How a connection ended, as reported to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCode {
    /// Orderly shutdown
    CompletedOk,

    /// Protocol, handshake or I/O failure
    WithError,

    /// Idle timeout expired
    TimeoutReached,
}

/// Plaintext consumer sitting above the secure transport.
pub trait HttpLayer: Send {
    /// The handshake finished and application data may flow.
    fn on_handshake_complete(&mut self, _params: &SecurityParameters) {}

    /// Decrypted application bytes, in order.
    fn on_data(&mut self, data: &[u8]) -> Result<()>;

    /// The transport has been released.
    fn on_terminate(&mut self, _code: TerminationCode) {}
}

/// One accepted TLS connection.
pub struct Connection<T: Transport, H: HttpLayer> {
    transport: Option<T>,
    session: TlsSession,
    state: ConnectionState,
    last_activity: Instant,
    timeout: Duration,
    application_data_seen: bool,
    http: H,
}

impl<T: Transport, H: HttpLayer> fmt::Debug for Connection<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.transport.is_some())
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .field("application_data_seen", &self.application_data_seen)
            .field("session", &self.session)
            .finish()
    }
}

impl<T: Transport, H: HttpLayer> Connection<T, H> {
    /// Wrap an accepted transport. A zero `timeout` never expires.
    pub fn new(transport: T, session: TlsSession, http: H, timeout: Duration) -> Self {
        tracing::debug!(role = ?session.role(), ?timeout, "New connection");
        Self {
            transport: Some(transport),
            session,
            state: ConnectionState::Init,
            last_activity: Instant::now(),
            timeout,
            application_data_seen: false,
            http,
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the transport is still held.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// The TLS session.
    pub fn session(&self) -> &TlsSession {
        &self.session
    }

    /// The HTTP layer.
    pub fn http(&self) -> &H {
        &self.http
    }

    /// Mutable HTTP layer.
    pub fn http_mut(&mut self) -> &mut H {
        &mut self.http
    }

    /// The transport, while open.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Time of the last read or write event.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Negotiated cipher suite.
    pub fn cipher_suite(&self) -> CipherSuite {
        self.session.cipher_suite()
    }

    /// Negotiated record MAC.
    pub fn mac_algorithm(&self) -> MacAlgorithm {
        self.session.mac_algorithm()
    }

    /// Negotiated compression method.
    pub fn compression_method(&self) -> CompressionMethod {
        self.session.compression_method()
    }

    /// Negotiated certificate type.
    pub fn certificate_type(&self) -> CertificateType {
        self.session.certificate_type()
    }

    /// Process every complete record the transport has for us.
    ///
    /// Returns `Ok(())` while the connection is healthy or after an orderly
    /// close, and `Err` once it has been torn down because of a failure.
    pub fn on_readable(&mut self) -> Result<()> {
        self.last_activity = Instant::now();

        if self.state.is_terminal() {
            self.force_close(TerminationCode::WithError);
            return Err(Error::ConnectionClosed);
        }

        loop {
            let transport = match self.transport.as_mut() {
                Some(transport) => transport,
                None => return Ok(()),
            };

            let header = match self.session.record_layer_mut().poll_record(transport) {
                Ok(RecordRead::Ready(header)) => header,
                Ok(RecordRead::WouldBlock) => return self.flush_pending(),
                Ok(RecordRead::Eof) => return self.handle_eof(),
                Err(e) => return self.fail(e),
            };

            self.process_record(header)?;

            if self.state.is_terminal() {
                return Ok(());
            }
        }
    }

    /// Flush queued records.
    ///
    /// In a terminal state the transport is released and the call fails.
    pub fn on_writable(&mut self) -> Result<()> {
        self.last_activity = Instant::now();

        if self.state.is_terminal() {
            self.force_close(TerminationCode::WithError);
            return Err(Error::ConnectionClosed);
        }

        self.flush_pending()
    }

    /// Periodic housekeeping.
    pub fn on_idle(&mut self) -> Result<()> {
        self.on_idle_at(Instant::now())
    }

    /// Housekeeping as of `now`.
    ///
    /// Releases the transport of a terminated connection, and closes a live
    /// one whose idle timeout has expired.
    pub fn on_idle_at(&mut self, now: Instant) -> Result<()> {
        if self.state.is_terminal() {
            self.force_close(TerminationCode::WithError);
        }

        if self.transport.is_some()
            && !self.timeout.is_zero()
            && now.saturating_duration_since(self.last_activity) > self.timeout
        {
            tracing::info!(timeout = ?self.timeout, "Connection timed out");
            self.session.invalidate();
            self.state = ConnectionState::Closed;
            self.force_close(TerminationCode::TimeoutReached);
            return Err(Error::Timeout);
        }

        Ok(())
    }

    /// Queue application bytes for the peer and try to send them.
    pub fn send_application_data(&mut self, data: &[u8]) -> Result<()> {
        if self.state != ConnectionState::HandshakeComplete {
            return Err(Error::UnexpectedMessage(
                "Application data before handshake completion".into(),
            ));
        }

        self.application_data_seen = true;
        if let Err(e) = self
            .session
            .record_layer_mut()
            .queue(ContentType::ApplicationData, data)
        {
            return self.fail(e);
        }
        self.flush_pending()
    }

    /// Send close_notify and release the transport.
    pub fn close(&mut self) {
        if self.transport.is_none() {
            return;
        }

        tracing::debug!("Closing connection");
        if !self.state.is_terminal() {
            self.send_alert(Alert::close_notify());
            self.state = ConnectionState::Closed;
            self.force_close(TerminationCode::CompletedOk);
        } else {
            self.force_close(TerminationCode::WithError);
        }
    }

    fn process_record(&mut self, header: RecordHeader) -> Result<()> {
        match ContentType::from_u8(header.content_type) {
            Some(ContentType::ChangeCipherSpec) => self.handle_change_cipher_spec(),
            Some(ContentType::Alert) => self.handle_alert(),
            Some(ContentType::Handshake) => self.handle_handshake(),
            Some(ContentType::ApplicationData) => self.handle_application_data(),
            Some(ContentType::InnerApplication) => {
                let record = self.take_record()?;
                tracing::trace!(len = record.len(), "Discarding inner application record");
                Ok(())
            },
            None => {
                tracing::warn!(content_type = header.content_type, "Unknown record type");
                self.fail(ProtocolError::UnexpectedMessage.into())
            },
        }
    }

    fn take_record(&mut self) -> Result<Vec<u8>> {
        match self.session.record_layer_mut().take_record() {
            Ok(record) => Ok(record.fragment),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn handle_handshake(&mut self) -> Result<()> {
        let fragment = self.take_record()?;

        match self.state {
            ConnectionState::Init => self.drive_handshake(ContentType::Handshake, &fragment),
            _ => {
                tracing::debug!("Refusing renegotiation");
                self.send_alert(Alert::new(
                    AlertLevel::Warning,
                    AlertDescription::NoRenegotiation,
                ));
                Ok(())
            },
        }
    }

    fn handle_change_cipher_spec(&mut self) -> Result<()> {
        let fragment = self.take_record()?;

        if self.state == ConnectionState::Init {
            return self.drive_handshake(ContentType::ChangeCipherSpec, &fragment);
        }

        if fragment.as_slice() != [1] {
            tracing::warn!(len = fragment.len(), "Malformed ChangeCipherSpec");
            return self.fail(ProtocolError::DecodeError.into());
        }

        if self.application_data_seen {
            tracing::warn!("ChangeCipherSpec after application data");
            return self.fail(ProtocolError::UnexpectedMessage.into());
        }

        tracing::debug!("Ignoring ChangeCipherSpec after handshake");
        Ok(())
    }

    fn drive_handshake(&mut self, content_type: ContentType, fragment: &[u8]) -> Result<()> {
        match self.session.step_handshake(content_type, fragment) {
            Ok(false) => self.flush_pending(),
            Ok(true) => {
                self.state = ConnectionState::HandshakeComplete;
                tracing::info!(
                    version = self.session.version().name(),
                    cipher_suite = ?self.session.cipher_suite(),
                    "Handshake complete"
                );
                self.http.on_handshake_complete(self.session.parameters());
                self.flush_pending()
            },
            Err(e) => self.handshake_failed(e),
        }
    }

    fn handshake_failed(&mut self, error: Error) -> Result<()> {
        tracing::warn!(error = %error, "Handshake failed");
        self.state = ConnectionState::HandshakeFailed;
        self.send_alert(Alert::close_notify());
        self.session.invalidate();
        self.session.teardown();
        self.force_close(TerminationCode::WithError);
        Err(error)
    }

    fn handle_alert(&mut self) -> Result<()> {
        let fragment = self.take_record()?;
        let alert = match Alert::decode(&fragment) {
            Ok(alert) => alert,
            Err(e) => return self.fail(e),
        };

        if alert.is_close_notify() {
            tracing::debug!("Received close_notify");
            self.send_alert(Alert::close_notify());
            self.session.mark_read_eof();
            self.state = ConnectionState::Closed;
            self.session.teardown();
            self.force_close(TerminationCode::CompletedOk);
            return Ok(());
        }

        if alert.is_fatal() {
            tracing::warn!(description = ?alert.description, "Received fatal alert");
            self.session.invalidate();
            self.state = ConnectionState::Closed;
            self.session.teardown();
            self.force_close(TerminationCode::WithError);
            return Err(Error::AlertReceived(alert.description));
        }

        tracing::info!(description = ?alert.description, "Received warning alert");
        Ok(())
    }

    fn handle_application_data(&mut self) -> Result<()> {
        let fragment = self.take_record()?;

        if self.state != ConnectionState::HandshakeComplete {
            tracing::warn!("Application data before handshake completion");
            return self.fail(ProtocolError::UnexpectedMessage.into());
        }

        self.application_data_seen = true;
        if fragment.is_empty() {
            return Ok(());
        }

        match self.http.on_data(&fragment) {
            Ok(()) => self.flush_pending(),
            Err(e) => self.fail(e),
        }
    }

    fn handle_eof(&mut self) -> Result<()> {
        self.session.mark_read_eof();
        if self.state == ConnectionState::HandshakeComplete {
            tracing::warn!("Peer closed without close_notify");
        } else {
            tracing::debug!(state = ?self.state, "Peer closed the transport");
        }
        self.session.invalidate();
        self.state = ConnectionState::Closed;
        self.session.teardown();
        self.force_close(TerminationCode::WithError);
        Err(Error::ConnectionClosed)
    }

    fn flush_pending(&mut self) -> Result<()> {
        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => return Ok(()),
        };

        match self.session.record_layer_mut().flush(transport) {
            Ok(FlushStatus::Done) | Ok(FlushStatus::WouldBlock) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "Write failed");
                self.session.invalidate();
                self.state = ConnectionState::Closed;
                self.session.teardown();
                self.force_close(TerminationCode::WithError);
                Err(e)
            },
        }
    }

    /// Close after a protocol violation: fatal alert, then release.
    fn fail(&mut self, error: Error) -> Result<()> {
        tracing::warn!(error = %error, state = ?self.state, "Closing connection on error");
        Err(self.abort(error))
    }

    fn abort(&mut self, error: Error) -> Error {
        self.send_alert(Alert::fatal(error.alert_description()));
        self.session.invalidate();
        self.state = ConnectionState::Closed;
        self.session.teardown();
        self.force_close(TerminationCode::WithError);
        error
    }

    /// Queue and flush an alert, ignoring failures.
    fn send_alert(&mut self, alert: Alert) {
        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => return,
        };

        let record_layer = self.session.record_layer_mut();
        if let Err(e) = record_layer.queue(ContentType::Alert, &alert.encode()) {
            tracing::debug!(error = %e, "Could not queue alert");
            return;
        }
        if let Err(e) = record_layer.flush(transport) {
            tracing::debug!(error = %e, "Could not send alert");
        }
    }

    /// Release the transport. Later calls are no-ops.
    pub fn force_close(&mut self, code: TerminationCode) {
        let mut transport = match self.transport.take() {
            Some(transport) => transport,
            None => return,
        };

        if let Err(e) = transport.shutdown() {
            tracing::debug!(error = %e, "Transport shutdown failed");
        }
        drop(transport);

        tracing::debug!(?code, state = ?self.state, "Connection released");
        self.http.on_terminate(code);
    }
}
