//! Byte-oriented duplex transport consumed by a connection.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// Non-blocking duplex byte stream.
///
/// `read` and `write` report `io::ErrorKind::WouldBlock` when no progress is
/// possible; `read` returning `Ok(0)` means the peer closed its side.
pub trait Transport: Send {
    /// Read available bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write some prefix of `buf`.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Shut down both directions.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }
}
