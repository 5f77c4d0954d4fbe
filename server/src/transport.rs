//! Uniform byte-level transport over a raw socket or a TLS session.
//!
//! [`PlainTransport`] and [`SecureTransport`] both implement [`Transport`], giving the
//! connection state machine a single `recv`/`send` vocabulary regardless of whether the
//! connection is encrypted. The secure variant additionally exposes a direction hint: when it
//! would block, it also reports whether the underlying socket needs to become readable or
//! writable before progress is possible, since those can invert relative to the logical
//! direction of the call.

use std::io::{self, ErrorKind, Read, Write};

use rustls::ServerConnection;

/// The socket readiness a stalled operation is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The underlying socket must become readable before the operation can proceed.
    Read,
    /// The underlying socket must become writable before the operation can proceed.
    Write,
}

/// The result of a single `recv`/`send` attempt.
#[derive(Debug)]
pub enum IoOutcome {
    /// `n` bytes were moved.
    Ready(usize),
    /// No bytes could be moved right now; try again once the socket is readable or writable
    /// again, matching the direction the caller originally intended.
    WouldBlock,
    /// Specific to the encrypted variant: no bytes could be moved, and progress additionally
    /// requires the underlying socket to become ready in `Direction`, which may differ from
    /// the logical direction of the call.
    Needs(Direction),
    /// The peer closed the connection in an orderly fashion.
    Eof,
    /// An unrecoverable transport error.
    Fatal(io::Error),
}

/// The outcome of driving a TLS handshake forward by one step.
#[derive(Debug)]
pub enum HandshakeOutcome {
    /// The handshake has finished.
    Complete,
    /// Progress stalled; the underlying socket must become ready in `Direction`.
    Needs(Direction),
    /// The handshake failed.
    Fatal(io::Error),
}

/// Common transport vocabulary for plain and TLS-wrapped sockets.
pub trait Transport {
    /// Attempts to receive plaintext bytes into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> IoOutcome;

    /// Attempts to send plaintext bytes from `buf`.
    fn send(&mut self, buf: &[u8]) -> IoOutcome;

    /// Whether this transport still has bytes queued internally that need a writable socket
    /// to be flushed, independent of whether the connection's outbound slot is occupied.
    ///
    /// Always `false` for [`PlainTransport`], since a plain socket write either completes or
    /// reports back-pressure immediately with nothing left queued inside this layer.
    fn needs_flush(&self) -> bool {
        false
    }
}

/// Transport over a raw, non-blocking stream.
#[derive(Debug)]
pub struct PlainTransport<S> {
    stream: S,
}

impl<S> PlainTransport<S> {
    /// Wraps an existing stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Reclaims the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Borrows the wrapped stream, e.g. to (de)register it with the event loop.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S: Read + Write> Transport for PlainTransport<S> {
    fn recv(&mut self, buf: &mut [u8]) -> IoOutcome {
        loop {
            return match self.stream.read(buf) {
                Ok(0) => IoOutcome::Eof,
                Ok(n) => IoOutcome::Ready(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => IoOutcome::WouldBlock,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => IoOutcome::Fatal(e),
            };
        }
    }

    fn send(&mut self, buf: &[u8]) -> IoOutcome {
        loop {
            return match self.stream.write(buf) {
                Ok(n) => IoOutcome::Ready(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => IoOutcome::WouldBlock,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => IoOutcome::Fatal(e),
            };
        }
    }
}

/// Transport over a TLS session layered on a raw, non-blocking stream.
#[derive(Debug)]
pub struct SecureTransport<S> {
    stream: S,
    session: Box<ServerConnection>,
}

impl<S> SecureTransport<S> {
    /// Wraps a stream with a freshly constructed server-side TLS session.
    pub fn new(stream: S, session: ServerConnection) -> Self {
        Self {
            stream,
            session: Box::new(session),
        }
    }

    /// Borrows the wrapped stream, e.g. to (de)register it with the event loop.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Whether the handshake is still in progress.
    pub fn is_handshaking(&self) -> bool {
        self.session.is_handshaking()
    }

    /// The negotiated ALPN protocol, if any.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.session.alpn_protocol()
    }

    fn direction_hint(&self) -> Direction {
        if self.session.wants_write() {
            Direction::Write
        } else {
            Direction::Read
        }
    }
}

impl<S: Read + Write> SecureTransport<S> {
    /// Drives the handshake forward by one step.
    pub fn drive_handshake(&mut self) -> HandshakeOutcome {
        match self.session.complete_io(&mut self.stream) {
            Ok(_) => {
                if self.session.is_handshaking() {
                    HandshakeOutcome::Needs(self.direction_hint())
                } else {
                    HandshakeOutcome::Complete
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                HandshakeOutcome::Needs(self.direction_hint())
            }
            Err(e) => HandshakeOutcome::Fatal(e),
        }
    }

    fn pull_records(&mut self) -> IoOutcome {
        let mut read_any = false;
        loop {
            match self.session.read_tls(&mut self.stream) {
                Ok(0) => return if read_any { IoOutcome::Ready(0) } else { IoOutcome::Eof },
                Ok(_) => read_any = true,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    return if read_any {
                        IoOutcome::Ready(0)
                    } else {
                        IoOutcome::Needs(self.direction_hint())
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return IoOutcome::Fatal(e),
            }
        }
    }

    fn push_records(&mut self) -> IoOutcome {
        let mut written = 0;
        while self.session.wants_write() {
            match self.session.write_tls(&mut self.stream) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    return if written > 0 {
                        IoOutcome::Ready(written)
                    } else {
                        IoOutcome::Needs(self.direction_hint())
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return IoOutcome::Fatal(e),
            }
        }
        IoOutcome::Ready(written)
    }
}

impl<S: Read + Write> Transport for SecureTransport<S> {
    fn recv(&mut self, buf: &mut [u8]) -> IoOutcome {
        match self.session.reader().read(buf) {
            Ok(0) => {}
            Ok(n) => return IoOutcome::Ready(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => return IoOutcome::Fatal(e),
        }

        match self.pull_records() {
            IoOutcome::Eof => IoOutcome::Eof,
            IoOutcome::Fatal(e) => IoOutcome::Fatal(e),
            IoOutcome::Needs(d) => IoOutcome::Needs(d),
            IoOutcome::Ready(_) => match self.session.process_new_packets() {
                Ok(_) => match self.session.reader().read(buf) {
                    Ok(0) => IoOutcome::WouldBlock,
                    Ok(n) => IoOutcome::Ready(n),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => IoOutcome::WouldBlock,
                    Err(e) => IoOutcome::Fatal(e),
                },
                Err(e) => IoOutcome::Fatal(io::Error::new(io::ErrorKind::InvalidData, e)),
            },
        }
    }

    fn send(&mut self, buf: &[u8]) -> IoOutcome {
        // Drain any backlog before accepting more plaintext: rustls's writer buffers
        // unboundedly, so accepting new bytes while a flush is already stalled would grow
        // that buffer without limit instead of surfacing back-pressure to the connection.
        if self.session.wants_write() {
            if let IoOutcome::Needs(d) = self.push_records() {
                return IoOutcome::Needs(d);
            }
        }

        if let Err(e) = self.session.writer().write_all(buf) {
            return IoOutcome::Fatal(e);
        }

        // Best-effort immediate flush; whatever doesn't fit stays queued and is reported via
        // `needs_flush` until a later writable firing drains it.
        let _ = self.push_records();
        IoOutcome::Ready(buf.len())
    }

    fn needs_flush(&self) -> bool {
        self.session.wants_write()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{Error, ErrorKind};

    struct FlakyStream {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for FlakyStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Err(Error::new(ErrorKind::WouldBlock, "would block"));
            }
            match self.chunks.remove(0) {
                Ok(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Err(e) => Err(e),
            }
        }
    }

    impl Write for FlakyStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn plain_transport_reports_eof_on_zero_read() {
        let mut t = PlainTransport::new(FlakyStream {
            chunks: vec![Ok(vec![])],
        });
        let mut buf = [0u8; 16];
        assert!(matches!(t.recv(&mut buf), IoOutcome::Eof));
    }

    #[test]
    fn plain_transport_reports_would_block() {
        let mut t = PlainTransport::new(FlakyStream { chunks: vec![] });
        let mut buf = [0u8; 16];
        assert!(matches!(t.recv(&mut buf), IoOutcome::WouldBlock));
    }

    #[test]
    fn plain_transport_reads_available_bytes() {
        let mut t = PlainTransport::new(FlakyStream {
            chunks: vec![Ok(b"hi".to_vec())],
        });
        let mut buf = [0u8; 16];
        match t.recv(&mut buf) {
            IoOutcome::Ready(2) => assert_eq!(&buf[..2], b"hi"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
