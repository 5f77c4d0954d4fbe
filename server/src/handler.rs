//! The embedder-supplied capability surface.
//!
//! Expressed as two small traits rather than a struct of nullable function pointers, so
//! an embedder only overrides the hooks it actually needs; every method carries a
//! sensible default.

use crate::buffer::OutboundBuffer;
use parser::h1::request::H1Request;

/// What to do when a connection's idle timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutDecision {
    /// Restart the idle timer for another full period.
    Again,
    /// Begin closing the connection.
    #[default]
    Stop,
}

/// Default inbound read buffer size: one TCP maximum window.
pub const DEFAULT_INBOUND_BUFFER: usize = 65_536;

/// Per-connection capability surface supplied by the embedder.
///
/// A fresh handler is constructed for every accepted connection via
/// [`NewConnection::new_connection`]; its lifetime is exactly the connection's.
pub trait ConnectionHandler {
    /// The per-request value created by [`ConnectionHandler::new_request`] and handed back to
    /// [`ConnectionHandler::on_request`].
    type Request;

    /// Provides a scratch buffer to receive into on the next readable firing.
    ///
    /// Returning `None` signals back-pressure: the core treats it as fatal for this
    /// connection rather than queuing reads implicitly.
    fn new_buf(&mut self) -> Option<Vec<u8>> {
        Some(vec![0u8; DEFAULT_INBOUND_BUFFER])
    }

    /// Creates the per-request object the parser's output will be delivered into.
    ///
    /// Called once a complete request line and header block have been parsed. Returning
    /// `None` causes the request to be dropped without invoking `on_request`.
    fn new_request(&mut self) -> Option<Self::Request> {
        None
    }

    /// Delivers a fully parsed request.
    ///
    /// `trailing` is whatever bytes followed the parsed request in the same read (a
    /// pipelined request, or the start of a message body) — framing those bytes is left
    /// to the embedder; this core has no HTTP semantics of its own.
    ///
    /// Returning `Some(buf)` is the embedder's write entrypoint for the common case of
    /// responding synchronously from within this callback: the core submits it to the
    /// connection's outbound slot immediately after this call returns,
    /// subject to the same single-buffer-in-flight contract as calling `Connection::write`
    /// directly. An embedder answering asynchronously (e.g. after a database call) instead
    /// returns `None` here and calls `Connection::write` later via whatever handle it kept
    /// to the connection (commonly its `mio::Token`, looked up again through the embedder's
    /// own bookkeeping).
    fn on_request(
        &mut self,
        request: Self::Request,
        parsed: &H1Request<'_>,
        trailing: &[u8],
    ) -> Option<OutboundBuffer>;

    /// Consulted when the connection's idle timer expires.
    fn on_timeout(&mut self) -> TimeoutDecision {
        TimeoutDecision::Stop
    }

    /// Invoked once, immediately after the connection reaches the `Closed` state.
    fn on_close(&mut self) {}

    /// Invoked once, immediately before the connection's slot is reclaimed — the last
    /// observable action the core takes on this handler.
    fn on_free(&mut self) {}
}

/// Server-level factory: allocates a handler for each newly accepted connection.
pub trait NewConnection {
    /// The handler type this server hands out to every accepted connection.
    type Handler: ConnectionHandler;

    /// Allocates a handler for a connection accepted from `peer`.
    ///
    /// Returning `None` is a soft rejection (e.g. a connection table at capacity): the
    /// accepted socket is closed immediately and the server keeps listening.
    fn new_connection(&mut self, peer: std::net::SocketAddr) -> Option<Self::Handler>;
}

/// A value an embedder can submit to `Connection::write`, built from owned bytes.
pub fn response_buffer(bytes: impl Into<Box<[u8]>>) -> OutboundBuffer {
    OutboundBuffer::new(bytes)
}
