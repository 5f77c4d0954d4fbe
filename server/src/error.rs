//! Error types surfaced across the server core's public API.
//!
//! Connection-level failures never reach this module: per the propagation policy, every
//! error a connection encounters collapses to a close and is only observable through
//! [`tracing`] events. Only configuration-fatal conditions at the server lifecycle boundary
//! (bind, listen) are represented here.

use std::io;

/// Failure binding or listening on a socket.
///
/// These are configuration-fatal: the caller of [`crate::Server::listen_on_port`] or
/// [`crate::Server::listen_on_fd`] is expected to treat them as unrecoverable for that
/// attempt, though it may retry with different configuration (e.g. a different port).
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    /// Creating the listening socket failed.
    #[error("failed to create listening socket: {0}")]
    Socket(#[source] io::Error),

    /// Setting `SO_REUSEADDR`, `SO_KEEPALIVE`, or `SO_LINGER` on the listening socket failed.
    #[error("failed to configure listening socket options: {0}")]
    SocketOption(#[source] io::Error),

    /// `bind` failed, most commonly because the address is already in use.
    #[error("failed to bind listening socket: {0}")]
    Bind(#[source] io::Error),

    /// `listen` failed after a successful bind.
    #[error("failed to listen on bound socket: {0}")]
    Listen(#[source] io::Error),

    /// Registering the listening socket's accept-readiness source with the event loop failed.
    #[error("failed to register listening socket with event loop: {0}")]
    Register(#[source] io::Error),
}
