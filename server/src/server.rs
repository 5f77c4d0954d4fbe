//! Server lifecycle: bind/listen/unlisten and the single-threaded accept+drive loop.
//!
//! `Slab`-indexed connections dispatched by `mio::Token`, a reserved token for the
//! listening socket, `poll`-then-dispatch-then-reregister, with direct same-thread
//! dispatch into [`Connection`]. There is exactly one `Poll` per `Server`, and every
//! event source — the listening socket, every connection's socket, the idle-timer wheel
//! — is driven from this one loop on this one thread.

use std::{
    io,
    net::SocketAddr,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use mio::{
    event::Event,
    net::{TcpListener as MioTcpListener, TcpStream as MioTcpStream},
    Events, Interest, Poll, Token,
};
use rustls::ServerConfig;
use slab::Slab;
use socket2::{Domain, Socket, Type};
use tracing::{debug, info, warn};

use crate::{
    connection::{ConnState, Connection, Outcome},
    error::ListenError,
    handler::NewConnection,
    timer::TimerWheel,
    tls,
};

const LISTEN_TOKEN: Token = Token(usize::MAX);

/// `listen`'s backlog argument, and a sane default an embedder's own connection-table
/// back-pressure can size against. The core does not itself enforce this as a
/// connection-count ceiling — it only ever reaches the kernel's `listen` call.
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Idle-connection timeout applied to accepted connections unless [`ListenerConfig::with_timeout`]
/// overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const EVENTS_CAPACITY: usize = 1024;

/// Bind/listen/TLS configuration for a [`Server`].
///
/// The caller-supplied fields: the secure/plain flag and, when secure, the credential
/// material.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// TLS configuration; `None` means the server speaks plaintext HTTP.
    pub tls: Option<Arc<ServerConfig>>,
    /// Idle-connection timeout, rearmed by every successful I/O operation.
    pub timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            tls: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ListenerConfig {
    /// A plaintext configuration with the default idle timeout.
    pub fn plain() -> Self {
        Self::default()
    }

    /// A TLS configuration loaded from a PEM certificate chain and an RSA/ECDSA private
    /// key. Credential loading panics on failure rather than returning a `Result` — see
    /// [`tls::load_server_config`].
    pub fn secure(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Self {
        Self {
            tls: Some(tls::load_server_config(cert_path.as_ref(), key_path.as_ref())),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the idle timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The embeddable server core: owns the listening socket, the event loop, the timer
/// wheel, and every accepted connection.
///
/// `F` is the embedder's connection factory; a fresh `F::Handler` is minted for each
/// accepted socket and lives exactly as long as that connection — for its entire
/// lifetime it belongs to exactly one `Server` value, which owns it in the `Slab`.
pub struct Server<F: NewConnection> {
    factory: F,
    config: ListenerConfig,
    poll: Poll,
    listener: Option<MioTcpListener>,
    listening: bool,
    port_name: Option<String>,
    connections: Slab<Connection<MioTcpStream, F::Handler>>,
    timers: TimerWheel,
}

impl<F: NewConnection> std::fmt::Debug for Server<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listening", &self.listening)
            .field("port_name", &self.port_name)
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl<F: NewConnection> Server<F> {
    /// Creates a server bound to no socket yet. `factory` is caller-owned for the
    /// server's entire lifetime.
    pub fn new(factory: F, config: ListenerConfig) -> io::Result<Self> {
        Ok(Self {
            factory,
            config,
            poll: Poll::new()?,
            listener: None,
            listening: false,
            port_name: None,
            connections: Slab::new(),
            timers: TimerWheel::new(),
        })
    }

    /// Whether the server currently has an armed accept-readiness source.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// The number of connections currently open.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Looks up a connection by the `Token` it was accepted under, e.g. so an embedder
    /// that answered a request asynchronously can call [`Connection::write`] on it
    /// directly instead of only ever responding from inside `on_request`.
    pub fn connection_mut(&mut self, token: Token) -> Option<&mut Connection<MioTcpStream, F::Handler>> {
        self.connections.get_mut(token.0)
    }

    /// The address the listening socket is bound to, e.g. to discover the port actually
    /// assigned after binding to port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not listening"))?
            .local_addr()
    }

    /// Binds, configures, and begins listening on `port` on all interfaces.
    ///
    /// Socket option ordering: `SO_REUSEADDR`, then `SO_KEEPALIVE`, then
    /// `SO_LINGER{off,0}`, then `bind`, then `listen`. `TCP_NODELAY` is deliberately
    /// *not* set here — it is applied per-connection to each accepted socket instead,
    /// not to the listening socket.
    pub fn listen_on_port(&mut self, port: u16) -> Result<(), ListenError> {
        let addr: SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, port).into();

        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).map_err(ListenError::Socket)?;
        socket.set_reuse_address(true).map_err(ListenError::SocketOption)?;
        socket.set_keepalive(true).map_err(ListenError::SocketOption)?;
        socket
            .set_linger(Some(Duration::ZERO))
            .map_err(ListenError::SocketOption)?;
        socket.bind(&addr.into()).map_err(ListenError::Bind)?;
        socket.listen(DEFAULT_BACKLOG).map_err(ListenError::Listen)?;

        self.listen_on_socket(socket, Some(port))
    }

    /// Adopts an already-bound, already-listening socket (e.g. one passed down by a
    /// process supervisor via socket activation) and arms the accept source on the
    /// event loop. No named port is recorded, so accepted connections will not carry a
    /// decoded peer IP.
    pub fn listen_on_fd(&mut self, socket: Socket) -> Result<(), ListenError> {
        self.listen_on_socket(socket, None)
    }

    fn listen_on_socket(&mut self, socket: Socket, named_port: Option<u16>) -> Result<(), ListenError> {
        socket.set_nonblocking(true).map_err(ListenError::SocketOption)?;
        let std_listener: std::net::TcpListener = socket.into();
        let mut listener = MioTcpListener::from_std(std_listener);

        self.poll
            .registry()
            .register(&mut listener, LISTEN_TOKEN, Interest::READABLE)
            .map_err(ListenError::Register)?;

        self.listener = Some(listener);
        self.listening = true;
        self.port_name = named_port.map(|p| p.to_string());
        info!(port = ?named_port, "listening");
        Ok(())
    }

    /// Disarms the accept source and closes the listening handle. Existing connections
    /// are left untouched — unlisten is an accept-only stop.
    pub fn unlisten(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            let _ = self.poll.registry().deregister(&mut listener);
        }
        self.listening = false;
        self.port_name = None;
        info!("unlistened");
    }

    /// Runs the accept+drive loop until a fatal `poll` error occurs.
    ///
    /// Each iteration: block until the next event or the earliest scheduled idle
    /// timeout, whichever comes first; dispatch every fired event; then sweep expired
    /// timers. No step in this loop may block beyond that single `poll` call.
    pub fn run(&mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        loop {
            self.run_once(&mut events)?;
        }
    }

    /// Runs exactly one iteration of the accept+drive loop: one `poll` call, dispatch of
    /// whatever fired, and a timer sweep. Exposed so tests and embedders needing to
    /// interleave the loop with other work can drive it step by step instead of calling
    /// [`Server::run`].
    pub fn run_once(&mut self, events: &mut Events) -> io::Result<()> {
        let timeout = self
            .timers
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));

        self.poll.poll(events, timeout)?;

        for event in events.iter() {
            match event.token() {
                LISTEN_TOKEN => {
                    if event.is_error() {
                        warn!("listening socket reported an error; unlistening");
                        self.unlisten();
                        continue;
                    }
                    self.accept();
                }
                token => self.dispatch(token, event),
            }
        }

        self.drive_timers();
        Ok(())
    }

    fn accept(&mut self) {
        loop {
            let Some(listener) = self.listener.as_ref() else {
                return;
            };

            let (stream, peer_addr) = match listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    return;
                }
            };

            let Some(handler) = self.factory.new_connection(peer_addr) else {
                debug!(%peer_addr, "new_connection refused; dropping accepted socket");
                drop(stream);
                continue;
            };

            let _ = stream.set_nodelay(true);

            let peer_ip = self.port_name.is_some().then(|| peer_addr.ip().to_string());
            let entry = self.connections.vacant_entry();
            let token = Token(entry.key());

            let mut connection = match &self.config.tls {
                Some(tls_config) => match rustls::ServerConnection::new(tls_config.clone()) {
                    Ok(session) => Connection::secure(
                        token,
                        stream,
                        session,
                        peer_addr,
                        peer_ip,
                        handler,
                        self.config.timeout,
                    ),
                    Err(e) => {
                        warn!(error = %e, "failed to start TLS session; dropping connection");
                        continue;
                    }
                },
                None => {
                    Connection::plain(token, stream, peer_addr, peer_ip, handler, self.config.timeout)
                }
            };

            if connection.register(self.poll.registry()).is_err() {
                continue;
            }

            self.timers.schedule(token, connection.deadline());
            debug!(%peer_addr, token = token.0, "accepted connection");
            entry.insert(connection);
        }
    }

    fn dispatch(&mut self, token: Token, event: &Event) {
        let Some(connection) = self.connections.get_mut(token.0) else {
            return;
        };

        let outcome = if event.is_error() {
            Outcome::Close
        } else {
            match connection.state() {
                ConnState::Handshaking => {
                    if event.is_readable() || event.is_writable() {
                        connection.on_handshake_progress()
                    } else {
                        Outcome::Continue
                    }
                }
                ConnState::Active => {
                    let read_outcome = if event.is_readable() {
                        connection.on_readable()
                    } else {
                        Outcome::Continue
                    };

                    if read_outcome == Outcome::Close {
                        Outcome::Close
                    } else if event.is_writable() {
                        connection.on_writable()
                    } else {
                        Outcome::Continue
                    }
                }
                ConnState::Closed => Outcome::Continue,
            }
        };

        if outcome == Outcome::Close {
            self.close_connection(token);
            return;
        }

        if let Some(connection) = self.connections.get_mut(token.0) {
            self.timers.schedule(token, connection.deadline());
            if connection.reregister(self.poll.registry()).is_err() {
                self.close_connection(token);
            }
        }
    }

    fn drive_timers(&mut self) {
        let now = Instant::now();
        for token in self.timers.pop_expired(now) {
            let Some(connection) = self.connections.get_mut(token.0) else {
                continue;
            };

            match connection.on_timeout() {
                Outcome::Continue => {
                    self.timers.schedule(token, connection.deadline());
                }
                Outcome::Close => self.close_connection(token),
            }
        }
    }

    fn close_connection(&mut self, token: Token) {
        if let Some(connection) = self.connections.get_mut(token.0) {
            connection.begin_close();
            let _ = connection.deregister(self.poll.registry());
            connection.finalize();
        }
        self.timers.cancel(token);
        self.connections.try_remove(token.0);
        debug!(token = token.0, "connection closed");
    }
}
