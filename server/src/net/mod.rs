//! Transport-agnostic socket traits.
//!
//! [`tcp_stream::TcpStream`] and [`tcp_listener::TcpListener`] let the connection state
//! machine and acceptor be generic over either `mio::net` (production, non-blocking) or
//! `std::net` (tests, blocking) sockets without hard-coding either.

pub mod tcp_listener;
pub mod tcp_stream;
