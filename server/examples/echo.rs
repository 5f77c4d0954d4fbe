//! A minimal plaintext embedder: answers every request with a fixed 200 response.
//!
//! Exercises the "Plain hello" scenario end to end — bind a port, accept a connection,
//! parse one request, write a response, let the idle timer eventually close it.
//!
//! Run with `cargo run -p server --example echo`, then `curl http://127.0.0.1:5000/`.

use std::net::SocketAddr;

use server::{response_buffer, ConnectionHandler, ListenerConfig, NewConnection, OutboundBuffer, Server, TimeoutDecision};

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\nhello world\n";

struct EchoHandler {
    peer: SocketAddr,
}

impl ConnectionHandler for EchoHandler {
    type Request = ();

    fn new_request(&mut self) -> Option<()> {
        Some(())
    }

    fn on_request(
        &mut self,
        _request: (),
        parsed: &parser::h1::request::H1Request<'_>,
        _trailing: &[u8],
    ) -> Option<OutboundBuffer> {
        tracing::info!(peer = %self.peer, target = ?parsed.target, "request");
        Some(response_buffer(RESPONSE.to_vec()))
    }

    fn on_timeout(&mut self) -> TimeoutDecision {
        TimeoutDecision::Stop
    }

    fn on_close(&mut self) {
        tracing::info!(peer = %self.peer, "connection closed");
    }
}

struct EchoFactory;

impl NewConnection for EchoFactory {
    type Handler = EchoHandler;

    fn new_connection(&mut self, peer: SocketAddr) -> Option<EchoHandler> {
        Some(EchoHandler { peer })
    }
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let mut server = Server::new(EchoFactory, ListenerConfig::plain())?;
    server
        .listen_on_port(5000)
        .expect("failed to bind 127.0.0.1:5000");

    tracing::info!("listening on 0.0.0.0:5000");
    server.run()
}
