// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unused_imports
)]
// Disallow warnings in examples.
#![doc(test(attr(deny(warnings))))]

//! An embeddable, single-threaded, non-blocking HTTP/1.x server core.
//!
//! This crate owns the connection lifecycle — the accept loop, the per-connection I/O
//! state machine that coordinates readability, writability, TLS handshake progress, and
//! idle-timeout expiry — and nothing else. It has no request-handling policy and
//! generates no responses; embedders supply both by implementing the traits in
//! [`handler`] and driving [`Server`].
//!
//! ## Example
//!
//! See `examples/echo.rs` for a complete plaintext server built on this crate.

mod buffer;
pub mod connection;
pub mod error;
pub mod handler;
pub mod net;
pub mod server;
mod timer;
pub mod tls;
mod transport;

pub use buffer::OutboundBuffer;
pub use connection::Connection;
pub use error::ListenError;
pub use handler::{response_buffer, ConnectionHandler, NewConnection, TimeoutDecision};
pub use server::{ListenerConfig, Server, DEFAULT_BACKLOG, DEFAULT_TIMEOUT};
