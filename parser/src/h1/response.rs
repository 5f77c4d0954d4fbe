//! A small helper for embedders to assemble an HTTP/1.1 response into bytes.
//!
//! This core does not generate responses — embedders decide status, headers and body — but
//! since almost every embedder needs to turn those decisions into a wire-format byte buffer, this
//! crate ships the serialization step as a convenience. Nothing here is consulted by the
//! connection state machine.

use std::fmt::Write as _;

use crate::{status::Status, Version};

/// An HTTP/1.1 response, built up with the `with_*` methods and turned into bytes with
/// [`Response::serialize`].
#[derive(Debug, Clone)]
pub struct Response {
    version: Version,
    status: Status,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Starts a new response with the given status line.
    pub fn new(version: Version, status: Status) -> Self {
        Self {
            version,
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header. Does not deduplicate against headers already added.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the response body. Does not set `Content-Length` automatically — callers that want
    /// it must add the header themselves, since the core never inspects the body to infer it.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes the status line, headers and body into a single byte buffer suitable for
    /// handing to a connection's write entrypoint.
    pub fn serialize(&self) -> Vec<u8> {
        let mut head = String::new();
        let _ = write!(
            head,
            "{} {} {}\r\n",
            self.version,
            self.status,
            self.status.reason_phrase()
        );
        for (name, value) in &self.headers {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}
