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

//! HTTP/1.1 request-line and header parsing.
//!
//! [`H1Request`] borrows from the buffer passed to [`H1Request::parse`]; it holds no state
//! between calls. That is a deliberate choice: a connection that has only received part of a
//! request cannot safely keep a previous `H1Request<'buf>` borrowing a buffer that may be grown
//! (and therefore reallocated) before the rest of the request arrives — the borrow would outlive
//! the memory it points to. Callers re-parse from the start of the accumulated buffer on every
//! new chunk of bytes and, on [`Status::Complete`], convert the borrowed fields to owned storage
//! before the borrow's scope ends.

use core::str::from_utf8_unchecked;

use super::tokens::{is_header_name_token, is_header_value_token, is_request_target_token};
use super::{discard_newline, discard_whitespace, Header, ParseError, ParseResult, Status};
use crate::raw_request::RawRequest;
use crate::{Method, Version};

/// A parsed HTTP/1.1 request line and header block, borrowing from the input buffer.
///
/// Reused across calls to [`H1Request::parse`] via [`H1Request::new`] or [`Default::default`];
/// each call clears previously parsed fields before attempting to parse the supplied buffer from
/// the beginning.
#[derive(Debug, Default)]
pub struct H1Request<'buf> {
    /// The request method.
    pub method: Option<Method>,
    /// The request target, as the raw bytes between the method and the version (not
    /// percent-decoded).
    pub target: Option<&'buf str>,
    /// The declared HTTP version.
    pub version: Option<Version>,
    /// Headers, in wire order, with no deduplication or folding applied.
    pub headers: Vec<Header<'buf>>,
}

impl<'buf> H1Request<'buf> {
    /// Creates an empty request, ready for [`H1Request::parse`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to parse a complete request line and header block from `buf`.
    ///
    /// On [`Status::Complete`], the returned `usize` is the number of bytes of `buf` that made up
    /// the request line and headers (including the terminating blank line) — any bytes beyond
    /// that offset belong to the message body, or to a second pipelined request, and are left
    /// untouched.
    ///
    /// On [`Status::Partial`], `buf` did not contain enough bytes to finish parsing; `self` is
    /// left cleared so the next call starts from a clean slate.
    ///
    /// # Example
    /// ```
    /// # use parser::h1::request::H1Request;
    /// # use parser::{Method, Version};
    /// let mut req = H1Request::new();
    /// req.parse(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
    /// assert_eq!(Some(Method::Get), req.method);
    /// assert_eq!(Some("/"), req.target);
    /// assert_eq!(Some(Version::H1_1), req.version);
    /// ```
    pub fn parse(&mut self, buf: &'buf [u8]) -> ParseResult<Status<usize>> {
        self.method = None;
        self.target = None;
        self.version = None;
        self.headers.clear();

        let mut req = RawRequest::new(buf);

        let method = match parse_method(&mut req)? {
            Status::Complete(m) => m,
            Status::Partial => return Ok(Status::Partial),
        };

        let target = match parse_target(&mut req)? {
            Status::Complete(t) => t,
            Status::Partial => return Ok(Status::Partial),
        };

        let version = match parse_version(&mut req)? {
            Status::Complete(v) => v,
            Status::Partial => return Ok(Status::Partial),
        };

        if req.len() < 2 {
            return Ok(Status::Partial);
        }
        discard_newline(&mut req)?;

        loop {
            match parse_header(&mut req)? {
                Status::Complete(Some(header)) => self.headers.push(header),
                Status::Complete(None) => break,
                Status::Partial => return Ok(Status::Partial),
            }
        }

        self.method = Some(method);
        self.target = Some(target);
        self.version = Some(version);

        let consumed = buf.len() - req.as_ref().len();
        Ok(Status::Complete(consumed))
    }
}

/// Consumes the method token and the single space that follows it.
fn parse_method<'b>(buf: &mut RawRequest<'b>) -> ParseResult<Status<Method>> {
    loop {
        match buf.next() {
            Some(b' ') => {
                let slice = buf.slice_skip(1).map_err(|_| ParseError::Method)?;
                return Ok(Status::Complete(Method::try_from(slice)?));
            }
            Some(b) if !b.is_ascii_uppercase() => return Err(ParseError::Method),
            Some(_) => continue,
            None => return Ok(Status::Partial),
        }
    }
}

/// Consumes the request target and the single space that follows it.
fn parse_target<'b>(buf: &mut RawRequest<'b>) -> ParseResult<Status<&'b str>> {
    loop {
        match buf.next() {
            Some(&b' ') => {
                let slice = buf.slice_skip(1).map_err(|_| ParseError::Target)?;
                // SAFETY: every byte was checked against `is_request_target_token`, which admits
                // only single-byte ASCII values, so the slice is valid UTF-8.
                return Ok(Status::Complete(unsafe { from_utf8_unchecked(slice) }));
            }
            Some(&b) if !is_request_target_token(b) => return Err(ParseError::Target),
            Some(_) => continue,
            None => return Ok(Status::Partial),
        }
    }
}

/// Consumes the HTTP version token up to (not including) the CRLF that ends the request line.
fn parse_version<'b>(buf: &mut RawRequest<'b>) -> ParseResult<Status<Version>> {
    loop {
        match buf.peek() {
            Some(b'\r') => {
                let slice = buf.slice();
                return Ok(Status::Complete(Version::try_from(slice)?));
            }
            Some(_) => {
                buf.next();
            }
            None => return Ok(Status::Partial),
        }
    }
}

/// Parses a single header line, or `None` if the next bytes are the blank line ending the
/// header block.
fn parse_header<'b>(buf: &mut RawRequest<'b>) -> ParseResult<Status<Option<Header<'b>>>> {
    if buf.peek() == Some(b'\r') {
        if buf.len() < 2 {
            return Ok(Status::Partial);
        }
        discard_newline(buf)?;
        return Ok(Status::Complete(None));
    }

    let name = match buf.take_until(|b| !is_header_name_token(b)) {
        Some(name) => name,
        None if buf.is_empty() => return Ok(Status::Partial),
        None => return Err(ParseError::HeaderName),
    };

    match buf.next() {
        Some(&b':') => {}
        Some(_) => return Err(ParseError::HeaderName),
        None => return Ok(Status::Partial),
    }
    buf.slice();

    discard_whitespace(buf);

    let value = match buf.take_until(|b| b == b'\r') {
        Some(value) => value,
        None if buf.is_empty() => return Ok(Status::Partial),
        None => return Err(ParseError::HeaderValue),
    };

    for &b in value {
        if !is_header_value_token(b) {
            return Err(ParseError::HeaderValue);
        }
    }

    if buf.len() < 2 {
        return Ok(Status::Partial);
    }
    discard_newline(buf)?;

    // SAFETY: `name` passed `is_header_name_token` (a subset of ASCII) and `value` passed
    // `is_header_value_token` (also ASCII), so both are valid UTF-8.
    let (name, value) = unsafe { (from_utf8_unchecked(name), from_utf8_unchecked(value)) };

    Ok(Status::Complete(Some(Header { name, value })))
}
