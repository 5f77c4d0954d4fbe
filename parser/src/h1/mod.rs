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

//! HTTP/1.1 parser implementation.

use core::fmt::Display;

use crate::raw_request::RawRequest;

pub mod request;
pub mod response;
pub mod tokens;

/// Possible failures while parsing an HTTP/1.1 message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Invalid byte in method.
    Method,
    /// Invalid byte in target.
    Target,
    /// Invalid or unsupported HTTP version.
    Version,
    /// Invalid byte in header name.
    HeaderName,
    /// Invalid byte in header value.
    HeaderValue,
    /// Invalid or missing new line.
    NewLine,
    /// More headers were present than the parser was configured to hold.
    TooManyHeaders,
}

impl ParseError {
    fn description_str(&self) -> &'static str {
        match *self {
            ParseError::Method => "invalid token in method",
            ParseError::Target => "invalid token in target",
            ParseError::Version => "invalid or unsupported HTTP version",
            ParseError::HeaderName => "invalid token in header name",
            ParseError::HeaderValue => "invalid token in header value",
            ParseError::NewLine => "invalid or missing new line",
            ParseError::TooManyHeaders => "too many headers",
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description_str())
    }
}

impl std::error::Error for ParseError {}

/// The result of a parse step: either a successful value or a parse error.
///
/// Running out of bytes before a step can determine success or failure is *not* an error — see
/// [`Status`].
pub type ParseResult<T> = Result<T, ParseError>;

/// The outcome of a single parse attempt over a (possibly incomplete) buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status<T> {
    /// Parsing finished; `T` is the parsed value.
    Complete(T),
    /// The buffer ended before parsing could finish. The caller should append more bytes and
    /// retry from the beginning of the buffer — this crate's parsers hold no state across calls.
    Partial,
}

impl<T> Status<T> {
    /// True if this is [`Status::Complete`].
    pub fn is_complete(&self) -> bool {
        matches!(self, Status::Complete(_))
    }

    /// True if this is [`Status::Partial`].
    pub fn is_partial(&self) -> bool {
        matches!(self, Status::Partial)
    }
}

/// A single HTTP header as a borrowed name/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'buf> {
    /// The header field name, verbatim (not lower-cased).
    pub name: &'buf str,
    /// The header field value, with leading optional whitespace already discarded.
    pub value: &'buf str,
}

/// Advances past zero or more optional whitespace (SP, HTAB) characters.
pub fn discard_whitespace(buf: &mut RawRequest<'_>) {
    while let Some(b' ') | Some(b'\t') = buf.peek() {
        buf.next();
    }
    buf.slice();
}

/// Advances past exactly one CRLF sequence. Returns an error if the next two bytes are not `\r\n`.
pub fn discard_newline(buf: &mut RawRequest<'_>) -> ParseResult<()> {
    match (buf.next(), buf.next()) {
        (Some(&b'\r'), Some(&b'\n')) => {
            buf.slice();
            Ok(())
        }
        _ => Err(ParseError::NewLine),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_is_complete_and_is_partial() {
        assert!(Status::Complete(1).is_complete());
        assert!(!Status::Complete(1).is_partial());
        assert!(Status::<()>::Partial.is_partial());
    }

    #[test]
    fn discard_whitespace_consumes_spaces_and_tabs() {
        let mut req = RawRequest::new(b"  \tfoo");
        discard_whitespace(&mut req);
        assert_eq!(b"foo", req.as_ref());
    }

    #[test]
    fn discard_newline_requires_crlf() {
        let mut req = RawRequest::new(b"\r\nfoo");
        assert!(discard_newline(&mut req).is_ok());
        assert_eq!(b"foo", req.as_ref());

        let mut bad = RawRequest::new(b"\nfoo");
        assert_eq!(Err(ParseError::NewLine), discard_newline(&mut bad));
    }
}
