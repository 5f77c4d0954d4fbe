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
// Disallow warnings in doc examples.
#![doc(test(attr(deny(warnings))))]

//! Incremental, zero-copy parsing of HTTP/1.1 request lines, headers and status lines.
//!
//! Every parse step borrows from the caller's buffer and reports [`Status::Partial`] rather
//! than erroring when it runs out of bytes, so a caller holding a growable accumulation buffer
//! can feed it bytes as they arrive off the wire and re-drive the parser with the same slice plus
//! whatever was appended since the last attempt.

pub mod h1;
pub mod raw_request;
mod method;
mod status;
mod version;

pub use method::Method;
pub use status::Status as HttpStatus;
pub use version::Version;

pub use h1::{ParseError, ParseResult, Status};

/// Marker trait implemented by the parsers in this crate, reserved for a future point at which
/// more than one wire format (H1, H2, H3) shares a common entry point.
pub trait Parser {}
