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

//! Buffer types used by the connection state machine.
//!
//! Three distinct buffers appear in this module, each grounded in a different part of the
//! data model:
//!
//! - [`OutboundBuffer`] is the single outstanding write slot an embedder fills via
//!   `Connection::write`: a length, a private cursor, an optional release hook, and an
//!   opaque tag.
//! - The inbound scratch buffer an embedder's `new_buf` hook hands back on each readable
//!   firing is represented directly as `Vec<u8>` — it has no cursor, release hook, or tag of
//!   its own, since the core consumes it in full before the call returns.
//! - [`AccumulatingBuffer`] is private core state: received bytes are appended to it and the
//!   parser re-parses its unconsumed contents on every firing, since the bundled parser holds
//!   no state of its own across calls.

use std::{
    alloc::{self, Layout},
    any::Any,
    borrow::{Borrow, BorrowMut},
    fmt,
    io::Write,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr::{copy, copy_nonoverlapping, NonNull},
};

/// The single outstanding outbound buffer slot for a connection.
///
/// Constructed by the embedder and handed to `Connection::write`. The cursor that tracks how
/// much of the buffer has been sent is private to the core; embedders only ever see `len()`
/// and whatever opaque `tag` they attached.
pub struct OutboundBuffer {
    data: Box<[u8]>,
    cursor: usize,
    release: Option<Box<dyn FnOnce() + Send>>,
    tag: Option<Box<dyn Any + Send>>,
}

impl OutboundBuffer {
    /// Creates a new outbound buffer from owned bytes, with no release hook or tag.
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self {
            data: data.into(),
            cursor: 0,
            release: None,
            tag: None,
        }
    }

    /// Attaches a release hook, invoked exactly once: either when the buffer is fully
    /// written, or when the owning connection closes while the buffer is still in flight.
    #[must_use]
    pub fn with_release_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    /// Attaches an opaque value the embedder can recover via [`OutboundBuffer::tag`].
    #[must_use]
    pub fn with_tag<T>(mut self, tag: T) -> Self
    where
        T: Any + Send + 'static,
    {
        self.tag = Some(Box::new(tag));
        self
    }

    /// Total length of the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty. An empty buffer is never valid to submit via
    /// `Connection::write` — the invariant requires `length > 0`.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The embedder-supplied tag, if any.
    pub fn tag(&self) -> Option<&(dyn Any + Send)> {
        self.tag.as_deref()
    }

    /// Bytes not yet handed to the transport.
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    /// Advances the cursor by `n` bytes, firing the release hook once the cursor reaches the
    /// buffer's length.
    pub(crate) fn advance(&mut self, n: usize) {
        self.cursor = self.data.len().min(self.cursor + n);
        if self.is_complete() {
            self.fire_release();
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.cursor >= self.data.len()
    }

    fn fire_release(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl Drop for OutboundBuffer {
    fn drop(&mut self) {
        // Covers the close-while-in-flight case: if the buffer never reached completion the
        // hook has not fired yet, and this is the only remaining chance to do so exactly once.
        self.fire_release();
    }
}

impl fmt::Debug for OutboundBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundBuffer")
            .field("len", &self.data.len())
            .field("cursor", &self.cursor)
            .field("has_release_hook", &self.release.is_some())
            .field("has_tag", &self.tag.is_some())
            .finish()
    }
}

/// A growable, contiguous byte buffer used internally by a connection to accumulate received
/// bytes across reads until the parser reports a complete request.
#[derive(Debug)]
pub struct AccumulatingBuffer {
    ptr: NonNull<u8>,
    cap: usize,
    read_offset: usize,
    write_offset: usize,
    desired_capcity: usize,
    _marker: PhantomData<u8>,
}

impl AccumulatingBuffer {
    /// Creates a new buffer with the given initial capacity.
    pub fn new(desired_capacity: usize) -> Self {
        let mut result = Self {
            ptr: NonNull::dangling(),
            cap: 0, // `grow_to_capacity` will set this
            read_offset: 0,
            write_offset: 0,
            desired_capcity: desired_capacity.next_power_of_two(),
            _marker: PhantomData,
        };

        if desired_capacity > 0 {
            result.desired_capcity = 2;
            result.grow();
        }
        result
    }

    /// Reserves at least `capacity` new space.
    pub fn reserve(&mut self, capacity: usize) {
        self.grow_to_capacity(self.cap + capacity);
    }

    /// Determines the capacity of elements available to be read.
    pub fn remaining(&self) -> usize {
        self.write_offset - self.read_offset
    }

    /// Determines the capacity available for writing.
    pub fn remaining_mut(&self) -> usize {
        self.cap - self.write_offset
    }

    /// Gets the current read position as a pointer. Use `remaining` to obtain the length.
    pub fn read_ptr(&self) -> *mut u8 {
        // Safety: both `ptr` and the resulting ptr are guaranteed to be within the allocated
        // object due to checks when compacting and mutating offsets. The offset will not
        // overflow `isize::MAX` as we never allocate more than that.
        unsafe { self.ptr.as_ptr().add(self.read_offset) }
    }

    /// Gets the current write position as a pointer. Use `remaining_mut` to obtain the length.
    pub fn write_ptr(&self) -> *mut u8 {
        // Safety: both `ptr` and the resulting ptr are guaranteed to be within the allocated
        // object due to checks when compacting and mutating offsets. The offset will not
        // overflow `isize::MAX` as we never allocate more than that.
        unsafe { self.ptr.as_ptr().add(self.write_offset) }
    }

    /// Marks `amount` bytes read from the buffer, freeing them for removal. If this is not
    /// called after reading, the next read sees the same data.
    pub fn mark_read(&mut self, amount: usize) {
        self.read_offset = self.write_offset.min(self.read_offset + amount);
        self.compact();
    }

    /// Marks `amount` bytes written to the buffer. If this is not called after writing, the
    /// next write overwrites the previously written data.
    pub fn mark_written(&mut self, amount: usize) {
        self.write_offset = self.cap.min(self.write_offset + amount);
    }

    fn grow(&mut self) {
        let new_cap = if self.cap == 0 {
            self.desired_capcity
        } else {
            2 * self.cap
        };

        self.grow_to_capacity(new_cap);
    }

    fn grow_to_capacity(&mut self, capacity: usize) {
        assert!(capacity <= isize::MAX as usize);

        let new_cap = capacity.next_power_of_two().min(isize::MAX as usize);

        let new_layout = Layout::array::<u8>(new_cap).unwrap();
        let new_ptr = if self.cap == 0 {
            // Safety: allocation failure is handled, layout is not zero-sized.
            unsafe { alloc::alloc(new_layout) }
        } else {
            let old_layout = Layout::array::<u8>(self.cap).unwrap();
            let old_ptr = self.ptr.as_ptr();

            // Safety: allocation failure is handled, layout is not zero-sized.
            unsafe { alloc::realloc(old_ptr, old_layout, new_layout.size()) }
        };

        self.ptr = match NonNull::new(new_ptr) {
            Some(p) => p,
            None => alloc::handle_alloc_error(new_layout),
        };
        self.cap = new_cap;
    }

    fn clear(&mut self) {
        self.read_offset = 0;
        self.write_offset = 0;

        if self.cap > self.desired_capcity {
            let layout = Layout::array::<u8>(self.cap).unwrap();

            // Safety: allocation failure is handled, layout is not zero-sized.
            let new_ptr =
                unsafe { alloc::realloc(self.ptr.as_ptr(), layout, self.desired_capcity) };

            self.ptr = match NonNull::new(new_ptr) {
                Some(p) => p,
                None => alloc::handle_alloc_error(layout),
            };
            self.cap = self.desired_capcity;
        }
    }

    fn compact(&mut self) {
        if self.remaining() == 0 {
            self.clear();
            return;
        }

        if self.cap == self.desired_capcity {
            return;
        }

        if self.read_offset > self.desired_capcity {
            if self.remaining() < self.read_offset {
                // Safety: `read_ptr()` and `ptr` are valid for `remaining()` and aligned to
                // u8. Copying to the beginning of the buffer will not overlap with `read_ptr`
                // since the read region is smaller than the offset.
                unsafe {
                    copy_nonoverlapping(self.read_ptr(), self.ptr.as_ptr(), self.remaining())
                }
            } else {
                // Safety: `read_ptr()` and `ptr` are valid for `remaining()` and aligned to u8.
                unsafe { copy(self.read_ptr(), self.ptr.as_ptr(), self.remaining()) }
            }

            self.write_offset = self.remaining();
            self.read_offset = 0;
        }
    }
}

impl Drop for AccumulatingBuffer {
    fn drop(&mut self) {
        if self.cap != 0 {
            let layout = Layout::array::<u8>(self.cap).unwrap();
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

impl Borrow<[u8]> for AccumulatingBuffer {
    fn borrow(&self) -> &[u8] {
        // Safety: `read_ptr` points into a single allocated, contiguous, initialized region
        // aligned for `u8`. The slice cannot outlive `self`, and will never exceed
        // `isize::MAX` bytes.
        unsafe { std::slice::from_raw_parts(self.read_ptr(), self.remaining()) }
    }
}

impl BorrowMut<[u8]> for AccumulatingBuffer {
    fn borrow_mut(&mut self) -> &mut [u8] {
        // Safety: `write_ptr` points into a single allocated, contiguous, initialized region
        // aligned for `u8`. The slice cannot outlive `self`, and will never exceed
        // `isize::MAX` bytes.
        unsafe { std::slice::from_raw_parts_mut(self.write_ptr(), self.remaining_mut()) }
    }
}

impl Deref for AccumulatingBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.borrow()
    }
}

impl DerefMut for AccumulatingBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.borrow_mut()
    }
}

impl Write for AccumulatingBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.remaining_mut() < buf.len() {
            self.reserve(buf.len());
        }
        self.deref_mut()[0..buf.len()].clone_from_slice(buf);
        self.mark_written(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn outbound_buffer_fires_release_hook_once_on_completion() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut buf = OutboundBuffer::new(b"hello".to_vec()).with_release_hook(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        buf.advance(3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        buf.advance(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(buf);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn outbound_buffer_fires_release_hook_on_drop_while_in_flight() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut buf = OutboundBuffer::new(b"hello world".to_vec()).with_release_hook(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        buf.advance(4);
        drop(buf);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn outbound_buffer_tag_round_trips() {
        let buf = OutboundBuffer::new(b"abc".to_vec()).with_tag(42usize);
        assert_eq!(buf.tag().unwrap().downcast_ref::<usize>(), Some(&42));
    }

    #[test]
    fn accumulating_buffer_write_then_read() {
        let mut buf = AccumulatingBuffer::new(16);
        buf.write_all(b"hello").unwrap();
        assert_eq!(buf.remaining(), 5);
        assert_eq!(&buf[..], b"hello");

        buf.mark_read(5);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn accumulating_buffer_grows_past_initial_capacity() {
        let mut buf = AccumulatingBuffer::new(4);
        let data = vec![7u8; 1024];
        buf.write_all(&data).unwrap();
        assert_eq!(buf.remaining(), 1024);
        assert_eq!(&buf[..], &data[..]);
    }

    #[test]
    fn accumulating_buffer_compacts_after_full_read() {
        let mut buf = AccumulatingBuffer::new(8);
        buf.write_all(b"0123456789").unwrap();
        buf.mark_read(10);
        assert_eq!(buf.remaining(), 0);

        buf.write_all(b"next").unwrap();
        assert_eq!(&buf[..], b"next");
    }
}
