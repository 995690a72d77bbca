//! Cursor traits over caller-owned byte buffers.
//!
//! The stream engine never allocates on behalf of a streaming call. It reads
//! from the contiguous readable region of a [`ReadCursor`] and appends into the
//! spare capacity of a [`WriteCursor`], advancing each by exactly the bytes
//! the codec transferred.
//!
//! Implementations are provided for [`BytesMut`], [`Bytes`], `&[u8]` and
//! `Vec<u8>`.

use bytes::{Buf, Bytes, BytesMut};

/// A buffer with a contiguous readable region that can be consumed from the front.
pub trait ReadCursor {
    /// The readable bytes, without copying.
    fn readable(&self) -> &[u8];

    /// Mark `count` readable bytes as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds [`ReadCursor::readable_bytes`].
    fn advance_reader(&mut self, count: usize);

    /// Number of readable bytes.
    fn readable_bytes(&self) -> usize {
        self.readable().len()
    }
}

/// A buffer that accepts in-place appends up to its current capacity.
pub trait WriteCursor {
    /// Number of bytes that can be appended without reallocating.
    fn writable_bytes(&self) -> usize;

    /// Offer the writable region to `fill` and keep the prefix it reports as written.
    ///
    /// `fill` returns the number of bytes it wrote and an arbitrary value that
    /// is handed back to the caller. Bytes beyond the reported count are
    /// discarded.
    fn append_with<T, F>(&mut self, fill: F) -> T
    where
        F: FnOnce(&mut [u8]) -> (usize, T);
}

impl ReadCursor for BytesMut {
    fn readable(&self) -> &[u8] {
        self
    }

    fn advance_reader(&mut self, count: usize) {
        Buf::advance(self, count);
    }
}

impl ReadCursor for Bytes {
    fn readable(&self) -> &[u8] {
        self
    }

    fn advance_reader(&mut self, count: usize) {
        Buf::advance(self, count);
    }
}

impl<'a> ReadCursor for &'a [u8] {
    fn readable(&self) -> &[u8] {
        self
    }

    fn advance_reader(&mut self, count: usize) {
        let rest: &'a [u8] = *self;
        *self = &rest[count..];
    }
}

impl WriteCursor for BytesMut {
    fn writable_bytes(&self) -> usize {
        self.capacity() - self.len()
    }

    fn append_with<T, F>(&mut self, fill: F) -> T
    where
        F: FnOnce(&mut [u8]) -> (usize, T),
    {
        let start = self.len();
        let end = self.capacity();
        self.resize(end, 0);
        let (written, value) = fill(&mut self[start..]);
        self.truncate(start + written.min(end - start));
        value
    }
}

impl WriteCursor for Vec<u8> {
    fn writable_bytes(&self) -> usize {
        self.capacity() - self.len()
    }

    fn append_with<T, F>(&mut self, fill: F) -> T
    where
        F: FnOnce(&mut [u8]) -> (usize, T),
    {
        let start = self.len();
        let end = self.capacity();
        self.resize(end, 0);
        let (written, value) = fill(&mut self[start..]);
        self.truncate(start + written.min(end - start));
        value
    }
}
