//! Growable, contiguous byte buffer with independent read/write cursors.
//!
//! This is the same design as a ring-less growable buffer: bytes are appended at the
//! write cursor and consumed from the read cursor; once every written byte has been
//! consumed the buffer is compacted back to its initial capacity so a long-lived
//! keep-alive connection doesn't pin a large allocation between requests.

use std::{
    alloc::{self, Layout},
    borrow::{Borrow, BorrowMut},
    io::{self, Read, Write},
    ptr::{self, NonNull},
};

/// A growable byte buffer used for both a connection's inbound and outbound data.
#[derive(Debug)]
pub struct Buffer {
    ptr: NonNull<u8>,
    cap: usize,
    read_offset: usize,
    write_offset: usize,
    initial_capacity: usize,
}

// SAFETY: `Buffer` owns its heap allocation exclusively; there is no shared mutable
// state that would make moving it across threads unsound.
unsafe impl Send for Buffer {}

impl Buffer {
    /// Creates a buffer that starts with `initial_capacity` bytes of backing storage.
    pub fn new(initial_capacity: usize) -> Self {
        let mut buf = Self {
            ptr: NonNull::dangling(),
            cap: 0,
            read_offset: 0,
            write_offset: 0,
            initial_capacity: initial_capacity.next_power_of_two().max(1),
        };
        buf.grow_to(buf.initial_capacity);
        buf
    }

    /// Bytes available to be read (the "peek" region of spec.md §3).
    pub fn readable(&self) -> usize {
        self.write_offset - self.read_offset
    }

    /// Spare capacity available for writing without reallocating.
    fn writable(&self) -> usize {
        self.cap - self.write_offset
    }

    /// The contiguous slice of unread bytes.
    pub fn peek(&self) -> &[u8] {
        self.borrow()
    }

    /// Advances the read cursor by `amount` bytes, clamped to what's readable, and
    /// compacts the buffer back to its initial capacity once fully drained. This is the
    /// "retrieve N" operation of spec.md §3.
    pub fn retrieve(&mut self, amount: usize) {
        self.read_offset = self.write_offset.min(self.read_offset + amount);
        self.compact();
    }

    /// Discards every unread byte. This is the "retrieve all" operation of spec.md §3,
    /// used when a connection's request/response cycle completes.
    pub fn retrieve_all(&mut self) {
        self.read_offset = self.write_offset;
        self.compact();
    }

    /// Appends bytes from `source`, growing as needed, looping until `source` reports
    /// `WouldBlock`, EOF (`Ok(0)`), or a hard error. This is the "append from fd"
    /// operation of spec.md §3; non-blocking sockets report `WouldBlock` once drained.
    ///
    /// Returns the total number of bytes appended, or the terminating error/EOF if no
    /// bytes were appended at all.
    pub fn append_from<R: Read>(&mut self, source: &mut R) -> io::Result<usize> {
        let mut total = 0usize;
        loop {
            if self.writable() < 4096 {
                self.reserve(16 * 1024);
            }

            match source.read(self.spare_capacity_mut()) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    self.mark_written(n);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return if total == 0 { Err(e) } else { Ok(total) }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return if total == 0 { Err(e) } else { Ok(total) },
            }
        }
    }

    /// Ensures at least `additional` bytes of spare write capacity are available.
    pub fn reserve(&mut self, additional: usize) {
        if self.writable() < additional {
            self.grow_to(self.write_offset + additional);
        }
    }

    fn spare_capacity_mut(&mut self) -> &mut [u8] {
        self.borrow_mut()
    }

    fn mark_written(&mut self, amount: usize) {
        self.write_offset = self.cap.min(self.write_offset + amount);
    }

    fn grow_to(&mut self, capacity: usize) {
        assert!(capacity <= isize::MAX as usize);
        let new_cap = capacity.next_power_of_two().min(isize::MAX as usize);
        if new_cap <= self.cap {
            return;
        }

        let new_layout = Layout::array::<u8>(new_cap).unwrap();
        let new_ptr = if self.cap == 0 {
            // SAFETY: layout is non-zero-sized; allocation failure is checked below.
            unsafe { alloc::alloc(new_layout) }
        } else {
            let old_layout = Layout::array::<u8>(self.cap).unwrap();
            // SAFETY: `self.ptr` was allocated with `old_layout`; allocation failure is
            // checked below.
            unsafe { alloc::realloc(self.ptr.as_ptr(), old_layout, new_layout.size()) }
        };

        self.ptr = match NonNull::new(new_ptr) {
            Some(p) => p,
            None => alloc::handle_alloc_error(new_layout),
        };
        self.cap = new_cap;
    }

    /// Resets to a clean state and frees capacity beyond the initial allocation.
    fn clear(&mut self) {
        self.read_offset = 0;
        self.write_offset = 0;

        if self.cap > self.initial_capacity {
            let layout = Layout::array::<u8>(self.cap).unwrap();
            // SAFETY: `self.ptr` was allocated with a `self.cap`-sized layout;
            // `self.initial_capacity` is non-zero and smaller, so shrinking is valid.
            let new_ptr = unsafe { alloc::realloc(self.ptr.as_ptr(), layout, self.initial_capacity) };
            self.ptr = match NonNull::new(new_ptr) {
                Some(p) => p,
                None => alloc::handle_alloc_error(layout),
            };
            self.cap = self.initial_capacity;
        }
    }

    /// Shifts unread bytes to the front of the allocation once the read cursor has
    /// drifted far enough to be worth reclaiming, or resets entirely once drained.
    fn compact(&mut self) {
        if self.readable() == 0 {
            self.clear();
            return;
        }

        if self.read_offset < self.initial_capacity {
            return;
        }

        let len = self.readable();
        // SAFETY: both regions are within the single allocation backing `self.ptr`;
        // `copy` tolerates the overlap between `[read_offset, read_offset+len)` and
        // `[0, len)` when they intersect.
        unsafe { ptr::copy(self.ptr.as_ptr().add(self.read_offset), self.ptr.as_ptr(), len) };
        self.read_offset = 0;
        self.write_offset = len;
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.cap != 0 {
            let layout = Layout::array::<u8>(self.cap).unwrap();
            // SAFETY: `self.ptr` was allocated with exactly this layout and is only
            // ever freed once, here.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl Borrow<[u8]> for Buffer {
    fn borrow(&self) -> &[u8] {
        // SAFETY: `[read_offset, write_offset)` is always within the allocated,
        // initialized region of `self.ptr`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(self.read_offset), self.readable()) }
    }
}

impl BorrowMut<[u8]> for Buffer {
    fn borrow_mut(&mut self) -> &mut [u8] {
        // SAFETY: `[write_offset, cap)` is always within the allocated region of
        // `self.ptr` and is not aliased elsewhere while this borrow is held.
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(self.write_offset), self.writable())
        }
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.reserve(buf.len());
        self.spare_capacity_mut()[..buf.len()].copy_from_slice(buf);
        self.mark_written(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_starts_empty() {
        let buf = Buffer::new(64);
        assert_eq!(0, buf.readable());
        assert_eq!(b"" as &[u8], buf.peek());
    }

    #[test]
    fn write_then_peek_returns_written_bytes() {
        let mut buf = Buffer::new(16);
        buf.write_all(b"hello").unwrap();
        assert_eq!(b"hello", buf.peek());
    }

    #[test]
    fn retrieve_advances_past_consumed_bytes() {
        let mut buf = Buffer::new(16);
        buf.write_all(b"hello world").unwrap();
        buf.retrieve(6);
        assert_eq!(b"world", buf.peek());
    }

    #[test]
    fn retrieve_all_drains_and_resets_capacity() {
        let mut buf = Buffer::new(4);
        buf.write_all(b"this is much longer than four bytes").unwrap();
        assert!(buf.cap > buf.initial_capacity);
        buf.retrieve_all();
        assert_eq!(0, buf.readable());
        assert_eq!(buf.initial_capacity, buf.cap);
    }

    #[test]
    fn append_from_reads_until_would_block() {
        struct Chunked(Vec<io::Result<Vec<u8>>>);
        impl Read for Chunked {
            fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
                match self.0.remove(0) {
                    Ok(chunk) => {
                        out[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    Err(e) => Err(e),
                }
            }
        }

        let mut source = Chunked(vec![
            Ok(b"ab".to_vec()),
            Ok(b"cd".to_vec()),
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
        ]);
        let mut buf = Buffer::new(16);
        let n = buf.append_from(&mut source).unwrap();
        assert_eq!(4, n);
        assert_eq!(b"abcd", buf.peek());
    }

    #[test]
    fn append_from_reports_eof_as_zero() {
        struct Eof;
        impl Read for Eof {
            fn read(&mut self, _out: &mut [u8]) -> io::Result<usize> {
                Ok(0)
            }
        }
        let mut buf = Buffer::new(16);
        let n = buf.append_from(&mut Eof).unwrap();
        assert_eq!(0, n);
    }
}
