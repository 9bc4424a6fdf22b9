//! Fixed-capacity request buffer shared across connections

use embedded_io_async::{Read, ReadReady};

/// Holds whatever part of a request has already arrived.
///
/// The capacity is a hard ceiling: bytes beyond it are left unread in the
/// socket. [`RequestBuffer::reset`] detaches the buffer from the previous
/// connection before it is used for the next one.
#[derive(Debug)]
pub struct RequestBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> Default for RequestBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RequestBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Copy in the bytes the stream already has ready, without waiting for
    /// more. Returns the number of bytes captured by this call.
    pub async fn capture<R>(&mut self, stream: &mut R) -> Result<usize, R::Error>
    where
        R: Read + ReadReady,
    {
        let start = self.len;
        while self.len < N && stream.read_ready()? {
            let n = stream.read(&mut self.buf[self.len..]).await?;
            if n == 0 {
                break;
            }
            self.len += n;
        }
        Ok(self.len - start)
    }

    /// First line of the captured request, without its line ending.
    ///
    /// `None` until a complete, valid UTF-8 line has arrived.
    pub fn request_line(&self) -> Option<&str> {
        let bytes = self.as_bytes();
        let end = bytes.iter().position(|&b| b == b'\n')?;
        let line = core::str::from_utf8(&bytes[..end]).ok()?;
        Some(line.trim_end_matches('\r'))
    }
}
