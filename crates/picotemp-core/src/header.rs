//! Reusable HTTP/1.1 response header
//!
//! A single [`ResponseHeader`] lives for the whole process and is handed to
//! each connection in turn. [`ResponseHeader::reset`] must run before every
//! reuse so no status, content type or length leaks from the previous
//! response.

use core::fmt::Write;

use heapless::String;

use crate::config::HEADER_BUFFER_SIZE;
use crate::responder::ResponseError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Reason phrase for the status codes this server emits.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        STATUS_OK => "OK",
        STATUS_INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug)]
pub struct ResponseHeader {
    status: u16,
    connection_close: bool,
    content_type: Option<&'static str>,
    content_length: Option<usize>,
    encoded: String<HEADER_BUFFER_SIZE>,
}

impl Default for ResponseHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseHeader {
    pub const fn new() -> Self {
        Self {
            status: STATUS_OK,
            connection_close: false,
            content_type: None,
            content_length: None,
            encoded: String::new(),
        }
    }

    /// Return every field to its default, dropping anything set for a
    /// previous response.
    pub fn reset(&mut self) {
        self.status = STATUS_OK;
        self.connection_close = false;
        self.content_type = None;
        self.content_length = None;
        self.encoded.clear();
    }

    pub fn set_connection_close(&mut self) {
        self.connection_close = true;
    }

    pub fn set_status_code(&mut self, status: u16) {
        self.status = status;
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.content_type = Some(content_type);
    }

    pub fn set_content_length(&mut self, length: usize) {
        self.content_length = Some(length);
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn connection_close(&self) -> bool {
        self.connection_close
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Encode the status line and headers, terminated by the blank line.
    ///
    /// The bytes live in the header's own fixed buffer and stay valid until
    /// the next `encode` or `reset`.
    pub fn encode(&mut self) -> Result<&[u8], ResponseError> {
        self.encoded.clear();
        self.write_fields()
            .map_err(|_| ResponseError::HeaderOverflow)?;
        Ok(self.encoded.as_bytes())
    }

    fn write_fields(&mut self) -> core::fmt::Result {
        let out = &mut self.encoded;
        write!(out, "HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status))?;
        if let Some(content_type) = self.content_type {
            write!(out, "Content-Type: {content_type}\r\n")?;
        }
        if let Some(length) = self.content_length {
            write!(out, "Content-Length: {length}\r\n")?;
        }
        if self.connection_close {
            out.write_str("Connection: close\r\n")?;
        }
        out.write_str("\r\n")
    }
}
