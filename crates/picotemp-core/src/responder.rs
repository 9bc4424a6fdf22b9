//! HTTP responder for the temperature endpoint
//!
//! Builds exactly one response per call: the current reading as a JSON
//! object, or a bodiless 500 if the body cannot be encoded. Every response
//! carries `Connection: close`.

use embedded_io_async::{Error as _, ErrorKind, Write};
use log::{error, info};
use thiserror_no_std::Error;

use crate::config::RESPONSE_BODY_CAPACITY;
use crate::header::{ResponseHeader, STATUS_INTERNAL_SERVER_ERROR};
use crate::temperature::{TemperatureReading, TemperatureSource};

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    #[error("response header does not fit its buffer")]
    HeaderOverflow,
    #[error("writing the response header failed: {0:?}")]
    WriteHeader(ErrorKind),
    #[error("writing the response body failed: {0:?}")]
    WriteBody(ErrorKind),
    #[error("flushing the response failed: {0:?}")]
    Flush(ErrorKind),
}

/// Encode `reading` into `body`, returning the encoded length.
pub fn encode_body(
    reading: &TemperatureReading,
    body: &mut [u8],
) -> Result<usize, serde_json_core::ser::Error> {
    serde_json_core::to_slice(reading, body)
}

/// Write the temperature response to `out`.
///
/// `header` must already be reset. Returns the status code sent.
pub async fn respond<W, S>(
    out: &mut W,
    header: &mut ResponseHeader,
    sensor: &mut S,
) -> Result<u16, ResponseError>
where
    W: Write,
    S: TemperatureSource,
{
    let mut body_buf = [0u8; RESPONSE_BODY_CAPACITY];
    respond_into(out, header, sensor, &mut body_buf).await
}

/// [`respond`] with a caller-provided body buffer.
///
/// The body is only written once the header went out, and on the 500 path
/// it is empty.
pub async fn respond_into<W, S>(
    out: &mut W,
    header: &mut ResponseHeader,
    sensor: &mut S,
    body_buf: &mut [u8],
) -> Result<u16, ResponseError>
where
    W: Write,
    S: TemperatureSource,
{
    header.set_connection_close();
    info!("Got temperature request...");
    let reading = TemperatureReading::sample(sensor);

    let body: &[u8] = match encode_body(&reading, body_buf) {
        Ok(len) => {
            header.set_content_type(CONTENT_TYPE_JSON);
            header.set_content_length(len);
            &body_buf[..len]
        }
        Err(e) => {
            error!("temperature json: {:?}", e);
            header.set_status_code(STATUS_INTERNAL_SERVER_ERROR);
            &[]
        }
    };

    let status = header.status_code();
    out.write_all(header.encode()?)
        .await
        .map_err(|e| ResponseError::WriteHeader(e.kind()))?;
    if !body.is_empty() {
        out.write_all(body)
            .await
            .map_err(|e| ResponseError::WriteBody(e.kind()))?;
    }
    out.flush().await.map_err(|e| ResponseError::Flush(e.kind()))?;

    Ok(status)
}
