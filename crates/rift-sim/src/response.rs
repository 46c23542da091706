//! Simulated response type.
//!
//! Responses are plain `hyper::Response` values whose body is a
//! [`ResponseBody`]: nothing, a buffer, or a seekable async stream (which is
//! what transfer-rate throttling decorates).

use bytes::Bytes;
use hyper::{Response, StatusCode};
use std::fmt;
use std::io::Cursor;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek};

/// Readable and seekable content source.
pub trait ContentStream: AsyncRead + AsyncSeek + Send {}

impl<T: AsyncRead + AsyncSeek + Send + ?Sized> ContentStream for T {}

/// Body of a simulated response.
#[derive(Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Full(Bytes),
    Stream(Pin<Box<dyn ContentStream>>),
}

impl ResponseBody {
    pub fn stream<S>(stream: S) -> Self
    where
        S: ContentStream + 'static,
    {
        ResponseBody::Stream(Box::pin(stream))
    }

    /// Turn any body into a stream, wrapping buffers in a cursor.
    pub fn into_stream(self) -> Pin<Box<dyn ContentStream>> {
        match self {
            ResponseBody::Empty => Box::pin(Cursor::new(Bytes::new())),
            ResponseBody::Full(bytes) => Box::pin(Cursor::new(bytes)),
            ResponseBody::Stream(stream) => stream,
        }
    }

    /// Length when known without reading.
    pub fn len_hint(&self) -> Option<usize> {
        match self {
            ResponseBody::Empty => Some(0),
            ResponseBody::Full(bytes) => Some(bytes.len()),
            ResponseBody::Stream(_) => None,
        }
    }

    /// Read the whole body.
    pub async fn collect(self) -> std::io::Result<Bytes> {
        match self {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Full(bytes) => Ok(bytes),
            ResponseBody::Stream(mut stream) => {
                let mut buffer = Vec::new();
                stream.read_to_end(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        ResponseBody::Full(bytes)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        ResponseBody::Full(Bytes::from(text))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        ResponseBody::Full(Bytes::from_static(text.as_bytes()))
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Response produced by a setup.
pub type HttpResponse = Response<ResponseBody>;

/// Draft every pipeline starts from: 200 OK, no headers, empty body.
pub fn draft() -> HttpResponse {
    Response::new(ResponseBody::Empty)
}

/// Response with only a status code set.
pub fn with_status(status: StatusCode) -> HttpResponse {
    let mut response = draft();
    *response.status_mut() = status;
    response
}
