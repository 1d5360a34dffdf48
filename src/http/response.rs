//! HTTP response building module
//!
//! The serving layer produces a closed set of responses: plain-text status
//! responses, full file sends, and partial (ranged) file sends. Bodies are a
//! tagged union of in-memory bytes and a bounded-chunk file stream, so the
//! dispatch logic never works through polymorphic response objects.

use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};

use http_body_util::Full;
use hyper::body::{Body, Bytes, Frame, SizeHint};
use hyper::Response;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};
use tracing::error;

/// Bytes read from disk per body frame. Memory use per in-flight response is
/// bounded by this regardless of file size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Response body: either buffered bytes or a bounded-chunk file stream.
pub enum ResponseBody {
    /// Entire body held in memory (status pages, downstream responses)
    Full(Full<Bytes>),
    /// File contents streamed chunk by chunk
    File(FileStream),
}

impl ResponseBody {
    /// Empty body (HEAD responses, status responses without text).
    pub fn empty() -> Self {
        Self::Full(Full::new(Bytes::new()))
    }

    /// In-memory body.
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Self::Full(Full::new(bytes.into()))
    }

    /// Stream `len` bytes from the file's current position.
    pub fn file(file: File, len: u64) -> Self {
        Self::File(FileStream::new(file, len))
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        match self.get_mut() {
            Self::Full(inner) => Pin::new(inner)
                .poll_frame(cx)
                .map(|frame| frame.map(|res| res.map_err(|never| match never {}))),
            Self::File(inner) => Pin::new(inner).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Full(inner) => inner.is_end_stream(),
            Self::File(inner) => inner.remaining == 0,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Full(inner) => inner.size_hint(),
            Self::File(inner) => SizeHint::with_exact(inner.remaining),
        }
    }
}

/// Bounded-chunk file body.
///
/// Each frame is fully read from disk before it is handed to the connection,
/// and the next read only happens once the connection polls again, so the
/// outbound write provides the backpressure. Dropping the body stops further
/// reads immediately.
pub struct FileStream {
    file: File,
    remaining: u64,
}

impl FileStream {
    fn new(file: File, len: u64) -> Self {
        Self {
            file,
            remaining: len,
        }
    }
}

impl Body for FileStream {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(None);
        }

        // The final chunk is truncated to the exact remaining byte count
        let want = usize::try_from(this.remaining.min(CHUNK_SIZE as u64))
            .unwrap_or(CHUNK_SIZE);
        let mut buf = vec![0u8; want];
        let mut read_buf = ReadBuf::new(&mut buf);

        match Pin::new(&mut this.file).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => Poll::Ready(Some(Err(err))),
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled().len();
                if filled == 0 {
                    // File shrank underneath us; end the stream
                    this.remaining = 0;
                    return Poll::Ready(None);
                }
                this.remaining -= filled as u64;
                buf.truncate(filled);
                Poll::Ready(Some(Ok(Frame::data(Bytes::from(buf)))))
            }
        }
    }
}

/// Build 404 Not Found response
pub fn not_found() -> Response<ResponseBody> {
    plain_text(404, "Not Found")
}

/// Build 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<ResponseBody> {
    Response::builder()
        .status(405)
        .header("content-type", "text/plain")
        .header("allow", "GET, HEAD")
        .body(ResponseBody::full("Method Not Allowed"))
        .unwrap_or_else(|err| {
            log_build_error("405", &err);
            Response::new(ResponseBody::empty())
        })
}

/// Build 416 Range Not Satisfiable response
pub fn range_not_satisfiable(size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(416)
        .header("content-type", "text/plain")
        .header("content-range", format!("bytes */{size}"))
        .body(ResponseBody::full("Range Not Satisfiable"))
        .unwrap_or_else(|err| {
            log_build_error("416", &err);
            Response::new(ResponseBody::empty())
        })
}

/// Build a plain-text status response
pub fn plain_text(status: u16, message: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(ResponseBody::full(message))
        .unwrap_or_else(|err| {
            log_build_error("plain text", &err);
            Response::new(ResponseBody::empty())
        })
}

/// Build a 200 response streaming an entire file.
///
/// `encoding` carries the `content-encoding` token when a precompressed
/// variant was selected. HEAD requests get the full header set and no body.
pub fn full_file(
    file: File,
    size: u64,
    content_type: &str,
    encoding: Option<&str>,
    cache_control: &str,
    is_head: bool,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(200)
        .header("content-type", content_type)
        .header("content-length", size)
        .header("accept-ranges", "bytes")
        .header("access-control-allow-origin", "*")
        .header("cache-control", cache_control);

    if let Some(token) = encoding {
        builder = builder.header("content-encoding", token);
    }

    let body = if is_head {
        ResponseBody::empty()
    } else {
        ResponseBody::file(file, size)
    };

    builder.body(body).unwrap_or_else(|err| {
        log_build_error("200", &err);
        Response::new(ResponseBody::empty())
    })
}

/// Build a 206 Partial Content response for an already-positioned file.
///
/// The file must be seeked to `start` before calling; exactly
/// `end - start + 1` bytes are streamed.
pub fn partial_file(
    file: File,
    start: u64,
    end: u64,
    size: u64,
    content_type: &str,
    is_head: bool,
) -> Response<ResponseBody> {
    let len = end - start + 1;
    let body = if is_head {
        ResponseBody::empty()
    } else {
        ResponseBody::file(file, len)
    };

    Response::builder()
        .status(206)
        .header("content-type", content_type)
        .header("content-length", len)
        .header("content-range", format!("bytes {start}-{end}/{size}"))
        .header("accept-ranges", "bytes")
        .header("access-control-allow-origin", "*")
        .body(body)
        .unwrap_or_else(|err| {
            log_build_error("206", &err);
            Response::new(ResponseBody::empty())
        })
}

/// Open `path` and position it at `start`, for [`partial_file`].
pub async fn open_at(path: &std::path::Path, start: u64) -> io::Result<File> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(start)).await?;
    Ok(file)
}

/// Log response build error
fn log_build_error(status: &str, err: &hyper::http::Error) {
    error!("failed to build {status} response: {err}");
}
