//! Encoding negotiation and header policy
//!
//! Decides which byte stream and which response headers a resolved file gets:
//! precompressed variant selection in a fixed preference order, the two
//! cache-control constants, and the ranged-send path that bypasses encoding
//! negotiation entirely.

use std::path::{Path, PathBuf};

use hyper::Response;
use tokio::fs;
use tracing::warn;

use crate::http::mime;
use crate::http::range::{self, RangeSpec, ResolvedRange};
use crate::http::response::{self, ResponseBody};

/// Cache lifetime for immutable files. Ten years is what nginx sets as the
/// max age if you use `expires max;` so we follow its lead.
pub const FOREVER: &str = "max-age=315360000, public, immutable";

/// Cache lifetime for everything else.
pub const A_LITTLE_WHILE: &str = "max-age=60, public";

/// Recognized precompressed variants as `(file suffix, content-encoding
/// token)`, in preference order. The first one the client accepts and the
/// filesystem can satisfy wins.
pub const CONTENT_ENCODINGS: &[(&str, &str)] = &[(".br", "br"), (".gz", "gzip")];

/// Serve a resolved file in full, negotiating the content encoding.
///
/// Iterates [`CONTENT_ENCODINGS`] in order, skipping encodings the client's
/// `Accept-Encoding` does not mention. A physical path that itself carries
/// the encoding's suffix is served directly; otherwise the `<path><suffix>`
/// sibling is probed. If no encoding matches, the original file is served
/// with no `content-encoding` header.
pub async fn respond_full(
    physical: &Path,
    accept_encoding: &str,
    is_head: bool,
    immutable: bool,
) -> Response<ResponseBody> {
    let cache_control = if immutable { FOREVER } else { A_LITTLE_WHILE };

    let name = physical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    for &(suffix, token) in CONTENT_ENCODINGS {
        if !accept_encoding.contains(token) {
            continue;
        }

        // The indexed file may itself be a variant with no uncompressed
        // counterpart; serve it under its inner type.
        if let Some(base) = name.strip_suffix(suffix) {
            let content_type = mime::content_type(Path::new(base));
            return send(physical, content_type, Some(token), cache_control, is_head).await;
        }

        let sibling = suffixed(physical, suffix);
        if is_file(&sibling).await {
            let content_type = mime::content_type(physical);
            return send(&sibling, content_type, Some(token), cache_control, is_head).await;
        }
    }

    let content_type = mime::content_type(physical);
    send(physical, content_type, None, cache_control, is_head).await
}

/// Serve a byte window of the uncompressed original.
///
/// The window is resolved against the size statted right now, never a cached
/// one. An unsatisfiable window is a 416; encoding negotiation does not
/// apply here.
pub async fn respond_range(
    physical: &Path,
    spec: RangeSpec,
    is_head: bool,
) -> Response<ResponseBody> {
    let size = match fs::metadata(physical).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) | Err(_) => {
            warn!(path = %physical.display(), "indexed file no longer statable");
            return response::not_found();
        }
    };

    match range::resolve(spec, size) {
        ResolvedRange::Unsatisfiable => response::range_not_satisfiable(size),
        ResolvedRange::Window { start, end } => {
            match response::open_at(physical, start).await {
                Ok(file) => {
                    let content_type = mime::content_type(physical);
                    response::partial_file(file, start, end, size, content_type, is_head)
                }
                Err(err) => {
                    warn!(path = %physical.display(), error = %err, "failed to open indexed file");
                    response::not_found()
                }
            }
        }
    }
}

/// Open a file and stream it whole.
async fn send(
    path: &Path,
    content_type: &str,
    encoding: Option<&str>,
    cache_control: &str,
    is_head: bool,
) -> Response<ResponseBody> {
    let (file, size) = match open_with_size(path).await {
        Ok(opened) => opened,
        Err(err) => {
            // The index is immutable; a file deleted after startup degrades
            // to a 404 rather than crashing the worker.
            warn!(path = %path.display(), error = %err, "failed to open indexed file");
            return response::not_found();
        }
    };

    response::full_file(file, size, content_type, encoding, cache_control, is_head)
}

async fn open_with_size(path: &Path) -> std::io::Result<(fs::File, u64)> {
    let file = fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    Ok((file, size))
}

/// `<path><suffix>`, e.g. `app.css` -> `app.css.br`.
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}
