//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension. This is a
//! fixed extension table, not content sniffing.

use std::path::Path;

/// Get the Content-Type for a file path based on its extension.
///
/// Compressed variants are labeled by the caller with the *original* file's
/// path, so a `.br` sibling of `app.css` is still served as `text/css`.
pub fn content_type(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Get the Content-Type for a file extension.
///
/// # Examples
/// ```
/// use static_front::http::mime::from_extension;
/// assert_eq!(from_extension(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(from_extension(Some("mp4")), "video/mp4");
/// assert_eq!(from_extension(None), "application/octet-stream");
/// ```
pub fn from_extension(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",

        // JavaScript/WASM
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",

        // Video
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogg" | "ogv") => "video/ogg",

        // Audio
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",
        Some("br") => "application/octet-stream",
        Some("tar") => "application/x-tar",

        // Default
        _ => "application/octet-stream",
    }
}
