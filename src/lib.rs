//! Static asset serving layer
//!
//! Serves files under registered URL prefixes in front of a wrapped
//! application: requests the layer cannot answer fall through to the
//! application untouched. Precompressed `.br`/`.gz` siblings produced by the
//! offline [`compress`] pipeline are selected through `Accept-Encoding`
//! negotiation, cache lifetimes follow an injectable immutability predicate,
//! and single byte ranges are served from the uncompressed originals.
//!
//! ```no_run
//! use hyper::body::Incoming;
//! use hyper::{Request, Response};
//! use static_front::http::response::{self, ResponseBody};
//! use static_front::StaticFront;
//!
//! # fn main() -> static_front::Result<()> {
//! async fn app(_req: Request<Incoming>) -> Response<ResponseBody> {
//!     response::not_found()
//! }
//!
//! let mut front = StaticFront::new(app)
//!     .with_immutable_test(|path: &str| path.starts_with("/static/releases/"));
//! front.add("static", "/static/")?;
//! # Ok(())
//! # }
//! ```

pub mod compress;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod index;
pub mod server;

// Re-export the main entry points
pub use dispatch::{Application, StaticFront};
pub use error::{Error, Result};
pub use http::response::ResponseBody;
pub use index::FileIndex;
