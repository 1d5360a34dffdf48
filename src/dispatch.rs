//! Request dispatch module
//!
//! Entry point for HTTP request processing: path normalization, prefix
//! matching, method validation, index lookup, and delegation to the header
//! policy and range engine. Everything outside the registered prefixes is
//! forwarded, untouched, to the wrapped application.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use hyper::{Method, Request, Response};

use crate::error::Result;
use crate::http::policy;
use crate::http::range;
use crate::http::response::{self, ResponseBody};
use crate::index::FileIndex;

/// A heap-allocated, type-erased future resolving to a response.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response<ResponseBody>> + Send + 'static>>;

/// The wrapped downstream application.
///
/// Automatically implemented for any `async fn(Request<B>) -> Response<ResponseBody>`
/// (and closures of the same shape), so the dispatcher can wrap a plain
/// handler function without ceremony.
pub trait Application<B>: Send + Sync + 'static {
    /// Handle a request the static layer declined.
    fn call(&self, req: Request<B>) -> BoxFuture;
}

impl<F, Fut, B> Application<B> for F
where
    F: Fn(Request<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<ResponseBody>> + Send + 'static,
{
    fn call(&self, req: Request<B>) -> BoxFuture {
        Box::pin(self(req))
    }
}

/// Predicate deciding whether a logical path is immutable content.
pub type ImmutableTest = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// The static-asset serving layer.
///
/// Built at startup (registrations via [`add`](Self::add)), then shared
/// immutably across request handlers; [`serve`](Self::serve) takes `&self`
/// and the index never changes after construction, so no locking is needed.
pub struct StaticFront<B> {
    index: FileIndex,
    root_path: String,
    immutable_test: ImmutableTest,
    app: Arc<dyn Application<B>>,
}

impl<B: 'static> StaticFront<B> {
    /// Wrap a downstream application.
    pub fn new(app: impl Application<B>) -> Self {
        Self {
            index: FileIndex::new(),
            root_path: String::new(),
            immutable_test: Box::new(|_| false),
            app: Arc::new(app),
        }
    }

    /// Set the predicate for serving files with the long-lived immutable
    /// cache directive. The default treats nothing as immutable.
    #[must_use]
    pub fn with_immutable_test(
        mut self,
        test: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.immutable_test = Box::new(test);
        self
    }

    /// Set the mount prefix the hosting runtime strips before matching
    /// (empty by default).
    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Index every regular file under `root` beneath `prefix`.
    ///
    /// May be called multiple times; expected to run at startup only.
    pub fn add(&mut self, root: impl AsRef<Path>, prefix: &str) -> Result<()> {
        self.index.register(root, prefix)
    }

    /// Number of files the layer will serve.
    pub fn indexed_files(&self) -> usize {
        self.index.len()
    }

    /// Handle one request.
    ///
    /// Requests outside every registered prefix move to the wrapped
    /// application with method, URI, headers, and body untouched. In-prefix
    /// requests are answered here: `405` for non-GET/HEAD, `404` for
    /// unmapped paths, otherwise a negotiated or ranged file send.
    pub async fn serve(&self, req: Request<B>) -> Response<ResponseBody> {
        let path = normalize_path(req.uri().path(), &self.root_path);

        if !self.index.matches_prefix(&path) {
            return self.app.call(req).await;
        }

        if !matches!(*req.method(), Method::GET | Method::HEAD) {
            return response::method_not_allowed();
        }

        let Some(physical) = self.index.lookup(&path) else {
            return response::not_found();
        };

        let is_head = *req.method() == Method::HEAD;
        let range_spec = req
            .headers()
            .get("range")
            .and_then(|value| value.to_str().ok())
            .and_then(range::parse);

        // A byte range bypasses encoding negotiation and targets the
        // uncompressed original; anything unparseable degrades to a full
        // response.
        if let Some(spec) = range_spec {
            return policy::respond_range(physical, spec, is_head).await;
        }

        let accept_encoding = req
            .headers()
            .get("accept-encoding")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let immutable = (self.immutable_test)(&path);

        policy::respond_full(physical, accept_encoding, is_head, immutable).await
    }
}

/// Normalize a request path: strip the host-supplied root path, resolve `.`
/// and `..` segments lexically, and collapse duplicate separators. `..` at
/// the root stays at the root, so the result can never climb above a mount.
fn normalize_path(raw: &str, root_path: &str) -> String {
    let raw = if root_path.is_empty() {
        raw
    } else {
        raw.strip_prefix(root_path).unwrap_or(raw)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut path = String::with_capacity(raw.len());
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}
