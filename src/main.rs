use std::sync::Arc;

use anyhow::Context;
use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::info;
use tracing_subscriber::EnvFilter;

use static_front::config::Config;
use static_front::http::response::{self, ResponseBody};
use static_front::{server, StaticFront};

fn main() -> anyhow::Result<()> {
    let cfg = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.clone())),
        )
        .init();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> anyhow::Result<()> {
    let addr = cfg
        .socket_addr()
        .map_err(|err| anyhow::anyhow!(err))?;

    let immutable_prefixes = cfg.cache.immutable_prefixes.clone();
    let mut front = StaticFront::new(fallback).with_immutable_test(move |path: &str| {
        immutable_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    });

    // The index must be complete before the listener accepts anything
    for mount in &cfg.mounts {
        front
            .add(&mount.root, &mount.prefix)
            .with_context(|| format!("failed to index mount {}", mount.root))?;
        info!(root = %mount.root, prefix = %mount.prefix, "mount registered");
    }

    let listener = server::bind(addr).context("failed to bind listener")?;
    info!(%addr, files = front.indexed_files(), "serving static assets");

    server::run(listener, Arc::new(front)).await?;
    Ok(())
}

/// Downstream handler for standalone use: nothing sits behind the static
/// layer, so anything it declines is a 404.
async fn fallback(_req: Request<Incoming>) -> Response<ResponseBody> {
    response::not_found()
}
