//! Server runtime module
//!
//! Owns connection I/O for the standalone binary: a reusable TCP listener,
//! one tokio task per connection, hyper HTTP/1.1 serving, and graceful
//! shutdown on SIGINT/SIGTERM. The dispatch layer itself is runtime-agnostic
//! and only sees requests this module feeds it.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::dispatch::StaticFront;

/// Create a `TcpListener` with `SO_REUSEPORT` and `SO_REUSEADDR` enabled,
/// so a replacement process can bind before this one releases the port.
pub fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    // Non-blocking mode for async compatibility
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Accept connections until a shutdown signal arrives.
///
/// The index inside `front` is fully built before this is called; requests
/// never observe a partial index.
pub async fn run(
    listener: TcpListener,
    front: Arc<StaticFront<Incoming>>,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        debug!(%peer_addr, "connection accepted");
                        spawn_connection(stream, Arc::clone(&front));
                    }
                    Err(err) => {
                        error!(error = %err, "failed to accept connection");
                    }
                }
            }
            () = shutdown_signal() => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }
    Ok(())
}

/// Serve one connection in its own task. In-flight requests on other
/// connections are unaffected by this one's lifecycle.
fn spawn_connection(stream: TcpStream, front: Arc<StaticFront<Incoming>>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| {
            let front = Arc::clone(&front);
            async move { Ok::<_, Infallible>(front.serve(req).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(true)
            .serve_connection(io, service);

        if let Err(err) = conn.await {
            debug!(error = %err, "connection closed with error");
        }
    });
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
