//! Connection handling and the bridge between hyper and the sync dispatcher.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::core::{BodyReader, Request, Response};
use crate::router::ApiHandler;

/// Decrements the active connection count when the connection task ends.
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(active))
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Accept loop state shared by every connection of one listener.
pub(crate) struct Acceptor {
    pub(crate) handler: ApiHandler,
    pub(crate) config: ServerConfig,
    pub(crate) active_connections: Arc<AtomicUsize>,
}

impl Acceptor {
    /// Accept connections until ctrl-c or `shutdown` turns true, then drain.
    pub(crate) async fn run(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<()> {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.header_read_timeout)
            .keep_alive(true);
        builder.http2().max_concurrent_streams(250);

        let graceful = GracefulShutdown::new();
        info!(addr = %listener.local_addr()?, routes = self.handler.route_count(), "listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!(error = %e, "accept error");
                            continue;
                        }
                    };
                    self.spawn_connection(&builder, &graceful, stream, remote_addr);
                }
                _ = shutdown_signal(&mut shutdown) => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        self.drain(graceful).await;
        Ok(())
    }

    fn spawn_connection(
        &self,
        builder: &auto::Builder<TokioExecutor>,
        graceful: &GracefulShutdown,
        stream: TcpStream,
        remote_addr: SocketAddr,
    ) {
        let _ = stream.set_nodelay(true);

        let handler = self.handler.clone();
        let service = service_fn(move |req: hyper::Request<Incoming>| {
            let handler = handler.clone();
            async move { Ok::<_, Infallible>(dispatch(handler, req, remote_addr).await) }
        });

        let conn = builder
            .serve_connection(TokioIo::new(stream), service)
            .into_owned();
        let conn = graceful.watch(conn);
        let guard = ConnectionGuard::new(&self.active_connections);

        tokio::spawn(async move {
            let _guard = guard;
            if let Err(err) = conn.await {
                // Client resets and half-closed sockets end up here.
                debug!(error = ?err, client = %remote_addr, "connection error");
            }
        });
    }

    async fn drain(&self, graceful: GracefulShutdown) {
        let active = self.active_connections.load(Ordering::Relaxed);
        if active > 0 {
            debug!(active, "waiting for connections to drain");
        }
        tokio::select! {
            _ = graceful.shutdown() => {
                debug!("all connections closed");
            }
            _ = tokio::time::sleep(self.config.drain_timeout) => {
                warn!(
                    active = self.active_connections.load(Ordering::Relaxed),
                    "drain timeout reached with open connections"
                );
            }
        }
    }
}

async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = shutdown.wait_for(|stop| *stop) => {}
    }
}

/// Run one request through the handler on the blocking pool.
///
/// The body stays a stream; handlers read it through a blocking reader.
pub(crate) async fn dispatch(
    handler: ApiHandler,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> hyper::Response<Full<Bytes>> {
    let request = into_request(req);
    let response = match tokio::task::spawn_blocking(move || {
        handler.serve_from(request, Some(remote_addr))
    })
    .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, client = %remote_addr, "request task failed");
            Response::error(StatusCode::INTERNAL_SERVER_ERROR, "unknown")
        }
    };

    let response: http::Response<Bytes> = response.into();
    response.map(Full::new)
}

/// Convert a hyper request, wrapping its body in a blocking reader.
///
/// Must be called inside the runtime; the reader blocks on it.
pub(crate) fn into_request(req: hyper::Request<Incoming>) -> Request {
    let (parts, body) = req.into_parts();
    let stream = TryStreamExt::map_err(body.into_data_stream(), io::Error::other).boxed();
    let body: BodyReader = Box::new(SyncIoBridge::new(StreamReader::new(stream)));

    let mut request = Request::new(parts.method, parts.uri, parts.headers, body);
    request.set_version(parts.version);
    request
}
