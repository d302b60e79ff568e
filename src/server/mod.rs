//! HTTP server facade.
//!
//! [`Server`] owns the root route [`Scope`], so endpoints are declared on
//! it directly. Serving builds the route tree once and runs every request
//! through the resulting [`ApiHandler`]; handlers run on tokio's blocking
//! pool and read the request body as a plain [`std::io::Read`].
//!
//! # Example
//!
//! ```rust,ignore
//! use smartapi::{query_param, Routes, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), smartapi::ServerError> {
//!     let mut server = Server::new();
//!     server.get("/hello", |name: String| -> Result<String, smartapi::BoxError> {
//!         Ok(format!("hello {name}"))
//!     }, [query_param("name")]);
//!     server.start("127.0.0.1:8080".parse().unwrap()).await
//! }
//! ```
//!
//! # Graceful Shutdown
//!
//! Ctrl-c or [`Server::trigger_shutdown`] stops the accept loop. Open
//! connections are asked to finish their in-flight requests and are given
//! `drain_timeout` to close.

mod connection;
mod error;

pub use error::ServerError;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::binding::Param;
use crate::config::ServerConfig;
use crate::core::{Request, ResponseWriter};
use crate::endpoint::{BuildError, Handler};
use crate::logging::{Logger, NoopLogger};
use crate::middleware::Middleware;
use crate::router::{ApiHandler, Routes, Scope, With};

use connection::Acceptor;

/// An API server: a root scope plus the settings to serve it.
pub struct Server {
    root: Scope,
    logger: Arc<dyn Logger>,
    config: ServerConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
    active_connections: Arc<AtomicUsize>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// A server with no routes, default settings and a no-op logger.
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            root: Scope::new(),
            logger: Arc::new(NoopLogger),
            config: ServerConfig::default(),
            shutdown_tx: Arc::new(shutdown_tx),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Logger for errors returned by endpoints.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Add middleware to the root scope.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.root.use_middleware(middleware);
        self
    }

    /// See [`Scope::with`].
    pub fn with<M: Middleware + 'static>(&mut self, middleware: M) -> With<'_> {
        self.root.with(middleware)
    }

    /// See [`Scope::route`].
    pub fn route<F>(
        &mut self,
        pattern: &str,
        build: F,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        F: FnOnce(&mut Scope),
    {
        self.root.route(pattern, build, params);
        self
    }

    /// See [`Scope::raw`].
    pub fn raw<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, ResponseWriter) + Send + Sync + 'static,
    {
        self.root.raw(method, pattern, handler);
        self
    }

    /// Build the request handler, or every registration error.
    pub fn handler(&self) -> Result<ApiHandler, BuildError> {
        self.root.handler(Arc::clone(&self.logger))
    }

    /// Stop accepting connections and start draining.
    pub fn trigger_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// A cloneable handle that triggers shutdown from elsewhere.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown_tx))
    }

    /// Connections currently open.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind `addr` and serve until shutdown.
    pub async fn start(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let handler = self.handler()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve_with(listener, handler).await
    }

    /// Bind the configured listen address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.start(self.config.listen_addr).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let handler = self.handler()?;
        self.serve_with(listener, handler).await
    }

    async fn serve_with(
        &self,
        listener: TcpListener,
        handler: ApiHandler,
    ) -> Result<(), ServerError> {
        let acceptor = Acceptor {
            handler,
            config: self.config.clone(),
            active_connections: Arc::clone(&self.active_connections),
        };
        acceptor
            .run(listener, self.shutdown_tx.subscribe())
            .await?;
        Ok(())
    }
}

impl Routes for Server {
    fn add_endpoint<H, A>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.root.add_endpoint(method, pattern, handler, params);
        self
    }
}

/// Triggers shutdown of the [`Server`] it came from.
#[derive(Clone, Debug)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}
