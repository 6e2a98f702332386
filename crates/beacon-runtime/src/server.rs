//! HTTP server implementation

use crate::handler::RequestHandler;
use crate::shutdown::ShutdownSignal;
use crate::static_files::StaticFiles;
use crate::RuntimeState;
use beacon_config::Config;
use beacon_core::{Error, Middleware, Result};
use beacon_middleware::MiddlewareBuilder;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// HTTP server
#[derive(Debug)]
pub struct Server {
    config: Config,
    handler: RequestHandler,
    state: Arc<RwLock<RuntimeState>>,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Create a new server builder
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Get the current state
    pub async fn state(&self) -> RuntimeState {
        *self.state.read().await
    }

    /// Get configured listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.config.server.listen
    }

    /// Get request count
    pub fn request_count(&self) -> usize {
        self.handler.request_count()
    }

    /// Get the request handler
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.listen_addr()).await.map_err(|e| {
            Error::Runtime(format!("Failed to bind to {}: {}", self.listen_addr(), e))
        })?;

        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Running;
        }

        let local_addr = listener.local_addr()?;
        self.log_startup(local_addr);

        let mut shutdown_rx = self.shutdown.subscribe();

        while !self.shutdown.is_triggered() {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::trace!(peer = %addr, "Accepted connection");
                            let handler = self.handler.clone();

                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    let handler = handler.clone();
                                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                                });

                                let io = TokioIo::new(stream);
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    tracing::debug!(peer = %addr, error = %e, "HTTP connection error");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        {
            let mut state = self.state.write().await;
            *state = RuntimeState::ShuttingDown;
        }
        drop(listener);

        self.drain().await;

        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Stopped;
        }

        Ok(())
    }

    /// Wait for in-flight requests, up to the configured shutdown timeout
    async fn drain(&self) {
        let shutdown_timeout = self.config.server.shutdown_timeout;
        let start = Instant::now();

        tracing::info!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Waiting for in-flight requests to complete"
        );

        loop {
            let active = self.handler.active_requests();

            if active == 0 {
                tracing::info!("All requests completed, shutting down cleanly");
                break;
            }

            if start.elapsed() >= shutdown_timeout {
                tracing::warn!(
                    active_requests = active,
                    "Shutdown timeout reached, forcing shutdown"
                );
                break;
            }

            tracing::debug!(
                active_requests = active,
                elapsed_ms = start.elapsed().as_millis(),
                "Waiting for active requests to complete"
            );

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tracing::info!(
            shutdown_duration_ms = start.elapsed().as_millis(),
            total_requests = self.handler.request_count(),
            "Server stopped"
        );
    }

    fn log_startup(&self, local_addr: SocketAddr) {
        let assets = &self.config.assets;

        tracing::info!(
            listen = %local_addr,
            site_root = %self.config.server.site_root.display(),
            "Server running"
        );
        tracing::info!(
            compression = self.config.compression.enabled,
            exempt_extensions = ?self.config.compression.exempt_extensions,
            minified_css = assets.rewrite_minified_css,
            priority_hints = assets.priority_hints,
            critical_css = assets.inline_critical_css,
            cache_control = self.config.cache.enabled,
            "Features enabled"
        );
        for resource in &assets.critical_resources {
            tracing::info!(resource = %resource, "Critical resource");
        }
    }
}

/// Server builder
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    extra_middleware: Vec<Arc<dyn Middleware>>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Append a middleware after the standard site chain
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.extra_middleware.push(middleware);
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("config is required".to_string()))?;

        let site_root = &config.server.site_root;
        let assets = &config.assets;

        if assets.inline_critical_css {
            let css_path = site_root.join(&assets.critical_css);
            // A read-only site root still serves, just without inlining
            if let Err(e) = beacon_css::critical::ensure_placeholder(&css_path) {
                tracing::warn!(error = %e, "Could not create critical CSS placeholder");
            }
        }

        let mut chain = MiddlewareBuilder::site(
            site_root,
            &config.request_logging,
            &config.compression,
            assets,
            &config.cache,
        )?;
        for middleware in self.extra_middleware {
            chain = chain.with_middleware(middleware);
        }

        tracing::info!(middleware_count = chain.len(), "Middleware chain assembled");

        let endpoint = Arc::new(StaticFiles::new(
            site_root.clone(),
            config.server.index_file.clone(),
        ));
        let handler = RequestHandler::new(chain.build(), endpoint);

        Ok(Server {
            config,
            handler,
            state: Arc::new(RwLock::new(RuntimeState::Initializing)),
            shutdown: ShutdownSignal::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_config::ConfigBuilder;
    use tempfile::TempDir;

    fn test_config(root: &std::path::Path) -> Config {
        ConfigBuilder::new()
            .listen("127.0.0.1:0".parse().unwrap())
            .site_root(root)
            .shutdown_timeout(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_server_builder() {
        let dir = TempDir::new().unwrap();
        let server = ServerBuilder::new()
            .config(test_config(dir.path()))
            .build()
            .unwrap();

        assert_eq!(server.listen_addr(), "127.0.0.1:0".parse::<std::net::SocketAddr>().unwrap());
        assert_eq!(server.request_count(), 0);
        assert!(dir.path().join("css/critical.css").exists());
    }

    #[test]
    fn test_server_builder_no_config() {
        let result = ServerBuilder::new().build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let server = Arc::new(
            Server::builder()
                .config(test_config(dir.path()))
                .build()
                .unwrap(),
        );
        assert_eq!(server.state().await, RuntimeState::Initializing);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let running = Arc::clone(&server);
        let task = tokio::spawn(async move { running.serve(listener).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        server.shutdown_signal().trigger();

        task.await.unwrap().unwrap();
        assert_eq!(server.state().await, RuntimeState::Stopped);
    }
}
