//! HTTP Game Server
//!
//! Async HTTP/1 server for the game API and the static web client.
//!
//! ```text
//!   TcpListener ──accept──► connection task (hyper http1)
//!                                 │
//!                          RequestHandler::handle
//!                           │                │
//!                     API route          other path
//!                           │                │
//!                  spawn_blocking       static_files
//!                  GameService::*
//! ```
//!
//! Storage calls block, so actions run on the blocking pool.

use hyper::service::service_fn;
use hyper::server::conn::http1;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{env_or, ConfigError};
use crate::game::actions::{ActionError, GameService};
use crate::game::view::GameView;
use crate::network::protocol::{
    action_status, error_response, json_response, parse_request, ApiRequest, HttpResponse,
};
use crate::network::static_files::serve_file;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Directory holding the web client.
    pub web_path: PathBuf,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            web_path: PathBuf::from("./web"),
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env_or("CLICKER_BIND_ADDR", defaults.bind_addr)?,
            web_path: env_or("CLICKER_WEB_PATH", defaults.web_path)?,
            max_connections: env_or("CLICKER_MAX_CONNECTIONS", defaults.max_connections)?,
        })
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

// =============================================================================
// REQUEST HANDLING
// =============================================================================

/// Routes requests to the game service or the web directory.
pub struct RequestHandler {
    service: Arc<GameService>,
    web_path: PathBuf,
}

impl RequestHandler {
    /// Create a handler.
    pub fn new(service: Arc<GameService>, web_path: PathBuf) -> Self {
        Self { service, web_path }
    }

    /// Handle one request.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse {
        let path = req.uri().path();

        let Some(parsed) = parse_request(path, req.uri().query()) else {
            if req.method() != Method::GET && req.method() != Method::HEAD {
                return error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
            }
            return serve_file(&self.web_path, path).await;
        };

        if req.method() != Method::GET {
            return error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        }

        match parsed {
            Ok(request) => self.execute(request).await,
            Err(e) => {
                debug!("bad request to {}: {}", path, e);
                error_response(StatusCode::BAD_REQUEST, &e.to_string())
            }
        }
    }

    #[instrument(skip(self), fields(route = request.name()))]
    async fn execute(&self, request: ApiRequest) -> HttpResponse {
        let service = self.service.clone();
        let now = unix_now();

        let result = tokio::task::spawn_blocking(move || -> Result<GameView, ActionError> {
            match request {
                ApiRequest::Enter { account_key } => service.enter(account_key, now),
                ApiRequest::Click { account_key, item_id } => service.click(account_key, item_id, now),
                ApiRequest::Buy { account_key, item_id } => service.buy(account_key, item_id),
                ApiRequest::Reset { account_key } => service.reset(account_key),
            }
        })
        .await;

        match result {
            Ok(Ok(view)) => json_response(StatusCode::OK, &view),
            Ok(Err(e)) => {
                let status = action_status(&e);
                if status.is_server_error() {
                    error!("{} failed for account {}: {}", request.name(), request.account_key(), e);
                } else {
                    warn!("{} rejected for account {}: {}", request.name(), request.account_key(), e);
                }
                error_response(status, &e.to_string())
            }
            Err(e) => {
                error!("{} task failed: {}", request.name(), e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared request handler.
    handler: Arc<RequestHandler>,
    /// Open connections.
    connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, service: Arc<GameService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let handler = Arc::new(RequestHandler::new(service, config.web_path.clone()));

        Self {
            config,
            handler,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Run the server until [`GameServer::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connection_count() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Serve one HTTP connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let handler = self.handler.clone();
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(handler.handle(req).await) }
            });

            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        debug!("Connection error from {}: {}", addr, e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    conn.as_mut().graceful_shutdown();
                    if let Err(e) = conn.await {
                        debug!("Connection error from {} during shutdown: {}", addr, e);
                    }
                }
            }

            connections.fetch_sub(1, Ordering::SeqCst);
            debug!("Connection closed: {}", addr);
        });
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

// =============================================================================
// TESTS
// =============================================================================
