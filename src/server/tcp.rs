//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión. Cada conexión lleva exactamente un request
//! (HTTP/1.0, `Connection: close`):
//!
//! ```text
//! accept → BufReader → Request::read_head ─┬─ GET  → Router
//!                                          ├─ HEAD → head_handler
//!                                          └─ POST → upload_handler (body desde el mismo reader)
//! ```

use crate::commands;
use crate::config::Config;
use crate::http::{Method, ParseError, Request, Response, StatusCode};
use crate::router::{RequestContext, Router};
use crate::server::routes::build_router;
use crate::server::state::AppState;
use crate::tasks::TaskError;
use crate::upload::handlers::upload_handler;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Servidor HTTP concurrente
pub struct Server {
    state: Arc<AppState>,
    router: Arc<Router>,
    listener: Option<TcpListener>,
}

impl Server {
    /// Crea el servidor y los directorios de trabajo
    pub fn new(config: Config) -> Result<Self, TaskError> {
        Ok(Self::with_state(AppState::from_config(config)?))
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
            router: Arc::new(build_router()),
            listener: None,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Abre el socket; con puerto 0 el sistema elige uno libre
    pub fn bind(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.state.config.address())?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Acepta conexiones indefinidamente
    pub fn run(&mut self) -> io::Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        };

        info!(address = %listener.local_addr()?, "server listening (one thread per connection)");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_connection(stream),
                Err(e) => warn!(error = %e, "cannot accept connection"),
            }
        }

        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream) {
        let router = Arc::clone(&self.router);
        let state = Arc::clone(&self.state);

        let peer_addr = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        debug!(peer = %peer_addr, "new connection");

        state.metrics.increment_active_threads();

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer_addr))
            .spawn({
                let state = Arc::clone(&state);
                move || {
                    if let Err(e) = handle_connection(stream, &peer_addr, &router, &state) {
                        warn!(peer = %peer_addr, error = %e, "connection error");
                    }
                    state.metrics.decrement_active_threads();
                }
            });

        if let Err(e) = spawned {
            error!(error = %e, "cannot spawn connection thread");
            state.metrics.decrement_active_threads();
        }
    }
}

/// Atiende un request completo sobre `stream`
pub fn handle_connection(
    stream: TcpStream,
    peer_addr: &str,
    router: &Router,
    state: &AppState,
) -> io::Result<()> {
    let start = Instant::now();
    let request_id = next_request_id();

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let (response, path, is_head) = match Request::read_head(&mut reader) {
        Ok(request) => {
            log_request(&request, peer_addr, &request_id);
            let path = request.path().to_string();

            let response = match request.method() {
                Method::GET => {
                    let ctx = RequestContext { state, peer_addr };
                    router.route(&request, &ctx)
                }
                Method::HEAD => commands::head_handler(&request),
                Method::POST => upload_handler(&request, &mut reader, &state.config.root_dir),
            };
            (response, path, request.method() == Method::HEAD)
        }
        Err(ParseError::EmptyRequest) => {
            debug!(peer = %peer_addr, "connection closed without a request");
            return Ok(());
        }
        Err(e) => {
            warn!(peer = %peer_addr, error = %e, "invalid request");
            let status = match e {
                ParseError::UnsupportedMethod(_) => StatusCode::MethodNotAllowed,
                _ => StatusCode::BadRequest,
            };
            (
                Response::error(status, &format!("Invalid: {}", e)),
                "/error".to_string(),
                false,
            )
        }
    };

    let mut response = response;
    Router::add_common_headers(&mut response);
    response.add_header("X-Request-Id", &request_id);

    let bytes = if is_head {
        response.head_bytes()
    } else {
        response.to_bytes()
    };
    writer.write_all(&bytes)?;
    writer.flush()?;

    let latency = start.elapsed();
    state
        .metrics
        .record_request(&path, response.status().as_u16(), latency);

    info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        latency_ms = latency.as_secs_f64() * 1000.0,
        "response sent"
    );

    Ok(())
}

fn log_request(request: &Request, peer_addr: &str, request_id: &str) {
    info!(
        request_id = %request_id,
        peer = %peer_addr,
        method = request.method().as_str(),
        target = %request.target(),
        "request"
    );

    if let Some(content_type) = request.header("Content-Type") {
        debug!("TYPE {}", content_type);
    }

    let mut args: Vec<_> = request.query_params().iter().collect();
    args.sort();
    debug!("ARGS {}", args.len());
    for (i, (key, value)) in args.iter().enumerate() {
        debug!("ARG[{}] {}={}", i, key, value);
    }
}

/// Id corto y único por request
fn next_request_id() -> String {
    let mut hasher = DefaultHasher::new();
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .hash(&mut hasher);
    thread::current().id().hash(&mut hasher);
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
