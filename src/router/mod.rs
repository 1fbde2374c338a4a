//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea paths de requests GET a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//!              └─ sin match → fallback (archivos estáticos)
//! ```
//!
//! `/get_task` y `/get_task/` son la misma ruta: la barra final se ignora
//! al comparar.

use crate::commands::basic::SERVER_VERSION;
use crate::http::{Request, Response, StatusCode};
use crate::server::state::AppState;

/// Datos de la conexión disponibles para los handlers
pub struct RequestContext<'a> {
    pub state: &'a AppState,
    pub peer_addr: &'a str,
}

/// Un handler recibe el request y el contexto, y retorna una Response
pub type Handler = fn(&Request, &RequestContext<'_>) -> Response;

pub struct Router {
    routes: Vec<(String, Handler)>,
    fallback: Option<Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
        }
    }

    /// Registra una ruta con su handler
    pub fn register(&mut self, path: &str, handler: Handler) {
        self.routes.push((normalize(path).to_string(), handler));
    }

    /// Handler para paths sin ruta registrada
    pub fn set_fallback(&mut self, handler: Handler) {
        self.fallback = Some(handler);
    }

    /// Ejecuta el handler que corresponde al path del request
    ///
    /// Sin ruta ni fallback retorna 404 Not Found.
    pub fn route(&self, request: &Request, ctx: &RequestContext<'_>) -> Response {
        let path = normalize(request.path());

        let handler = self
            .routes
            .iter()
            .find(|(route_path, _)| route_path == path)
            .map(|(_, handler)| *handler)
            .or(self.fallback);

        let mut response = match handler {
            Some(handler) => handler(request, ctx),
            None => Response::error(
                StatusCode::NotFound,
                &format!("Route not found: {}", request.path()),
            ),
        };
        Self::add_common_headers(&mut response);
        response
    }

    /// Headers presentes en todas las respuestas
    pub fn add_common_headers(response: &mut Response) {
        response.add_header("Server", SERVER_VERSION);
        response.add_header("Connection", "close");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Quita la barra final, salvo en "/"
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
