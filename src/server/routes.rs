//! Tabla de rutas GET del servidor

use crate::commands;
use crate::http::Response;
use crate::router::{RequestContext, Router};
use crate::server::state::AppState;
use crate::tasks::handlers as task_handlers;
use serde_json::json;

/// Router con todos los endpoints GET
///
/// | Path        | Handler                         |
/// |-------------|---------------------------------|
/// | `/info`     | diagnóstico de la conexión      |
/// | `/get_task` | asigna una tarea                |
/// | `/end_task` | cierra una tarea                |
/// | `/metrics`  | métricas + contadores de tareas |
/// | otro        | archivo estático bajo la raíz   |
pub fn build_router() -> Router {
    let mut router = Router::new();

    router.register("/info", |req, ctx| commands::info_handler(req, ctx.peer_addr));
    router.register("/get_task", |req, ctx| {
        task_handlers::get_task_handler(req, &ctx.state.dispatcher)
    });
    router.register("/end_task", |req, ctx| {
        task_handlers::end_task_handler(req, &ctx.state.dispatcher)
    });
    router.register("/metrics", |_req, ctx| metrics_handler(ctx));

    router.set_fallback(|req, ctx| {
        let config = &ctx.state.config;
        commands::static_file_handler(req, &config.root_dir, config.serve_delay())
    });

    router
}

/// Handler para /metrics
pub fn metrics_handler(ctx: &RequestContext<'_>) -> Response {
    Response::json(&metrics_body(ctx.state).to_string())
}

fn metrics_body(state: &AppState) -> serde_json::Value {
    let mut body = state.metrics.metrics_json();
    body["tasks"] = json!(state.dispatcher.stats());
    body
}
