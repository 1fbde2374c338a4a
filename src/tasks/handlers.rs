//! # Handlers HTTP para Tareas
//! src/tasks/handlers.rs
//!
//! - `/get_task`
//! - `/end_task?task_id=ID`

use crate::http::{Request, Response, StatusCode};
use crate::tasks::dispatcher::TaskDispatcher;
use crate::tasks::error::TaskError;
use tracing::{error, warn};

/// Segundos sugeridos al cliente cuando el pool está vacío
const RETRY_AFTER_SECS: &str = "5";

/// Handler para /get_task
///
/// # Ejemplo de response
/// ```json
/// {"task_id": "QDTsrv_20240101-120000", "in_file": "...", "out_file": "...",
///  "log_file": "...", "retrieve_path": "input"}
/// ```
pub fn get_task_handler(_req: &Request, dispatcher: &TaskDispatcher) -> Response {
    let task = match dispatcher.get_task() {
        Ok(task) => task,
        Err(e) => return task_error_response(&e),
    };

    match serde_json::to_string(&task) {
        Ok(body) => Response::json(&body),
        Err(e) => Response::error(
            StatusCode::InternalServerError,
            &format!("Cannot encode task: {}", e),
        ),
    }
}

/// Handler para /end_task?task_id=ID
///
/// Responde 200 sin body cuando el archivo fue movido.
pub fn end_task_handler(req: &Request, dispatcher: &TaskDispatcher) -> Response {
    let task_id = match req.query_param("task_id") {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Response::error(
                StatusCode::BadRequest,
                "Missing required parameter: task_id",
            );
        }
    };

    match dispatcher.end_task(task_id) {
        Ok(_) => Response::empty_ok(),
        Err(e) => task_error_response(&e),
    }
}

fn task_error_response(err: &TaskError) -> Response {
    let status = err.status_code();
    if err.is_io_failure() {
        error!(error = %err, "task operation failed");
    } else {
        warn!(error = %err, "task request rejected");
    }

    let mut response = Response::error(status, &err.to_string());
    if matches!(err, TaskError::PoolExhausted) {
        response.add_header("Retry-After", RETRY_AFTER_SECS);
    }
    response
}
