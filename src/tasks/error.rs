//! # Errores del Sistema de Tareas
//! src/tasks/error.rs

use crate::http::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errores de `get_task` / `end_task`
#[derive(Debug, Error)]
pub enum TaskError {
    /// No hay archivos pendientes ni tras recargar el pool
    #[error("file pool exhausted: no input files available")]
    PoolExhausted,

    /// task_id nunca emitido, o ya finalizado
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    /// Falló el rename de input/ a processed/
    #[error("cannot move {} to {}: {source}", from.display(), to.display())]
    RelocationFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cualquier otro error de filesystem (crear placeholders, listar input/)
    #[error("{context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        TaskError::IoFailure {
            context: context.into(),
            source,
        }
    }

    /// Código HTTP con el que se reporta el error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TaskError::PoolExhausted => StatusCode::ServiceUnavailable,
            TaskError::UnknownTask(_) => StatusCode::NotFound,
            TaskError::RelocationFailed { .. } | TaskError::IoFailure { .. } => {
                StatusCode::InternalServerError
            }
        }
    }

    /// `RelocationFailed` es un caso particular de fallo de I/O
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            TaskError::RelocationFailed { .. } | TaskError::IoFailure { .. }
        )
    }
}
