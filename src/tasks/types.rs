//! # Tipos del Sistema de Tareas
//! src/tasks/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Un archivo pendiente, relativo al directorio de entrada
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem(String);

impl WorkItem {
    pub fn new(name: impl Into<String>) -> Self {
        WorkItem(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptor que recibe el cliente en `/get_task`
///
/// ```json
/// {
///   "task_id": "QDTsrv_20240101-120000",
///   "in_file": "EUC_LE1_VIS-W-12000-1_20270303T104640.0Z.fits",
///   "out_file": "EUC_QLA_LE1-VIS-W-12000-1_20270303T104640.0Z.json",
///   "log_file": "EUC_QLA_LE1-VIS-LOG-W-12000-1_20270303T104640.0Z.log",
///   "retrieve_path": "input"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub in_file: String,
    pub out_file: String,
    pub log_file: String,
    pub retrieve_path: String,
}

/// Contadores del dispatcher para `/metrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    /// Archivos aún sin asignar
    pub pool_size: usize,
    /// Tareas emitidas y no finalizadas
    pub open_tasks: usize,
    pub issued: u64,
    pub completed: u64,
    pub refills: u64,
}
