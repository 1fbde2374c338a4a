//! # Sistema de Tareas
//! src/tasks/mod.rs
//!
//! Reparto de archivos a clientes que hacen polling:
//!
//! ```text
//! GET /get_task            → pool.take() → registry.insert(task_id, in_file)
//! GET /end_task?task_id=ID → registry.get(ID) → rename input/ → processed/
//! ```
//!
//! El pool se recarga desde un `PoolSource` cuando se vacía.

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod naming;
pub mod placeholder;
pub mod pool;
pub mod registry;
pub mod source;
pub mod types;

pub use dispatcher::{DispatcherSettings, TaskDispatcher};
pub use error::TaskError;
pub use types::{DispatcherStats, TaskDescriptor, WorkItem};
