//! # Comandos del Servidor
//!
//! Handlers auxiliares que no forman parte del reparto de tareas:
//!
//! - **basic**: `/info` y respuestas a HEAD
//! - **files**: archivos estáticos bajo la raíz

pub mod basic;
pub mod files;

pub use basic::{head_handler, info_handler};
pub use files::static_file_handler;
