//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! 1. Escucha en host:puerto
//! 2. Acepta conexiones, un thread por cada una
//! 3. Lee el request y lo despacha (router, HEAD o upload)
//! 4. Envía la respuesta y registra métricas

pub mod routes;
pub mod state;
pub mod tcp;

pub use state::AppState;
pub use tcp::Server;
