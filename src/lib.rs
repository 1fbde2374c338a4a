//! # Data Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente que reparte archivos como tareas a
//! clientes que hacen polling, recibe sus resultados por upload multipart
//! y sirve archivos estáticos.
//!
//! ## Arquitectura
//!
//! - `http`: parsing de requests, responses y traducción de paths
//! - `server`: servidor TCP, un thread por conexión
//! - `router`: enrutamiento de GET a handlers
//! - `tasks`: pool de archivos, registro de tareas y `get_task`/`end_task`
//! - `upload`: parser multipart en streaming
//! - `commands`: `/info`, HEAD y archivos estáticos
//! - `metrics`: métricas de requests y latencias
//! - `config` / `logging`: CLI y `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use dataserver::config::Config;
//! use dataserver::server::Server;
//!
//! let config = Config::default();
//! let mut server = Server::new(config).expect("cannot prepare directories");
//! server.run().expect("server error");
//! ```

pub mod commands;
pub mod config;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod server;
pub mod tasks;
pub mod upload;
