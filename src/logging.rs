//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing` con salida a stdout. El nivel viene de `--level`
//! salvo que `RUST_LOG` esté definido.

use crate::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Construye el filtro: `RUST_LOG` si existe, si no el nivel de la CLI
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
}

/// Instala el subscriber global
///
/// Llamarla dos veces no es un error: el segundo intento se ignora
/// (útil en tests que levantan varios servidores).
pub fn init_logging(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}
