//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de datos con soporte para argumentos CLI
//! y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./dataserver --host 0.0.0.0 --port 8080 \
//!   --rootdir /srv/qla \
//!   --level debug \
//!   --scan-interval-ms 250
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! DATASERVER_PORT=8080 DATASERVER_ROOT=/srv/qla ./dataserver --synthetic
//! ```

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Niveles de log aceptados por `--level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Notset,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Directiva equivalente para `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Notset => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Notset => "notset",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

/// Configuración del servidor de datos
#[derive(Debug, Clone, Parser)]
#[command(name = "dataserver")]
#[command(about = "Servidor HTTP que reparte tareas sobre archivos y recibe sus resultados")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "DATASERVER_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "DATASERVER_PORT")]
    pub port: u16,

    /// Raíz del servidor: archivos estáticos, input/ y processed/
    #[arg(short = 'r', long = "rootdir", default_value = ".", env = "DATASERVER_ROOT")]
    pub root_dir: PathBuf,

    /// Nivel de logging (RUST_LOG tiene prioridad si está definido)
    #[arg(short = 'l', long, value_enum, default_value = "info", env = "DATASERVER_LOG_LEVEL")]
    pub level: LogLevel,

    // === Pool de archivos ===

    /// Subdirectorio (bajo la raíz) con los archivos pendientes
    #[arg(long = "input-dir", default_value = "input", env = "DATASERVER_INPUT_DIR")]
    pub input_dir: String,

    /// Subdirectorio (bajo la raíz) al que se mueven los archivos procesados
    #[arg(long = "processed-dir", default_value = "processed", env = "DATASERVER_PROCESSED_DIR")]
    pub processed_dir: String,

    /// Generar archivos de prueba en vez de escanear el directorio de entrada
    #[arg(long, env = "DATASERVER_SYNTHETIC")]
    pub synthetic: bool,

    /// Sufijo de los archivos que entran al pool en modo escaneo
    #[arg(long = "input-suffix", default_value = ".fits", env = "DATASERVER_INPUT_SUFFIX")]
    pub input_suffix: String,

    /// Primer identificador de observación en modo sintético
    #[arg(long = "first-obs-id", default_value = "12000", env = "DATASERVER_FIRST_OBS_ID")]
    pub first_obs_id: u64,

    // === Escaneo ===

    /// Pausa entre escaneos vacíos del directorio de entrada (ms)
    #[arg(long = "scan-interval-ms", default_value = "500", env = "DATASERVER_SCAN_INTERVAL_MS")]
    pub scan_interval_ms: u64,

    /// Escaneos por recarga antes de rendirse (0 = esperar indefinidamente)
    #[arg(long = "scan-max-polls", default_value = "20", env = "DATASERVER_SCAN_MAX_POLLS")]
    pub scan_max_polls: u32,

    // === Archivos estáticos ===

    /// Retardo artificial antes de servir un archivo (ms)
    #[arg(long = "serve-delay-ms", default_value = "0", env = "DATASERVER_SERVE_DELAY_MS")]
    pub serve_delay_ms: u64,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use dataserver::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ruta absoluta (o relativa a la raíz) del directorio de entrada
    pub fn input_path(&self) -> PathBuf {
        self.root_dir.join(&self.input_dir)
    }

    /// Ruta del directorio de procesados
    pub fn processed_path(&self) -> PathBuf {
        self.root_dir.join(&self.processed_dir)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn serve_delay(&self) -> Duration {
        Duration::from_millis(self.serve_delay_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port is out of range [1..65535]: 0".to_string());
        }

        if !is_plain_dir_name(&self.input_dir) {
            return Err(format!("Input dir must be a plain directory name: '{}'", self.input_dir));
        }
        if !is_plain_dir_name(&self.processed_dir) {
            return Err(format!(
                "Processed dir must be a plain directory name: '{}'",
                self.processed_dir
            ));
        }
        if self.input_dir == self.processed_dir {
            return Err("Input and processed dirs must differ".to_string());
        }

        if self.input_suffix.is_empty() {
            return Err("Input suffix must not be empty".to_string());
        }

        if self.scan_interval_ms == 0 {
            return Err("Scan interval must be > 0".to_string());
        }

        Ok(())
    }

    /// Verifica que la raíz exista y sea un directorio
    pub fn validate_root(&self) -> Result<(), String> {
        if !self.root_dir.is_dir() {
            return Err(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            ));
        }
        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn print_summary(&self) {
        info!("dataserver configuration");
        info!("  address:        {}", self.address());
        info!("  root dir:       {}", self.root_dir.display());
        info!("  log level:      {}", self.level.as_str());
        info!("  input dir:      {}", self.input_path().display());
        info!("  processed dir:  {}", self.processed_path().display());
        if self.synthetic {
            info!("  pool mode:      synthetic (first obs id {})", self.first_obs_id);
        } else {
            let polls = if self.scan_max_polls == 0 {
                "unbounded".to_string()
            } else {
                self.scan_max_polls.to_string()
            };
            info!(
                "  pool mode:      scan '*{}' every {} ms ({} polls)",
                self.input_suffix, self.scan_interval_ms, polls
            );
        }
        if self.serve_delay_ms > 0 {
            info!("  serve delay:    {} ms", self.serve_delay_ms);
        }
    }
}

/// Un nombre de directorio simple: no vacío y sin separadores ni `..`
fn is_plain_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && Path::new(name).components().count() == 1
        && !name.contains('/')
        && !name.contains('\\')
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            root_dir: PathBuf::from("."),
            level: LogLevel::Info,
            input_dir: "input".to_string(),
            processed_dir: "processed".to_string(),
            synthetic: false,
            input_suffix: ".fits".to_string(),
            first_obs_id: 12000,
            scan_interval_ms: 500,
            scan_max_polls: 20,
            serve_delay_ms: 0,
        }
    }
}
