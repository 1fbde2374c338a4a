//! # Nombres derivados e identificadores de tarea
//! src/tasks/naming.rs
//!
//! `out_file` y `log_file` se derivan de `in_file` con sustituciones de
//! texto fijas:
//!
//! ```text
//! in_file   EUC_LE1_VIS-W-12000-1_20270303T104640.0Z.fits
//!               LE1_VIS -> QLA_LE1-VIS, .fits -> .json
//! out_file  EUC_QLA_LE1-VIS-W-12000-1_20270303T104640.0Z.json
//!               LE1-VIS -> LE1-VIS-LOG, .json -> .log
//! log_file  EUC_QLA_LE1-VIS-LOG-W-12000-1_20270303T104640.0Z.log
//! ```

use chrono::{DateTime, Utc};

/// Formato del task_id (resolución de segundos, UTC)
pub const TASK_ID_FORMAT: &str = "QDTsrv_%Y%m%d-%H%M%S";

/// Reglas de sustitución para derivar nombres de salida
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub input_tag: String,
    pub output_tag: String,
    pub log_source_tag: String,
    pub log_tag: String,
    pub input_ext: String,
    pub output_ext: String,
    pub log_ext: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            input_tag: "LE1_VIS".to_string(),
            output_tag: "QLA_LE1-VIS".to_string(),
            log_source_tag: "LE1-VIS".to_string(),
            log_tag: "LE1-VIS-LOG".to_string(),
            input_ext: ".fits".to_string(),
            output_ext: ".json".to_string(),
            log_ext: ".log".to_string(),
        }
    }
}

impl NamingScheme {
    /// Misma regla con otra extensión de entrada (ver `--input-suffix`)
    pub fn with_input_ext(mut self, ext: &str) -> Self {
        self.input_ext = ext.to_string();
        self
    }

    /// Nombre del archivo de resultados para `in_file`
    pub fn out_file(&self, in_file: &str) -> String {
        let tagged = in_file.replace(&self.input_tag, &self.output_tag);
        swap_extension(&tagged, &self.input_ext, &self.output_ext)
    }

    /// Nombre del log, derivado del `out_file`
    pub fn log_file(&self, out_file: &str) -> String {
        let tagged = out_file.replace(&self.log_source_tag, &self.log_tag);
        swap_extension(&tagged, &self.output_ext, &self.log_ext)
    }
}

/// Reemplaza la extensión `from` por `to`; si no la tiene, agrega `to`
fn swap_extension(name: &str, from: &str, to: &str) -> String {
    match name.strip_suffix(from) {
        Some(stem) => format!("{}{}", stem, to),
        None => format!("{}{}", name, to),
    }
}

/// Genera task_ids con el formato `QDTsrv_%Y%m%d-%H%M%S`
///
/// Dos ids pedidos dentro del mismo segundo reciben un sufijo `-N`:
/// el primero conserva el formato exacto, los siguientes son
/// `QDTsrv_20240101-120000-1`, `QDTsrv_20240101-120000-2`, ...
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    last_stamp: String,
    repeats: u32,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> String {
        let stamp = now.format(TASK_ID_FORMAT).to_string();
        if stamp == self.last_stamp {
            self.repeats += 1;
            format!("{}-{}", stamp, self.repeats)
        } else {
            self.last_stamp = stamp.clone();
            self.repeats = 0;
            stamp
        }
    }
}
