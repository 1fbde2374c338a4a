//! # Fuentes del Pool
//! src/tasks/source.rs
//!
//! - `SyntheticSource`: inventa lotes de 40 nombres y crea un FITS de
//!   relleno por cada uno
//! - `DirectoryScanSource`: lista el directorio de entrada, reintentando
//!   con pausa mientras no encuentre nada

use crate::tasks::clock::Clock;
use crate::tasks::error::TaskError;
use crate::tasks::placeholder;
use crate::tasks::pool::PoolSource;
use crate::tasks::types::WorkItem;
use chrono::Duration as ChronoDuration;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Observaciones por lote
pub const SYNTHETIC_OBSERVATIONS: i64 = 10;
/// Dithers por observación
pub const SYNTHETIC_DITHERS: u32 = 4;
/// Desplazamiento de las fechas sintéticas respecto al reloj
const SYNTHETIC_OFFSET_SECS: i64 = 100_000_000;
/// Separación entre observaciones de un lote
const SYNTHETIC_STEP_SECS: i64 = 100;

/// Generador de nombres sintéticos
///
/// Cada recarga produce `10 x 4` nombres
/// `EUC_LE1_VIS-W-<obs_id>-<dither>_<YYYYMMDDTHHMMSS>.0Z.fits`. El obs_id
/// aumenta con cada nombre y nunca se reinicia.
pub struct SyntheticSource {
    input_dir: PathBuf,
    next_obs_id: u64,
    clock: Arc<dyn Clock>,
}

impl SyntheticSource {
    pub fn new(input_dir: PathBuf, first_obs_id: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            input_dir,
            next_obs_id: first_obs_id,
            clock,
        }
    }

    pub fn next_obs_id(&self) -> u64 {
        self.next_obs_id
    }
}

impl PoolSource for SyntheticSource {
    /// Los nombres sintéticos son siempre nuevos: `open` no se consulta
    fn replenish(
        &mut self,
        items: &mut VecDeque<WorkItem>,
        _open: &HashSet<String>,
    ) -> Result<usize, TaskError> {
        let now = self.clock.now();
        let mut added = 0;

        for x in 0..SYNTHETIC_OBSERVATIONS {
            let stamp = now
                + ChronoDuration::seconds(SYNTHETIC_OFFSET_SECS + x * SYNTHETIC_STEP_SECS);

            for dither in 1..=SYNTHETIC_DITHERS {
                let name = format!(
                    "EUC_LE1_VIS-W-{}-{}_{}.0Z.fits",
                    self.next_obs_id,
                    dither,
                    stamp.format("%Y%m%dT%H%M%S")
                );
                self.next_obs_id += 1;

                let path = self.input_dir.join(&name);
                placeholder::write_placeholder(&path).map_err(|e| {
                    TaskError::io(format!("cannot create {}", path.display()), e)
                })?;

                debug!(file = %name, "synthetic input created");
                items.push_back(WorkItem::new(name));
                added += 1;
            }
        }

        info!(added, next_obs_id = self.next_obs_id, "synthetic batch generated");
        Ok(added)
    }

    fn mode(&self) -> &'static str {
        "synthetic"
    }
}

/// Escaneo del directorio de entrada
///
/// Si no hay archivos con el sufijo esperado, duerme `interval` y vuelve
/// a mirar, hasta `max_polls` intentos (`0` = sin límite).
pub struct DirectoryScanSource {
    input_dir: PathBuf,
    suffix: String,
    interval: Duration,
    max_polls: u32,
}

impl DirectoryScanSource {
    pub fn new(input_dir: PathBuf, suffix: &str, interval: Duration, max_polls: u32) -> Self {
        Self {
            input_dir,
            suffix: suffix.to_string(),
            interval,
            max_polls,
        }
    }

    /// Nombres de archivos regulares con el sufijo, ordenados
    fn scan(&self) -> Result<Vec<String>, TaskError> {
        let entries = fs::read_dir(&self.input_dir).map_err(|e| {
            TaskError::io(format!("cannot list {}", self.input_dir.display()), e)
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                TaskError::io(format!("cannot list {}", self.input_dir.display()), e)
            })?;

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(&self.suffix) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

impl PoolSource for DirectoryScanSource {
    /// Los archivos de tareas abiertas siguen en el directorio hasta su
    /// `end_task`; se ignoran y, si no queda otro, se sigue esperando.
    fn replenish(
        &mut self,
        items: &mut VecDeque<WorkItem>,
        open: &HashSet<String>,
    ) -> Result<usize, TaskError> {
        let mut polls: u32 = 0;

        loop {
            let mut names = self.scan()?;
            names.retain(|name| !open.contains(name));
            if !names.is_empty() {
                let added = names.len();
                items.extend(names.into_iter().map(WorkItem::new));
                info!(added, dir = %self.input_dir.display(), "input directory scanned");
                return Ok(added);
            }

            polls += 1;
            if self.max_polls != 0 && polls >= self.max_polls {
                debug!(polls, "no input files found, giving up");
                return Ok(0);
            }

            debug!(polls, "no input files yet, waiting");
            thread::sleep(self.interval);
        }
    }

    fn mode(&self) -> &'static str {
        "scan"
    }
}
