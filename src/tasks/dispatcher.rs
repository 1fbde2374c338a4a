//! # Dispatcher de Tareas
//! src/tasks/dispatcher.rs
//!
//! Reparte los archivos del pool como tareas y los mueve a `processed/`
//! cuando el cliente las da por terminadas.
//!
//! Pool, registro, generador de ids y contadores viven detrás de un único
//! `Mutex`: dos `get_task` concurrentes nunca reciben el mismo archivo.
//! La fuente del pool tiene su propio lock. Una recarga (que en modo
//! escaneo puede dormir entre intentos) la hace un solo thread por vez y
//! sin bloquear el estado, así `end_task` y `/metrics` siguen atendiendo.
//!
//! Orden de locks: fuente y después estado, nunca al revés.

use crate::config::Config;
use crate::tasks::clock::{Clock, SystemClock};
use crate::tasks::error::TaskError;
use crate::tasks::naming::{NamingScheme, TaskIdGenerator};
use crate::tasks::pool::{FilePool, PoolSource};
use crate::tasks::registry::TaskRegistry;
use crate::tasks::source::{DirectoryScanSource, SyntheticSource};
use crate::tasks::types::{DispatcherStats, TaskDescriptor, WorkItem};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Directorios y reglas de nombres del dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub input_dir: PathBuf,
    pub processed_dir: PathBuf,
    /// Valor de `retrieve_path` en los descriptores
    pub retrieve_path: String,
    pub naming: NamingScheme,
}

impl DispatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        let input_ext = if config.synthetic {
            ".fits"
        } else {
            config.input_suffix.as_str()
        };

        Self {
            input_dir: config.input_path(),
            processed_dir: config.processed_path(),
            retrieve_path: config.input_dir.clone(),
            naming: NamingScheme::default().with_input_ext(input_ext),
        }
    }
}

struct DispatcherState {
    pool: FilePool,
    registry: TaskRegistry,
    ids: TaskIdGenerator,
    issued: u64,
    completed: u64,
}

pub struct TaskDispatcher {
    settings: DispatcherSettings,
    clock: Arc<dyn Clock>,
    source: Mutex<Box<dyn PoolSource>>,
    mode: &'static str,
    state: Mutex<DispatcherState>,
}

impl TaskDispatcher {
    pub fn new(
        settings: DispatcherSettings,
        source: Box<dyn PoolSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            clock,
            mode: source.mode(),
            source: Mutex::new(source),
            state: Mutex::new(DispatcherState {
                pool: FilePool::new(),
                registry: TaskRegistry::new(),
                ids: TaskIdGenerator::new(),
                issued: 0,
                completed: 0,
            }),
        }
    }

    /// Construye el dispatcher para la configuración dada
    ///
    /// Crea los directorios de entrada y de procesados si no existen.
    pub fn from_config(config: &Config) -> Result<Self, TaskError> {
        let settings = DispatcherSettings::from_config(config);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let source: Box<dyn PoolSource> = if config.synthetic {
            Box::new(SyntheticSource::new(
                settings.input_dir.clone(),
                config.first_obs_id,
                Arc::clone(&clock),
            ))
        } else {
            Box::new(DirectoryScanSource::new(
                settings.input_dir.clone(),
                &config.input_suffix,
                config.scan_interval(),
                config.scan_max_polls,
            ))
        };

        let dispatcher = Self::new(settings, source, clock);
        dispatcher.prepare_dirs()?;
        Ok(dispatcher)
    }

    /// Crea `input/` y `processed/`
    pub fn prepare_dirs(&self) -> Result<(), TaskError> {
        for dir in [&self.settings.input_dir, &self.settings.processed_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| TaskError::io(format!("cannot create {}", dir.display()), e))?;
        }
        Ok(())
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Asigna el siguiente archivo pendiente como una tarea nueva
    ///
    /// Si el pool está vacío se recarga una vez; si sigue vacío retorna
    /// `PoolExhausted` y el registro queda intacto. Los archivos de tareas
    /// abiertas nunca vuelven al pool.
    pub fn get_task(&self) -> Result<TaskDescriptor, TaskError> {
        {
            let mut state = self.lock();
            if let Ok(item) = state.pool.take() {
                return Ok(self.issue(&mut state, item));
            }
        }

        let mut source = self.lock_source();

        // Mientras se esperaba la fuente, otro thread pudo haber recargado
        let open = {
            let mut state = self.lock();
            if let Ok(item) = state.pool.take() {
                return Ok(self.issue(&mut state, item));
            }
            state.registry.open_files()
        };

        // Solo quien tiene la fuente agrega al pool, así que ningún archivo
        // del lote puede emitirse mientras se escanea sin el estado.
        let mut batch = VecDeque::new();
        let replenished = source.replenish(&mut batch, &open);

        let mut state = self.lock();
        let added = state.pool.restock(batch);
        debug!(added, mode = self.mode, "pool refilled");
        replenished?;

        let item = state.pool.take()?;
        Ok(self.issue(&mut state, item))
    }

    fn issue(&self, state: &mut DispatcherState, item: WorkItem) -> TaskDescriptor {
        let out_file = self.settings.naming.out_file(item.name());
        let log_file = self.settings.naming.log_file(&out_file);

        let now = self.clock.now();
        let mut task_id = state.ids.next(now);
        while state.registry.contains(&task_id) {
            task_id = state.ids.next(now);
        }

        state.registry.insert(task_id.clone(), item.clone());
        state.issued += 1;

        info!(task_id = %task_id, in_file = %item, "task issued");

        TaskDescriptor {
            task_id,
            in_file: item.name().to_string(),
            out_file,
            log_file,
            retrieve_path: self.settings.retrieve_path.clone(),
        }
    }

    /// Cierra una tarea moviendo su archivo de entrada a `processed/`
    ///
    /// La entrada del registro se elimina solo si el rename tuvo éxito, así
    /// que un fallo puede reintentarse con el mismo task_id.
    pub fn end_task(&self, task_id: &str) -> Result<WorkItem, TaskError> {
        let mut state = self.lock();

        let item = state
            .registry
            .get(task_id)
            .cloned()
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;

        let from = self.settings.input_dir.join(item.name());
        let to = self.settings.processed_dir.join(item.name());

        if let Err(source) = fs::rename(&from, &to) {
            warn!(task_id, error = %source, "cannot relocate input file");
            return Err(TaskError::RelocationFailed { from, to, source });
        }

        state.registry.remove(task_id);
        state.completed += 1;

        info!(task_id, in_file = %item, "task completed");
        Ok(item)
    }

    pub fn stats(&self) -> DispatcherStats {
        let state = self.lock();
        DispatcherStats {
            pool_size: state.pool.len(),
            open_tasks: state.registry.len(),
            issued: state.issued,
            completed: state.completed,
            refills: state.pool.refills(),
        }
    }

    /// Un handler que entró en pánico no debe dejar al dispatcher inservible
    fn lock(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_source(&self) -> MutexGuard<'_, Box<dyn PoolSource>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::clock::FixedClock;
    use crate::tasks::pool::testing::ScriptedSource;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn settings(root: &TempDir) -> DispatcherSettings {
        DispatcherSettings {
            input_dir: root.path().join("input"),
            processed_dir: root.path().join("processed"),
            retrieve_path: "input".to_string(),
            naming: NamingScheme::default(),
        }
    }

    /// Dispatcher con archivos reales en input/
    fn dispatcher_with(root: &TempDir, names: &[&str]) -> (TaskDispatcher, Arc<std::sync::atomic::AtomicUsize>) {
        let (source, calls) = ScriptedSource::new(names);
        let dispatcher = TaskDispatcher::new(
            settings(root),
            Box::new(source),
            Arc::new(FixedClock::noon()),
        );
        dispatcher.prepare_dirs().unwrap();
        for name in names {
            fs::write(root.path().join("input").join(name), b"data").unwrap();
        }
        (dispatcher, calls)
    }

    #[test]
    fn test_get_task_descriptor() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) =
            dispatcher_with(&root, &["EUC_LE1_VIS-W-12000-1_20270303T214640.0Z.fits"]);

        let task = dispatcher.get_task().unwrap();
        assert_eq!(task.task_id, "QDTsrv_20240101-120000");
        assert_eq!(task.in_file, "EUC_LE1_VIS-W-12000-1_20270303T214640.0Z.fits");
        assert_eq!(task.out_file, "EUC_QLA_LE1-VIS-W-12000-1_20270303T214640.0Z.json");
        assert_eq!(task.log_file, "EUC_QLA_LE1-VIS-LOG-W-12000-1_20270303T214640.0Z.log");
        assert_eq!(task.retrieve_path, "input");
    }

    #[test]
    fn test_tasks_follow_pool_order_with_unique_ids() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher_with(&root, &["a.fits", "b.fits", "c.fits"]);

        let tasks: Vec<_> = (0..3).map(|_| dispatcher.get_task().unwrap()).collect();
        let files: Vec<_> = tasks.iter().map(|t| t.in_file.as_str()).collect();
        assert_eq!(files, vec!["a.fits", "b.fits", "c.fits"]);

        let ids: HashSet<_> = tasks.iter().map(|t| t.task_id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(dispatcher.stats().open_tasks, 3);
    }

    #[test]
    fn test_exhausted_pool() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, calls) = dispatcher_with(&root, &["a.fits"]);

        dispatcher.get_task().unwrap();
        let err = dispatcher.get_task().unwrap_err();
        assert!(matches!(err, TaskError::PoolExhausted));

        // Una recarga por cada get_task con el pool vacío
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.stats().open_tasks, 1);
    }

    #[test]
    fn test_end_task_moves_file() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher_with(&root, &["a.fits"]);

        let task = dispatcher.get_task().unwrap();
        let item = dispatcher.end_task(&task.task_id).unwrap();
        assert_eq!(item.name(), "a.fits");

        assert!(!root.path().join("input/a.fits").exists());
        assert!(root.path().join("processed/a.fits").exists());

        let stats = dispatcher.stats();
        assert_eq!(stats.open_tasks, 0);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn test_end_task_twice_is_unknown() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher_with(&root, &["a.fits"]);

        let task = dispatcher.get_task().unwrap();
        dispatcher.end_task(&task.task_id).unwrap();

        let err = dispatcher.end_task(&task.task_id).unwrap_err();
        assert!(matches!(err, TaskError::UnknownTask(ref id) if id == &task.task_id));
    }

    #[test]
    fn test_end_task_unknown_id_touches_nothing() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher_with(&root, &["a.fits"]);
        dispatcher.get_task().unwrap();

        let err = dispatcher.end_task("QDTsrv_19990101-000000").unwrap_err();
        assert!(matches!(err, TaskError::UnknownTask(_)));
        assert!(root.path().join("input/a.fits").exists());
        assert_eq!(dispatcher.stats().open_tasks, 1);
    }

    #[test]
    fn test_failed_relocation_keeps_task_open() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher_with(&root, &["a.fits"]);

        let task = dispatcher.get_task().unwrap();
        fs::remove_file(root.path().join("input/a.fits")).unwrap();

        let err = dispatcher.end_task(&task.task_id).unwrap_err();
        assert!(matches!(err, TaskError::RelocationFailed { .. }));
        assert_eq!(dispatcher.stats().open_tasks, 1);

        // El archivo reaparece: el mismo id ahora funciona
        fs::write(root.path().join("input/a.fits"), b"data").unwrap();
        dispatcher.end_task(&task.task_id).unwrap();
    }

    #[test]
    fn test_concurrent_get_task_on_single_file() {
        let root = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher_with(&root, &["only.fits"]);
        let dispatcher = Arc::new(dispatcher);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                thread::spawn(move || dispatcher.get_task())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, Err(TaskError::PoolExhausted)))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(exhausted, 1);
    }

    /// Dispatcher en modo escaneo sobre `root/input`
    fn scan_dispatcher(root: &TempDir, names: &[&str], max_polls: u32) -> TaskDispatcher {
        let source = DirectoryScanSource::new(
            root.path().join("input"),
            ".fits",
            Duration::from_millis(10),
            max_polls,
        );
        let dispatcher =
            TaskDispatcher::new(settings(root), Box::new(source), Arc::new(FixedClock::noon()));
        dispatcher.prepare_dirs().unwrap();
        for name in names {
            fs::write(root.path().join("input").join(name), b"data").unwrap();
        }
        dispatcher
    }

    #[test]
    fn test_rescan_skips_open_tasks() {
        let root = tempfile::tempdir().unwrap();
        let dispatcher = scan_dispatcher(&root, &["only.fits"], 2);

        let first = dispatcher.get_task().unwrap();
        assert_eq!(first.in_file, "only.fits");

        // El archivo sigue en input/ pero su tarea está abierta
        let err = dispatcher.get_task().unwrap_err();
        assert!(matches!(err, TaskError::PoolExhausted));
        assert_eq!(dispatcher.stats().open_tasks, 1);

        dispatcher.end_task(&first.task_id).unwrap();
        assert!(root.path().join("processed/only.fits").exists());
    }

    #[test]
    fn test_rescan_picks_new_files_only() {
        let root = tempfile::tempdir().unwrap();
        let dispatcher = scan_dispatcher(&root, &["a.fits"], 2);

        dispatcher.get_task().unwrap();
        fs::write(root.path().join("input/b.fits"), b"data").unwrap();

        let second = dispatcher.get_task().unwrap();
        assert_eq!(second.in_file, "b.fits");
        assert_eq!(dispatcher.stats().pool_size, 0);
    }

    #[test]
    fn test_end_task_while_another_get_task_polls() {
        let root = tempfile::tempdir().unwrap();
        let dispatcher = Arc::new(scan_dispatcher(&root, &["a.fits"], 0));
        let first = dispatcher.get_task().unwrap();

        // Sin límite de escaneos: espera hasta que aparezca un archivo nuevo
        let poller = {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || dispatcher.get_task())
        };
        thread::sleep(Duration::from_millis(50));

        // El estado no queda bloqueado durante la espera
        let started = Instant::now();
        dispatcher.end_task(&first.task_id).unwrap();
        assert_eq!(dispatcher.stats().completed, 1);
        assert!(started.elapsed() < Duration::from_secs(1));

        fs::write(root.path().join("input/b.fits"), b"data").unwrap();
        let second = poller.join().unwrap().unwrap();
        assert_eq!(second.in_file, "b.fits");
    }

    #[test]
    fn test_synthetic_from_config() {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            root_dir: root.path().to_path_buf(),
            synthetic: true,
            ..Config::default()
        };

        let dispatcher = TaskDispatcher::from_config(&config).unwrap();
        assert!(root.path().join("processed").is_dir());

        let task = dispatcher.get_task().unwrap();
        assert!(task.in_file.starts_with("EUC_LE1_VIS-W-12000-1_"));
        assert!(root.path().join("input").join(&task.in_file).is_file());
        assert_eq!(dispatcher.stats().pool_size, 39);

        dispatcher.end_task(&task.task_id).unwrap();
        assert!(root.path().join("processed").join(&task.in_file).is_file());
    }
}
