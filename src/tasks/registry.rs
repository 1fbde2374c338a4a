//! # Registro de Tareas Abiertas
//! src/tasks/registry.rs

use crate::tasks::types::WorkItem;
use std::collections::{HashMap, HashSet};

/// task_id -> archivo asignado
///
/// Una entrada existe desde que `get_task` la emite hasta que `end_task`
/// mueve el archivo con éxito.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: HashMap<String, WorkItem>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: String, item: WorkItem) {
        self.entries.insert(task_id, item);
    }

    pub fn get(&self, task_id: &str) -> Option<&WorkItem> {
        self.entries.get(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.entries.contains_key(task_id)
    }

    pub fn remove(&mut self, task_id: &str) -> Option<WorkItem> {
        self.entries.remove(task_id)
    }

    /// Archivos de todas las tareas abiertas
    pub fn open_files(&self) -> HashSet<String> {
        self.entries.values().map(|item| item.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
