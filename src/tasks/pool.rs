//! # Pool de Archivos Pendientes
//! src/tasks/pool.rs
//!
//! Cola FIFO de archivos aún no asignados. Cuando se vacía, se recarga
//! desde un `PoolSource` (modo sintético o escaneo de directorio).

use crate::tasks::error::TaskError;
use crate::tasks::types::WorkItem;
use std::collections::{HashSet, VecDeque};

/// Origen de nuevos archivos para el pool
pub trait PoolSource: Send {
    /// Agrega archivos nuevos al final de `items`
    ///
    /// `open` tiene los archivos de tareas todavía abiertas: siguen en el
    /// directorio de entrada pero no deben volver al pool. Retorna cuántos
    /// se agregaron; `Ok(0)` significa que no hubo nada que agregar.
    fn replenish(
        &mut self,
        items: &mut VecDeque<WorkItem>,
        open: &HashSet<String>,
    ) -> Result<usize, TaskError>;

    /// Nombre del modo para logs
    fn mode(&self) -> &'static str;
}

/// Pool FIFO de archivos pendientes
///
/// La fuente vive fuera del pool: la recarga puede dormir entre escaneos
/// y no debe hacerlo con el estado del dispatcher bloqueado.
#[derive(Debug, Default)]
pub struct FilePool {
    items: VecDeque<WorkItem>,
    refills: u64,
}

impl FilePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un lote recién obtenido de la fuente
    ///
    /// Cuenta como una recarga aunque el lote venga vacío.
    pub fn restock(&mut self, batch: VecDeque<WorkItem>) -> usize {
        self.refills += 1;
        let added = batch.len();
        self.items.extend(batch);
        added
    }

    /// Saca el archivo más antiguo
    pub fn take(&mut self) -> Result<WorkItem, TaskError> {
        self.items.pop_front().ok_or(TaskError::PoolExhausted)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Veces que se intentó recargar
    pub fn refills(&self) -> u64 {
        self.refills
    }
}
