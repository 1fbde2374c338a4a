//! Estado compartido por todas las conexiones

use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::tasks::{TaskDispatcher, TaskError};

pub struct AppState {
    pub config: Config,
    pub dispatcher: TaskDispatcher,
    pub metrics: MetricsCollector,
}

impl AppState {
    /// Arma el estado para la configuración, creando input/ y processed/
    pub fn from_config(config: Config) -> Result<Self, TaskError> {
        let dispatcher = TaskDispatcher::from_config(&config)?;
        Ok(Self::new(config, dispatcher))
    }

    pub fn new(config: Config, dispatcher: TaskDispatcher) -> Self {
        Self {
            config,
            dispatcher,
            metrics: MetricsCollector::new(),
        }
    }
}
