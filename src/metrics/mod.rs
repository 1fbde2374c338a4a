//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección y agregación de métricas del servidor:
//! - Contadores de requests por ruta y por código
//! - Latencias (p50, p95, p99)
//! - Threads activos
//!
//! Los contadores del dispatcher se agregan en el handler de `/metrics`.

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
