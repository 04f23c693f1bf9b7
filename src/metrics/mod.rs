//! Metrics export.
//!
//! # Submodules
//!
//! - `prom` - Prometheus Push Gateway integration

pub mod prom;
