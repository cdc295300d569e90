//! Vitrine Core
//!
//! Ambient utilities shared by every Vitrine crate: logging setup, puffin
//! profiling hooks and runtime configuration.

pub mod config;
pub mod logging;
pub mod profiling;

pub use config::{Config, ProfilingMode};
