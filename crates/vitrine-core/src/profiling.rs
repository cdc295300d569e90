//! Profiling utilities based on the `puffin` crate.
//!
//! Scopes are always compiled in and cost almost nothing while puffin scopes
//! are switched off. The HTTP viewer server needs the `profiling` feature.

#[cfg(feature = "profiling")]
use std::sync::OnceLock;

pub use puffin::{profile_function, profile_scope};

use crate::config::ProfilingMode;

/// Default address of the puffin HTTP server.
pub const PUFFIN_ADDRESS: &str = "0.0.0.0:8585";

#[cfg(feature = "profiling")]
static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Initialize profiling for the given mode.
///
/// # Example
/// ```no_run
/// use vitrine_core::{profiling::init_profiling, ProfilingMode};
///
/// init_profiling(ProfilingMode::Scopes);
/// ```
pub fn init_profiling(mode: ProfilingMode) {
    match mode {
        ProfilingMode::Off => puffin::set_scopes_on(false),
        ProfilingMode::Scopes => puffin::set_scopes_on(true),
        ProfilingMode::WithWebserver => {
            puffin::set_scopes_on(true);
            start_server();
        }
    }
}

#[cfg(feature = "profiling")]
fn start_server() {
    if PROFILING_SERVER.get().is_some() {
        return;
    }
    match puffin_http::Server::new(PUFFIN_ADDRESS) {
        Ok(server) => {
            tracing::info!("Puffin profiler server started on http://{}", PUFFIN_ADDRESS);
            let _ = PROFILING_SERVER.set(server);
        }
        Err(e) => {
            tracing::error!("Failed to start puffin server: {}", e);
        }
    }
}

#[cfg(not(feature = "profiling"))]
fn start_server() {
    tracing::warn!("puffin webserver requested but the `profiling` feature is disabled");
}

/// Mark the start of a new profiling frame.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
