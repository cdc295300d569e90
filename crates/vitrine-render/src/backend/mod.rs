//! Native providers backed by wgpu.
//!
//! Surfaces are offscreen render-target textures. A context binds the
//! calling thread to one target; rendering code reaches the current target
//! through [`WgpuContextProvider::with_current`].

mod offscreen;

pub use offscreen::{
    COLOR_FORMAT, ContextState, CurrentTarget, OffscreenTarget, WgpuBackend, WgpuContextProvider,
    WgpuDevice, WgpuGpu, WgpuSurfaceProvider,
};
