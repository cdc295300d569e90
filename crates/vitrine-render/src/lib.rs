//! Vitrine Render
//!
//! Drawable and context lifecycle for rendering surfaces. An
//! [`AutoDrawable`] binds one [`Drawable`] to one [`Context`], dispatches
//! [`RenderListener`] callbacks in order and coordinates destruction with an
//! animation thread and window-system callbacks.
//!
//! Native work goes through the providers of [`vitrine_native`]. With the
//! `wgpu` feature, [`backend`] offers offscreen drawables backed by wgpu
//! textures.

pub mod animator;
pub mod auto_drawable;
pub mod context;
pub mod drawable;
pub mod error;
pub mod factory;
pub mod fps;
pub mod listener;
pub mod preserve;
pub mod threading;

#[cfg(feature = "wgpu")]
pub mod backend;

pub use animator::{Animator, DEFAULT_FRAME_INTERVAL};
pub use auto_drawable::{AutoDrawable, Phase};
pub use context::{Context, MakeCurrent};
pub use drawable::{Drawable, DrawableId, NativeProviders, SurfaceState};
pub use error::{ListenerError, ListenerPhase, RenderError, RenderResult, StateError};
pub use factory::DrawableFactory;
pub use fps::FpsCounter;
pub use listener::{ListenerHelper, RenderListener, SharedListener};
pub use preserve::{PreservedState, StateKeeperListener};
pub use threading::{DedicatedThread, Inline, NativeTask, ThreadingStrategy, run_blocking};
