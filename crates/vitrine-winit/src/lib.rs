//! Vitrine Winit
//!
//! Connects winit windows to [`vitrine_render::AutoDrawable`]. Resize, close
//! and redraw events become controller notifications, and the window's
//! close policy is applied to the drawable's surface.

pub mod app;
pub mod bridge;
pub mod window;

// Re-export WindowId for convenience
pub use winit::window::WindowId;

pub use app::{DrawableBuilder, RedrawMode, run_window};
pub use bridge::{WindowOutcome, forward_window_event};
pub use window::{Window, WindowDescriptor};
