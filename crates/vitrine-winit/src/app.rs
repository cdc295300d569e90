//! A single-window event loop driving one auto drawable.

use std::sync::Arc;

use vitrine_core::profiling::new_frame;
use vitrine_render::{AutoDrawable, RenderResult};
use winit::application::ApplicationHandler;
pub use winit::error::EventLoopError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::{
    bridge::{WindowOutcome, forward_window_event},
    window::{Window, WindowDescriptor},
};

/// Builds the drawable that renders into a freshly created window.
pub type DrawableBuilder = Box<dyn FnMut(&Window) -> RenderResult<Arc<AutoDrawable>>>;

/// When the event loop asks the window for another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedrawMode {
    /// Only when the window system requests a repaint, or an animator
    /// renders on its own thread.
    #[default]
    OnDemand,
    /// A new redraw is requested after every repaint.
    Continuous,
}

struct WindowProxy {
    descriptor: Option<WindowDescriptor>,
    builder: DrawableBuilder,
    mode: RedrawMode,
    bound: Option<(Window, Arc<AutoDrawable>)>,
}

impl WindowProxy {
    fn open(&mut self, event_loop: &ActiveEventLoop, descriptor: WindowDescriptor) {
        let window = match Window::new(event_loop, descriptor) {
            Ok(window) => window,
            Err(err) => {
                tracing::error!("failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        match (self.builder)(&window) {
            Ok(drawable) => {
                if !window.attach(&drawable) {
                    tracing::warn!("drawable for window {:?} has no surface bound", window.id());
                }
                window.request_redraw();
                self.bound = Some((window, drawable));
            }
            Err(err) => {
                tracing::error!("failed to build drawable for window {:?}: {}", window.id(), err);
                event_loop.exit();
            }
        }
    }

    fn request_redraw(&self) {
        if let Some((window, _)) = &self.bound {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for WindowProxy {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(descriptor) = self.descriptor.take() {
            self.open(event_loop, descriptor);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let outcome = {
            let Some((_, drawable)) = self.bound.as_ref().filter(|(window, _)| window.id() == window_id) else {
                return;
            };
            if matches!(event, WindowEvent::RedrawRequested) {
                new_frame();
            }
            forward_window_event(drawable, &event)
        };

        match outcome {
            Ok(WindowOutcome::Destroyed) => {
                tracing::info!("Drawable for window {:?} destroyed, exiting", window_id);
                self.bound = None;
                event_loop.exit();
            }
            // The deferred destroy runs in the next display.
            Ok(WindowOutcome::DestroyDeferred) => self.request_redraw(),
            Ok(WindowOutcome::Repainted) if self.mode == RedrawMode::Continuous => self.request_redraw(),
            Ok(_) => {}
            Err(err) => tracing::warn!("failed to forward {:?}: {}", event, err),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some((_, drawable)) = self.bound.take() {
            if let Err(err) = drawable.destroy() {
                tracing::warn!("failed to destroy drawable at exit: {}", err);
            }
        }
    }
}

/// Opens one window, binds the drawable built for it and runs the event loop
/// until that drawable is destroyed.
pub fn run_window(
    descriptor: WindowDescriptor,
    mode: RedrawMode,
    builder: DrawableBuilder,
) -> Result<(), EventLoopError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut proxy = WindowProxy {
        descriptor: Some(descriptor),
        builder,
        mode,
        bound: None,
    };
    event_loop.run_app(&mut proxy)
}
