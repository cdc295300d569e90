//! Forwards window events to an auto drawable.
//!
//! Window events arrive on the event loop thread while an animator may be
//! rendering the same drawable. Every notification used here consults the
//! drawable's surface state first and never blocks on a busy renderer: a
//! close request that collides with a frame in flight is deferred to the
//! next display.

use vitrine_core::profiling::profile_function;
use vitrine_render::{AutoDrawable, Phase, RenderResult};
use winit::event::WindowEvent;

/// What forwarding a window event did to the drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// The event has no drawable counterpart.
    Ignored,
    /// A reshape to the new size is pending or already rendered.
    Resized { width: u32, height: u32 },
    /// A repaint was requested. The frame is skipped while another thread
    /// owns the surface.
    Repainted,
    /// The close policy kept the drawable alive.
    CloseIgnored,
    /// Another thread holds the surface; the destroy runs at the next display.
    DestroyDeferred,
    /// The drawable is destroyed.
    Destroyed,
}

impl WindowOutcome {
    pub fn is_destroyed(&self) -> bool {
        matches!(self, WindowOutcome::Destroyed)
    }
}

/// Translates one window event into the matching controller notification.
///
/// A zero-sized resize (a minimized window) is ignored, the surface keeps
/// its last size.
pub fn forward_window_event(drawable: &AutoDrawable, event: &WindowEvent) -> RenderResult<WindowOutcome> {
    profile_function!();
    let outcome = match event {
        WindowEvent::Resized(size) if size.width == 0 || size.height == 0 => {
            tracing::debug!("ignoring zero-sized resize");
            WindowOutcome::Ignored
        }
        WindowEvent::Resized(size) => {
            drawable.reshape_notify(size.width, size.height)?;
            WindowOutcome::Resized {
                width: size.width,
                height: size.height,
            }
        }
        WindowEvent::RedrawRequested => {
            drawable.window_repaint_notify()?;
            WindowOutcome::Repainted
        }
        WindowEvent::CloseRequested => {
            drawable.destroy_notify()?;
            if drawable.is_destroy_pending() {
                WindowOutcome::DestroyDeferred
            } else {
                WindowOutcome::CloseIgnored
            }
        }
        WindowEvent::Destroyed => {
            drawable.destroy_avoid_aware_of_locking()?;
            if drawable.is_destroy_pending() {
                WindowOutcome::DestroyDeferred
            } else {
                WindowOutcome::Destroyed
            }
        }
        _ => WindowOutcome::Ignored,
    };

    // A deferred destroy may have run inside the display this event caused.
    match outcome {
        WindowOutcome::Repainted | WindowOutcome::CloseIgnored if drawable.phase() == Phase::Destroyed => {
            Ok(WindowOutcome::Destroyed)
        }
        outcome => Ok(outcome),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use parking_lot::Mutex;
    use vitrine_native::{CapabilityDescriptor, ClosePolicy, ContextFlags, SurfaceProvider};
    use vitrine_render::{Drawable, ListenerError, NativeProviders, RenderListener};
    use vitrine_test_utils::{MockAnimator, MockProviders, NativeCall, mock_providers};
    use winit::dpi::PhysicalSize;

    use super::*;

    #[derive(Default)]
    struct Frames {
        reshapes: Mutex<Vec<(u32, u32)>>,
        displays: Mutex<usize>,
    }

    impl RenderListener for Frames {
        fn display(&self, _drawable: &AutoDrawable) -> Result<(), ListenerError> {
            *self.displays.lock() += 1;
            Ok(())
        }

        fn reshape(
            &self,
            _drawable: &AutoDrawable,
            _x: i32,
            _y: i32,
            width: u32,
            height: u32,
        ) -> Result<(), ListenerError> {
            self.reshapes.lock().push((width, height));
            Ok(())
        }
    }

    fn windowed(width: u32, height: u32) -> (AutoDrawable, Arc<Frames>, MockProviders) {
        let mocks = mock_providers();
        let device = mocks.surfaces.open_device().unwrap();
        let providers = NativeProviders::new(mocks.surfaces.clone(), mocks.contexts.clone());
        let drawable = Drawable::new(providers, device, CapabilityDescriptor::default(), width, height);
        let context = drawable.create_context(None, ContextFlags::empty()).unwrap();

        let auto = AutoDrawable::new();
        auto.bind(drawable, Some(context), true).unwrap();
        auto.set_realized(true).unwrap();
        let frames = Arc::new(Frames::default());
        auto.add_listener(frames.clone());
        (auto, frames, mocks)
    }

    fn displays(frames: &Frames) -> usize {
        *frames.displays.lock()
    }

    #[test]
    fn test_resize_reshapes_and_renders() {
        let (auto, frames, _mocks) = windowed(320, 240);
        let event = WindowEvent::Resized(PhysicalSize::new(640, 480));

        let outcome = forward_window_event(&auto, &event).unwrap();
        assert_eq!(
            outcome,
            WindowOutcome::Resized {
                width: 640,
                height: 480
            }
        );
        assert_eq!(auto.width(), 640);
        assert_eq!(*frames.reshapes.lock(), vec![(640, 480)]);
        assert_eq!(displays(&frames), 1);
    }

    #[test]
    fn test_zero_sized_resize_is_ignored() {
        let (auto, frames, _mocks) = windowed(320, 240);
        let event = WindowEvent::Resized(PhysicalSize::new(0, 0));

        assert_eq!(forward_window_event(&auto, &event).unwrap(), WindowOutcome::Ignored);
        assert_eq!(auto.width(), 320);
        assert_eq!(displays(&frames), 0);
    }

    #[test]
    fn test_redraw_renders_a_frame() {
        let (auto, frames, _mocks) = windowed(64, 64);

        let outcome = forward_window_event(&auto, &WindowEvent::RedrawRequested).unwrap();
        assert_eq!(outcome, WindowOutcome::Repainted);
        assert_eq!(displays(&frames), 1);
        assert_eq!(auto.fps().total_frames(), 1);
    }

    #[test]
    fn test_redraw_skipped_while_animated_elsewhere() {
        let (auto, frames, mocks) = windowed(64, 64);
        auto.set_animator(Some(Arc::new(MockAnimator::on_foreign_thread(mocks.log.clone()))));

        forward_window_event(&auto, &WindowEvent::RedrawRequested).unwrap();
        assert_eq!(displays(&frames), 0);
    }

    #[test]
    fn test_close_request_destroys() {
        let (auto, _frames, mocks) = windowed(64, 64);
        forward_window_event(&auto, &WindowEvent::RedrawRequested).unwrap();

        let outcome = forward_window_event(&auto, &WindowEvent::CloseRequested).unwrap();
        assert!(outcome.is_destroyed());
        assert_eq!(auto.phase(), Phase::Destroyed);
        assert_eq!(
            mocks
                .log
                .count(|call| matches!(call, NativeCall::DestroyContext { .. })),
            1
        );
    }

    #[test]
    fn test_close_request_respects_policy() {
        let (auto, _frames, _mocks) = windowed(64, 64);
        auto.set_close_policy(Some(ClosePolicy::DoNothingOnClose));

        let outcome = forward_window_event(&auto, &WindowEvent::CloseRequested).unwrap();
        assert_eq!(outcome, WindowOutcome::CloseIgnored);
        assert!(auto.is_realized());
    }

    #[test]
    fn test_close_during_foreign_frame_is_deferred_to_redraw() {
        let (auto, _frames, _mocks) = windowed(64, 64);
        let surface = auto.surface_state().unwrap();
        let locked = Arc::new(Barrier::new(2));
        let unlock = Arc::new(Barrier::new(2));
        let holder = {
            let (locked, unlock) = (locked.clone(), unlock.clone());
            thread::spawn(move || {
                let _guard = surface.lock().lock();
                locked.wait();
                unlock.wait();
            })
        };

        locked.wait();
        let outcome = forward_window_event(&auto, &WindowEvent::CloseRequested).unwrap();
        assert_eq!(outcome, WindowOutcome::DestroyDeferred);
        unlock.wait();
        holder.join().unwrap();

        let outcome = forward_window_event(&auto, &WindowEvent::RedrawRequested).unwrap();
        assert_eq!(outcome, WindowOutcome::Destroyed);
        assert!(!auto.is_destroy_pending());
    }

    #[test]
    fn test_destroyed_window_tears_down_regardless_of_policy() {
        let (auto, _frames, _mocks) = windowed(64, 64);
        auto.set_close_policy(Some(ClosePolicy::DoNothingOnClose));

        let outcome = forward_window_event(&auto, &WindowEvent::Destroyed).unwrap();
        assert_eq!(outcome, WindowOutcome::Destroyed);
        assert!(!auto.is_realized());
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        let (auto, frames, _mocks) = windowed(64, 64);

        let outcome = forward_window_event(&auto, &WindowEvent::Focused(true)).unwrap();
        assert_eq!(outcome, WindowOutcome::Ignored);
        assert_eq!(displays(&frames), 0);
    }
}
