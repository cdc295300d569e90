//! Opens a window and renders into an offscreen wgpu drawable sized to it.
//!
//! `VITRINE_PROFILING=http` serves puffin scopes to `puffin_viewer`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use vitrine_core::{config::Config, logging, profiling::init_profiling};
use vitrine_native::CapabilityDescriptor;
use vitrine_render::backend::{WgpuBackend, WgpuContextProvider};
use vitrine_render::{AutoDrawable, DrawableFactory, ListenerError, RenderListener};
use vitrine_winit::{RedrawMode, WindowDescriptor, run_window};

struct Pulse {
    contexts: Arc<WgpuContextProvider>,
    frames: AtomicU64,
}

impl RenderListener for Pulse {
    fn display(&self, _drawable: &AutoDrawable) -> Result<(), ListenerError> {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed);
        let level = (frame % 120) as f64 / 120.0;
        self.contexts
            .with_current(|current| {
                current.state.clear_color = wgpu::Color {
                    r: level,
                    g: 0.2,
                    b: 1.0 - level,
                    a: 1.0,
                };
                current.clear();
            })
            .ok_or("no current target")?;
        Ok(())
    }

    fn reshape(&self, _drawable: &AutoDrawable, x: i32, y: i32, width: u32, height: u32) -> Result<(), ListenerError> {
        tracing::info!("viewport {}x{} at ({}, {})", width, height, x, y);
        Ok(())
    }

    fn dispose(&self, _drawable: &AutoDrawable) -> Result<(), ListenerError> {
        tracing::info!("rendered {} frames", self.frames.load(Ordering::Relaxed));
        Ok(())
    }
}

fn main() {
    logging::init();
    let config = Config::from_env();
    init_profiling(config.profiling);

    let backend = match WgpuBackend::new_sync() {
        Ok(backend) => backend,
        Err(err) => {
            tracing::error!("no wgpu device: {}", err);
            return;
        }
    };
    let factory = DrawableFactory::new(backend.providers());
    let contexts = backend.contexts.clone();

    let descriptor = WindowDescriptor::default()
        .with_title("Vitrine")
        .with_size(800, 600);
    let result = run_window(
        descriptor,
        RedrawMode::Continuous,
        Box::new(move |window| {
            let size = window.physical_size();
            let drawable = factory.create_offscreen_auto_drawable(
                &CapabilityDescriptor::default(),
                size.width.max(1),
                size.height.max(1),
                None,
            )?;
            drawable.preserve_state_at_destroy(config.preserve_state_at_destroy);
            drawable.set_fps_update_interval(config.fps_update_frames);
            drawable.add_listener(Arc::new(Pulse {
                contexts: contexts.clone(),
                frames: AtomicU64::new(0),
            }));
            Ok(Arc::new(drawable))
        }),
    );

    if let Err(err) = result {
        tracing::error!("event loop failed: {}", err);
    }
}
