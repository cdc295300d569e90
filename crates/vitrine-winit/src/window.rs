use std::sync::Arc;

use vitrine_native::ClosePolicy;
use vitrine_render::AutoDrawable;
pub use winit::dpi::PhysicalSize as WinitPhysicalSize;
pub use winit::window::Fullscreen;
pub use winit::window::Window as WinitWindow;
use winit::{error::OsError, event_loop::ActiveEventLoop};

pub struct WindowDescriptor {
    pub title: String,
    pub resizeable: bool,
    pub size: Option<WinitPhysicalSize<u32>>,
    pub visible: bool,
    pub fullscreen: Option<Fullscreen>,
    /// Applied to the drawable bound to this window.
    pub close_policy: ClosePolicy,
}

impl Default for WindowDescriptor {
    fn default() -> Self {
        Self {
            title: "Vitrine Window".to_string(),
            resizeable: true,
            size: None,
            visible: true,
            fullscreen: None,
            close_policy: ClosePolicy::DisposeOnClose,
        }
    }
}

impl WindowDescriptor {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some(WinitPhysicalSize::new(width, height));
        self
    }

    pub fn with_close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }
}

pub struct Window {
    pub window: Arc<WinitWindow>,
    close_policy: ClosePolicy,
}

impl Window {
    pub fn id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    /// Get the physical size of the window in pixels.
    pub fn physical_size(&self) -> WinitPhysicalSize<u32> {
        self.window.inner_size()
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    pub fn close_policy(&self) -> ClosePolicy {
        self.close_policy
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Applies this window's close policy to the drawable's surface.
    ///
    /// Returns `false` if the drawable has nothing bound yet.
    pub fn attach(&self, drawable: &AutoDrawable) -> bool {
        drawable.set_close_policy(Some(self.close_policy))
    }

    pub(crate) fn new(
        event_loop: &ActiveEventLoop,
        descriptor: WindowDescriptor,
    ) -> Result<Self, OsError> {
        let mut attributes = WinitWindow::default_attributes()
            .with_title(descriptor.title)
            .with_resizable(descriptor.resizeable)
            .with_visible(descriptor.visible)
            .with_fullscreen(descriptor.fullscreen);

        if let Some(size) = descriptor.size {
            attributes = attributes.with_inner_size(size);
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        tracing::debug!("created window {:?}", window.id());

        Ok(Window {
            window,
            close_policy: descriptor.close_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor_disposes_on_close() {
        let descriptor = WindowDescriptor::default();
        assert_eq!(descriptor.close_policy, ClosePolicy::DisposeOnClose);
        assert!(descriptor.size.is_none());
        assert!(descriptor.resizeable);
    }

    #[test]
    fn test_descriptor_builders() {
        let descriptor = WindowDescriptor::default()
            .with_title("preview")
            .with_size(640, 480)
            .with_close_policy(ClosePolicy::DoNothingOnClose);
        assert_eq!(descriptor.title, "preview");
        assert_eq!(descriptor.size, Some(WinitPhysicalSize::new(640, 480)));
        assert_eq!(descriptor.close_policy, ClosePolicy::DoNothingOnClose);
    }
}
