//! Native surface ownership.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use vitrine_native::{
    CapabilityDescriptor, ClosePolicy, ContextFlags, ContextProvider, GraphicsDevice,
    SurfaceHandle, SurfaceLock, SurfaceProvider,
};

use crate::{
    context::Context,
    error::{RenderError, RenderResult, StateError},
};

/// Identity of a [`Drawable`], used by contexts to refer to their target
/// without owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(u64);

impl DrawableId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DrawableId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The platform providers a drawable and its contexts allocate through.
#[derive(Clone)]
pub struct NativeProviders {
    pub surfaces: Arc<dyn SurfaceProvider>,
    pub contexts: Arc<dyn ContextProvider>,
}

impl NativeProviders {
    pub fn new(surfaces: Arc<dyn SurfaceProvider>, contexts: Arc<dyn ContextProvider>) -> Self {
        Self { surfaces, contexts }
    }
}

/// Surface state readable from any thread without the controller lock.
///
/// Window-system callbacks consult it to decide, without blocking, whether
/// a surface is busy on another thread or should be disposed on close.
#[derive(Debug)]
pub struct SurfaceState {
    lock: SurfaceLock,
    onscreen: bool,
    close_policy: Mutex<Option<ClosePolicy>>,
    width: AtomicU32,
    height: AtomicU32,
    realized: AtomicBool,
}

impl SurfaceState {
    fn new(onscreen: bool, width: u32, height: u32) -> Self {
        Self {
            lock: SurfaceLock::new(),
            onscreen,
            close_policy: Mutex::new(None),
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
            realized: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) -> &SurfaceLock {
        &self.lock
    }

    pub fn is_onscreen(&self) -> bool {
        self.onscreen
    }

    /// The explicit close policy, if one was set.
    pub fn close_policy(&self) -> Option<ClosePolicy> {
        *self.close_policy.lock()
    }

    pub fn set_close_policy(&self, policy: Option<ClosePolicy>) {
        *self.close_policy.lock() = policy;
    }

    /// Whether a close request from the window system destroys the surface.
    /// Surfaces without an explicit policy are disposed.
    pub fn disposes_on_close(&self) -> bool {
        !matches!(self.close_policy(), Some(ClosePolicy::DoNothingOnClose))
    }

    pub fn width(&self) -> u32 {
        self.width.load(Ordering::Acquire)
    }

    pub fn height(&self) -> u32 {
        self.height.load(Ordering::Acquire)
    }

    pub fn is_realized(&self) -> bool {
        self.realized.load(Ordering::Acquire)
    }

    fn set_size(&self, width: u32, height: u32) {
        self.width.store(width, Ordering::Release);
        self.height.store(height, Ordering::Release);
    }
}

/// A renderable native surface, on- or offscreen.
///
/// The native handle exists exactly while the drawable is realized.
pub struct Drawable {
    id: DrawableId,
    providers: NativeProviders,
    device: Arc<dyn GraphicsDevice>,
    caps: CapabilityDescriptor,
    gl_oriented: bool,
    handle: Option<SurfaceHandle>,
    state: Arc<SurfaceState>,
}

impl Drawable {
    /// Creates an unrealized drawable with the chosen capabilities.
    pub fn new(
        providers: NativeProviders,
        device: Arc<dyn GraphicsDevice>,
        caps: CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> Self {
        let gl_oriented = providers.surfaces.is_gl_oriented(&caps);
        Self {
            id: DrawableId::next(),
            state: Arc::new(SurfaceState::new(caps.onscreen, width, height)),
            providers,
            device,
            caps,
            gl_oriented,
            handle: None,
        }
    }

    pub fn id(&self) -> DrawableId {
        self.id
    }

    pub fn capabilities(&self) -> &CapabilityDescriptor {
        &self.caps
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn providers(&self) -> &NativeProviders {
        &self.providers
    }

    pub fn surface_state(&self) -> &Arc<SurfaceState> {
        &self.state
    }

    pub fn surface_lock(&self) -> &SurfaceLock {
        &self.state.lock
    }

    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.state.width()
    }

    pub fn height(&self) -> u32 {
        self.state.height()
    }

    pub fn is_realized(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_onscreen(&self) -> bool {
        self.state.onscreen
    }

    /// Whether the surface origin is bottom-left.
    pub fn is_gl_oriented(&self) -> bool {
        self.gl_oriented
    }

    /// Allocates or releases the native surface.
    ///
    /// Returns `true` if the realized state changed.
    pub fn set_realized(&mut self, realized: bool) -> RenderResult<bool> {
        match (realized, self.handle) {
            (true, None) => {
                let (width, height) = (self.width(), self.height());
                if width == 0 || height == 0 {
                    return Err(RenderError::InvalidSize { width, height });
                }
                let handle = self.providers.surfaces.create_surface(
                    self.device.as_ref(),
                    &self.caps,
                    width,
                    height,
                )?;
                tracing::debug!("realized {:?} as {:?} ({}x{})", self.id, handle, width, height);
                self.handle = Some(handle);
                self.state.realized.store(true, Ordering::Release);
                Ok(true)
            }
            (false, Some(handle)) => {
                self.release_surface(handle);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Records a size the window system already applied to the surface.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.state.set_size(width, height);
    }

    /// Reallocates an offscreen surface at a new size, replacing the native
    /// handle. An unrealized drawable only records the size.
    pub fn resize_offscreen(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        if let Some(existing) = self.handle {
            let handle =
                self.providers
                    .surfaces
                    .resize_surface(self.device.as_ref(), existing, width, height)?;
            if handle != existing {
                tracing::debug!("{:?} surface replaced: {:?} -> {:?}", self.id, existing, handle);
            }
            self.handle = Some(handle);
        }
        self.state.set_size(width, height);
        Ok(())
    }

    /// Presents the back buffer. A no-op while unrealized.
    pub fn swap_buffers(&self) -> RenderResult<()> {
        if let Some(handle) = self.handle {
            self.providers.surfaces.swap_buffers(handle)?;
        }
        Ok(())
    }

    /// Creates an uncreated context targeting this drawable.
    ///
    /// The native context is allocated on its first make-current. A share
    /// context must already be created.
    pub fn create_context(&self, share_with: Option<&Context>, flags: ContextFlags) -> RenderResult<Context> {
        let share = match share_with {
            Some(share) => Some(share.handle().ok_or(StateError::ShareContextNotCreated)?),
            None => None,
        };
        let mut context = Context::new(self.providers.contexts.clone())
            .with_share(share)
            .with_flags(flags);
        context.set_associated_drawable(Some(self.id));
        Ok(context)
    }

    fn release_surface(&mut self, handle: SurfaceHandle) {
        self.providers
            .surfaces
            .release_surface(self.device.as_ref(), handle);
        self.handle = None;
        self.state.realized.store(false, Ordering::Release);
        tracing::debug!("unrealized {:?}, released {:?}", self.id, handle);
    }
}

impl Drop for Drawable {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            self.release_surface(handle);
        }
    }
}

impl std::fmt::Debug for Drawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drawable")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("onscreen", &self.is_onscreen())
            .field("device", &self.device.connection())
            .finish_non_exhaustive()
    }
}
