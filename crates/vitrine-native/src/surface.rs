use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::{
    capabilities::{AttribList, CapabilityDescriptor},
    chooser::VisualList,
    device::GraphicsDevice,
    error::NativeError,
    handle::SurfaceHandle,
};

/// What a surface does when the windowing system asks it to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClosePolicy {
    /// The application intercepts the close request.
    DoNothingOnClose,
    /// The surface and its context are destroyed.
    #[default]
    DisposeOnClose,
}

/// Allocates and manages native surfaces for one platform.
///
/// All methods may be called from any thread; implementations synchronize
/// their own native state. Surface handles are only ever mutated by the
/// drawable that owns them, while holding its controller's lock.
pub trait SurfaceProvider: Send + Sync {
    /// Opens a new connection to the graphics system.
    fn open_device(&self) -> Result<Arc<dyn GraphicsDevice>, NativeError>;

    /// Whether the device supports multisampled visuals.
    #[allow(unused_variables)]
    fn multisample_available(&self, device: &dyn GraphicsDevice) -> bool {
        false
    }

    /// Whether offscreen surfaces can be created on the device.
    #[allow(unused_variables)]
    fn supports_offscreen(&self, device: &dyn GraphicsDevice) -> bool {
        true
    }

    /// Enumerates the visuals of `device`, optionally recommending the one
    /// matching `attribs`.
    fn enumerate_visuals(
        &self,
        device: &dyn GraphicsDevice,
        attribs: &AttribList,
    ) -> Result<VisualList, NativeError>;

    /// Allocates a native surface.
    fn create_surface(
        &self,
        device: &dyn GraphicsDevice,
        caps: &CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError>;

    /// Resizes an offscreen surface. The returned handle may differ from
    /// `existing`, in which case `existing` is no longer valid.
    fn resize_surface(
        &self,
        device: &dyn GraphicsDevice,
        existing: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError>;

    /// Releases a native surface. Releasing never fails.
    fn release_surface(&self, device: &dyn GraphicsDevice, surface: SurfaceHandle);

    /// Presents the back buffer of a double-buffered surface.
    fn swap_buffers(&self, surface: SurfaceHandle) -> Result<(), NativeError>;

    /// Whether surfaces with these capabilities have a bottom-left origin.
    #[allow(unused_variables)]
    fn is_gl_oriented(&self, caps: &CapabilityDescriptor) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    holds: u32,
}

/// A recursive lock over a native surface that knows its owning thread.
///
/// Making a context current locks its surface; releasing the context
/// unlocks it. Other threads can ask whether the surface is held by a
/// foreign thread without blocking, which is how window-system callbacks
/// avoid waiting on a rendering thread.
#[derive(Debug, Default)]
pub struct SurfaceLock {
    state: Mutex<LockState>,
    unlocked: Condvar,
}

impl SurfaceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the current thread owns the lock.
    pub fn acquire(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.holds = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.holds += 1;
                    return;
                }
                Some(_) => self.unlocked.wait(&mut state),
            }
        }
    }

    /// Releases one hold of the current thread.
    pub fn release(&self) -> Result<(), NativeError> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(NativeError::SurfaceLockNotHeld);
        }
        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            self.unlocked.notify_one();
        }
        Ok(())
    }

    /// Acquires the lock for the lifetime of the returned guard.
    pub fn lock(&self) -> SurfaceLockGuard<'_> {
        self.acquire();
        SurfaceLockGuard { lock: self }
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    pub fn is_locked_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Whether a thread other than the caller currently holds the lock.
    pub fn is_locked_by_other_thread(&self) -> bool {
        let me = thread::current().id();
        matches!(self.state.lock().owner, Some(owner) if owner != me)
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.state.lock().owner
    }
}

/// Releases a [`SurfaceLock`] hold on drop.
#[must_use = "the surface is unlocked as soon as the guard is dropped"]
pub struct SurfaceLockGuard<'a> {
    lock: &'a SurfaceLock,
}

impl Drop for SurfaceLockGuard<'_> {
    fn drop(&mut self) {
        // The guard was created by this thread's acquire.
        let _ = self.lock.release();
    }
}
