//! Rendering context state.

use std::sync::Arc;

use vitrine_native::{ContextFlags, ContextHandle, ContextProvider, GlStateBlob};

use crate::{
    drawable::{Drawable, DrawableId, SurfaceState},
    error::RenderResult,
};

/// Outcome of [`Context::make_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakeCurrent {
    /// The drawable is not realized; nothing was bound.
    NotCurrent,
    /// An existing native context was bound.
    Current,
    /// The native context was created by this call and bound.
    CurrentNew,
}

impl MakeCurrent {
    pub fn is_current(self) -> bool {
        !matches!(self, MakeCurrent::NotCurrent)
    }
}

/// A native rendering context bound to at most one drawable.
///
/// The native context is created lazily by the first successful
/// [`Context::make_current`]. While current, the context holds its
/// drawable's surface lock.
pub struct Context {
    provider: Arc<dyn ContextProvider>,
    handle: Option<ContextHandle>,
    drawable: Option<DrawableId>,
    share_with: Option<ContextHandle>,
    flags: ContextFlags,
    pending_state: Option<GlStateBlob>,
    current_surface: Option<Arc<SurfaceState>>,
    current_depth: u32,
}

impl Context {
    pub fn new(provider: Arc<dyn ContextProvider>) -> Self {
        Self {
            provider,
            handle: None,
            drawable: None,
            share_with: None,
            flags: ContextFlags::empty(),
            pending_state: None,
            current_surface: None,
            current_depth: 0,
        }
    }

    /// Shares resources with an already created native context.
    pub fn with_share(mut self, share_with: Option<ContextHandle>) -> Self {
        self.share_with = share_with;
        self
    }

    pub fn with_flags(mut self, flags: ContextFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn handle(&self) -> Option<ContextHandle> {
        self.handle
    }

    pub fn is_created(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_current(&self) -> bool {
        self.current_surface.is_some()
    }

    pub fn share_with(&self) -> Option<ContextHandle> {
        self.share_with
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    /// Flags used when the native context is next created.
    pub fn set_flags(&mut self, flags: ContextFlags) {
        self.flags = flags;
    }

    pub fn associated_drawable(&self) -> Option<DrawableId> {
        self.drawable
    }

    pub fn set_associated_drawable(&mut self, drawable: Option<DrawableId>) {
        self.drawable = drawable;
    }

    /// Queues captured state to be restored by the next make-current.
    pub fn set_pending_state(&mut self, state: Option<GlStateBlob>) {
        self.pending_state = state;
    }

    pub fn has_pending_state(&self) -> bool {
        self.pending_state.is_some()
    }

    /// Binds the context to the calling thread with `drawable` as target,
    /// creating the native context first if needed.
    ///
    /// Locks the drawable's surface until [`Context::release`]. On failure
    /// the surface is unlocked again. Nested calls on a context that is
    /// already current only count; the matching releases unwind them.
    pub fn make_current(&mut self, drawable: &Drawable) -> RenderResult<MakeCurrent> {
        let Some(surface) = drawable.handle() else {
            return Ok(MakeCurrent::NotCurrent);
        };
        if self.current_surface.is_some() && self.drawable == Some(drawable.id()) {
            self.current_depth += 1;
            return Ok(MakeCurrent::Current);
        }

        let state = drawable.surface_state().clone();
        state.lock().acquire();

        match self.bind(drawable) {
            Ok(outcome) => {
                self.drawable = Some(drawable.id());
                self.current_surface = Some(state);
                self.current_depth = 1;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(unlock) = state.lock().release() {
                    tracing::debug!("failed to unlock {:?} after make current: {}", surface, unlock);
                }
                tracing::debug!("make current on {:?} failed: {}", surface, err);
                Err(err)
            }
        }
    }

    fn bind(&mut self, drawable: &Drawable) -> RenderResult<MakeCurrent> {
        let Some(surface) = drawable.handle() else {
            return Ok(MakeCurrent::NotCurrent);
        };

        let (handle, outcome) = match self.handle {
            Some(handle) => (handle, MakeCurrent::Current),
            None => {
                let handle = self.provider.create_context(
                    surface,
                    drawable.capabilities(),
                    self.share_with,
                    self.flags,
                )?;
                tracing::debug!("created context {:?} on {:?}", handle, surface);
                self.handle = Some(handle);
                (handle, MakeCurrent::CurrentNew)
            }
        };

        self.provider.make_current(handle, surface)?;
        if let Some(state) = self.pending_state.take() {
            self.provider.restore_state(handle, state)?;
        }
        Ok(outcome)
    }

    /// Unbinds the context from the calling thread and unlocks its surface.
    /// A no-op if the context is not current.
    pub fn release(&mut self) -> RenderResult<()> {
        if self.current_depth > 1 {
            self.current_depth -= 1;
            return Ok(());
        }
        let Some(state) = self.current_surface.take() else {
            return Ok(());
        };
        self.current_depth = 0;
        let released = match self.handle {
            Some(handle) => self.provider.release(handle),
            None => Ok(()),
        };
        let unlocked = state.lock().release();
        released?;
        unlocked?;
        Ok(())
    }

    /// Captures the state of the current native context.
    pub fn capture_state(&self) -> Option<GlStateBlob> {
        self.handle
            .filter(|_| self.is_current())
            .and_then(|handle| self.provider.capture_state(handle))
    }

    /// Destroys the native context, releasing it first if current.
    /// The context can be created again by a later make-current.
    pub fn destroy(&mut self) -> RenderResult<()> {
        self.current_depth = self.current_depth.min(1);
        let released = self.release();
        let destroyed = match self.handle.take() {
            Some(handle) => {
                tracing::debug!("destroying context {:?}", handle);
                self.provider.destroy_context(handle)
            }
            None => Ok(()),
        };
        self.pending_state = None;
        released?;
        destroyed?;
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.is_created() || self.is_current() {
            if let Err(err) = self.destroy() {
                tracing::debug!("failed to destroy dropped context: {}", err);
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle)
            .field("drawable", &self.drawable)
            .field("share_with", &self.share_with)
            .field("flags", &self.flags)
            .field("current", &self.is_current())
            .finish_non_exhaustive()
    }
}
