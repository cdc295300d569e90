//! Listener and GL state detached from a live drawable.

use vitrine_native::GlStateBlob;

use crate::{auto_drawable::AutoDrawable, listener::SharedListener};

/// Observes state preservation of an [`AutoDrawable`].
pub trait StateKeeperListener: Send + Sync {
    /// Called before listeners and GL state are pulled from the drawable.
    fn on_preserving(&self, drawable: &AutoDrawable);

    /// Called after preserved state was pushed back into the drawable.
    fn on_restored(&self, drawable: &AutoDrawable);
}

/// Listeners, with their initialized flags, and a captured GL state.
///
/// Produced by [`AutoDrawable::pull_state`] and consumed by
/// [`AutoDrawable::push_state`].
pub struct PreservedState {
    listeners: Vec<(SharedListener, bool)>,
    gl_state: Option<GlStateBlob>,
}

impl PreservedState {
    pub(crate) fn new(listeners: Vec<(SharedListener, bool)>, gl_state: Option<GlStateBlob>) -> Self {
        Self {
            listeners,
            gl_state,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listener(&self, index: usize) -> Option<&SharedListener> {
        self.listeners.get(index).map(|(listener, _)| listener)
    }

    /// Whether the listener at `index` was initialized when pulled.
    pub fn was_initialized(&self, index: usize) -> Option<bool> {
        self.listeners.get(index).map(|&(_, initialized)| initialized)
    }

    pub fn gl_state(&self) -> Option<&GlStateBlob> {
        self.gl_state.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Vec<(SharedListener, bool)>, Option<GlStateBlob>) {
        (self.listeners, self.gl_state)
    }
}

impl std::fmt::Debug for PreservedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreservedState")
            .field("listeners", &self.listeners.len())
            .field("gl_state", &self.gl_state)
            .finish()
    }
}
