use std::any::Any;
use std::fmt;

use crate::{
    capabilities::CapabilityDescriptor,
    error::NativeError,
    handle::{ContextFlags, ContextHandle, SurfaceHandle},
};

/// Opaque rendering state captured from a context.
///
/// Only the provider that produced a blob knows how to interpret it.
pub struct GlStateBlob(Box<dyn Any + Send>);

impl GlStateBlob {
    pub fn new<T: Any + Send>(state: T) -> Self {
        Self(Box::new(state))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        self.0.downcast().map(|state| *state).map_err(Self)
    }
}

impl fmt::Debug for GlStateBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GlStateBlob(..)")
    }
}

/// Creates and binds native rendering contexts.
///
/// `make_current` and `release` are always called by the thread that holds
/// the surface lock of the surface involved.
pub trait ContextProvider: Send + Sync {
    /// Creates a native context for `surface`, sharing resources with
    /// `share_with` when given.
    fn create_context(
        &self,
        surface: SurfaceHandle,
        caps: &CapabilityDescriptor,
        share_with: Option<ContextHandle>,
        flags: ContextFlags,
    ) -> Result<ContextHandle, NativeError>;

    /// Binds `context` to the calling thread with `surface` as its target.
    fn make_current(&self, context: ContextHandle, surface: SurfaceHandle) -> Result<(), NativeError>;

    /// Unbinds `context` from the calling thread.
    fn release(&self, context: ContextHandle) -> Result<(), NativeError>;

    /// Destroys a native context. The handle is invalid afterwards.
    fn destroy_context(&self, context: ContextHandle) -> Result<(), NativeError>;

    /// Captures state of a current context for later restoration.
    #[allow(unused_variables)]
    fn capture_state(&self, context: ContextHandle) -> Option<GlStateBlob> {
        None
    }

    /// Restores state captured by [`ContextProvider::capture_state`] into a
    /// current context.
    #[allow(unused_variables)]
    fn restore_state(&self, context: ContextHandle, state: GlStateBlob) -> Result<(), NativeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_downcast() {
        let blob = GlStateBlob::new(vec![1u32, 2, 3]);
        assert_eq!(blob.downcast_ref::<Vec<u32>>(), Some(&vec![1, 2, 3]));
        assert!(blob.downcast_ref::<String>().is_none());

        let blob = blob.downcast::<String>().unwrap_err();
        assert_eq!(blob.downcast::<Vec<u32>>().unwrap(), vec![1, 2, 3]);
    }
}
