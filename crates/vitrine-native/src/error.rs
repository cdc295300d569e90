/// Errors raised by the native layer.
///
/// Configuration errors describe a request that can never succeed and are
/// reported straight to the caller. Resource errors come from a native
/// allocation that failed. Neither is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    #[error("bit depths < {min} (i.e., non-true-color) not supported, requested {bits}")]
    InsufficientColorDepth { bits: u32, min: u32 },

    #[error("capabilities chooser specified invalid index {index} (expected 0..{count})")]
    InvalidChoice { index: usize, count: usize },

    #[error("capabilities chooser chose an unusable visual at index {0}")]
    UnusableVisual(usize),

    #[error("no usable visual among {0} candidates")]
    NoUsableVisual(usize),

    #[error("graphics device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("error while enumerating visuals: {0}")]
    VisualEnumeration(String),

    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("context creation failed: {0}")]
    ContextCreation(String),

    #[error("make current failed: {0}")]
    MakeCurrent(String),

    #[error("context release failed: {0}")]
    Release(String),

    #[error("buffer swap failed: {0}")]
    SwapBuffers(String),

    #[error("surface lock is not held by the current thread")]
    SurfaceLockNotHeld,
}

impl NativeError {
    /// Whether this error describes an invalid request rather than a failed
    /// native allocation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NativeError::InsufficientColorDepth { .. }
                | NativeError::InvalidChoice { .. }
                | NativeError::UnusableVisual(_)
                | NativeError::NoUsableVisual(_)
        )
    }
}
