use std::fmt;

/// Opaque native surface handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

/// Opaque native rendering context handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(pub u64);

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({:#x})", self.0)
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextHandle({:#x})", self.0)
    }
}

bitflags::bitflags! {
    /// Additional flags passed to native context creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContextFlags: u32 {
        /// Request a debug context.
        const DEBUG = 1 << 0;
        /// Request a forward compatible context.
        const FORWARD_COMPATIBLE = 1 << 1;
        /// Request robust buffer access.
        const ROBUST = 1 << 2;
    }
}
