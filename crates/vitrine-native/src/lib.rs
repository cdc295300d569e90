//! Native-side contracts consumed by the Vitrine drawable lifecycle.
//!
//! Nothing in this crate talks to a real windowing system. It defines the
//! narrow interfaces a platform binding implements:
//!
//! - [`SurfaceProvider`] allocates, resizes, swaps and releases native surfaces
//! - [`ContextProvider`] creates, binds and destroys native rendering contexts
//! - [`AnimatorControl`] is the pause/resume protocol of an animation loop
//! - [`GraphicsDevice`] is a connection to the graphics system
//!
//! It also owns the value types shared across those seams: the
//! [`CapabilityDescriptor`], visual selection through a
//! [`CapabilitiesChooser`], native handles and the thread-aware
//! [`SurfaceLock`].

pub mod animator;
pub mod capabilities;
pub mod chooser;
pub mod context;
pub mod device;
pub mod error;
pub mod handle;
pub mod surface;

pub use animator::AnimatorControl;
pub use capabilities::{AttribList, CapabilityDescriptor, ColorBits, MIN_COLOR_DEPTH, SurfaceAttrib};
pub use chooser::{CapabilitiesChooser, DefaultCapabilitiesChooser, VisualList, choose_capabilities};
pub use context::{ContextProvider, GlStateBlob};
pub use device::GraphicsDevice;
pub use error::NativeError;
pub use handle::{ContextFlags, ContextHandle, SurfaceHandle};
pub use surface::{ClosePolicy, SurfaceLock, SurfaceProvider};
