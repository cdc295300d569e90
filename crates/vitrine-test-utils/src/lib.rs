//! Test utilities for Vitrine.
//!
//! With the `mock` feature this crate provides recording implementations of
//! every native contract a drawable consumes:
//!
//! - [`MockSurfaceProvider`] and [`MockContextProvider`] hand out fake
//!   handles and record each call
//! - [`MockDevice`] counts how often it was closed
//! - [`MockAnimator`] reports a configurable loop state
//!
//! All mocks created through [`mock_providers`] share one [`CallLog`], so a
//! test can assert the relative order of surface, context and animator calls.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use vitrine_native::{CapabilityDescriptor, SurfaceProvider};
//! use vitrine_test_utils::{NativeCall, mock_providers};
//!
//! let mocks = mock_providers();
//! let device = mocks.surfaces.open_device().unwrap();
//! let handle = mocks
//!     .surfaces
//!     .create_surface(device.as_ref(), &CapabilityDescriptor::default(), 64, 64)
//!     .unwrap();
//!
//! assert!(mocks.log.contains(&NativeCall::CreateSurface { handle, width: 64, height: 64 }));
//! # }
//! ```

#[cfg(feature = "mock")]
pub mod mock_animator;
#[cfg(feature = "mock")]
pub mod mock_native;

#[cfg(feature = "mock")]
pub use mock_animator::*;
#[cfg(feature = "mock")]
pub use mock_native::*;
