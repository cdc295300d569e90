//! Graphics devices and the process-wide default connection.
//!
//! Visual selection and offscreen surfaces share one default device per
//! process. That connection, and the capability queries cached against it,
//! live in a single lock-guarded static:
//!
//! - [`default_device`] opens the connection on first use and reuses it
//!   afterwards, reopening it if it was closed
//! - [`multisample_available`] caches the provider's answer per connection
//! - [`shutdown`] closes the default device and forgets every cached result

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::{error::NativeError, surface::SurfaceProvider};

/// A connection to the graphics system, shared by the drawables created on
/// it. Only the owner recorded at drawable-controller construction closes it.
pub trait GraphicsDevice: Send + Sync + fmt::Debug {
    /// Connection name, e.g. a display string.
    fn connection(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Closes the connection. Returns `true` if it was open.
    fn close(&self) -> bool;
}

#[derive(Default)]
struct ProcessDevices {
    default: Option<Arc<dyn GraphicsDevice>>,
    multisample: AHashMap<String, bool>,
}

static PROCESS_DEVICES: Mutex<Option<ProcessDevices>> = parking_lot::const_mutex(None);

/// Returns the process-wide default device, opening it through `provider`
/// on first use.
pub fn default_device(provider: &dyn SurfaceProvider) -> Result<Arc<dyn GraphicsDevice>, NativeError> {
    let mut guard = PROCESS_DEVICES.lock();
    let devices = guard.get_or_insert_with(ProcessDevices::default);

    if let Some(device) = devices.default.as_ref().filter(|device| device.is_open()) {
        return Ok(device.clone());
    }

    let device = provider.open_device()?;
    tracing::debug!("opened default graphics device {}", device.connection());
    devices.default = Some(device.clone());
    Ok(device)
}

/// Whether `device` supports multisampling, asking `provider` once per
/// connection.
pub fn multisample_available(provider: &dyn SurfaceProvider, device: &dyn GraphicsDevice) -> bool {
    let mut guard = PROCESS_DEVICES.lock();
    let devices = guard.get_or_insert_with(ProcessDevices::default);

    if let Some(&available) = devices.multisample.get(device.connection()) {
        return available;
    }
    let available = provider.multisample_available(device);
    devices
        .multisample
        .insert(device.connection().to_owned(), available);
    available
}

/// Whether the process-wide state has been initialized and not shut down.
pub fn is_initialized() -> bool {
    PROCESS_DEVICES.lock().is_some()
}

/// Closes the default device and clears all cached query results.
///
/// Returns `true` if an open default device was closed. Later calls to
/// [`default_device`] open a fresh connection.
pub fn shutdown() -> bool {
    let Some(devices) = PROCESS_DEVICES.lock().take() else {
        return false;
    };
    match devices.default {
        Some(device) => {
            tracing::debug!("closing default graphics device {}", device.connection());
            device.close()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capabilities::{AttribList, CapabilityDescriptor},
        chooser::VisualList,
        handle::SurfaceHandle,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // Tests in this module share the process-wide state.
    static SERIAL: Mutex<()> = parking_lot::const_mutex(());

    #[derive(Debug)]
    struct TestDevice {
        open: AtomicBool,
    }

    impl GraphicsDevice for TestDevice {
        fn connection(&self) -> &str {
            ":test"
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn close(&self) -> bool {
            self.open.swap(false, Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct CountingProvider {
        opened: AtomicUsize,
        queried: AtomicUsize,
    }

    impl SurfaceProvider for CountingProvider {
        fn open_device(&self) -> Result<Arc<dyn GraphicsDevice>, NativeError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(TestDevice {
                open: AtomicBool::new(true),
            }))
        }

        fn multisample_available(&self, _device: &dyn GraphicsDevice) -> bool {
            self.queried.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn enumerate_visuals(
            &self,
            _device: &dyn GraphicsDevice,
            _attribs: &AttribList,
        ) -> Result<VisualList, NativeError> {
            Ok(VisualList::new(Vec::new(), None))
        }

        fn create_surface(
            &self,
            _device: &dyn GraphicsDevice,
            _caps: &CapabilityDescriptor,
            _width: u32,
            _height: u32,
        ) -> Result<SurfaceHandle, NativeError> {
            Ok(SurfaceHandle(1))
        }

        fn resize_surface(
            &self,
            _device: &dyn GraphicsDevice,
            existing: SurfaceHandle,
            _width: u32,
            _height: u32,
        ) -> Result<SurfaceHandle, NativeError> {
            Ok(existing)
        }

        fn release_surface(&self, _device: &dyn GraphicsDevice, _surface: SurfaceHandle) {}

        fn swap_buffers(&self, _surface: SurfaceHandle) -> Result<(), NativeError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_device_opens_once() {
        let _serial = SERIAL.lock();
        shutdown();
        let provider = CountingProvider::default();

        let first = default_device(&provider).unwrap();
        let second = default_device(&provider).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.opened.load(Ordering::SeqCst), 1);
        assert!(is_initialized());

        assert!(shutdown());
        assert!(!first.is_open());
        assert!(!is_initialized());
    }

    #[test]
    fn test_closed_default_device_is_reopened() {
        let _serial = SERIAL.lock();
        shutdown();
        let provider = CountingProvider::default();

        let first = default_device(&provider).unwrap();
        first.close();
        let second = default_device(&provider).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(provider.opened.load(Ordering::SeqCst), 2);
        shutdown();
    }

    #[test]
    fn test_multisample_query_is_cached_until_shutdown() {
        let _serial = SERIAL.lock();
        shutdown();
        let provider = CountingProvider::default();
        let device = default_device(&provider).unwrap();

        assert!(multisample_available(&provider, device.as_ref()));
        assert!(multisample_available(&provider, device.as_ref()));
        assert_eq!(provider.queried.load(Ordering::SeqCst), 1);

        shutdown();
        assert!(multisample_available(&provider, device.as_ref()));
        assert_eq!(provider.queried.load(Ordering::SeqCst), 2);
        shutdown();
    }
}
