//! Mock implementations of the native surface and context contracts.
//!
//! The providers never touch a window system. They hand out increasing fake
//! handles and append every call to a shared [`CallLog`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use vitrine_native::{
    AttribList, CapabilityDescriptor, ContextFlags, ContextHandle, ContextProvider, GlStateBlob,
    GraphicsDevice, NativeError, SurfaceHandle, SurfaceProvider, VisualList,
};

/// Records a native call for verification in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    OpenDevice {
        connection: String,
    },
    CloseDevice {
        connection: String,
    },
    EnumerateVisuals {
        count: usize,
    },
    ReleaseVisuals,
    CreateSurface {
        handle: SurfaceHandle,
        width: u32,
        height: u32,
    },
    ResizeSurface {
        from: SurfaceHandle,
        to: SurfaceHandle,
        width: u32,
        height: u32,
    },
    ReleaseSurface {
        handle: SurfaceHandle,
    },
    SwapBuffers {
        handle: SurfaceHandle,
    },
    CreateContext {
        handle: ContextHandle,
        surface: SurfaceHandle,
        share_with: Option<ContextHandle>,
        flags: ContextFlags,
    },
    MakeCurrent {
        context: ContextHandle,
        surface: SurfaceHandle,
    },
    ReleaseContext {
        context: ContextHandle,
    },
    DestroyContext {
        context: ContextHandle,
    },
    CaptureState {
        context: ContextHandle,
    },
    RestoreState {
        context: ContextHandle,
    },
    AnimatorPause {
        was_animating: bool,
    },
    AnimatorResume,
    /// Free-form marker pushed by test code, e.g. from a listener.
    Marker(String),
}

/// A cloneable, thread-safe list of [`NativeCall`]s.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<NativeCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: NativeCall) {
        self.calls.lock().push(call);
    }

    /// Pushes a [`NativeCall::Marker`].
    pub fn mark(&self, marker: impl Into<String>) {
        self.push(NativeCall::Marker(marker.into()));
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().clone()
    }

    pub fn contains(&self, call: &NativeCall) -> bool {
        self.calls.lock().contains(call)
    }

    /// Counts the calls matching a predicate.
    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Position of the first call matching a predicate.
    pub fn position(&self, predicate: impl Fn(&NativeCall) -> bool) -> Option<usize> {
        self.calls.lock().iter().position(|call| predicate(call))
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Mock graphics device connection.
#[derive(Debug)]
pub struct MockDevice {
    connection: String,
    open: AtomicBool,
    closes: AtomicUsize,
    log: CallLog,
}

impl MockDevice {
    pub fn new(connection: impl Into<String>, log: CallLog) -> Self {
        Self {
            connection: connection.into(),
            open: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
            log,
        }
    }

    /// Number of `close` calls that closed an open connection.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl GraphicsDevice for MockDevice {
    fn connection(&self) -> &str {
        &self.connection
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::SeqCst);
        if was_open {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.log.push(NativeCall::CloseDevice {
                connection: self.connection.clone(),
            });
        }
        was_open
    }
}

/// Mock surface provider.
///
/// # Example
///
/// ```rust
/// use vitrine_native::{CapabilityDescriptor, SurfaceProvider};
/// use vitrine_test_utils::MockSurfaceProvider;
///
/// let surfaces = MockSurfaceProvider::new();
/// let device = surfaces.open_device().unwrap();
/// let caps = CapabilityDescriptor::default();
///
/// let a = surfaces.create_surface(device.as_ref(), &caps, 32, 32).unwrap();
/// let b = surfaces.resize_surface(device.as_ref(), a, 64, 64).unwrap();
///
/// assert_ne!(a, b);
/// assert_eq!(surfaces.live_surfaces(), vec![b]);
/// ```
pub struct MockSurfaceProvider {
    log: CallLog,
    next_handle: AtomicU64,
    next_device: AtomicUsize,
    visuals: Mutex<(Vec<Option<CapabilityDescriptor>>, Option<usize>)>,
    live: Mutex<Vec<SurfaceHandle>>,
    multisample: AtomicBool,
    offscreen: AtomicBool,
    gl_oriented: AtomicBool,
    resize_replaces_handle: AtomicBool,
    fail_create: AtomicBool,
    fail_swap: AtomicBool,
    enumeration_error: Mutex<Option<String>>,
}

impl MockSurfaceProvider {
    /// Create a new mock surface provider with its own call log.
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            next_handle: AtomicU64::new(0x100),
            next_device: AtomicUsize::new(0),
            visuals: Mutex::new((vec![Some(CapabilityDescriptor::default())], Some(0))),
            live: Mutex::new(Vec::new()),
            multisample: AtomicBool::new(true),
            offscreen: AtomicBool::new(true),
            gl_oriented: AtomicBool::new(true),
            resize_replaces_handle: AtomicBool::new(true),
            fail_create: AtomicBool::new(false),
            fail_swap: AtomicBool::new(false),
            enumeration_error: Mutex::new(None),
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Replaces the visuals returned by `enumerate_visuals`.
    pub fn set_visuals(&self, visuals: Vec<Option<CapabilityDescriptor>>, recommended: Option<usize>) {
        *self.visuals.lock() = (visuals, recommended);
    }

    pub fn set_enumeration_error(&self, error: Option<&str>) {
        *self.enumeration_error.lock() = error.map(str::to_owned);
    }

    pub fn set_multisample_available(&self, available: bool) {
        self.multisample.store(available, Ordering::SeqCst);
    }

    pub fn set_supports_offscreen(&self, supported: bool) {
        self.offscreen.store(supported, Ordering::SeqCst);
    }

    pub fn set_gl_oriented(&self, oriented: bool) {
        self.gl_oriented.store(oriented, Ordering::SeqCst);
    }

    /// Whether resizing hands out a new handle (the default) or keeps it.
    pub fn set_resize_replaces_handle(&self, replaces: bool) {
        self.resize_replaces_handle.store(replaces, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_swap(&self, fail: bool) {
        self.fail_swap.store(fail, Ordering::SeqCst);
    }

    /// Surfaces created and not yet released, in creation order.
    pub fn live_surfaces(&self) -> Vec<SurfaceHandle> {
        self.live.lock().clone()
    }

    pub fn count_surface_creates(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::CreateSurface { .. }))
    }

    pub fn count_surface_releases(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::ReleaseSurface { .. }))
    }

    pub fn count_enumerations(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::EnumerateVisuals { .. }))
    }

    pub fn count_visual_releases(&self) -> usize {
        self.log.count(|call| matches!(call, NativeCall::ReleaseVisuals))
    }

    pub fn count_swaps(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::SwapBuffers { .. }))
    }

    fn allocate(&self) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.live.lock().push(handle);
        handle
    }

    fn forget(&self, handle: SurfaceHandle) {
        self.live.lock().retain(|&live| live != handle);
    }
}

impl Default for MockSurfaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceProvider for MockSurfaceProvider {
    fn open_device(&self) -> Result<Arc<dyn GraphicsDevice>, NativeError> {
        let connection = format!(":mock.{}", self.next_device.fetch_add(1, Ordering::SeqCst));
        self.log.push(NativeCall::OpenDevice {
            connection: connection.clone(),
        });
        Ok(Arc::new(MockDevice::new(connection, self.log.clone())))
    }

    fn multisample_available(&self, _device: &dyn GraphicsDevice) -> bool {
        self.multisample.load(Ordering::SeqCst)
    }

    fn supports_offscreen(&self, _device: &dyn GraphicsDevice) -> bool {
        self.offscreen.load(Ordering::SeqCst)
    }

    fn enumerate_visuals(
        &self,
        _device: &dyn GraphicsDevice,
        _attribs: &AttribList,
    ) -> Result<VisualList, NativeError> {
        if let Some(error) = self.enumeration_error.lock().clone() {
            return Err(NativeError::VisualEnumeration(error));
        }
        let (visuals, recommended) = self.visuals.lock().clone();
        self.log.push(NativeCall::EnumerateVisuals {
            count: visuals.len(),
        });
        let log = self.log.clone();
        Ok(VisualList::new(visuals, recommended).with_release(move || log.push(NativeCall::ReleaseVisuals)))
    }

    fn create_surface(
        &self,
        _device: &dyn GraphicsDevice,
        _caps: &CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(NativeError::SurfaceCreation("mock surface creation disabled".into()));
        }
        let handle = self.allocate();
        self.log.push(NativeCall::CreateSurface {
            handle,
            width,
            height,
        });
        Ok(handle)
    }

    fn resize_surface(
        &self,
        _device: &dyn GraphicsDevice,
        existing: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(NativeError::SurfaceCreation("mock surface creation disabled".into()));
        }
        let to = if self.resize_replaces_handle.load(Ordering::SeqCst) {
            self.forget(existing);
            self.allocate()
        } else {
            existing
        };
        self.log.push(NativeCall::ResizeSurface {
            from: existing,
            to,
            width,
            height,
        });
        Ok(to)
    }

    fn release_surface(&self, _device: &dyn GraphicsDevice, surface: SurfaceHandle) {
        self.forget(surface);
        self.log.push(NativeCall::ReleaseSurface { handle: surface });
    }

    fn swap_buffers(&self, surface: SurfaceHandle) -> Result<(), NativeError> {
        if self.fail_swap.load(Ordering::SeqCst) {
            return Err(NativeError::SwapBuffers("mock swap disabled".into()));
        }
        self.log.push(NativeCall::SwapBuffers { handle: surface });
        Ok(())
    }

    fn is_gl_oriented(&self, _caps: &CapabilityDescriptor) -> bool {
        self.gl_oriented.load(Ordering::SeqCst)
    }
}

/// State blob produced by [`MockContextProvider::capture_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockGlState {
    pub captured_from: ContextHandle,
}

/// Mock context provider.
pub struct MockContextProvider {
    log: CallLog,
    next_handle: AtomicU64,
    current: Mutex<Vec<(ThreadId, ContextHandle)>>,
    restored: Mutex<Vec<MockGlState>>,
    fail_create: AtomicBool,
    fail_make_current: AtomicBool,
}

impl MockContextProvider {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            next_handle: AtomicU64::new(0x1000),
            current: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_make_current: AtomicBool::new(false),
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_make_current(&self, fail: bool) {
        self.fail_make_current.store(fail, Ordering::SeqCst);
    }

    /// The context current on the calling thread, if any.
    pub fn current_context(&self) -> Option<ContextHandle> {
        let me = thread::current().id();
        self.current
            .lock()
            .iter()
            .find(|(thread, _)| *thread == me)
            .map(|&(_, context)| context)
    }

    /// State blobs restored so far, in order.
    pub fn restored_states(&self) -> Vec<MockGlState> {
        self.restored.lock().clone()
    }

    pub fn count_context_creates(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::CreateContext { .. }))
    }

    pub fn count_make_current(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::MakeCurrent { .. }))
    }

    pub fn count_context_destroys(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::DestroyContext { .. }))
    }
}

impl Default for MockContextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for MockContextProvider {
    fn create_context(
        &self,
        surface: SurfaceHandle,
        _caps: &CapabilityDescriptor,
        share_with: Option<ContextHandle>,
        flags: ContextFlags,
    ) -> Result<ContextHandle, NativeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(NativeError::ContextCreation("mock context creation disabled".into()));
        }
        let handle = ContextHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.log.push(NativeCall::CreateContext {
            handle,
            surface,
            share_with,
            flags,
        });
        Ok(handle)
    }

    fn make_current(&self, context: ContextHandle, surface: SurfaceHandle) -> Result<(), NativeError> {
        if self.fail_make_current.load(Ordering::SeqCst) {
            return Err(NativeError::MakeCurrent("mock make current disabled".into()));
        }
        let me = thread::current().id();
        let mut current = self.current.lock();
        current.retain(|(thread, _)| *thread != me);
        current.push((me, context));
        self.log.push(NativeCall::MakeCurrent { context, surface });
        Ok(())
    }

    fn release(&self, context: ContextHandle) -> Result<(), NativeError> {
        let me = thread::current().id();
        self.current
            .lock()
            .retain(|&(thread, current)| !(thread == me && current == context));
        self.log.push(NativeCall::ReleaseContext { context });
        Ok(())
    }

    fn destroy_context(&self, context: ContextHandle) -> Result<(), NativeError> {
        self.current.lock().retain(|&(_, current)| current != context);
        self.log.push(NativeCall::DestroyContext { context });
        Ok(())
    }

    fn capture_state(&self, context: ContextHandle) -> Option<GlStateBlob> {
        self.log.push(NativeCall::CaptureState { context });
        Some(GlStateBlob::new(MockGlState {
            captured_from: context,
        }))
    }

    fn restore_state(&self, context: ContextHandle, state: GlStateBlob) -> Result<(), NativeError> {
        if let Some(state) = state.downcast_ref::<MockGlState>() {
            self.restored.lock().push(*state);
        }
        self.log.push(NativeCall::RestoreState { context });
        Ok(())
    }
}

/// Surface and context providers sharing one call log.
pub struct MockProviders {
    pub log: CallLog,
    pub surfaces: Arc<MockSurfaceProvider>,
    pub contexts: Arc<MockContextProvider>,
}

/// Creates mock providers sharing one call log.
pub fn mock_providers() -> MockProviders {
    let log = CallLog::new();
    MockProviders {
        surfaces: Arc::new(MockSurfaceProvider::with_log(log.clone())),
        contexts: Arc::new(MockContextProvider::with_log(log.clone())),
        log,
    }
}
