//! Shared fixtures for the controller integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use vitrine_native::{CapabilityDescriptor, ContextFlags, SurfaceProvider};
use vitrine_render::{AutoDrawable, Drawable, ListenerError, NativeProviders, RenderListener, SharedListener};
use vitrine_test_utils::{CallLog, MockProviders, NativeCall, mock_providers};

// ============================================================================
// Recording listener
// ============================================================================

/// Pushes a `name:callback` marker into the shared call log for every
/// callback it receives.
pub struct RecordingListener {
    name: &'static str,
    log: CallLog,
    pub fail_display: AtomicBool,
    pub fail_dispose: AtomicBool,
}

impl RecordingListener {
    pub fn new(name: &'static str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_display: AtomicBool::new(false),
            fail_dispose: AtomicBool::new(false),
        })
    }

    pub fn shared(self: &Arc<Self>) -> SharedListener {
        self.clone()
    }
}

impl RenderListener for RecordingListener {
    fn init(&self, _drawable: &AutoDrawable) -> Result<(), ListenerError> {
        self.log.mark(format!("{}:init", self.name));
        Ok(())
    }

    fn display(&self, _drawable: &AutoDrawable) -> Result<(), ListenerError> {
        if self.fail_display.load(Ordering::SeqCst) {
            return Err(format!("{} refused to display", self.name).into());
        }
        self.log.mark(format!("{}:display", self.name));
        Ok(())
    }

    fn reshape(
        &self,
        _drawable: &AutoDrawable,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<(), ListenerError> {
        self.log
            .mark(format!("{}:reshape {},{},{},{}", self.name, x, y, width, height));
        Ok(())
    }

    fn dispose(&self, _drawable: &AutoDrawable) -> Result<(), ListenerError> {
        self.log.mark(format!("{}:dispose", self.name));
        if self.fail_dispose.load(Ordering::SeqCst) {
            return Err(format!("{} refused to dispose", self.name).into());
        }
        Ok(())
    }
}

/// Every marker in the log, in order.
pub fn markers(log: &CallLog) -> Vec<String> {
    log.calls()
        .into_iter()
        .filter_map(|call| match call {
            NativeCall::Marker(marker) => Some(marker),
            _ => None,
        })
        .collect()
}

/// Position of the first call matching `predicate`, panicking if absent.
pub fn position_of(log: &CallLog, predicate: impl Fn(&NativeCall) -> bool) -> usize {
    log.position(predicate).expect("call not recorded")
}

/// How often `marker` was recorded.
pub fn marker_count(log: &CallLog, marker: &str) -> usize {
    log.count(|call| matches!(call, NativeCall::Marker(m) if m == marker))
}

/// Polls `condition` until it holds, panicking after five seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

pub fn marker_position(log: &CallLog, marker: &str) -> usize {
    position_of(log, |call| matches!(call, NativeCall::Marker(m) if m == marker))
}

// ============================================================================
// Drawable fixtures
// ============================================================================

/// An unrealized drawable with an uncreated context, bound to a fresh
/// controller that owns the device.
pub fn bound(caps: CapabilityDescriptor, width: u32, height: u32) -> (AutoDrawable, MockProviders) {
    let mocks = mock_providers();
    let auto = AutoDrawable::new();
    rebind(&auto, &mocks, caps, width, height, true);
    (auto, mocks)
}

/// A realized onscreen drawable.
pub fn realized(width: u32, height: u32) -> (AutoDrawable, MockProviders) {
    let (auto, mocks) = bound(CapabilityDescriptor::default(), width, height);
    auto.set_realized(true).unwrap();
    (auto, mocks)
}

/// A realized offscreen drawable.
pub fn realized_offscreen(width: u32, height: u32) -> (AutoDrawable, MockProviders) {
    let caps = CapabilityDescriptor::default().with_onscreen(false);
    let (auto, mocks) = bound(caps, width, height);
    auto.set_realized(true).unwrap();
    (auto, mocks)
}

/// Binds a new drawable and context, opened on a new mock device.
pub fn rebind(
    auto: &AutoDrawable,
    mocks: &MockProviders,
    caps: CapabilityDescriptor,
    width: u32,
    height: u32,
    owns_device: bool,
) {
    let device = mocks.surfaces.open_device().unwrap();
    let providers = NativeProviders::new(mocks.surfaces.clone(), mocks.contexts.clone());
    let drawable = Drawable::new(providers, device, caps, width, height);
    let context = drawable.create_context(None, ContextFlags::empty()).unwrap();
    auto.bind(drawable, Some(context), owns_device).unwrap();
}
