//! Drawable creation.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use vitrine_core::profiling::profile_function;
use vitrine_native::{
    CapabilitiesChooser, CapabilityDescriptor, DefaultCapabilitiesChooser,
    GraphicsDevice, NativeError, choose_capabilities, device,
};

use crate::{
    auto_drawable::AutoDrawable,
    drawable::{Drawable, NativeProviders},
    error::RenderResult,
    threading::{Inline, ThreadingStrategy, run_blocking},
};

/// Creates drawables for one platform.
///
/// Capability queries and native surface creation go through the factory's
/// [`ThreadingStrategy`].
pub struct DrawableFactory {
    providers: NativeProviders,
    chooser: Arc<dyn CapabilitiesChooser>,
    threading: Arc<dyn ThreadingStrategy>,
    offscreen_support: Mutex<AHashMap<String, bool>>,
}

impl DrawableFactory {
    pub fn new(providers: NativeProviders) -> Self {
        Self {
            providers,
            chooser: Arc::new(DefaultCapabilitiesChooser),
            threading: Arc::new(Inline),
            offscreen_support: Mutex::new(AHashMap::new()),
        }
    }

    pub fn with_chooser(mut self, chooser: Arc<dyn CapabilitiesChooser>) -> Self {
        self.chooser = chooser;
        self
    }

    pub fn with_threading(mut self, threading: Arc<dyn ThreadingStrategy>) -> Self {
        self.threading = threading;
        self
    }

    pub fn providers(&self) -> &NativeProviders {
        &self.providers
    }

    /// The process-wide default device of this factory's platform.
    pub fn default_device(&self) -> RenderResult<Arc<dyn GraphicsDevice>> {
        let surfaces = self.providers.surfaces.clone();
        Ok(run_blocking(self.threading.as_ref(), move || {
            device::default_device(surfaces.as_ref())
        })??)
    }

    /// Chooses the capabilities closest to `desired` on `device`.
    pub fn choose_capabilities(
        &self,
        device: &Arc<dyn GraphicsDevice>,
        desired: &CapabilityDescriptor,
    ) -> RenderResult<CapabilityDescriptor> {
        let surfaces = self.providers.surfaces.clone();
        let chooser = self.chooser.clone();
        let device = device.clone();
        let desired = *desired;
        Ok(run_blocking(self.threading.as_ref(), move || {
            choose_capabilities(surfaces.as_ref(), device.as_ref(), &desired, chooser.as_ref())
        })??)
    }

    /// Whether offscreen surfaces can be created on `device`. Cached per
    /// connection.
    pub fn can_create_offscreen(&self, device: &dyn GraphicsDevice) -> bool {
        let mut cache = self.offscreen_support.lock();
        if let Some(&supported) = cache.get(device.connection()) {
            return supported;
        }
        let supported = self.providers.surfaces.supports_offscreen(device);
        cache.insert(device.connection().to_owned(), supported);
        supported
    }

    /// An unrealized onscreen drawable.
    pub fn create_onscreen_drawable(
        &self,
        device: &Arc<dyn GraphicsDevice>,
        desired: &CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> RenderResult<Drawable> {
        profile_function!();
        let caps = self.choose_capabilities(device, &desired.with_onscreen(true))?;
        Ok(Drawable::new(self.providers.clone(), device.clone(), caps, width, height))
    }

    /// A realized offscreen drawable.
    pub fn create_offscreen_drawable(
        &self,
        device: &Arc<dyn GraphicsDevice>,
        desired: &CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> RenderResult<Drawable> {
        profile_function!();
        if !self.can_create_offscreen(device.as_ref()) {
            return Err(NativeError::SurfaceCreation(format!(
                "offscreen surfaces are not supported on {}",
                device.connection()
            ))
            .into());
        }
        let caps = self.choose_capabilities(device, &desired.with_onscreen(false))?;
        let drawable = Drawable::new(self.providers.clone(), device.clone(), caps, width, height);
        run_blocking(self.threading.as_ref(), move || {
            let mut drawable = drawable;
            drawable.set_realized(true).map(|_| drawable)
        })?
    }

    /// A controller bound to a realized offscreen drawable on its own
    /// device, which the controller closes when destroyed.
    pub fn create_offscreen_auto_drawable(
        &self,
        desired: &CapabilityDescriptor,
        width: u32,
        height: u32,
        share_with: Option<&AutoDrawable>,
    ) -> RenderResult<AutoDrawable> {
        profile_function!();
        let surfaces = self.providers.surfaces.clone();
        let device = run_blocking(self.threading.as_ref(), move || surfaces.open_device())??;

        let created = self
            .create_offscreen_drawable(&device, desired, width, height)
            .and_then(|drawable| {
                let auto = AutoDrawable::new();
                auto.bind(drawable, None, true)?;
                let context = auto.create_context(share_with)?;
                auto.set_context(context, false)?;
                Ok(auto)
            });
        if created.is_err() {
            device.close();
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RenderError, threading::DedicatedThread};
    use vitrine_native::{ColorBits, SurfaceProvider};
    use vitrine_test_utils::{MockProviders, NativeCall, mock_providers};

    fn factory() -> (DrawableFactory, MockProviders) {
        let mocks = mock_providers();
        let providers = NativeProviders::new(mocks.surfaces.clone(), mocks.contexts.clone());
        (DrawableFactory::new(providers), mocks)
    }

    #[test]
    fn test_low_color_depth_rejected_before_enumeration() {
        let (factory, mocks) = factory();
        let device = mocks.surfaces.open_device().unwrap();
        let desired = CapabilityDescriptor::default().with_color(ColorBits::new(4, 4, 4, 0));

        let result = factory.choose_capabilities(&device, &desired);
        assert!(matches!(
            result,
            Err(RenderError::Native(NativeError::InsufficientColorDepth { bits: 12, .. }))
        ));
        assert_eq!(mocks.surfaces.count_enumerations(), 0);
    }

    #[test]
    fn test_visuals_released_after_choice() {
        let (factory, mocks) = factory();
        let device = mocks.surfaces.open_device().unwrap();
        factory
            .choose_capabilities(&device, &CapabilityDescriptor::default())
            .unwrap();
        assert_eq!(mocks.surfaces.count_visual_releases(), 1);
    }

    #[test]
    fn test_visuals_released_after_failed_choice() {
        let (factory, mocks) = factory();
        mocks.surfaces.set_visuals(vec![None, None], None);
        let device = mocks.surfaces.open_device().unwrap();

        let result = factory.choose_capabilities(&device, &CapabilityDescriptor::default());
        assert!(matches!(
            result,
            Err(RenderError::Native(NativeError::NoUsableVisual(2)))
        ));
        assert_eq!(mocks.surfaces.count_visual_releases(), 1);
    }

    #[test]
    fn test_offscreen_support_is_cached() {
        let (factory, mocks) = factory();
        let device = mocks.surfaces.open_device().unwrap();
        assert!(factory.can_create_offscreen(device.as_ref()));

        mocks.surfaces.set_supports_offscreen(false);
        assert!(factory.can_create_offscreen(device.as_ref()));
    }

    #[test]
    fn test_offscreen_drawable_is_realized() {
        let (factory, mocks) = factory();
        let device = mocks.surfaces.open_device().unwrap();
        let drawable = factory
            .create_offscreen_drawable(&device, &CapabilityDescriptor::default(), 32, 32)
            .unwrap();
        assert!(drawable.is_realized());
        assert!(!drawable.is_onscreen());
        assert_eq!(mocks.surfaces.live_surfaces(), vec![drawable.handle().unwrap()]);
    }

    #[test]
    fn test_offscreen_auto_drawable_owns_device() {
        let (factory, mocks) = factory();
        let auto = factory
            .create_offscreen_auto_drawable(&CapabilityDescriptor::default(), 20, 10, None)
            .unwrap();
        assert!(auto.owns_device());
        assert!(auto.is_realized());
        assert!(auto.is_reshape_pending());

        auto.display().unwrap();
        assert!(auto.is_context_created());
        auto.destroy().unwrap();
        let closed = mocks
            .log
            .count(|call| matches!(call, NativeCall::CloseDevice { .. }));
        assert_eq!(closed, 1);
    }

    #[test]
    fn test_native_work_runs_on_dedicated_thread() {
        let (factory, mocks) = factory();
        let worker = Arc::new(DedicatedThread::spawn("vitrine-factory-test").unwrap());
        let factory = factory.with_threading(worker);
        let device = mocks.surfaces.open_device().unwrap();

        let drawable = factory
            .create_offscreen_drawable(&device, &CapabilityDescriptor::default(), 8, 8)
            .unwrap();
        assert!(drawable.is_realized());
    }
}
