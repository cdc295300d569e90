use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use vitrine_native::{
    AttribList, CapabilityDescriptor, ColorBits, ContextFlags, ContextHandle, ContextProvider,
    GlStateBlob, GraphicsDevice, NativeError, SurfaceAttrib, SurfaceHandle, SurfaceProvider,
    VisualList,
};

use crate::drawable::NativeProviders;

/// Color format of every offscreen target.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Sample counts wgpu guarantees for multisampled render targets.
const MSAA_SAMPLES: u8 = 4;

/// (depth bits, stencil bits) combinations offered as visuals.
const DEPTH_STENCIL: [(u8, u8); 3] = [(0, 0), (24, 0), (24, 8)];

type Targets = Arc<RwLock<AHashMap<SurfaceHandle, Arc<OffscreenTarget>>>>;

/// The wgpu instance, adapter, device and queue shared by every connection.
pub struct WgpuGpu {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl WgpuGpu {
    /// Creates a GPU connection asynchronously.
    pub async fn new() -> Result<Arc<Self>, NativeError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| NativeError::DeviceUnavailable(err.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vitrine"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(|err| NativeError::DeviceUnavailable(err.to_string()))?;

        tracing::info!("created wgpu device on {}", adapter.get_info().name);
        Ok(Arc::new(Self {
            instance,
            adapter,
            device,
            queue,
        }))
    }

    /// Creates a GPU connection, blocking the current thread.
    ///
    /// See [`WgpuGpu::new`] for the asynchronous version.
    pub fn new_sync() -> Result<Arc<Self>, NativeError> {
        pollster::block_on(Self::new())
    }

    fn supports_msaa(&self) -> bool {
        self.adapter
            .get_texture_format_features(COLOR_FORMAT)
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_X4)
    }

    fn is_hardware(&self) -> bool {
        self.adapter.get_info().device_type != wgpu::DeviceType::Cpu
    }
}

/// One connection handed out by [`WgpuSurfaceProvider::open_device`].
///
/// Connections share the underlying [`WgpuGpu`]. Closing one only stops it
/// from allocating new surfaces.
pub struct WgpuDevice {
    connection: String,
    gpu: Arc<WgpuGpu>,
    open: AtomicBool,
}

impl WgpuDevice {
    pub fn gpu(&self) -> &Arc<WgpuGpu> {
        &self.gpu
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("connection", &self.connection)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl GraphicsDevice for WgpuDevice {
    fn connection(&self) -> &str {
        &self.connection
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

/// The textures behind one offscreen surface handle.
pub struct OffscreenTarget {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub msaa_view: Option<wgpu::TextureView>,
    pub depth_view: Option<wgpu::TextureView>,
    pub caps: CapabilityDescriptor,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

impl OffscreenTarget {
    fn new(gpu: &WgpuGpu, caps: &CapabilityDescriptor, width: u32, height: u32) -> Result<Self, NativeError> {
        let max = gpu.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(NativeError::SurfaceCreation(format!(
                "{}x{} exceeds the maximum texture size {}",
                width, height, max
            )));
        }
        let sample_count = match (caps.sample_buffers, caps.num_samples) {
            (false, _) => 1,
            (true, MSAA_SAMPLES) => MSAA_SAMPLES as u32,
            (true, samples) => {
                return Err(NativeError::SurfaceCreation(format!(
                    "unsupported sample count {}",
                    samples
                )));
            }
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color_texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Vitrine Offscreen Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (sample_count > 1).then(|| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Vitrine Offscreen MSAA"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: COLOR_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth_view = (caps.depth_bits > 0 || caps.stencil_bits > 0).then(|| {
            let format = if caps.stencil_bits > 0 {
                wgpu::TextureFormat::Depth24PlusStencil8
            } else {
                wgpu::TextureFormat::Depth24Plus
            };
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Vitrine Offscreen Depth"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        Ok(Self {
            color_texture,
            color_view,
            msaa_view,
            depth_view,
            caps: *caps,
            width,
            height,
            sample_count,
        })
    }
}

/// Allocates offscreen render-target textures as native surfaces.
pub struct WgpuSurfaceProvider {
    gpu: Arc<WgpuGpu>,
    targets: Targets,
    next_handle: AtomicU64,
    next_connection: AtomicU64,
}

impl WgpuSurfaceProvider {
    fn new(gpu: Arc<WgpuGpu>, targets: Targets) -> Self {
        Self {
            gpu,
            targets,
            next_handle: AtomicU64::new(1),
            next_connection: AtomicU64::new(0),
        }
    }

    /// The textures behind `surface`, while it is alive.
    pub fn target(&self, surface: SurfaceHandle) -> Option<Arc<OffscreenTarget>> {
        self.targets.read().get(&surface).cloned()
    }

    pub fn live_surfaces(&self) -> usize {
        self.targets.read().len()
    }

    fn allocate(
        &self,
        device: &dyn GraphicsDevice,
        caps: &CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError> {
        if !device.is_open() {
            return Err(NativeError::DeviceUnavailable(device.connection().to_owned()));
        }
        let target = OffscreenTarget::new(&self.gpu, caps, width, height)?;
        let handle = SurfaceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.targets.write().insert(handle, Arc::new(target));
        Ok(handle)
    }
}

fn requested_visual(attribs: &AttribList) -> (u8, u8, u8) {
    let (mut depth, mut stencil, mut samples) = (0, 0, 0);
    for attrib in attribs {
        match *attrib {
            SurfaceAttrib::DepthSize(bits) => depth = bits,
            SurfaceAttrib::StencilSize(bits) => stencil = bits,
            SurfaceAttrib::Samples(count) => samples = count,
            _ => {}
        }
    }
    (depth, stencil, samples)
}

impl SurfaceProvider for WgpuSurfaceProvider {
    fn open_device(&self) -> Result<Arc<dyn GraphicsDevice>, NativeError> {
        let connection = format!(
            "wgpu:{}#{}",
            self.gpu.adapter.get_info().name,
            self.next_connection.fetch_add(1, Ordering::Relaxed)
        );
        Ok(Arc::new(WgpuDevice {
            connection,
            gpu: self.gpu.clone(),
            open: AtomicBool::new(true),
        }))
    }

    fn multisample_available(&self, _device: &dyn GraphicsDevice) -> bool {
        self.gpu.supports_msaa()
    }

    fn enumerate_visuals(
        &self,
        device: &dyn GraphicsDevice,
        attribs: &AttribList,
    ) -> Result<VisualList, NativeError> {
        if !device.is_open() {
            return Err(NativeError::DeviceUnavailable(device.connection().to_owned()));
        }

        let mut sample_counts = vec![0];
        if self.gpu.supports_msaa() {
            sample_counts.push(MSAA_SAMPLES);
        }
        let hardware = self.gpu.is_hardware();
        let visuals: Vec<CapabilityDescriptor> = sample_counts
            .iter()
            .flat_map(|&samples| {
                DEPTH_STENCIL.iter().map(move |&(depth, stencil)| {
                    CapabilityDescriptor::new()
                        .with_color(ColorBits::new(8, 8, 8, 8))
                        .with_depth_bits(depth)
                        .with_stencil_bits(stencil)
                        .with_double_buffered(false)
                        .with_samples(samples)
                        .with_hardware_accelerated(hardware)
                        .with_onscreen(false)
                })
            })
            .collect();

        let (depth, stencil, samples) = requested_visual(attribs);
        let recommended = visuals.iter().position(|visual| {
            let samples_match = if samples == 0 {
                !visual.sample_buffers
            } else {
                visual.sample_buffers && visual.num_samples == samples
            };
            visual.depth_bits >= depth && visual.stencil_bits >= stencil && samples_match
        });
        tracing::trace!("offering {} wgpu visuals, recommended {:?}", visuals.len(), recommended);
        Ok(VisualList::new(visuals.into_iter().map(Some).collect(), recommended))
    }

    fn create_surface(
        &self,
        device: &dyn GraphicsDevice,
        caps: &CapabilityDescriptor,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError> {
        if caps.onscreen {
            return Err(NativeError::SurfaceCreation(
                "the wgpu backend only provides offscreen surfaces".into(),
            ));
        }
        self.allocate(device, caps, width, height)
    }

    /// Textures cannot grow in place, so every resize hands out a new handle.
    fn resize_surface(
        &self,
        device: &dyn GraphicsDevice,
        existing: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, NativeError> {
        let Some(previous) = self.target(existing) else {
            return Err(NativeError::SurfaceCreation(format!("unknown surface {:?}", existing)));
        };
        let handle = self.allocate(device, &previous.caps, width, height)?;
        self.targets.write().remove(&existing);
        Ok(handle)
    }

    fn release_surface(&self, _device: &dyn GraphicsDevice, surface: SurfaceHandle) {
        self.targets.write().remove(&surface);
    }

    /// Offscreen targets have no back buffer; pending work is submitted.
    fn swap_buffers(&self, surface: SurfaceHandle) -> Result<(), NativeError> {
        if !self.targets.read().contains_key(&surface) {
            return Err(NativeError::SwapBuffers(format!("unknown surface {:?}", surface)));
        }
        self.gpu.queue.submit(std::iter::empty());
        Ok(())
    }

    fn is_gl_oriented(&self, _caps: &CapabilityDescriptor) -> bool {
        false
    }
}

/// Per-context state that survives a pull/push cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextState {
    pub clear_color: wgpu::Color,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
        }
    }
}

struct ContextRecord {
    flags: ContextFlags,
    share_with: Option<ContextHandle>,
    state: ContextState,
}

/// The target bound to the calling thread, passed to
/// [`WgpuContextProvider::with_current`].
pub struct CurrentTarget<'a> {
    pub gpu: &'a WgpuGpu,
    pub target: &'a OffscreenTarget,
    pub state: &'a mut ContextState,
    pub flags: ContextFlags,
}

impl CurrentTarget<'_> {
    /// Clears the target to the context's clear color and submits the pass.
    pub fn clear(&self) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vitrine Clear"),
            });
        let (view, resolve_target) = match self.target.msaa_view.as_ref() {
            Some(msaa) => (msaa, Some(&self.target.color_view)),
            None => (&self.target.color_view, None),
        };
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vitrine Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.state.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: self.target.depth_view.as_ref().map(|depth| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.gpu.queue.submit(Some(encoder.finish()));
    }
}

/// Binds contexts to offscreen targets, one current context per thread.
pub struct WgpuContextProvider {
    gpu: Arc<WgpuGpu>,
    targets: Targets,
    contexts: Mutex<AHashMap<ContextHandle, ContextRecord>>,
    current: Mutex<AHashMap<ThreadId, (ContextHandle, SurfaceHandle)>>,
    next_handle: AtomicU64,
}

impl WgpuContextProvider {
    fn new(gpu: Arc<WgpuGpu>, targets: Targets) -> Self {
        Self {
            gpu,
            targets,
            contexts: Mutex::new(AHashMap::new()),
            current: Mutex::new(AHashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// The context current on the calling thread.
    pub fn current_context(&self) -> Option<ContextHandle> {
        self.current
            .lock()
            .get(&thread::current().id())
            .map(|&(context, _)| context)
    }

    pub fn share_context(&self, context: ContextHandle) -> Option<ContextHandle> {
        self.contexts.lock().get(&context).and_then(|record| record.share_with)
    }

    /// Runs `f` against the target of the context current on the calling
    /// thread. Returns `None` if no context is current.
    ///
    /// Changes to [`CurrentTarget::state`] are stored back into the context.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut CurrentTarget<'_>) -> R) -> Option<R> {
        let (context, surface) = *self.current.lock().get(&thread::current().id())?;
        let target = self.targets.read().get(&surface).cloned()?;
        let (mut state, flags) = {
            let contexts = self.contexts.lock();
            let record = contexts.get(&context)?;
            (record.state, record.flags)
        };

        let mut current = CurrentTarget {
            gpu: &self.gpu,
            target: &target,
            state: &mut state,
            flags,
        };
        let result = f(&mut current);

        if let Some(record) = self.contexts.lock().get_mut(&context) {
            record.state = state;
        }
        Some(result)
    }
}

impl ContextProvider for WgpuContextProvider {
    fn create_context(
        &self,
        surface: SurfaceHandle,
        _caps: &CapabilityDescriptor,
        share_with: Option<ContextHandle>,
        flags: ContextFlags,
    ) -> Result<ContextHandle, NativeError> {
        if !self.targets.read().contains_key(&surface) {
            return Err(NativeError::ContextCreation(format!("unknown surface {:?}", surface)));
        }
        let mut contexts = self.contexts.lock();
        if let Some(share) = share_with.filter(|share| !contexts.contains_key(share)) {
            return Err(NativeError::ContextCreation(format!(
                "share context {:?} does not exist",
                share
            )));
        }

        let handle = ContextHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        contexts.insert(
            handle,
            ContextRecord {
                flags,
                share_with,
                state: ContextState::default(),
            },
        );
        Ok(handle)
    }

    fn make_current(&self, context: ContextHandle, surface: SurfaceHandle) -> Result<(), NativeError> {
        if !self.contexts.lock().contains_key(&context) {
            return Err(NativeError::MakeCurrent(format!("unknown context {:?}", context)));
        }
        if !self.targets.read().contains_key(&surface) {
            return Err(NativeError::MakeCurrent(format!("unknown surface {:?}", surface)));
        }

        let me = thread::current().id();
        let mut current = self.current.lock();
        if current
            .iter()
            .any(|(&thread, &(bound, _))| bound == context && thread != me)
        {
            return Err(NativeError::MakeCurrent(format!(
                "{:?} is current on another thread",
                context
            )));
        }
        current.insert(me, (context, surface));
        Ok(())
    }

    fn release(&self, context: ContextHandle) -> Result<(), NativeError> {
        let me = thread::current().id();
        let mut current = self.current.lock();
        match current.get(&me) {
            Some(&(bound, _)) if bound == context => {
                current.remove(&me);
                Ok(())
            }
            _ => Err(NativeError::Release(format!(
                "{:?} is not current on this thread",
                context
            ))),
        }
    }

    fn destroy_context(&self, context: ContextHandle) -> Result<(), NativeError> {
        self.current.lock().retain(|_, &mut (bound, _)| bound != context);
        self.contexts.lock().remove(&context);
        Ok(())
    }

    fn capture_state(&self, context: ContextHandle) -> Option<GlStateBlob> {
        self.contexts
            .lock()
            .get(&context)
            .map(|record| GlStateBlob::new(record.state))
    }

    fn restore_state(&self, context: ContextHandle, state: GlStateBlob) -> Result<(), NativeError> {
        let Ok(state) = state.downcast::<ContextState>() else {
            tracing::warn!("ignoring foreign state blob for {:?}", context);
            return Ok(());
        };
        if let Some(record) = self.contexts.lock().get_mut(&context) {
            record.state = state;
        }
        Ok(())
    }
}

/// Surface and context providers sharing one GPU and one target table.
pub struct WgpuBackend {
    pub gpu: Arc<WgpuGpu>,
    pub surfaces: Arc<WgpuSurfaceProvider>,
    pub contexts: Arc<WgpuContextProvider>,
}

impl WgpuBackend {
    pub fn new(gpu: Arc<WgpuGpu>) -> Self {
        let targets = Targets::default();
        Self {
            surfaces: Arc::new(WgpuSurfaceProvider::new(gpu.clone(), targets.clone())),
            contexts: Arc::new(WgpuContextProvider::new(gpu.clone(), targets)),
            gpu,
        }
    }

    pub fn new_sync() -> Result<Self, NativeError> {
        Ok(Self::new(WgpuGpu::new_sync()?))
    }

    pub fn providers(&self) -> NativeProviders {
        NativeProviders::new(self.surfaces.clone(), self.contexts.clone())
    }
}
