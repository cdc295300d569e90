//! The drawable lifecycle controller.
//!
//! An [`AutoDrawable`] owns one [`Drawable`] and one [`Context`] and drives
//! them on behalf of three kinds of callers: the application, an optional
//! animation thread, and the window-system callback thread. Every mutating
//! operation runs under one re-entrant lock, so listener callbacks can call
//! back into the controller from within a frame.
//!
//! Window-system notifications that must not block consult the shared
//! [`SurfaceState`] without taking that lock. A destroy request arriving
//! while another thread renders is deferred to the start of the next
//! [`AutoDrawable::display`].

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard};
use vitrine_core::{Config, profiling::profile_function};
use vitrine_native::{
    AnimatorControl, CapabilityDescriptor, ClosePolicy, ContextFlags, ContextHandle, GlStateBlob,
    SurfaceHandle,
};

use crate::{
    context::{Context, MakeCurrent},
    drawable::{Drawable, SurfaceState},
    error::{ListenerError, RenderResult, StateError},
    fps::FpsCounter,
    listener::{ListenerHelper, SharedListener, Task},
    preserve::{PreservedState, StateKeeperListener},
};

/// Lifecycle phase of the bound drawable/context pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing is bound, or the bound drawable is not realized.
    Uninitialized,
    Realized,
    /// Inside a locked [`AutoDrawable::reshape_notify`].
    Reshaping,
    /// The bound pair was destroyed. A new pair can be bound.
    Destroyed,
}

struct Inner {
    // Dropped before the drawable so the context never outlives its target.
    context: Option<Context>,
    drawable: Option<Drawable>,
    owns_device: bool,
    phase: Phase,
    context_flags: ContextFlags,
}

impl Inner {
    fn is_empty(&self) -> bool {
        self.drawable.is_none() && self.context.is_none()
    }

    fn context_created(&self) -> bool {
        self.context.as_ref().is_some_and(Context::is_created)
    }
}

type InnerGuard<'a> = ReentrantMutexGuard<'a, RefCell<Inner>>;

/// Owns a drawable and its context and serializes their lifecycle.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use vitrine_native::{CapabilityDescriptor, ContextFlags, SurfaceProvider};
/// use vitrine_render::{AutoDrawable, Drawable, NativeProviders};
/// # use vitrine_test_utils::mock_providers;
///
/// # let mocks = mock_providers();
/// # let (surfaces, contexts) = (mocks.surfaces.clone(), mocks.contexts.clone());
/// let device = surfaces.open_device()?;
/// let providers = NativeProviders::new(surfaces, contexts);
/// let drawable = Drawable::new(providers, device, CapabilityDescriptor::default(), 800, 600);
/// let context = drawable.create_context(None, ContextFlags::empty())?;
///
/// let auto = AutoDrawable::new();
/// auto.bind(drawable, Some(context), false)?;
/// auto.set_realized(true)?;
/// auto.display()?;
/// assert_eq!(auto.fps().total_frames(), 1);
/// auto.destroy()?;
/// # Ok::<(), vitrine_render::RenderError>(())
/// ```
pub struct AutoDrawable {
    inner: ReentrantMutex<RefCell<Inner>>,
    listeners: ListenerHelper,
    surface: Mutex<Option<Arc<SurfaceState>>>,
    animator: Mutex<Option<Arc<dyn AnimatorControl>>>,
    state_keeper: Mutex<Option<Arc<dyn StateKeeperListener>>>,
    preserved: Mutex<Option<PreservedState>>,
    /// Pushed GL state waiting for a context to be bound.
    orphan_gl_state: Mutex<Option<GlStateBlob>>,
    fps: Mutex<FpsCounter>,
    send_reshape: AtomicBool,
    send_destroy: AtomicBool,
    preserve_at_destroy: AtomicBool,
    auto_swap: AtomicBool,
}

impl AutoDrawable {
    /// An empty controller. Bind a drawable with [`AutoDrawable::bind`].
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                context: None,
                drawable: None,
                owns_device: false,
                phase: Phase::Uninitialized,
                context_flags: ContextFlags::empty(),
            })),
            listeners: ListenerHelper::new(),
            surface: Mutex::new(None),
            animator: Mutex::new(None),
            state_keeper: Mutex::new(None),
            preserved: Mutex::new(None),
            orphan_gl_state: Mutex::new(None),
            fps: Mutex::new(FpsCounter::new(config.fps_update_frames)),
            send_reshape: AtomicBool::new(false),
            send_destroy: AtomicBool::new(false),
            preserve_at_destroy: AtomicBool::new(config.preserve_state_at_destroy),
            auto_swap: AtomicBool::new(true),
        }
    }

    /// Binds a drawable and optionally its context.
    ///
    /// Only an empty or destroyed controller can be bound; the phase restarts
    /// at [`Phase::Uninitialized`], or [`Phase::Realized`] with a reshape
    /// pending if the drawable is already realized. `owns_device` makes this
    /// controller close the drawable's device when destroyed.
    pub fn bind(&self, drawable: Drawable, context: Option<Context>, owns_device: bool) -> RenderResult<()> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if inner.phase != Phase::Destroyed && !inner.is_empty() {
            return Err(StateError::AlreadyBound.into());
        }

        let mut context = context;
        if let Some(context) = context.as_mut() {
            context.set_associated_drawable(Some(drawable.id()));
            self.adopt_orphan_state(context);
        }
        let realized = drawable.is_realized();
        *self.surface.lock() = Some(drawable.surface_state().clone());
        tracing::debug!("binding {:?} (owns device: {})", drawable, owns_device);

        inner.context = context;
        inner.drawable = Some(drawable);
        inner.owns_device = owns_device;
        inner.phase = if realized {
            Phase::Realized
        } else {
            Phase::Uninitialized
        };
        self.send_destroy.store(false, Ordering::Release);
        self.send_reshape.store(realized, Ordering::Release);
        Ok(())
    }

    /// Realizes or unrealizes the bound drawable.
    ///
    /// A no-op without a drawable, or when realizing a drawable with an empty
    /// size. Realizing marks a reshape pending.
    pub fn set_realized(&self, realized: bool) -> RenderResult<()> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let Some(drawable) = inner.drawable.as_mut() else {
            return Ok(());
        };
        if realized && (drawable.width() == 0 || drawable.height() == 0) {
            tracing::debug!(
                "not realizing {:?} with size {}x{}",
                drawable.id(),
                drawable.width(),
                drawable.height()
            );
            return Ok(());
        }

        if drawable.set_realized(realized)? {
            if realized {
                self.send_reshape.store(true, Ordering::Release);
                inner.phase = Phase::Realized;
            } else {
                inner.phase = Phase::Uninitialized;
            }
        }
        Ok(())
    }

    /// Renders one frame.
    ///
    /// A pending deferred destroy runs instead of the frame. Otherwise the
    /// context is made current, new listeners are initialized, a pending
    /// reshape is dispatched, every listener displays, queued tasks run and
    /// buffers are swapped. Listener failures are returned after the context
    /// is released; the controller stays usable.
    pub fn display(&self) -> RenderResult<()> {
        profile_function!();
        if self.send_destroy.swap(false, Ordering::AcqRel) {
            tracing::debug!("running deferred destroy instead of display");
            return self.destroy();
        }

        let guard = self.inner.lock();
        let rendered = self.with_current(&guard, |made| {
            if made == MakeCurrent::CurrentNew {
                let reshape_pending = self.send_reshape.load(Ordering::Acquire);
                self.listeners.init(self, !reshape_pending)?;
                self.fps.lock().reset();
            }
            if self.send_reshape.swap(false, Ordering::AcqRel) {
                self.listeners
                    .reshape(self, 0, 0, self.width(), self.height())?;
            }
            self.listeners.display(self)?;
            self.listeners.run_tasks(self)?;
            if self.auto_swap.load(Ordering::Acquire) {
                self.swap_double_buffered(&guard)?;
            }
            Ok(())
        })?;

        if rendered.is_some() {
            self.fps.lock().tick();
        }
        Ok(())
    }

    /// Records a new surface size.
    ///
    /// Offscreen surfaces are reallocated at the new size under the lock;
    /// onscreen surfaces were already resized by the window system. A reshape
    /// is marked pending and a frame is rendered right away if the surface is
    /// realized, not locked by another thread and no animator is bound.
    pub fn reshape_notify(&self, width: u32, height: u32) -> RenderResult<()> {
        profile_function!();
        {
            let guard = self.inner.lock();
            let mut inner = guard.borrow_mut();
            let Inner {
                drawable, phase, ..
            } = &mut *inner;
            let Some(drawable) = drawable.as_mut() else {
                return Ok(());
            };

            let previous = std::mem::replace(phase, Phase::Reshaping);
            let resized = if drawable.is_onscreen() {
                drawable.set_size(width, height);
                Ok(())
            } else {
                drawable.resize_offscreen(width, height)
            };
            *phase = previous;
            resized?;

            self.send_reshape.store(true, Ordering::Release);
            tracing::debug!("reshape to {}x{} pending on {:?}", width, height, drawable.id());
        }

        if self.can_display_after_reshape() {
            self.display()?;
        }
        Ok(())
    }

    /// Renders a frame for a window-system repaint request, unless another
    /// thread holds the surface or animates this drawable.
    pub fn window_repaint_notify(&self) -> RenderResult<()> {
        let Some(surface) = self.surface_state() else {
            return Ok(());
        };
        let animated_elsewhere = self
            .animator()
            .is_some_and(|animator| animator.is_animating_on_other_thread());
        if surface.is_realized() && !surface.lock().is_locked_by_other_thread() && !animated_elsewhere {
            self.display()?;
        }
        Ok(())
    }

    /// Handles a close request from the window system according to the
    /// surface's close policy.
    pub fn destroy_notify(&self) -> RenderResult<()> {
        let disposes = self
            .surface_state()
            .is_none_or(|surface| surface.disposes_on_close());
        if disposes {
            self.destroy_avoid_aware_of_locking()
        } else {
            tracing::debug!("close request ignored by close policy");
            Ok(())
        }
    }

    /// Destroys without risking a deadlock with the animation or rendering
    /// thread.
    ///
    /// An animator started on another thread is paused around a synchronous
    /// destroy and resumed only if it was animating. A surface locked by
    /// another thread defers the destroy to the next display. Otherwise the
    /// destroy runs synchronously. The controller lock is not taken before a
    /// path is chosen.
    pub fn destroy_avoid_aware_of_locking(&self) -> RenderResult<()> {
        if let Some(animator) = self
            .animator()
            .filter(|animator| animator.is_started_on_other_thread())
        {
            let was_animating = animator.pause();
            let result = self.destroy();
            if was_animating {
                animator.resume();
            }
            return result;
        }

        if let Some(surface) = self
            .surface_state()
            .filter(|surface| surface.lock().is_locked_by_other_thread())
        {
            tracing::debug!(
                "surface locked by {:?}, deferring destroy",
                surface.lock().owner()
            );
            self.send_destroy.store(true, Ordering::Release);
            return Ok(());
        }

        self.destroy()
    }

    /// Disposes every listener, destroys the context, releases the surface
    /// and closes an owned device. Idempotent.
    ///
    /// Listener dispose failures are logged and do not stop the teardown.
    pub fn destroy(&self) -> RenderResult<()> {
        profile_function!();
        let guard = self.inner.lock();
        self.send_destroy.store(false, Ordering::Release);
        if guard.borrow().is_empty() {
            return Ok(());
        }

        if self.preserve_at_destroy.swap(false, Ordering::AcqRel) {
            if let Err(err) = self.pull_state() {
                tracing::warn!("could not preserve listener state at destroy: {}", err);
            }
        }

        if guard.borrow().context_created() {
            self.dispose_listeners(&guard);
        }

        let (context, drawable, owns_device) = {
            let mut inner = guard.borrow_mut();
            inner.phase = Phase::Destroyed;
            (
                inner.context.take(),
                inner.drawable.take(),
                std::mem::take(&mut inner.owns_device),
            )
        };
        *self.surface.lock() = None;
        self.send_reshape.store(false, Ordering::Release);
        let dropped = self.listeners.clear_tasks();
        if dropped > 0 {
            tracing::debug!("dropped {} queued tasks at destroy", dropped);
        }

        if let Some(mut context) = context {
            if let Err(err) = context.destroy() {
                tracing::warn!("failed to destroy context: {}", err);
            }
        }
        if let Some(mut drawable) = drawable {
            if let Err(err) = drawable.set_realized(false) {
                tracing::warn!("failed to unrealize drawable: {}", err);
            }
            if owns_device && drawable.device().close() {
                tracing::debug!("closed owned device {}", drawable.device().connection());
            }
        }
        tracing::debug!("drawable destroyed");
        Ok(())
    }

    /// Replaces the bound context, returning the previous one.
    ///
    /// With `destroy_previous`, listeners are disposed on the previous
    /// context before it is destroyed. Otherwise it is released and detached
    /// from the drawable. The new context is associated with the drawable.
    pub fn set_context(&self, context: Option<Context>, destroy_previous: bool) -> RenderResult<Option<Context>> {
        let guard = self.inner.lock();
        if destroy_previous && guard.borrow().context_created() {
            self.dispose_listeners(&guard);
        }

        let mut inner = guard.borrow_mut();
        let drawable = inner.drawable.as_ref().map(Drawable::id);
        let mut previous = inner.context.take();
        if let Some(previous) = previous.as_mut() {
            let result = if destroy_previous {
                previous.destroy()
            } else {
                previous.release()
            };
            if let Err(err) = result {
                tracing::warn!("failed to detach previous context: {}", err);
            }
            previous.set_associated_drawable(None);
        }

        inner.context = context.map(|mut context| {
            context.set_associated_drawable(drawable);
            self.adopt_orphan_state(&mut context);
            context
        });
        Ok(previous)
    }

    /// Creates an uncreated context for the bound drawable using the current
    /// context creation flags. Returns `None` without a drawable.
    ///
    /// A share drawable must have a created context.
    pub fn create_context(&self, share_with: Option<&AutoDrawable>) -> RenderResult<Option<Context>> {
        let share = match share_with {
            Some(share) => Some(share.context_handle().ok_or(StateError::ShareContextNotCreated)?),
            None => None,
        };

        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner
            .drawable
            .as_ref()
            .map(|drawable| {
                drawable
                    .create_context(None, inner.context_flags)
                    .map(|context| context.with_share(share))
            })
            .transpose()
    }

    /// Disposes one listener on the current context, removing it if `remove`
    /// is set. Returns `false` if the listener is not registered.
    ///
    /// The dispose callback only runs if the context can be made current.
    /// Without a created context, or while the drawable is unrealized, the
    /// listener is only marked uninitialized.
    pub fn dispose_listener(&self, listener: &SharedListener, remove: bool) -> RenderResult<bool> {
        let guard = self.inner.lock();
        if guard.borrow().context_created() {
            let disposed = self.with_current(&guard, |_| self.listeners.dispose(self, listener, remove))?;
            if let Some(found) = disposed {
                return Ok(found);
            }
        }

        let found = self.listeners.set_init_state(listener, false).is_some();
        if remove {
            self.listeners.remove(listener);
        }
        Ok(found)
    }

    /// Runs `task` with the context current within a display pass.
    ///
    /// While an animator renders this drawable on another thread the task is
    /// queued for its next frame, and with `wait` the call blocks until the
    /// task ran or was dropped by a destroy. Otherwise a frame is rendered
    /// right away. Returns `false` if the drawable is not realized, or if a
    /// waited-for task was dropped.
    pub fn invoke<F>(&self, wait: bool, task: F) -> RenderResult<bool>
    where
        F: FnOnce(&AutoDrawable) -> Result<(), ListenerError> + Send + 'static,
    {
        if !self.is_realized() {
            return Ok(false);
        }

        let animated_elsewhere = self
            .animator()
            .is_some_and(|animator| animator.is_animating_on_other_thread());
        if !animated_elsewhere {
            self.listeners.enqueue(Task::new(Box::new(task), None));
            self.display()?;
            return Ok(true);
        }

        if !wait || self.inner.is_owned_by_current_thread() {
            self.listeners.enqueue(Task::new(Box::new(task), None));
            return Ok(true);
        }
        let (done, ran) = mpsc::channel();
        self.listeners.enqueue(Task::new(Box::new(task), Some(done)));
        Ok(ran.recv().is_ok())
    }

    /// Presents the back buffer of the bound drawable.
    pub fn swap_buffers(&self) -> RenderResult<()> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        match inner.drawable.as_ref() {
            Some(drawable) => drawable.swap_buffers(),
            None => Ok(()),
        }
    }

    fn swap_double_buffered(&self, guard: &InnerGuard<'_>) -> RenderResult<()> {
        let inner = guard.borrow();
        match inner.drawable.as_ref() {
            Some(drawable) if drawable.capabilities().double_buffered => drawable.swap_buffers(),
            _ => Ok(()),
        }
    }

    fn can_display_after_reshape(&self) -> bool {
        let Some(surface) = self.surface_state() else {
            return false;
        };
        surface.is_realized() && !surface.lock().is_locked_by_other_thread() && self.animator.lock().is_none()
    }

    fn make_current(&self, guard: &InnerGuard<'_>) -> RenderResult<MakeCurrent> {
        let mut inner = guard.borrow_mut();
        let Inner {
            drawable, context, ..
        } = &mut *inner;
        match (drawable.as_ref(), context.as_mut()) {
            (Some(drawable), Some(context)) => context.make_current(drawable),
            _ => Ok(MakeCurrent::NotCurrent),
        }
    }

    fn release_context(&self, guard: &InnerGuard<'_>) -> RenderResult<()> {
        match guard.borrow_mut().context.as_mut() {
            Some(context) => context.release(),
            None => Ok(()),
        }
    }

    /// Runs `f` with the context current, releasing it afterwards. Returns
    /// `None` if the context could not be made current.
    ///
    /// No `RefCell` borrow is held while `f` runs.
    fn with_current<R>(
        &self,
        guard: &InnerGuard<'_>,
        f: impl FnOnce(MakeCurrent) -> RenderResult<R>,
    ) -> RenderResult<Option<R>> {
        let made = self.make_current(guard)?;
        if !made.is_current() {
            return Ok(None);
        }
        let result = f(made);
        let released = self.release_context(guard);
        let value = result?;
        released?;
        Ok(Some(value))
    }

    /// Disposes every listener, with the context current when possible.
    fn dispose_listeners(&self, guard: &InnerGuard<'_>) {
        let mut disposed = false;
        let result = self.with_current(guard, |_| {
            disposed = true;
            self.listeners.dispose_all(self);
            Ok(())
        });
        if let Err(err) = result {
            tracing::warn!("context not current while disposing listeners: {}", err);
        }
        if !disposed {
            self.listeners.dispose_all(self);
        }
    }

    /// Moves the listeners, with their initialized flags, and the GL state
    /// out of the controller.
    ///
    /// Returns `Ok(false)` without a created context. Fails if state is
    /// already held.
    pub fn pull_state(&self) -> RenderResult<bool> {
        let guard = self.inner.lock();
        if self.preserved.lock().is_some() {
            return Err(StateError::AlreadyPulled.into());
        }
        if !guard.borrow().context_created() {
            return Ok(false);
        }

        if let Some(keeper) = self.state_keeper() {
            keeper.on_preserving(self);
        }
        let gl_state = match self.with_current(&guard, |_| {
            Ok(guard.borrow().context.as_ref().and_then(Context::capture_state))
        }) {
            Ok(state) => state.flatten(),
            Err(err) => {
                tracing::warn!("could not capture GL state: {}", err);
                None
            }
        };

        let listeners = self.listeners.take_all();
        tracing::debug!("pulled {} listeners", listeners.len());
        *self.preserved.lock() = Some(PreservedState::new(listeners, gl_state));
        Ok(true)
    }

    /// Moves held state back into the controller. The GL state is restored
    /// on the next make-current, of the context bound next if none is bound
    /// now.
    ///
    /// Returns `Ok(false)` if no state is held.
    pub fn push_state(&self) -> RenderResult<bool> {
        let guard = self.inner.lock();
        let Some(state) = self.preserved.lock().take() else {
            return Ok(false);
        };

        let (listeners, gl_state) = state.into_parts();
        tracing::debug!("pushing {} listeners", listeners.len());
        self.listeners.restore(listeners);
        if let Some(gl_state) = gl_state {
            match guard.borrow_mut().context.as_mut() {
                Some(context) => context.set_pending_state(Some(gl_state)),
                None => {
                    tracing::debug!("no context bound, keeping GL state for the next one");
                    *self.orphan_gl_state.lock() = Some(gl_state);
                }
            }
        }

        if let Some(keeper) = self.state_keeper() {
            keeper.on_restored(self);
        }
        Ok(true)
    }

    /// Hands GL state pushed while no context was bound to `context`,
    /// unless it already has state of its own to restore.
    fn adopt_orphan_state(&self, context: &mut Context) {
        if context.has_pending_state() {
            return;
        }
        if let Some(state) = self.orphan_gl_state.lock().take() {
            context.set_pending_state(Some(state));
        }
    }

    /// Whether GL state pushed without a bound context is waiting for one.
    pub fn has_orphan_gl_state(&self) -> bool {
        self.orphan_gl_state.lock().is_some()
    }

    /// Whether the next [`AutoDrawable::destroy`] pulls state first.
    pub fn preserve_state_at_destroy(&self, preserve: bool) {
        self.preserve_at_destroy.store(preserve, Ordering::Release);
    }

    pub fn is_preserve_state_at_destroy(&self) -> bool {
        self.preserve_at_destroy.load(Ordering::Acquire)
    }

    pub fn preserved_state(&self) -> Option<MappedMutexGuard<'_, PreservedState>> {
        MutexGuard::try_map(self.preserved.lock(), Option::as_mut).ok()
    }

    pub fn is_state_preserved(&self) -> bool {
        self.preserved.lock().is_some()
    }

    /// Drops held state without pushing it back.
    pub fn clear_preserved_state(&self) -> Option<PreservedState> {
        self.preserved.lock().take()
    }

    pub fn set_state_keeper_listener(
        &self,
        keeper: Option<Arc<dyn StateKeeperListener>>,
    ) -> Option<Arc<dyn StateKeeperListener>> {
        std::mem::replace(&mut *self.state_keeper.lock(), keeper)
    }

    fn state_keeper(&self) -> Option<Arc<dyn StateKeeperListener>> {
        self.state_keeper.lock().clone()
    }

    /// Appends a listener. Returns `false` if it is already registered.
    pub fn add_listener(&self, listener: SharedListener) -> bool {
        self.listeners.add(listener)
    }

    pub fn add_listener_at(&self, index: usize, listener: SharedListener) -> RenderResult<bool> {
        self.listeners.add_at(index, listener)
    }

    /// Removes a listener without disposing it.
    pub fn remove_listener(&self, listener: &SharedListener) -> bool {
        self.listeners.remove(listener)
    }

    pub fn listener(&self, index: usize) -> Option<SharedListener> {
        self.listeners.get(index)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }

    pub fn listener_init_state(&self, listener: &SharedListener) -> Option<bool> {
        self.listeners.init_state(listener)
    }

    pub fn set_listener_init_state(&self, listener: &SharedListener, initialized: bool) -> Option<bool> {
        self.listeners.set_init_state(listener, initialized)
    }

    pub fn listeners(&self) -> &ListenerHelper {
        &self.listeners
    }

    /// Binds the animation loop driving this drawable, returning the
    /// previous one.
    pub fn set_animator(&self, animator: Option<Arc<dyn AnimatorControl>>) -> Option<Arc<dyn AnimatorControl>> {
        std::mem::replace(&mut *self.animator.lock(), animator)
    }

    pub fn animator(&self) -> Option<Arc<dyn AnimatorControl>> {
        self.animator.lock().clone()
    }

    /// Whether [`AutoDrawable::display`] swaps double-buffered surfaces.
    pub fn set_auto_swap_buffer_mode(&self, enabled: bool) {
        self.auto_swap.store(enabled, Ordering::Release);
    }

    pub fn auto_swap_buffer_mode(&self) -> bool {
        self.auto_swap.load(Ordering::Acquire)
    }

    /// Sets the close policy of the bound surface. Returns `false` if no
    /// drawable is bound.
    pub fn set_close_policy(&self, policy: Option<ClosePolicy>) -> bool {
        match self.surface_state() {
            Some(surface) => {
                surface.set_close_policy(policy);
                true
            }
            None => false,
        }
    }

    pub fn close_policy(&self) -> Option<ClosePolicy> {
        self.surface_state().and_then(|surface| surface.close_policy())
    }

    /// Flags for contexts created from now on, also applied to the bound
    /// context if it is not created yet.
    pub fn set_context_creation_flags(&self, flags: ContextFlags) {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.context_flags = flags;
        if let Some(context) = inner.context.as_mut().filter(|context| !context.is_created()) {
            context.set_flags(flags);
        }
    }

    pub fn context_creation_flags(&self) -> ContextFlags {
        self.inner.lock().borrow().context_flags
    }

    /// A snapshot of the frame-rate accounting.
    pub fn fps(&self) -> FpsCounter {
        self.fps.lock().clone()
    }

    pub fn reset_fps_counter(&self) {
        self.fps.lock().reset();
    }

    pub fn set_fps_update_interval(&self, frames: u32) {
        self.fps.lock().set_update_interval(frames);
    }

    /// The shared state of the bound surface, readable without the
    /// controller lock.
    pub fn surface_state(&self) -> Option<Arc<SurfaceState>> {
        self.surface.lock().clone()
    }

    pub fn width(&self) -> u32 {
        self.surface_state().map_or(0, |surface| surface.width())
    }

    pub fn height(&self) -> u32 {
        self.surface_state().map_or(0, |surface| surface.height())
    }

    pub fn is_realized(&self) -> bool {
        self.surface_state().is_some_and(|surface| surface.is_realized())
    }

    /// Whether the surface origin is bottom-left. `true` when unbound.
    pub fn is_gl_oriented(&self) -> bool {
        self.inner
            .lock()
            .borrow()
            .drawable
            .as_ref()
            .is_none_or(Drawable::is_gl_oriented)
    }

    pub fn chosen_capabilities(&self) -> Option<CapabilityDescriptor> {
        self.inner
            .lock()
            .borrow()
            .drawable
            .as_ref()
            .map(|drawable| *drawable.capabilities())
    }

    pub fn surface_handle(&self) -> Option<SurfaceHandle> {
        self.inner.lock().borrow().drawable.as_ref().and_then(Drawable::handle)
    }

    pub fn context_handle(&self) -> Option<ContextHandle> {
        self.inner.lock().borrow().context.as_ref().and_then(Context::handle)
    }

    pub fn is_context_created(&self) -> bool {
        self.inner.lock().borrow().context_created()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().borrow().phase
    }

    pub fn owns_device(&self) -> bool {
        self.inner.lock().borrow().owns_device
    }

    /// Whether a destroy was deferred to the next display.
    pub fn is_destroy_pending(&self) -> bool {
        self.send_destroy.load(Ordering::Acquire)
    }

    pub fn is_reshape_pending(&self) -> bool {
        self.send_reshape.load(Ordering::Acquire)
    }

    /// Runs `f` on the bound drawable under the controller lock.
    pub fn with_drawable<R>(&self, f: impl FnOnce(&Drawable) -> R) -> Option<R> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner.drawable.as_ref().map(f)
    }
}

impl Default for AutoDrawable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AutoDrawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoDrawable")
            .field("realized", &self.is_realized())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("listeners", &self.listener_count())
            .field("destroy_pending", &self.is_destroy_pending())
            .finish_non_exhaustive()
    }
}
