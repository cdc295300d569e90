//! A dedicated animation thread.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use vitrine_core::profiling::profile_scope;
use vitrine_native::AnimatorControl;

use crate::auto_drawable::AutoDrawable;

/// Frame pacing used by [`Animator::new`].
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
struct LoopState {
    started: bool,
    stop_requested: bool,
    pause_requested: bool,
    /// The loop is parked between frames.
    paused: bool,
    thread: Option<ThreadId>,
}

struct Shared {
    state: Mutex<LoopState>,
    changed: Condvar,
    drawables: Mutex<Vec<Weak<AutoDrawable>>>,
    frame_interval: Option<Duration>,
}

impl Shared {
    fn render_frame(&self) {
        profile_scope!("animator_frame");
        let drawables: Vec<Arc<AutoDrawable>> = {
            let mut drawables = self.drawables.lock();
            drawables.retain(|drawable| drawable.strong_count() > 0);
            drawables.iter().filter_map(Weak::upgrade).collect()
        };
        for drawable in drawables {
            if let Err(err) = drawable.display() {
                tracing::warn!("animator display failed: {}", err);
            }
        }
    }

    fn run(&self) {
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                break;
            }
            if state.pause_requested {
                if !state.paused {
                    state.paused = true;
                    self.changed.notify_all();
                }
                self.changed.wait(&mut state);
                continue;
            }
            state.paused = false;

            MutexGuard::unlocked(&mut state, || self.render_frame());

            if state.stop_requested || state.pause_requested {
                continue;
            }
            if let Some(interval) = self.frame_interval {
                self.changed.wait_for(&mut state, interval);
            }
        }

        state.started = false;
        state.paused = false;
        state.pause_requested = false;
        state.thread = None;
        self.changed.notify_all();
    }
}

/// Drives [`AutoDrawable::display`] of its drawables from a named thread.
///
/// Drawables are held weakly and dropped from the loop once released.
/// [`AnimatorControl::pause`] returns only after the loop finished its
/// current frame.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use vitrine_native::AnimatorControl;
/// use vitrine_render::{Animator, AutoDrawable};
///
/// let drawable = Arc::new(AutoDrawable::new());
/// let animator = Animator::new("render");
/// animator.add(&drawable);
/// animator.start().unwrap();
///
/// animator.pause();
/// // no frame is in flight here
/// animator.resume();
/// animator.stop();
/// ```
pub struct Animator {
    name: String,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Animator {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_frame_interval(name, Some(DEFAULT_FRAME_INTERVAL))
    }

    /// An animator waiting `interval` between frames, or rendering back to
    /// back with `None`.
    pub fn with_frame_interval(name: impl Into<String>, interval: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState::default()),
                changed: Condvar::new(),
                drawables: Mutex::new(Vec::new()),
                frame_interval: interval,
            }),
            handle: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a drawable and binds this animator to it.
    pub fn add(self: &Arc<Self>, drawable: &Arc<AutoDrawable>) {
        self.shared.drawables.lock().push(Arc::downgrade(drawable));
        drawable.set_animator(Some(self.clone() as Arc<dyn AnimatorControl>));
    }

    /// Unregisters a drawable and unbinds this animator from it.
    pub fn remove(&self, drawable: &Arc<AutoDrawable>) -> bool {
        let target = Arc::downgrade(drawable);
        let mut drawables = self.shared.drawables.lock();
        let before = drawables.len();
        drawables.retain(|weak| !weak.ptr_eq(&target));
        let removed = drawables.len() != before;
        drop(drawables);
        if removed {
            drawable.set_animator(None);
        }
        removed
    }

    pub fn drawable_count(&self) -> usize {
        self.shared
            .drawables
            .lock()
            .iter()
            .filter(|drawable| drawable.strong_count() > 0)
            .count()
    }

    /// Spawns the loop thread. Returns `false` if it is already started.
    pub fn start(&self) -> std::io::Result<bool> {
        let mut handle = self.handle.lock();
        {
            let mut state = self.shared.state.lock();
            if state.started {
                return Ok(false);
            }
            *state = LoopState {
                started: true,
                ..LoopState::default()
            };
        }

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(format!("vitrine-animator-{}", self.name))
            .spawn(move || shared.run());
        match spawned {
            Ok(thread) => {
                self.shared.state.lock().thread = Some(thread.thread().id());
                tracing::debug!("animator {} started", self.name);
                *handle = Some(thread);
                Ok(true)
            }
            Err(err) => {
                self.shared.state.lock().started = false;
                Err(err)
            }
        }
    }

    /// Stops the loop and waits for its thread to exit. Returns `false` if
    /// it was not started.
    pub fn stop(&self) -> bool {
        let on_loop_thread = {
            let mut state = self.shared.state.lock();
            if !state.started {
                return false;
            }
            state.stop_requested = true;
            self.shared.changed.notify_all();
            state.thread == Some(thread::current().id())
        };

        if on_loop_thread {
            return true;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("animator {} thread panicked", self.name);
            }
        }
        tracing::debug!("animator {} stopped", self.name);
        true
    }
}

impl AnimatorControl for Animator {
    fn is_started(&self) -> bool {
        self.shared.state.lock().started
    }

    fn is_animating(&self) -> bool {
        let state = self.shared.state.lock();
        state.started && !state.pause_requested
    }

    fn is_paused(&self) -> bool {
        let state = self.shared.state.lock();
        state.started && state.pause_requested
    }

    fn thread(&self) -> Option<ThreadId> {
        self.shared.state.lock().thread
    }

    fn pause(&self) -> bool {
        let mut state = self.shared.state.lock();
        if !state.started {
            return false;
        }
        let was_animating = !state.pause_requested;
        state.pause_requested = true;
        self.shared.changed.notify_all();

        // The loop cannot acknowledge while this thread is inside its frame.
        if state.thread == Some(thread::current().id()) {
            return was_animating;
        }
        while state.started && !state.paused {
            self.shared.changed.wait(&mut state);
        }
        was_animating
    }

    fn resume(&self) -> bool {
        let mut state = self.shared.state.lock();
        if !state.started || !state.pause_requested {
            return false;
        }
        state.pause_requested = false;
        self.shared.changed.notify_all();
        true
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        self.stop();
    }
}
