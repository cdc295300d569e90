//! Render listeners and their ordered dispatch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc;

use parking_lot::Mutex;

use crate::{
    auto_drawable::AutoDrawable,
    error::{ListenerError, ListenerPhase, RenderError, RenderResult},
};

/// Application callbacks receiving the lifecycle of an [`AutoDrawable`].
///
/// Every callback runs with the drawable's context current on the calling
/// thread. Callbacks may call back into the drawable.
pub trait RenderListener: Send + Sync {
    /// Called once after the context is created, before the first display.
    #[allow(unused_variables)]
    fn init(&self, drawable: &AutoDrawable) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Renders one frame.
    fn display(&self, drawable: &AutoDrawable) -> Result<(), ListenerError>;

    /// Called with the new viewport after the surface size changed.
    #[allow(unused_variables)]
    fn reshape(
        &self,
        drawable: &AutoDrawable,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Releases the listener's resources before the context goes away.
    #[allow(unused_variables)]
    fn dispose(&self, drawable: &AutoDrawable) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// A listener as stored by a [`ListenerHelper`].
pub type SharedListener = Arc<dyn RenderListener>;

type TaskFn = Box<dyn FnOnce(&AutoDrawable) -> Result<(), ListenerError> + Send>;

/// A closure queued to run within the next display pass.
pub(crate) struct Task {
    run: TaskFn,
    done: Option<mpsc::Sender<()>>,
}

impl Task {
    pub(crate) fn new(run: TaskFn, done: Option<mpsc::Sender<()>>) -> Self {
        Self { run, done }
    }
}

#[derive(Clone)]
struct Entry {
    listener: SharedListener,
    initialized: bool,
}

fn same(a: &SharedListener, b: &SharedListener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Ordered listeners, each with an initialized flag.
///
/// Every dispatch pass iterates a snapshot taken when the pass starts, so
/// listeners added or removed by a callback take part from the next pass
/// on.
#[derive(Default)]
pub struct ListenerHelper {
    entries: Mutex<Vec<Entry>>,
    tasks: Mutex<VecDeque<Task>>,
}

impl ListenerHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener. Returns `false` if it is already registered.
    pub fn add(&self, listener: SharedListener) -> bool {
        let mut entries = self.entries.lock();
        if entries.iter().any(|entry| same(&entry.listener, &listener)) {
            tracing::debug!("listener already registered");
            return false;
        }
        entries.push(Entry {
            listener,
            initialized: false,
        });
        true
    }

    /// Inserts a listener at `index`, `0..=count`. Returns `Ok(false)` if it
    /// is already registered.
    pub fn add_at(&self, index: usize, listener: SharedListener) -> RenderResult<bool> {
        let mut entries = self.entries.lock();
        if index > entries.len() {
            return Err(RenderError::ListenerIndex {
                index,
                count: entries.len(),
            });
        }
        if entries.iter().any(|entry| same(&entry.listener, &listener)) {
            tracing::debug!("listener already registered");
            return Ok(false);
        }
        entries.insert(
            index,
            Entry {
                listener,
                initialized: false,
            },
        );
        Ok(true)
    }

    /// Removes a listener without disposing it.
    pub fn remove(&self, listener: &SharedListener) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| !same(&entry.listener, listener));
        entries.len() != before
    }

    pub fn get(&self, index: usize) -> Option<SharedListener> {
        self.entries
            .lock()
            .get(index)
            .map(|entry| entry.listener.clone())
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn contains(&self, listener: &SharedListener) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| same(&entry.listener, listener))
    }

    /// Whether `listener` is initialized, or `None` if it is not registered.
    pub fn init_state(&self, listener: &SharedListener) -> Option<bool> {
        self.entries
            .lock()
            .iter()
            .find(|entry| same(&entry.listener, listener))
            .map(|entry| entry.initialized)
    }

    /// Overrides the initialized flag of a registered listener. Returns the
    /// previous flag.
    pub fn set_init_state(&self, listener: &SharedListener, initialized: bool) -> Option<bool> {
        self.entries
            .lock()
            .iter_mut()
            .find(|entry| same(&entry.listener, listener))
            .map(|entry| std::mem::replace(&mut entry.initialized, initialized))
    }

    /// Registered listeners with their initialized flags, in order.
    pub fn snapshot(&self) -> Vec<(SharedListener, bool)> {
        self.entries
            .lock()
            .iter()
            .map(|entry| (entry.listener.clone(), entry.initialized))
            .collect()
    }

    /// Removes and returns every listener with its initialized flag.
    pub fn take_all(&self) -> Vec<(SharedListener, bool)> {
        std::mem::take(&mut *self.entries.lock())
            .into_iter()
            .map(|entry| (entry.listener, entry.initialized))
            .collect()
    }

    /// Appends listeners keeping their initialized flags. Listeners that
    /// were registered again in the meantime keep their current entry.
    pub fn restore(&self, listeners: Vec<(SharedListener, bool)>) {
        let mut entries = self.entries.lock();
        for (listener, initialized) in listeners {
            if entries.iter().any(|entry| same(&entry.listener, &listener)) {
                continue;
            }
            entries.push(Entry {
                listener,
                initialized,
            });
        }
    }

    fn mark(&self, listener: &SharedListener, initialized: bool) {
        self.set_init_state(listener, initialized);
    }

    fn init_one(
        &self,
        drawable: &AutoDrawable,
        listener: &SharedListener,
        reshape: bool,
    ) -> RenderResult<()> {
        listener
            .init(drawable)
            .map_err(|err| RenderError::listener(ListenerPhase::Init, err))?;
        self.mark(listener, true);
        if reshape {
            listener
                .reshape(drawable, 0, 0, drawable.width(), drawable.height())
                .map_err(|err| RenderError::listener(ListenerPhase::Reshape, err))?;
        }
        Ok(())
    }

    /// Initializes every listener not yet initialized, in order, reshaping
    /// each one afterwards if `send_reshape` is set.
    pub fn init(&self, drawable: &AutoDrawable, send_reshape: bool) -> RenderResult<()> {
        for (listener, initialized) in self.snapshot() {
            if !initialized {
                self.init_one(drawable, &listener, send_reshape)?;
            }
        }
        Ok(())
    }

    /// Displays every listener in order. Listeners added since the last pass
    /// are initialized and reshaped first.
    pub fn display(&self, drawable: &AutoDrawable) -> RenderResult<()> {
        for (listener, initialized) in self.snapshot() {
            if !initialized {
                self.init_one(drawable, &listener, true)?;
            }
            listener
                .display(drawable)
                .map_err(|err| RenderError::listener(ListenerPhase::Display, err))?;
        }
        Ok(())
    }

    pub fn reshape(
        &self,
        drawable: &AutoDrawable,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        for (listener, _) in self.snapshot() {
            listener
                .reshape(drawable, x, y, width, height)
                .map_err(|err| RenderError::listener(ListenerPhase::Reshape, err))?;
        }
        Ok(())
    }

    /// Disposes one listener if it is initialized, then removes it if
    /// `remove` is set. Returns `false` if the listener is not registered.
    ///
    /// The listener is marked uninitialized, and removed when requested,
    /// even if its dispose callback fails.
    pub fn dispose(
        &self,
        drawable: &AutoDrawable,
        listener: &SharedListener,
        remove: bool,
    ) -> RenderResult<bool> {
        let Some(initialized) = self.init_state(listener) else {
            return Ok(false);
        };
        let result = if initialized {
            listener
                .dispose(drawable)
                .map_err(|err| RenderError::listener(ListenerPhase::Dispose, err))
        } else {
            Ok(())
        };
        self.mark(listener, false);
        if remove {
            self.remove(listener);
        }
        result.map(|()| true)
    }

    /// Disposes every initialized listener in order. Failures are logged and
    /// do not stop the pass. Returns the number of listeners disposed.
    pub fn dispose_all(&self, drawable: &AutoDrawable) -> usize {
        let mut disposed = 0;
        for (index, (listener, initialized)) in self.snapshot().into_iter().enumerate() {
            if !initialized {
                continue;
            }
            if let Err(err) = listener.dispose(drawable) {
                tracing::warn!("render listener {} failed to dispose: {}", index, err);
            }
            self.mark(&listener, false);
            disposed += 1;
        }
        disposed
    }

    pub(crate) fn enqueue(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Runs the tasks queued before this call, in order. A failing task stops
    /// the pass; tasks after it stay queued.
    pub(crate) fn run_tasks(&self, drawable: &AutoDrawable) -> RenderResult<()> {
        let queued = self.tasks.lock().len();
        for _ in 0..queued {
            let Some(task) = self.tasks.lock().pop_front() else {
                break;
            };
            let result = (task.run)(drawable);
            if let Some(done) = task.done {
                let _ = done.send(());
            }
            result.map_err(|err| RenderError::listener(ListenerPhase::Task, err))?;
        }
        Ok(())
    }

    /// Drops every queued task, waking callers waiting on them.
    pub(crate) fn clear_tasks(&self) -> usize {
        let dropped = std::mem::take(&mut *self.tasks.lock());
        dropped.len()
    }
}
