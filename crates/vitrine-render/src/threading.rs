//! Where native work runs.
//!
//! Some platforms require surfaces and contexts to be created on one
//! designated thread. A [`ThreadingStrategy`] decides whether a task runs
//! inline or is submitted to that thread, blocking until it completes.

use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;

use crate::error::{RenderError, RenderResult};

/// A unit of native work.
pub type NativeTask = Box<dyn FnOnce() + Send>;

pub trait ThreadingStrategy: Send + Sync {
    /// Whether the calling thread may run native work directly.
    fn is_owning_thread(&self) -> bool;

    /// Runs `task`, blocking until it completed.
    fn run(&self, task: NativeTask) -> RenderResult<()>;
}

/// Runs every task on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl ThreadingStrategy for Inline {
    fn is_owning_thread(&self) -> bool {
        true
    }

    fn run(&self, task: NativeTask) -> RenderResult<()> {
        task();
        Ok(())
    }
}

/// Submits tasks to one dedicated worker thread, or runs them inline when
/// already on it.
pub struct DedicatedThread {
    sender: Mutex<Option<mpsc::Sender<(NativeTask, mpsc::Sender<()>)>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread: ThreadId,
}

impl DedicatedThread {
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<(NativeTask, mpsc::Sender<()>)>();
        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            while let Ok((task, done)) = receiver.recv() {
                task();
                let _ = done.send(());
            }
        })?;
        tracing::debug!("spawned native thread {:?}", handle.thread().name());

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }
}

impl ThreadingStrategy for DedicatedThread {
    fn is_owning_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn run(&self, task: NativeTask) -> RenderResult<()> {
        if self.is_owning_thread() {
            task();
            return Ok(());
        }

        let (done, completed) = mpsc::channel();
        self.sender
            .lock()
            .as_ref()
            .ok_or(RenderError::ThreadUnavailable)?
            .send((task, done))
            .map_err(|_| RenderError::ThreadUnavailable)?;
        completed.recv().map_err(|_| RenderError::ThreadUnavailable)
    }
}

impl Drop for DedicatedThread {
    fn drop(&mut self) {
        self.sender.lock().take();
        if self.is_owning_thread() {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

/// Runs `f` through `strategy` and returns its result.
pub fn run_blocking<R, F>(strategy: &dyn ThreadingStrategy, f: F) -> RenderResult<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    strategy.run(Box::new(move || {
        let _ = sender.send(f());
    }))?;
    receiver.recv().map_err(|_| RenderError::ThreadUnavailable)
}
