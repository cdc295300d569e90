use std::thread::{self, ThreadId};

/// Control surface of an animation loop driving drawables from its own
/// thread.
///
/// Pausing is cooperative: `pause` returns once the loop has finished its
/// current frame and will not start another until resumed.
pub trait AnimatorControl: Send + Sync {
    /// The loop thread exists, whether animating or paused.
    fn is_started(&self) -> bool;

    /// The loop is started and not paused.
    fn is_animating(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// The thread the loop runs on, while started.
    fn thread(&self) -> Option<ThreadId>;

    /// Pauses the loop. Returns `true` if it was animating before the call.
    fn pause(&self) -> bool;

    /// Resumes a paused loop. Returns `true` if it was paused before the call.
    fn resume(&self) -> bool;

    /// Started, and not running on the calling thread.
    fn is_started_on_other_thread(&self) -> bool {
        self.is_started() && self.thread().is_some_and(|t| t != thread::current().id())
    }

    /// Animating, and not running on the calling thread.
    fn is_animating_on_other_thread(&self) -> bool {
        self.is_animating() && self.thread().is_some_and(|t| t != thread::current().id())
    }
}
