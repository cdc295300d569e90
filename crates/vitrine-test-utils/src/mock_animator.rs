//! Mock animation loop control.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use vitrine_native::AnimatorControl;

use crate::mock_native::{CallLog, NativeCall};

/// An [`AnimatorControl`] whose loop state is set by the test.
///
/// No thread is spawned. [`MockAnimator::on_foreign_thread`] reports the id
/// of a short-lived helper thread so that the caller always sees the loop as
/// running elsewhere.
pub struct MockAnimator {
    log: CallLog,
    started: AtomicBool,
    paused: AtomicBool,
    thread: Mutex<Option<ThreadId>>,
}

impl MockAnimator {
    /// A stopped animator.
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            started: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            thread: Mutex::new(None),
        }
    }

    /// An animator started and animating on a thread other than the caller's.
    pub fn on_foreign_thread(log: CallLog) -> Self {
        let animator = Self::new(log);
        let foreign = thread::spawn(|| thread::current().id())
            .join()
            .expect("helper thread panicked");
        animator.start_on(foreign);
        animator
    }

    /// Marks the loop as started on `thread`, animating.
    pub fn start_on(&self, thread: ThreadId) {
        *self.thread.lock() = Some(thread);
        self.paused.store(false, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
    }

    /// Marks the loop as started on the calling thread.
    pub fn start_here(&self) {
        self.start_on(thread::current().id());
    }

    /// Marks the loop as started but paused, without logging a pause call.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        *self.thread.lock() = None;
    }

    pub fn pause_count(&self) -> usize {
        self.log
            .count(|call| matches!(call, NativeCall::AnimatorPause { .. }))
    }

    pub fn resume_count(&self) -> usize {
        self.log.count(|call| matches!(call, NativeCall::AnimatorResume))
    }
}

impl AnimatorControl for MockAnimator {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn is_animating(&self) -> bool {
        self.is_started() && !self.is_paused()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn thread(&self) -> Option<ThreadId> {
        *self.thread.lock()
    }

    fn pause(&self) -> bool {
        let was_animating = self.is_animating();
        if self.is_started() {
            self.paused.store(true, Ordering::SeqCst);
        }
        self.log.push(NativeCall::AnimatorPause { was_animating });
        was_animating
    }

    fn resume(&self) -> bool {
        let was_paused = self.is_started() && self.paused.swap(false, Ordering::SeqCst);
        self.log.push(NativeCall::AnimatorResume);
        was_paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_thread_animator() {
        let animator = MockAnimator::on_foreign_thread(CallLog::new());
        assert!(animator.is_started_on_other_thread());
        assert!(animator.is_animating_on_other_thread());
    }

    #[test]
    fn test_local_animator_is_not_foreign() {
        let animator = MockAnimator::new(CallLog::new());
        animator.start_here();
        assert!(animator.is_started());
        assert!(!animator.is_started_on_other_thread());
    }

    #[test]
    fn test_pause_reports_previous_state() {
        let animator = MockAnimator::on_foreign_thread(CallLog::new());
        animator.set_paused(true);
        assert!(!animator.pause());
        assert!(animator.resume());
        assert!(animator.pause());
        assert_eq!(animator.pause_count(), 2);
        assert_eq!(animator.resume_count(), 1);
    }
}
