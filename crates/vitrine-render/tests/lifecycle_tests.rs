//! Integration tests for realization, display and reshape dispatch.

mod common;

use std::sync::Arc;

use common::*;
use parking_lot::Mutex;
use vitrine_native::{AnimatorControl, CapabilityDescriptor, ClosePolicy};
use vitrine_render::{
    Animator, AutoDrawable, ListenerError, ListenerPhase, Phase, RenderError, RenderListener, SharedListener,
    StateError,
};
use vitrine_test_utils::{MockAnimator, NativeCall};

// ============================================================================
// Display
// ============================================================================

#[test]
fn test_first_display_inits_reshapes_and_displays() {
    let (auto, mocks) = realized(800, 600);
    let listener = RecordingListener::new("a", &mocks.log);
    auto.add_listener(listener.clone());

    auto.display().unwrap();
    assert_eq!(
        markers(&mocks.log),
        vec!["a:init", "a:reshape 0,0,800,600", "a:display"]
    );
    assert_eq!(auto.fps().total_frames(), 1);
    assert_eq!(auto.listener_init_state(&listener.shared()), Some(true));
    assert!(auto.is_context_created());
    assert_eq!(mocks.contexts.current_context(), None);
}

#[test]
fn test_reshape_is_dispatched_once() {
    let (auto, mocks) = realized(800, 600);
    auto.add_listener(RecordingListener::new("a", &mocks.log));

    auto.display().unwrap();
    auto.display().unwrap();
    auto.display().unwrap();

    let reshapes = markers(&mocks.log)
        .iter()
        .filter(|marker| marker.starts_with("a:reshape"))
        .count();
    assert_eq!(reshapes, 1);
    assert!(!auto.is_reshape_pending());
    assert_eq!(auto.fps().total_frames(), 3);
    assert_eq!(mocks.contexts.count_context_creates(), 1);
}

#[test]
fn test_unrealized_display_does_nothing() {
    let (auto, mocks) = bound(CapabilityDescriptor::default(), 64, 64);
    auto.add_listener(RecordingListener::new("a", &mocks.log));

    auto.display().unwrap();
    assert!(markers(&mocks.log).is_empty());
    assert_eq!(mocks.contexts.count_context_creates(), 0);
    assert_eq!(auto.fps().total_frames(), 0);
    assert_eq!(auto.phase(), Phase::Uninitialized);
}

#[test]
fn test_zero_size_is_not_realized() {
    let (auto, mocks) = bound(CapabilityDescriptor::default(), 0, 0);
    auto.set_realized(true).unwrap();

    assert!(!auto.is_realized());
    assert_eq!(mocks.surfaces.count_surface_creates(), 0);
    assert!(!auto.is_reshape_pending());
}

#[test]
fn test_display_failure_is_returned_after_release() {
    let (auto, mocks) = realized(32, 32);
    let listener = RecordingListener::new("a", &mocks.log);
    listener
        .fail_display
        .store(true, std::sync::atomic::Ordering::SeqCst);
    auto.add_listener(listener.clone());

    let result = auto.display();
    assert!(matches!(
        result,
        Err(RenderError::Listener {
            phase: ListenerPhase::Display,
            ..
        })
    ));
    assert_eq!(mocks.contexts.current_context(), None);
    assert!(!auto.surface_state().unwrap().lock().is_locked());
    assert_eq!(auto.fps().total_frames(), 0);

    listener
        .fail_display
        .store(false, std::sync::atomic::Ordering::SeqCst);
    auto.display().unwrap();
    assert_eq!(auto.fps().total_frames(), 1);
}

#[test]
fn test_unrealize_restarts_at_uninitialized() {
    let (auto, mocks) = realized(32, 32);
    auto.display().unwrap();
    auto.set_realized(false).unwrap();

    assert_eq!(auto.phase(), Phase::Uninitialized);
    assert_eq!(mocks.surfaces.count_surface_releases(), 1);
    assert!(auto.surface_handle().is_none());
}

// ============================================================================
// Listener management
// ============================================================================

/// Adds `late` to the drawable during its first display.
struct Spawner {
    late: Mutex<Option<SharedListener>>,
}

impl RenderListener for Spawner {
    fn display(&self, drawable: &AutoDrawable) -> Result<(), ListenerError> {
        if let Some(late) = self.late.lock().take() {
            drawable.add_listener(late);
        }
        Ok(())
    }
}

#[test]
fn test_listener_added_during_display_joins_next_pass() {
    let (auto, mocks) = realized(20, 10);
    let late = RecordingListener::new("late", &mocks.log);
    auto.add_listener(Arc::new(Spawner {
        late: Mutex::new(Some(late.clone())),
    }));

    auto.display().unwrap();
    assert!(markers(&mocks.log).is_empty());
    assert_eq!(auto.listener_count(), 2);

    auto.display().unwrap();
    assert_eq!(
        markers(&mocks.log),
        vec!["late:init", "late:reshape 0,0,20,10", "late:display"]
    );
}

#[test]
fn test_listeners_display_in_order() {
    let (auto, mocks) = realized(8, 8);
    auto.add_listener(RecordingListener::new("b", &mocks.log));
    auto.add_listener_at(0, RecordingListener::new("a", &mocks.log))
        .unwrap();
    assert!(matches!(
        auto.add_listener_at(5, RecordingListener::new("c", &mocks.log)),
        Err(RenderError::ListenerIndex { index: 5, count: 2 })
    ));

    auto.display().unwrap();
    mocks.log.clear();
    auto.display().unwrap();
    assert_eq!(markers(&mocks.log), vec!["a:display", "b:display"]);
}

#[test]
fn test_removed_listener_is_not_disposed() {
    let (auto, mocks) = realized(8, 8);
    let listener = RecordingListener::new("a", &mocks.log);
    auto.add_listener(listener.clone());
    auto.display().unwrap();

    assert!(auto.remove_listener(&listener.shared()));
    assert!(!auto.remove_listener(&listener.shared()));
    auto.destroy().unwrap();
    assert!(!markers(&mocks.log).contains(&"a:dispose".to_string()));
}

// ============================================================================
// Reshape
// ============================================================================

#[test]
fn test_onscreen_reshape_displays_right_away() {
    let (auto, mocks) = realized(800, 600);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    mocks.log.clear();

    auto.reshape_notify(1024, 768).unwrap();
    assert_eq!(
        markers(&mocks.log),
        vec!["a:reshape 0,0,1024,768", "a:display"]
    );
    assert_eq!((auto.width(), auto.height()), (1024, 768));
    assert_eq!(
        mocks
            .log
            .count(|call| matches!(call, NativeCall::ResizeSurface { .. })),
        0
    );
}

#[test]
fn test_offscreen_reshape_replaces_surface() {
    let (auto, mocks) = realized_offscreen(64, 64);
    mocks.surfaces.set_resize_replaces_handle(true);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    let before = auto.surface_handle().unwrap();
    mocks.log.clear();

    auto.reshape_notify(400, 300).unwrap();
    let after = auto.surface_handle().unwrap();
    assert_ne!(before, after);
    assert_eq!(mocks.surfaces.live_surfaces(), vec![after]);
    assert!(mocks.log.contains(&NativeCall::ResizeSurface {
        from: before,
        to: after,
        width: 400,
        height: 300,
    }));
    assert_eq!(
        markers(&mocks.log),
        vec!["a:reshape 0,0,400,300", "a:display"]
    );
    assert_eq!(auto.phase(), Phase::Realized);
}

#[test]
fn test_offscreen_reshape_to_zero_fails() {
    let (auto, _mocks) = realized_offscreen(64, 64);
    assert!(matches!(
        auto.reshape_notify(0, 10),
        Err(RenderError::InvalidSize { width: 0, height: 10 })
    ));
    assert_eq!((auto.width(), auto.height()), (64, 64));
    assert_eq!(auto.phase(), Phase::Realized);
}

#[test]
fn test_reshape_with_animator_waits_for_next_frame() {
    let (auto, mocks) = realized(100, 100);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    auto.set_animator(Some(Arc::new(MockAnimator::new(mocks.log.clone()))));
    mocks.log.clear();

    auto.reshape_notify(200, 150).unwrap();
    assert!(markers(&mocks.log).is_empty());
    assert!(auto.is_reshape_pending());

    auto.display().unwrap();
    assert_eq!(
        markers(&mocks.log),
        vec!["a:reshape 0,0,200,150", "a:display"]
    );
}

#[test]
fn test_reshape_left_to_bound_animator_thread() {
    let (auto, mocks) = realized(100, 100);
    let auto = Arc::new(auto);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    let animator = Animator::with_frame_interval("reshape", None);
    animator.add(&auto);
    mocks.log.clear();

    auto.reshape_notify(120, 90).unwrap();
    assert!(markers(&mocks.log).is_empty());
    assert!(auto.is_reshape_pending());
    assert_eq!(auto.fps().total_frames(), 1);

    assert!(animator.start().unwrap());
    wait_until(|| marker_count(&mocks.log, "a:display") > 0);
    animator.stop();

    assert_eq!(marker_count(&mocks.log, "a:reshape 0,0,120,90"), 1);
    assert!(marker_position(&mocks.log, "a:reshape 0,0,120,90") < marker_position(&mocks.log, "a:display"));
    assert!(!auto.is_reshape_pending());
    assert!(!animator.is_started());
}

#[test]
fn test_repaint_skipped_while_animated_elsewhere() {
    let (auto, mocks) = realized(16, 16);
    auto.add_listener(RecordingListener::new("a", &mocks.log));

    auto.window_repaint_notify().unwrap();
    assert_eq!(auto.fps().total_frames(), 1);

    let animator = Arc::new(MockAnimator::on_foreign_thread(mocks.log.clone()));
    auto.set_animator(Some(animator.clone()));
    auto.window_repaint_notify().unwrap();
    assert_eq!(auto.fps().total_frames(), 1);

    animator.set_paused(true);
    auto.window_repaint_notify().unwrap();
    assert_eq!(auto.fps().total_frames(), 2);
}

// ============================================================================
// Context management
// ============================================================================

#[test]
fn test_set_context_detaches_previous() {
    let (auto, mocks) = realized(16, 16);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    let first = auto.context_handle().unwrap();

    let next = auto.create_context(None).unwrap().unwrap();
    let previous = auto.set_context(Some(next), false).unwrap().unwrap();
    assert_eq!(previous.handle(), Some(first));
    assert_eq!(previous.associated_drawable(), None);
    assert!(!previous.is_current());
    assert!(!auto.is_context_created());

    auto.display().unwrap();
    assert_eq!(mocks.contexts.count_context_creates(), 2);
    assert_ne!(auto.context_handle(), Some(first));
    drop(previous);
    assert!(mocks.log.contains(&NativeCall::DestroyContext { context: first }));
}

#[test]
fn test_set_context_destroying_previous_disposes_listeners() {
    let (auto, mocks) = realized(16, 16);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    let first = auto.context_handle().unwrap();

    let previous = auto.set_context(None, true).unwrap().unwrap();
    assert!(!previous.is_created());
    assert!(marker_position(&mocks.log, "a:dispose")
        < position_of(&mocks.log, |call| *call == NativeCall::DestroyContext { context: first }));

    // Without a context the drawable renders nothing.
    mocks.log.clear();
    auto.display().unwrap();
    assert!(markers(&mocks.log).is_empty());
}

#[test]
fn test_shared_context_requires_created_share() {
    let (first, first_mocks) = realized(16, 16);
    let (second, _second_mocks) = realized(16, 16);
    assert!(matches!(
        second.create_context(Some(&first)),
        Err(RenderError::State(StateError::ShareContextNotCreated))
    ));

    first.display().unwrap();
    let shared = second.create_context(Some(&first)).unwrap().unwrap();
    assert_eq!(shared.share_with(), first.context_handle());
    assert!(first_mocks.contexts.count_context_creates() == 1);
}

// ============================================================================
// Invoke
// ============================================================================

#[test]
fn test_invoke_runs_after_listeners() {
    let (auto, mocks) = realized(16, 16);
    auto.add_listener(RecordingListener::new("a", &mocks.log));

    let log = mocks.log.clone();
    let ran = auto
        .invoke(true, move |_| {
            log.mark("task");
            Ok(())
        })
        .unwrap();
    assert!(ran);
    assert_eq!(
        markers(&mocks.log),
        vec!["a:init", "a:reshape 0,0,16,16", "a:display", "task"]
    );
    assert_eq!(auto.listeners().pending_tasks(), 0);
}

#[test]
fn test_invoke_on_unrealized_drawable_is_rejected() {
    let (auto, _mocks) = bound(CapabilityDescriptor::default(), 16, 16);
    assert!(!auto.invoke(true, |_| Ok(())).unwrap());
    assert_eq!(auto.listeners().pending_tasks(), 0);
}

#[test]
fn test_invoke_queues_for_foreign_animator() {
    let (auto, mocks) = realized(16, 16);
    auto.set_animator(Some(Arc::new(MockAnimator::on_foreign_thread(mocks.log.clone()))));

    let log = mocks.log.clone();
    assert!(auto
        .invoke(false, move |_| {
            log.mark("task");
            Ok(())
        })
        .unwrap());
    assert_eq!(auto.listeners().pending_tasks(), 1);
    assert!(markers(&mocks.log).is_empty());

    auto.display().unwrap();
    assert_eq!(markers(&mocks.log), vec!["task"]);
    assert_eq!(auto.listeners().pending_tasks(), 0);
}

#[test]
fn test_failing_task_is_reported() {
    let (auto, _mocks) = realized(16, 16);
    let result = auto.invoke(false, |_| Err("task failed".into()));
    assert!(matches!(
        result,
        Err(RenderError::Listener {
            phase: ListenerPhase::Task,
            ..
        })
    ));
}

// ============================================================================
// Rebinding
// ============================================================================

#[test]
fn test_rebind_after_destroy_restarts() {
    let (auto, mocks) = realized(16, 16);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    auto.destroy().unwrap();
    assert_eq!(auto.phase(), Phase::Destroyed);

    rebind(&auto, &mocks, CapabilityDescriptor::default(), 32, 24, false);
    assert_eq!(auto.phase(), Phase::Uninitialized);
    assert!(!auto.owns_device());
    assert_eq!(auto.close_policy(), None);
    auto.set_close_policy(Some(ClosePolicy::DisposeOnClose));

    mocks.log.clear();
    auto.set_realized(true).unwrap();
    auto.display().unwrap();
    assert_eq!(
        markers(&mocks.log),
        vec!["a:init", "a:reshape 0,0,32,24", "a:display"]
    );
}
