//! Integration tests for pulling and pushing listener and GL state.

mod common;

use std::sync::Arc;

use common::*;
use vitrine_native::CapabilityDescriptor;
use vitrine_render::{AutoDrawable, RenderError, StateError, StateKeeperListener};
use vitrine_test_utils::{CallLog, MockGlState, NativeCall};

struct Keeper {
    log: CallLog,
}

impl StateKeeperListener for Keeper {
    fn on_preserving(&self, drawable: &AutoDrawable) {
        self.log
            .mark(format!("keeper:preserving {}", drawable.listener_count()));
    }

    fn on_restored(&self, drawable: &AutoDrawable) {
        self.log
            .mark(format!("keeper:restored {}", drawable.listener_count()));
    }
}

// ============================================================================
// Pull and push
// ============================================================================

#[test]
fn test_pull_then_push_round_trip() {
    let (auto, mocks) = realized(32, 32);
    let a = RecordingListener::new("a", &mocks.log);
    let b = RecordingListener::new("b", &mocks.log);
    auto.add_listener(a.clone());
    auto.add_listener(b.clone());
    auto.display().unwrap();
    let context = auto.context_handle().unwrap();

    assert!(auto.pull_state().unwrap());
    assert_eq!(auto.listener_count(), 0);
    {
        let preserved = auto.preserved_state().unwrap();
        assert_eq!(preserved.listener_count(), 2);
        assert_eq!(preserved.was_initialized(0), Some(true));
        assert_eq!(preserved.was_initialized(1), Some(true));
        let gl_state = preserved.gl_state().unwrap();
        assert_eq!(
            gl_state.downcast_ref::<MockGlState>(),
            Some(&MockGlState {
                captured_from: context
            })
        );
    }

    assert!(matches!(
        auto.pull_state(),
        Err(RenderError::State(StateError::AlreadyPulled))
    ));

    assert!(auto.push_state().unwrap());
    assert!(!auto.is_state_preserved());
    let first = auto.listener(0).unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&first), Arc::as_ptr(&a)));
    assert_eq!(auto.listener_init_state(&b.shared()), Some(true));

    mocks.log.clear();
    auto.display().unwrap();
    assert_eq!(markers(&mocks.log), vec!["a:display", "b:display"]);
    assert_eq!(mocks.contexts.restored_states().len(), 1);
    assert!(!auto.push_state().unwrap());
}

#[test]
fn test_pull_without_created_context() {
    let (auto, mocks) = realized(32, 32);
    auto.add_listener(RecordingListener::new("a", &mocks.log));

    assert!(!auto.pull_state().unwrap());
    assert_eq!(auto.listener_count(), 1);
    assert!(!auto.is_state_preserved());
}

#[test]
fn test_push_without_state() {
    let (auto, _mocks) = realized(32, 32);
    assert!(!auto.push_state().unwrap());
}

#[test]
fn test_keeper_observes_pull_and_push() {
    let (auto, mocks) = realized(32, 32);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    let previous = auto.set_state_keeper_listener(Some(Arc::new(Keeper {
        log: mocks.log.clone(),
    })));
    assert!(previous.is_none());
    mocks.log.clear();

    auto.pull_state().unwrap();
    auto.push_state().unwrap();
    assert_eq!(
        markers(&mocks.log),
        vec!["keeper:preserving 1", "keeper:restored 1"]
    );
}

#[test]
fn test_cleared_state_is_not_pushed() {
    let (auto, mocks) = realized(32, 32);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    auto.pull_state().unwrap();

    let cleared = auto.clear_preserved_state().unwrap();
    assert_eq!(cleared.listener_count(), 1);
    assert!(!auto.push_state().unwrap());
    assert_eq!(auto.listener_count(), 0);
}

// ============================================================================
// Preservation across destroy
// ============================================================================

#[test]
fn test_state_preserved_across_destroy_and_rebind() {
    let (auto, mocks) = realized(32, 32);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    auto.preserve_state_at_destroy(true);

    auto.destroy().unwrap();
    assert!(auto.is_state_preserved());
    assert!(!auto.is_preserve_state_at_destroy());
    assert!(!markers(&mocks.log).contains(&"a:dispose".to_string()));
    assert!(mocks
        .log
        .contains(&NativeCall::DestroyContext {
            context: auto
                .preserved_state()
                .and_then(|state| {
                    state
                        .gl_state()
                        .and_then(|blob| blob.downcast_ref::<MockGlState>())
                        .map(|state| state.captured_from)
                })
                .unwrap()
        }));

    rebind(&auto, &mocks, CapabilityDescriptor::default(), 48, 48, true);
    assert!(auto.push_state().unwrap());
    auto.set_realized(true).unwrap();
    mocks.log.clear();
    auto.display().unwrap();

    assert_eq!(
        markers(&mocks.log),
        vec!["a:reshape 0,0,48,48", "a:display"]
    );
    assert_eq!(mocks.contexts.restored_states().len(), 1);
    assert_eq!(
        mocks
            .log
            .count(|call| matches!(call, NativeCall::RestoreState { .. })),
        1
    );
}

#[test]
fn test_gl_state_pushed_without_context_waits_for_next_bind() {
    let (auto, mocks) = realized(32, 32);
    auto.add_listener(RecordingListener::new("a", &mocks.log));
    auto.display().unwrap();
    auto.preserve_state_at_destroy(true);
    auto.destroy().unwrap();

    assert!(auto.push_state().unwrap());
    assert_eq!(auto.listener_count(), 1);
    assert!(auto.has_orphan_gl_state());

    rebind(&auto, &mocks, CapabilityDescriptor::default(), 32, 32, true);
    assert!(!auto.has_orphan_gl_state());
    auto.set_realized(true).unwrap();
    auto.display().unwrap();
    assert_eq!(mocks.contexts.restored_states().len(), 1);
}
