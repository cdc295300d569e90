use std::fmt;

use vitrine_native::NativeError;

/// Failure raised by a [`RenderListener`](crate::RenderListener) callback or
/// a queued task.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

pub type RenderResult<T> = Result<T, RenderError>;

/// The listener callback a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerPhase {
    Init,
    Display,
    Reshape,
    Dispose,
    Task,
}

impl fmt::Display for ListenerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListenerPhase::Init => "init",
            ListenerPhase::Display => "display",
            ListenerPhase::Reshape => "reshape",
            ListenerPhase::Dispose => "dispose",
            ListenerPhase::Task => "invoke task",
        })
    }
}

/// Misuse of the controller's state protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("listener state has already been pulled and not pushed back")]
    AlreadyPulled,

    #[error("controller is already bound to a live drawable")]
    AlreadyBound,

    #[error("share context has not been created")]
    ShareContextNotCreated,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("render listener failed during {phase}")]
    Listener {
        phase: ListenerPhase,
        #[source]
        source: ListenerError,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("listener index {index} out of range (0..={count})")]
    ListenerIndex { index: usize, count: usize },

    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("rendering thread is no longer running")]
    ThreadUnavailable,
}

impl RenderError {
    pub(crate) fn listener(phase: ListenerPhase, source: ListenerError) -> Self {
        RenderError::Listener { phase, source }
    }

    /// Whether this error describes an invalid request rather than a failed
    /// native allocation or callback.
    pub fn is_configuration(&self) -> bool {
        match self {
            RenderError::Native(err) => err.is_configuration(),
            RenderError::ListenerIndex { .. } | RenderError::InvalidSize { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_listener_error_keeps_source() {
        let err = RenderError::listener(ListenerPhase::Display, "shader missing".into());
        assert_eq!(err.to_string(), "render listener failed during display");
        assert_eq!(err.source().unwrap().to_string(), "shader missing");
    }

    #[test]
    fn test_configuration_classification() {
        let err: RenderError = NativeError::InsufficientColorDepth { bits: 12, min: 15 }.into();
        assert!(err.is_configuration());
        assert!(RenderError::ListenerIndex { index: 3, count: 1 }.is_configuration());
        assert!(!RenderError::from(StateError::AlreadyPulled).is_configuration());
    }
}
