//! Queue lifecycle state machine (`spec.md` §4.2).
//!
//! A fixed transition table rather than an open match, so adding a
//! transition means editing one table (`spec.md` §9).

use serde::{Deserialize, Serialize};

use crate::error::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueState {
    Running,
    Stopped,
    Draining,
}

impl Default for QueueState {
    fn default() -> Self {
        QueueState::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    Start,
    Stop,
    Remove,
}

impl QueueEvent {
    fn name(self) -> &'static str {
        match self {
            QueueEvent::Start => "Start",
            QueueEvent::Stop => "Stop",
            QueueEvent::Remove => "Remove",
        }
    }
}

/// Apply `event` to `from`, returning the new state or the illegal
/// transition it would have required. `Draining` is terminal: `Start` from
/// `Draining` always fails.
pub fn transition(queue: &str, from: QueueState, event: QueueEvent) -> Result<QueueState, StateError> {
    use QueueEvent::*;
    use QueueState::*;

    match (from, event) {
        (Running, Stop) => Ok(Stopped),
        (Stopped, Start) => Ok(Running),
        (Running, Remove) | (Stopped, Remove) | (Draining, Remove) => Ok(Draining),
        _ => Err(StateError::IllegalTransition {
            queue: queue.to_string(),
            from,
            event: event.name(),
        }),
    }
}
