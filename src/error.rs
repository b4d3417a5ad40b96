//! Error taxonomy for the scheduling core (`spec.md` §7).
//!
//! Four families: configuration errors are fatal for the batch that
//! introduced them; state and capacity errors are returned to the caller
//! with no mutation applied; "not found" is either an `Option::None` on read
//! paths or a silent no-op (unreserve), never an error variant constructed
//! on those paths — the variant exists for the update-path callers named in
//! §7.

use thiserror::Error;

use crate::queue::QueueState;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("resource '{resource}' has invalid value '{value}'")]
    InvalidResourceValue { resource: String, value: String },

    #[error("queue path '{0}' is not unique among its siblings")]
    DuplicateQueueName(String),

    #[error("unknown partition '{0}'")]
    UnknownPartition(String),

    #[error("malformed configuration document: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("queue '{queue}' cannot transition from {from:?} via {event}")]
    IllegalTransition {
        queue: String,
        from: QueueState,
        event: &'static str,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("ask for queue '{queue}' exceeds max resource: request={request}, max={max}")]
    MaxExceeded {
        queue: String,
        request: String,
        max: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("queue path '{0}' does not exist")]
    QueuePath(String),

    #[error("application '{0}' does not exist")]
    Application(String),

    #[error("ask key '{0}' does not exist for application '{1}'")]
    AskKey(String, String),
}
