//! Error types for workspace I/O and event handlers.

/// Failures talking to the workspace.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("slack connection failed: {0}")]
    Connection(String),
    #[error("slack send failed: {0}")]
    Send(String),
    #[error("slack request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("slack api error: {0}")]
    Api(String),
}

/// Failure inside an event handler. Logged by the dispatcher; never retried.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("reply not delivered: {0}")]
    Reply(#[from] ChannelError),
    #[error("event rejected: {0}")]
    Rejected(String),
}
