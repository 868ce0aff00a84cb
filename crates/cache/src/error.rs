use thiserror::Error;

/// Cache error type.
///
/// Every public handler operation catches these at its boundary and degrades
/// to a miss or a no-op; nothing here crosses into the render pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store connection error: {0}")]
    Connection(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store command timed out")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

impl Error {
    /// Whether the underlying failure indicates a dropped or broken
    /// connection that a reconnect could repair.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Connection(_) => true,
            Error::Redis(e) => {
                e.is_connection_dropped()
                    || e.is_io_error()
                    || e.is_connection_refusal()
                    // Older client versions surface a dead socket only
                    // through the message text.
                    || e.to_string().contains("broken pipe")
            }
            Error::Serialization(_) => false,
        }
    }
}
