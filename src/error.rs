use thiserror::Error;

use crate::types::Asset;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("read failed: {0}")]
    Transport(String),

    #[error("malformed tick: {0}")]
    Decode(String),

    #[error("stream closed by peer")]
    Closed,
}

impl FeedError {
    /// Terminal errors end the current stream; the reader reconnects.
    /// A decode error only costs the one message.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FeedError::Decode(_))
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("nothing to render for {0}")]
    EmptySeries(Asset),
}
