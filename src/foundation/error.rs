/// Crate-wide result alias.
pub type VanimResult<T> = Result<T, VanimError>;

/// Error type shared by the playback, batch and progress layers.
///
/// Cancellation and rejected `Start` commands are reported through outcome types, not through
/// this enum.
#[derive(thiserror::Error, Debug)]
pub enum VanimError {
    /// Invalid configuration or arguments, raised before any IO happens.
    #[error("validation error: {0}")]
    Validation(String),

    /// The clip resource could not be opened or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Rasterizing onto a surface failed.
    #[error("render error: {0}")]
    Render(String),

    /// Encoding or persisting a frame image failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Anything else, usually IO with an `anyhow` context chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VanimError {
    /// Build a [`VanimError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VanimError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`VanimError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`VanimError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
