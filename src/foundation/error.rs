/// Convenience result type used across animgif.
pub type AnimResult<T> = Result<T, AnimError>;

/// Top-level error taxonomy used by decoder, cache and playback APIs.
#[derive(thiserror::Error, Debug)]
pub enum AnimError {
    /// Malformed container: bad signature, unknown block introducer or truncated sub-block.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid compressed image data (bad LZW back-reference, pixel stack overflow).
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// The source offers neither a byte stream nor a resolvable identity.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    /// Mutually exclusive or out-of-domain playback rate settings.
    #[error("configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// Out-of-range arguments or invalid options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnimError {
    /// Build an [`AnimError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build an [`AnimError::CorruptData`] value.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }

    /// Build an [`AnimError::UnsupportedSource`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedSource(msg.into())
    }

    /// Build an [`AnimError::ConfigurationConflict`] value.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConfigurationConflict(msg.into())
    }

    /// Build an [`AnimError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Produce an equivalent error for another waiter on a shared computation.
    ///
    /// The variant and message are preserved; wrapped sources are flattened into their
    /// rendered chain.
    pub fn replicate(&self) -> Self {
        match self {
            Self::Decode(m) => Self::Decode(m.clone()),
            Self::CorruptData(m) => Self::CorruptData(m.clone()),
            Self::UnsupportedSource(m) => Self::UnsupportedSource(m.clone()),
            Self::ConfigurationConflict(m) => Self::ConfigurationConflict(m.clone()),
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::Other(e) => Self::Other(anyhow::anyhow!("{e:#}")),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
