/// Convenience result type used across flurry.
pub type FlurryResult<T> = Result<T, FlurryError>;

/// Top-level error taxonomy used at the edges of the engine.
///
/// Per-frame `update`/`process` calls never return these: parameter problems are clamped and
/// compile failures degrade to pass-through. Errors surface only from asset preparation, model
/// validation, rasterization and frame output.
#[derive(thiserror::Error, Debug)]
pub enum FlurryError {
    /// Invalid user-provided model data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while evaluating a frame (bad surfaces, size overflow).
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors while rasterizing operations.
    #[error("render error: {0}")]
    Render(String),

    /// The graphics device is permanently unavailable for this process.
    #[error("graphics device unavailable: {0}")]
    Unavailable(String),

    /// A disposed resource was accessed through a fallible accessor.
    #[error("{0} used after dispose")]
    Disposed(&'static str),

    /// Errors when serializing or deserializing models.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlurryError {
    /// Build a [`FlurryError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlurryError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`FlurryError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`FlurryError::Unavailable`] value.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Build a [`FlurryError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for FlurryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
