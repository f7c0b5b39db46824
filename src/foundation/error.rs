/// Result type returned by compositing and rendering APIs.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Errors reported by the tile store, compositor and renderer.
#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    /// Inputs that do not fit together, such as mismatched region sizes.
    #[error("validation error: {0}")]
    Validation(String),

    /// A rectangle with negative or empty extent.
    #[error("invalid rectangle: {0}")]
    InvalidRect(String),

    /// An image and projection that cannot be composited together.
    #[error("composite error: {0}")]
    Composite(String),

    /// Bad display parameters or a missing pyramid level.
    #[error("render error: {0}")]
    Render(String),

    /// Unparseable render settings.
    #[error("settings error: {0}")]
    Settings(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MosaicError {
    /// Build a [`MosaicError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MosaicError::InvalidRect`] value.
    pub fn invalid_rect(msg: impl Into<String>) -> Self {
        Self::InvalidRect(msg.into())
    }

    /// Build a [`MosaicError::Composite`] value.
    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }

    /// Build a [`MosaicError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`MosaicError::Settings`] value.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
