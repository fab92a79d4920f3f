/// Result alias that carries the custom [`SegmenterError`] type.
pub type Result<T> = std::result::Result<T, SegmenterError>;

/// Common error type for the core crate.
///
/// The engines themselves never fail: malformed modes classify to black and
/// cancellation is a silent early return. Errors only arise while building
/// inputs, e.g. constructing a raster from a byte buffer of the wrong size.
#[derive(Debug, thiserror::Error)]
pub enum SegmenterError {
    /// A caller-supplied value could not be turned into a valid input.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// Free-form error used by collaborators (image decoding, file output).
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SegmenterError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SegmenterError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SegmenterError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
