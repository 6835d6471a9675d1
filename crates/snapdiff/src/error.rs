use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    /// Reference could not be fetched or decoded.
    #[error("failed to load image {reference}: {reason}")]
    Load { reference: String, reason: String },

    /// Both inputs are zero-sized; there is nothing to compare.
    #[error("degenerate input: {left_w}x{left_h} vs {right_w}x{right_h}")]
    Dimension {
        left_w: u32,
        left_h: u32,
        right_w: u32,
        right_h: u32,
    },

    #[error("failed to encode diff image: {0}")]
    Encode(String),

    #[error("comparison cancelled")]
    Cancelled,

    #[error("comparison task failed: {0}")]
    Task(String),
}

impl DiffError {
    pub(crate) fn load(reference: impl ToString, reason: impl ToString) -> Self {
        Self::Load {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }
}
