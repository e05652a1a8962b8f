use thiserror::Error;

/// An error type for the lowering and pooling kernels.
#[derive(Error, Debug, PartialEq)]
pub enum DnnOpsError {
    /// Image slice length does not match the geometry.
    #[error("image length mismatch: got {0}, expected {1}")]
    InvalidImageLength(usize, usize),

    /// Column buffer length does not match the geometry.
    #[error("column buffer length mismatch: got {0}, expected {1}")]
    InvalidColumnLength(usize, usize),

    /// Batched tensor length does not match `batch` times the per-image length.
    #[error("batched tensor length mismatch: got {0}, expected {1}")]
    InvalidBatchLength(usize, usize),

    /// Argmax buffer length does not match the pooling output length.
    #[error("argmax length mismatch: got {0}, expected {1}")]
    ArgmaxLengthMismatch(usize, usize),
}
