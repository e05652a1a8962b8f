#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the kernels in this crate.
pub mod error;

/// Lowering between sliding-window views and dense column buffers.
///
/// [`im2col`](im2col::im2col) expands a padded, strided window view of one
/// image into a column buffer so that convolution reduces to matrix
/// multiplication; [`col2im`](im2col::col2im) is its adjoint and
/// scatter-accumulates a gradient buffer back into the image.
pub mod im2col;

/// Memory-layout strategies for 4D tensors.
///
/// The kernels are written once and parametrized by [`TensorLayout`], with
/// [`Nchw`] (channel-major) and [`Nhwc`] (channel-minor) supplying the two
/// offset mappings.
pub mod layout;

/// Max-pooling forward and backward kernels.
pub mod pooling;

pub use error::DnnOpsError;
pub use im2col::{col2im, im2col, Conv2dGeometry};
pub use layout::{Nchw, Nhwc, TensorLayout};
pub use pooling::{max_pool2d, max_pool2d_backward, Pool2dGeometry};
