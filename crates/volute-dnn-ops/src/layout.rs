mod private {
    pub trait Sealed {}
    impl Sealed for super::Nchw {}
    impl Sealed for super::Nhwc {}
}

/// Index-mapping strategy for one physical memory layout of a
/// `(batch, channel, height, width)` tensor.
///
/// The trait is sealed: the column-buffer ordering produced by
/// [`col_offset`](TensorLayout::col_offset) is a contract with the matrix
/// multiply that consumes the buffer, so no layout can be added from outside
/// this crate.
pub trait TensorLayout: private::Sealed + Copy + Send + Sync + 'static {
    /// Linear offset of the element `(c, h, w)` inside one image of shape
    /// `(channels, height, width)`.
    ///
    /// Pooling reuses this mapping for its output grid by substituting the
    /// output dimensions for `height`/`width`.
    fn offset(c: usize, h: usize, w: usize, channels: usize, height: usize, width: usize)
        -> usize;

    /// Linear offset inside the dense column buffer of the patch element
    /// `(c, k, o)`, where `k` is the flattened kernel position `r * S + s`
    /// and `o` the flattened output position `p * Q + q`.
    fn col_offset(
        c: usize,
        k: usize,
        o: usize,
        channels: usize,
        kernel_len: usize,
        output_len: usize,
    ) -> usize;
}

/// Channel-major layout: the channel index varies slowest (`NCHW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nchw;

/// Channel-minor layout: the channel index varies fastest (`NHWC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nhwc;

impl TensorLayout for Nchw {
    #[inline]
    fn offset(
        c: usize,
        h: usize,
        w: usize,
        _channels: usize,
        height: usize,
        width: usize,
    ) -> usize {
        (c * height + h) * width + w
    }

    #[inline]
    fn col_offset(
        c: usize,
        k: usize,
        o: usize,
        _channels: usize,
        kernel_len: usize,
        output_len: usize,
    ) -> usize {
        (c * kernel_len + k) * output_len + o
    }
}

impl TensorLayout for Nhwc {
    #[inline]
    fn offset(
        c: usize,
        h: usize,
        w: usize,
        channels: usize,
        _height: usize,
        width: usize,
    ) -> usize {
        (h * width + w) * channels + c
    }

    #[inline]
    fn col_offset(
        c: usize,
        k: usize,
        o: usize,
        channels: usize,
        kernel_len: usize,
        _output_len: usize,
    ) -> usize {
        (o * kernel_len + k) * channels + c
    }
}
