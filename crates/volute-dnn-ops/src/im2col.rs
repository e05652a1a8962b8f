use num_traits::Float;

use crate::error::DnnOpsError;
use crate::layout::TensorLayout;

/// Sliding-window geometry for [`im2col`]/[`col2im`] over a single image.
///
/// `output_h`/`output_w` must be the output dimensions the caller derived
/// from the input size, kernel, padding and stride; that relationship is
/// trusted and not re-derived here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dGeometry {
    /// Number of input channels.
    pub channels: usize,
    /// Input height.
    pub height: usize,
    /// Input width.
    pub width: usize,
    /// Kernel height.
    pub kernel_h: usize,
    /// Kernel width.
    pub kernel_w: usize,
    /// Output height.
    pub output_h: usize,
    /// Output width.
    pub output_w: usize,
    /// Implicit zero-padding rows above and below the image.
    pub padding_h: usize,
    /// Implicit zero-padding columns left and right of the image.
    pub padding_w: usize,
    /// Vertical stride between consecutive windows.
    pub stride_h: usize,
    /// Horizontal stride between consecutive windows.
    pub stride_w: usize,
}

impl Conv2dGeometry {
    /// Number of elements of one input image.
    pub fn image_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Number of elements of the dense column buffer.
    pub fn col_len(&self) -> usize {
        self.channels * self.kernel_len() * self.output_len()
    }

    /// Flattened kernel window size.
    pub fn kernel_len(&self) -> usize {
        self.kernel_h * self.kernel_w
    }

    /// Flattened output size.
    pub fn output_len(&self) -> usize {
        self.output_h * self.output_w
    }
}

/// Expand a padded, strided sliding-window view of one image into a dense
/// column buffer.
///
/// Every element of `dst` is written: either a copy of the input element the
/// window position maps to, or an explicit zero where the position falls in
/// the padded region. The element ordering of `dst` follows the layout `L`
/// (channel-major groups by channel first, channel-minor keeps all channels
/// of one sample contiguous), so the matrix multiply consuming the buffer
/// must be instantiated with the same layout.
///
/// Batching is the caller's loop: invoke once per image, sequentially or
/// from a parallel iterator over disjoint destination buffers.
///
/// # Arguments
///
/// * `src` - The input image, `geometry.image_len()` elements in layout `L`.
/// * `dst` - The column buffer to fill, `geometry.col_len()` elements.
/// * `geometry` - The window geometry.
///
/// # Errors
///
/// Returns an error if a slice length does not match the geometry.
///
/// # Example
///
/// ```
/// use volute_dnn_ops::{im2col, Conv2dGeometry, Nchw};
///
/// let geometry = Conv2dGeometry {
///     channels: 1,
///     height: 3,
///     width: 3,
///     kernel_h: 2,
///     kernel_w: 2,
///     output_h: 2,
///     output_w: 2,
///     padding_h: 0,
///     padding_w: 0,
///     stride_h: 1,
///     stride_w: 1,
/// };
///
/// let image = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
/// let mut cols = [0.0f32; 16];
/// im2col::<f32, Nchw>(&image, &mut cols, &geometry).unwrap();
///
/// assert_eq!(
///     cols,
///     [
///         1.0, 2.0, 4.0, 5.0, // kernel position (0, 0)
///         2.0, 3.0, 5.0, 6.0, // kernel position (0, 1)
///         4.0, 5.0, 7.0, 8.0, // kernel position (1, 0)
///         5.0, 6.0, 8.0, 9.0, // kernel position (1, 1)
///     ]
/// );
/// ```
pub fn im2col<T, L>(src: &[T], dst: &mut [T], geometry: &Conv2dGeometry) -> Result<(), DnnOpsError>
where
    T: Float,
    L: TensorLayout,
{
    if src.len() != geometry.image_len() {
        return Err(DnnOpsError::InvalidImageLength(
            src.len(),
            geometry.image_len(),
        ));
    }
    if dst.len() != geometry.col_len() {
        return Err(DnnOpsError::InvalidColumnLength(
            dst.len(),
            geometry.col_len(),
        ));
    }

    let g = geometry;
    let kernel_len = g.kernel_len();
    let output_len = g.output_len();

    for c in 0..g.channels {
        for r in 0..g.kernel_h {
            for s in 0..g.kernel_w {
                let k = r * g.kernel_w + s;
                for p in 0..g.output_h {
                    let h = (p * g.stride_h + r) as isize - g.padding_h as isize;
                    let row = p * g.output_w;
                    if h < 0 || h >= g.height as isize {
                        // the whole output row reads from the padded region
                        for q in 0..g.output_w {
                            dst[L::col_offset(c, k, row + q, g.channels, kernel_len, output_len)] =
                                T::zero();
                        }
                        continue;
                    }
                    let h = h as usize;
                    for q in 0..g.output_w {
                        let w = (q * g.stride_w + s) as isize - g.padding_w as isize;
                        let value = if w < 0 || w >= g.width as isize {
                            T::zero()
                        } else {
                            src[L::offset(c, h, w as usize, g.channels, g.height, g.width)]
                        };
                        dst[L::col_offset(c, k, row + q, g.channels, kernel_len, output_len)] =
                            value;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Scatter-accumulate a dense column buffer back into an image, the adjoint
/// of [`im2col`].
///
/// Each column element is added (`+=`) to the input position its window slot
/// maps to; slots that map into the padded region are dropped. Accumulation
/// is required because overlapping windows (stride smaller than the kernel)
/// contribute to the same input position more than once. `dst` is never
/// zeroed here — the caller pre-zeroes it.
///
/// # Arguments
///
/// * `cols` - The column buffer, `geometry.col_len()` elements ordered as
///   [`im2col`] with the same `L` would have produced.
/// * `dst` - The image-gradient buffer to accumulate into,
///   `geometry.image_len()` elements in layout `L`.
/// * `geometry` - The window geometry.
///
/// # Errors
///
/// Returns an error if a slice length does not match the geometry.
///
/// # Example
///
/// ```
/// use volute_dnn_ops::{col2im, Conv2dGeometry, Nchw};
///
/// let geometry = Conv2dGeometry {
///     channels: 1,
///     height: 2,
///     width: 2,
///     kernel_h: 2,
///     kernel_w: 2,
///     output_h: 1,
///     output_w: 1,
///     padding_h: 0,
///     padding_w: 0,
///     stride_h: 1,
///     stride_w: 1,
/// };
///
/// let cols = [1.0f32, 2.0, 3.0, 4.0];
/// let mut grad = [0.0f32; 4];
/// col2im::<f32, Nchw>(&cols, &mut grad, &geometry).unwrap();
///
/// assert_eq!(grad, [1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn col2im<T, L>(cols: &[T], dst: &mut [T], geometry: &Conv2dGeometry) -> Result<(), DnnOpsError>
where
    T: Float,
    L: TensorLayout,
{
    if cols.len() != geometry.col_len() {
        return Err(DnnOpsError::InvalidColumnLength(
            cols.len(),
            geometry.col_len(),
        ));
    }
    if dst.len() != geometry.image_len() {
        return Err(DnnOpsError::InvalidImageLength(
            dst.len(),
            geometry.image_len(),
        ));
    }

    let g = geometry;
    let kernel_len = g.kernel_len();
    let output_len = g.output_len();

    for c in 0..g.channels {
        for r in 0..g.kernel_h {
            for s in 0..g.kernel_w {
                let k = r * g.kernel_w + s;
                for p in 0..g.output_h {
                    let h = (p * g.stride_h + r) as isize - g.padding_h as isize;
                    if h < 0 || h >= g.height as isize {
                        continue;
                    }
                    let h = h as usize;
                    let row = p * g.output_w;
                    for q in 0..g.output_w {
                        let w = (q * g.stride_w + s) as isize - g.padding_w as isize;
                        if w < 0 || w >= g.width as isize {
                            continue;
                        }
                        let i = L::offset(c, h, w as usize, g.channels, g.height, g.width);
                        dst[i] = dst[i]
                            + cols[L::col_offset(c, k, row + q, g.channels, kernel_len, output_len)];
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Nchw, Nhwc};

    fn geometry_3x3_k2() -> Conv2dGeometry {
        Conv2dGeometry {
            channels: 1,
            height: 3,
            width: 3,
            kernel_h: 2,
            kernel_w: 2,
            output_h: 2,
            output_w: 2,
            padding_h: 0,
            padding_w: 0,
            stride_h: 1,
            stride_w: 1,
        }
    }

    #[test]
    fn test_im2col_zero_input_stays_zero() {
        let geometry = Conv2dGeometry {
            channels: 2,
            height: 3,
            width: 4,
            kernel_h: 3,
            kernel_w: 3,
            output_h: 3,
            output_w: 4,
            padding_h: 1,
            padding_w: 1,
            stride_h: 1,
            stride_w: 1,
        };
        let src = vec![0.0f32; geometry.image_len()];

        let mut cols = vec![1.0f32; geometry.col_len()];
        im2col::<f32, Nchw>(&src, &mut cols, &geometry).unwrap();
        assert!(cols.iter().all(|&v| v == 0.0));

        let mut cols = vec![1.0f32; geometry.col_len()];
        im2col::<f32, Nhwc>(&src, &mut cols, &geometry).unwrap();
        assert!(cols.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_im2col_nchw_with_padding() {
        let geometry = Conv2dGeometry {
            channels: 1,
            height: 2,
            width: 2,
            kernel_h: 2,
            kernel_w: 2,
            output_h: 3,
            output_w: 3,
            padding_h: 1,
            padding_w: 1,
            stride_h: 1,
            stride_w: 1,
        };
        let src = [1.0f32, 2.0, 3.0, 4.0];
        let mut cols = vec![0.0f32; geometry.col_len()];
        im2col::<f32, Nchw>(&src, &mut cols, &geometry).unwrap();

        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 3.0, 4.0, // kernel position (0, 0)
            0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 3.0, 4.0, 0.0, // kernel position (0, 1)
            0.0, 1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, // kernel position (1, 0)
            1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, // kernel position (1, 1)
        ];
        assert_eq!(cols.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_im2col_nhwc_keeps_channels_contiguous() {
        // one 2x2 window over a 2x2 image: the column buffer is the four
        // pixels in scan order, channels interleaved
        let geometry = Conv2dGeometry {
            channels: 2,
            height: 2,
            width: 2,
            kernel_h: 2,
            kernel_w: 2,
            output_h: 1,
            output_w: 1,
            padding_h: 0,
            padding_w: 0,
            stride_h: 1,
            stride_w: 1,
        };
        let src = [1.0f32, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0];
        let mut cols = vec![0.0f32; geometry.col_len()];
        im2col::<f32, Nhwc>(&src, &mut cols, &geometry).unwrap();
        assert_eq!(
            cols.as_slice(),
            [1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0].as_slice()
        );
    }

    #[test]
    fn test_col2im_counts_overlapping_windows() {
        // stride < kernel: each input position accumulates one contribution
        // per window that covers it
        let geometry = geometry_3x3_k2();
        let cols = vec![1.0f32; geometry.col_len()];
        let mut grad = vec![0.0f32; geometry.image_len()];
        col2im::<f32, Nchw>(&cols, &mut grad, &geometry).unwrap();

        #[rustfmt::skip]
        let expected = [
            1.0, 2.0, 1.0,
            2.0, 4.0, 2.0,
            1.0, 2.0, 1.0,
        ];
        assert_eq!(grad.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_col2im_drops_padded_positions() {
        let geometry = Conv2dGeometry {
            channels: 1,
            height: 2,
            width: 2,
            kernel_h: 2,
            kernel_w: 2,
            output_h: 3,
            output_w: 3,
            padding_h: 1,
            padding_w: 1,
            stride_h: 1,
            stride_w: 1,
        };
        let cols = vec![1.0f32; geometry.col_len()];
        let mut grad = vec![0.0f32; geometry.image_len()];
        col2im::<f32, Nchw>(&cols, &mut grad, &geometry).unwrap();

        // every input position is covered by 4 of the 9 windows; the other
        // contributions land in the padding and are dropped
        assert_eq!(grad.as_slice(), [4.0, 4.0, 4.0, 4.0].as_slice());
    }

    #[test]
    fn test_col2im_accumulates_into_existing_values() {
        let geometry = geometry_3x3_k2();
        let cols = vec![1.0f32; geometry.col_len()];
        let mut grad = vec![10.0f32; geometry.image_len()];
        col2im::<f32, Nchw>(&cols, &mut grad, &geometry).unwrap();
        assert_eq!(grad[4], 14.0);
        assert_eq!(grad[0], 11.0);
    }

    #[test]
    fn test_im2col_invalid_image_length() {
        let geometry = geometry_3x3_k2();
        let src = [0.0f32; 4];
        let mut cols = vec![0.0f32; geometry.col_len()];
        let result = im2col::<f32, Nchw>(&src, &mut cols, &geometry);
        assert!(matches!(
            result,
            Err(DnnOpsError::InvalidImageLength(4, 9))
        ));
    }

    #[test]
    fn test_col2im_invalid_column_length() {
        let geometry = geometry_3x3_k2();
        let cols = [0.0f32; 3];
        let mut grad = vec![0.0f32; geometry.image_len()];
        let result = col2im::<f32, Nchw>(&cols, &mut grad, &geometry);
        assert!(matches!(
            result,
            Err(DnnOpsError::InvalidColumnLength(3, 16))
        ));
    }
}
