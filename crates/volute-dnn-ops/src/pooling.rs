use num_traits::Float;
use rayon::prelude::*;

use crate::error::DnnOpsError;
use crate::layout::TensorLayout;

/// Window geometry for [`max_pool2d`]/[`max_pool2d_backward`].
///
/// Pooling windows carry no padding: `output_h`/`output_w` must be chosen by
/// the caller so that every window lies fully inside the image. That
/// relationship is trusted and not re-derived here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool2dGeometry {
    /// Number of channels, preserved between input and output.
    pub channels: usize,
    /// Input height.
    pub height: usize,
    /// Input width.
    pub width: usize,
    /// Output height.
    pub output_h: usize,
    /// Output width.
    pub output_w: usize,
    /// Window height.
    pub kernel_h: usize,
    /// Window width.
    pub kernel_w: usize,
    /// Vertical stride between consecutive windows.
    pub stride_h: usize,
    /// Horizontal stride between consecutive windows.
    pub stride_w: usize,
}

impl Pool2dGeometry {
    /// Number of elements of one input image.
    pub fn image_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Number of elements of one output image.
    pub fn output_len(&self) -> usize {
        self.channels * self.output_h * self.output_w
    }
}

/// Max-pooling forward pass over a batch of images.
///
/// For every batch element, channel and output position, scans the window
/// row-major (top-to-bottom, left-to-right) and writes the maximum to `dst`.
/// `argmax` receives, per output element, the linear offset of the winning
/// element inside the image of the same batch element — the handoff
/// [`max_pool2d_backward`] consumes to route gradients. Ties keep the
/// first-visited element: the comparison is strict, so a later equal value
/// never replaces the running best. Reordering the scan would silently
/// change which gradient path the backward pass takes.
///
/// Batch elements are processed in parallel; each writes its own disjoint
/// slice of `dst` and `argmax`.
///
/// # Arguments
///
/// * `src` - The input tensor, `batch * geometry.image_len()` elements in
///   layout `L`.
/// * `dst` - The output tensor, `batch * geometry.output_len()` elements.
/// * `argmax` - The argmax buffer, same length as `dst`.
/// * `batch` - Number of batch elements.
/// * `geometry` - The window geometry.
///
/// # Errors
///
/// Returns an error if a slice length does not match the geometry.
///
/// # Example
///
/// ```
/// use volute_dnn_ops::{max_pool2d, Nchw, Pool2dGeometry};
///
/// let geometry = Pool2dGeometry {
///     channels: 1,
///     height: 4,
///     width: 4,
///     output_h: 2,
///     output_w: 2,
///     kernel_h: 2,
///     kernel_w: 2,
///     stride_h: 2,
///     stride_w: 2,
/// };
///
/// let src: Vec<f32> = (1..=16).map(|v| v as f32).collect();
/// let mut dst = [0.0f32; 4];
/// let mut argmax = [0usize; 4];
/// max_pool2d::<f32, Nchw>(&src, &mut dst, &mut argmax, 1, &geometry).unwrap();
///
/// assert_eq!(dst, [6.0, 8.0, 14.0, 16.0]);
/// assert_eq!(argmax, [5, 7, 13, 15]);
/// ```
pub fn max_pool2d<T, L>(
    src: &[T],
    dst: &mut [T],
    argmax: &mut [usize],
    batch: usize,
    geometry: &Pool2dGeometry,
) -> Result<(), DnnOpsError>
where
    T: Float + Send + Sync,
    L: TensorLayout,
{
    let image_len = geometry.image_len();
    let output_len = geometry.output_len();
    if src.len() != batch * image_len {
        return Err(DnnOpsError::InvalidBatchLength(src.len(), batch * image_len));
    }
    if dst.len() != batch * output_len {
        return Err(DnnOpsError::InvalidBatchLength(
            dst.len(),
            batch * output_len,
        ));
    }
    if argmax.len() != dst.len() {
        return Err(DnnOpsError::ArgmaxLengthMismatch(argmax.len(), dst.len()));
    }

    src.par_chunks_exact(image_len)
        .zip(dst.par_chunks_exact_mut(output_len))
        .zip(argmax.par_chunks_exact_mut(output_len))
        .for_each(|((image, out), idx)| {
            max_pool2d_image::<T, L>(image, out, idx, geometry);
        });

    Ok(())
}

fn max_pool2d_image<T, L>(image: &[T], out: &mut [T], argmax: &mut [usize], g: &Pool2dGeometry)
where
    T: Float,
    L: TensorLayout,
{
    for c in 0..g.channels {
        for p in 0..g.output_h {
            let hs = p * g.stride_h;
            for q in 0..g.output_w {
                let ws = q * g.stride_w;
                debug_assert!(hs + g.kernel_h <= g.height && ws + g.kernel_w <= g.width);
                let mut best = L::offset(c, hs, ws, g.channels, g.height, g.width);
                for h in hs..hs + g.kernel_h {
                    for w in ws..ws + g.kernel_w {
                        let candidate = L::offset(c, h, w, g.channels, g.height, g.width);
                        if image[candidate] > image[best] {
                            best = candidate;
                        }
                    }
                }
                let o = L::offset(c, p, q, g.channels, g.output_h, g.output_w);
                out[o] = image[best];
                argmax[o] = best;
            }
        }
    }
}

/// Max-pooling backward pass over a batch of images.
///
/// For every output-gradient element, overwrites the input-gradient position
/// recorded in `argmax` with the gradient value. Positions never selected by
/// any window keep whatever the caller pre-populated (typically zero);
/// nothing else is touched. When windows overlap and share an argmax, the
/// last-processed output wins — overwrite, not accumulate, matching the
/// forward/backward contract this pair was designed with.
///
/// The argmax convention makes this routine layout-independent: the recorded
/// offsets already encode the layout the forward pass ran under.
///
/// # Arguments
///
/// * `grad_out` - The output-gradient tensor, `batch * geometry.output_len()`
///   elements.
/// * `grad_in` - The input-gradient tensor, `batch * geometry.image_len()`
///   elements, pre-populated by the caller.
/// * `argmax` - The argmax buffer written by [`max_pool2d`], same length as
///   `grad_out`.
/// * `batch` - Number of batch elements.
/// * `geometry` - The window geometry of the forward pass.
///
/// # Errors
///
/// Returns an error if a slice length does not match the geometry.
pub fn max_pool2d_backward<T>(
    grad_out: &[T],
    grad_in: &mut [T],
    argmax: &[usize],
    batch: usize,
    geometry: &Pool2dGeometry,
) -> Result<(), DnnOpsError>
where
    T: Float + Send + Sync,
{
    let image_len = geometry.image_len();
    let output_len = geometry.output_len();
    if grad_out.len() != batch * output_len {
        return Err(DnnOpsError::InvalidBatchLength(
            grad_out.len(),
            batch * output_len,
        ));
    }
    if grad_in.len() != batch * image_len {
        return Err(DnnOpsError::InvalidBatchLength(
            grad_in.len(),
            batch * image_len,
        ));
    }
    if argmax.len() != grad_out.len() {
        return Err(DnnOpsError::ArgmaxLengthMismatch(
            argmax.len(),
            grad_out.len(),
        ));
    }

    grad_in
        .par_chunks_exact_mut(image_len)
        .zip(grad_out.par_chunks_exact(output_len))
        .zip(argmax.par_chunks_exact(output_len))
        .for_each(|((grad_image, grads), idx)| {
            for (&g, &i) in grads.iter().zip(idx.iter()) {
                grad_image[i] = g;
            }
        });

    Ok(())
}
