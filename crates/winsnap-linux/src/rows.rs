//! Repacking of ZPixmap image rows into a frame buffer.

use winsnap_platform::{CaptureError, FrameDescriptor, RowOrder};

/// Copy `rows` top-down source rows of `width` 32-bit pixels from `data`
/// into `dst`, laid out with the descriptor's stride and row order.
///
/// The source stride is `data.len() / rows` and may exceed `width * 4` when
/// the server pads scanlines. Returns the number of rows copied.
pub fn copy_rows(
    data: &[u8],
    width: usize,
    rows: usize,
    descriptor: &FrameDescriptor,
    dst: &mut [u8],
) -> Result<u32, CaptureError> {
    let row_bytes = width * 4;
    let stride = descriptor.stride();

    if rows == 0 || data.len() < row_bytes * rows {
        return Err(CaptureError::ExtractFailed(format!(
            "GetImage returned {} bytes for {}x{}",
            data.len(),
            width,
            rows
        )));
    }
    if stride < row_bytes || dst.len() < stride * rows {
        return Err(CaptureError::ExtractFailed(format!(
            "buffer holds {} bytes, need {}",
            dst.len(),
            stride * rows
        )));
    }
    let src_stride = data.len() / rows;

    for y in 0..rows {
        let out_row = match descriptor.row_order() {
            RowOrder::BottomUp => rows - 1 - y,
            RowOrder::TopDown => y,
        };
        let src = &data[y * src_stride..y * src_stride + row_bytes];
        dst[out_row * stride..out_row * stride + row_bytes].copy_from_slice(src);
    }

    Ok(rows as u32)
}
