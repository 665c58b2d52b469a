//! Uncompressed bitmap (BMP) serialization.
//!
//! File layout, all fields little-endian:
//!
//! ```text
//! [magic "BM":2][file size:4][reserved:2][reserved:2][pixel offset:4]
//! [40-byte format header (FrameDescriptor)]
//! [pixel rows, stride * |height| bytes]
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::BufMut;
use thiserror::Error;
use tracing::debug;
use winsnap_platform::{FrameDescriptor, INFO_HEADER_SIZE};

use crate::frame::{check_layout, Frame, FrameError, PixelBuffer};

/// "BM" read as a little-endian u16
pub const BITMAP_MAGIC: u16 = 0x4D42;

/// Size of the file header preceding the format header
pub const FILE_HEADER_SIZE: u32 = 14;

/// Byte offset of the first pixel row
pub const PIXEL_DATA_OFFSET: u32 = FILE_HEADER_SIZE + INFO_HEADER_SIZE;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot open {}: {source}", path.display())]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("incomplete write to {}: {source}", path.display())]
    IncompleteWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
}

/// Total file length for a pixel payload, or None if it overflows the
/// 32-bit size field
pub fn file_len(pixel_len: usize) -> Option<u32> {
    u32::try_from(pixel_len)
        .ok()?
        .checked_add(PIXEL_DATA_OFFSET)
}

/// Encode the file header and format header (54 bytes)
pub fn encode_headers(descriptor: &FrameDescriptor, file_size: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PIXEL_DATA_OFFSET as usize);

    buf.put_u16_le(BITMAP_MAGIC);
    buf.put_u32_le(file_size);
    buf.put_u16_le(0);
    buf.put_u16_le(0);
    buf.put_u32_le(PIXEL_DATA_OFFSET);

    buf.put_u32_le(INFO_HEADER_SIZE);
    buf.put_i32_le(descriptor.width);
    buf.put_i32_le(descriptor.height);
    buf.put_u16_le(descriptor.planes);
    buf.put_u16_le(descriptor.bit_count);
    buf.put_u32_le(descriptor.compression);
    buf.put_u32_le(descriptor.size_image);
    buf.put_i32_le(descriptor.x_pels_per_meter);
    buf.put_i32_le(descriptor.y_pels_per_meter);
    buf.put_u32_le(descriptor.colors_used);
    buf.put_u32_le(descriptor.colors_important);

    buf
}

/// Stream headers and pixel rows to `out`
pub fn encode_into<W: Write>(
    out: &mut W,
    descriptor: &FrameDescriptor,
    file_size: u32,
    pixels: &[u8],
) -> io::Result<()> {
    out.write_all(&encode_headers(descriptor, file_size))?;
    out.write_all(pixels)?;
    out.flush()
}

fn open_exclusive(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
    }
    options.open(path)
}

/// Write one frame to `path`, replacing any existing file.
///
/// On success returns the number of bytes written, which is the file length
/// declared in the header; callers that only care about success can ignore
/// it. The pixel buffer is consumed and dropped whether
/// or not the write succeeds. On `IncompleteWrite` a truncated file may be
/// left behind.
pub fn write_bitmap(
    path: &Path,
    descriptor: &FrameDescriptor,
    pixels: PixelBuffer,
) -> Result<u64, WriteError> {
    write_with(path, descriptor, pixels, open_exclusive)
}

/// `write_bitmap` with the sink opener supplied by the caller. The sink is
/// dropped before this returns, on success and on every error.
fn write_with<W, F>(
    path: &Path,
    descriptor: &FrameDescriptor,
    pixels: PixelBuffer,
    open: F,
) -> Result<u64, WriteError>
where
    W: Write,
    F: FnOnce(&Path) -> io::Result<W>,
{
    check_layout(descriptor, &pixels)?;
    let file_size = file_len(pixels.len()).ok_or(FrameError::TooLarge(pixels.len()))?;

    let mut sink = open(path).map_err(|source| WriteError::CannotOpen {
        path: path.to_path_buf(),
        source,
    })?;

    encode_into(&mut sink, descriptor, file_size, pixels.as_bytes()).map_err(|source| {
        WriteError::IncompleteWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;

    debug!(path = %path.display(), bytes = file_size, "bitmap written");
    Ok(file_size as u64)
}

pub fn write_frame(path: &Path, frame: Frame) -> Result<u64, WriteError> {
    write_bitmap(path, &frame.descriptor, frame.pixels)
}
