use std::fmt;

use thiserror::Error;

use crate::target::TargetSpec;

/// Size of the serialized format header (BITMAPINFOHEADER layout)
pub const INFO_HEADER_SIZE: u32 = 40;

/// The only pixel depth this pipeline produces
pub const BITS_PER_PIXEL: u16 = 32;

/// Compression tag for raw, uncompressed rows
pub const COMPRESSION_NONE: u32 = 0;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture target not found: {0}")]
    TargetNotFound(String),
    #[error("client area unavailable: {0}")]
    GeometryUnavailable(String),
    #[error("off-screen surface allocation failed: {0}")]
    SurfaceAllocationFailed(String),
    #[error("pixel copy rejected: {0}")]
    BlitFailed(String),
    #[error("pixel extraction failed: {0}")]
    ExtractFailed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("width must be positive, got {0}")]
    Width(i32),
    #[error("height must be non-zero")]
    Height,
    #[error("unsupported plane count {0}")]
    Planes(u16),
    #[error("unsupported bit depth {0}")]
    BitCount(u16),
    #[error("unsupported compression mode {0}")]
    Compression(u32),
}

/// Client-area rectangle of a capture target, in target coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ClientRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when the rectangle has no drawable area
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

impl fmt::Display for ClientRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {}) {}x{}",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

/// Row order of extracted pixel data, carried in the sign of the height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// Last visible row first; positive height
    #[default]
    BottomUp,
    /// First visible row first; negative height
    TopDown,
}

/// Geometry and pixel format of a captured frame.
///
/// Field order and widths match the 40-byte format header of the bitmap
/// container, so the writer can serialize it field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl FrameDescriptor {
    /// 32-bit uncompressed descriptor for a `width` x `rows` surface
    pub fn new(width: i32, rows: i32, order: RowOrder) -> Self {
        let height = match order {
            RowOrder::BottomUp => rows,
            RowOrder::TopDown => -rows,
        };
        Self {
            width,
            height,
            planes: 1,
            bit_count: BITS_PER_PIXEL,
            compression: COMPRESSION_NONE,
            size_image: 0,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            colors_used: 0,
            colors_important: 0,
        }
    }

    /// Number of pixel rows regardless of row order
    pub fn rows(&self) -> u32 {
        self.height.unsigned_abs()
    }

    pub fn row_order(&self) -> RowOrder {
        if self.height < 0 {
            RowOrder::TopDown
        } else {
            RowOrder::BottomUp
        }
    }

    /// Bytes per row, padded to a 4-byte boundary
    pub fn stride(&self) -> usize {
        stride_for(self.width, self.bit_count)
    }

    /// Exact pixel byte length for this geometry: `stride * |height|`
    pub fn image_len(&self) -> usize {
        self.stride() * self.rows() as usize
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.width <= 0 {
            return Err(DescriptorError::Width(self.width));
        }
        if self.height == 0 {
            return Err(DescriptorError::Height);
        }
        if self.planes != 1 {
            return Err(DescriptorError::Planes(self.planes));
        }
        if self.bit_count != BITS_PER_PIXEL {
            return Err(DescriptorError::BitCount(self.bit_count));
        }
        if self.compression != COMPRESSION_NONE {
            return Err(DescriptorError::Compression(self.compression));
        }
        Ok(())
    }
}

/// Row stride in bytes: `((width * bits + 31) / 32) * 4`
pub fn stride_for(width: i32, bits_per_pixel: u16) -> usize {
    let bits = width.max(0) as u64 * bits_per_pixel as u64;
    (((bits + 31) / 32) * 4) as usize
}

/// System graphics services needed to grab one frame from a window.
///
/// Handle types release their OS resource when dropped, so a caller that
/// holds them in locals gets release on every exit path. Handles are never
/// retained across captures.
pub trait CaptureService {
    /// Opaque window or surface handle, resolved once per run
    type Target: Copy + fmt::Debug;
    /// Drawing context of the target window
    type WindowContext;
    /// Off-screen drawing context compatible with a window context
    type MemoryContext;
    /// Off-screen pixel surface
    type Surface;

    /// Resolve a target description into a handle
    fn resolve(&self, spec: &TargetSpec) -> Result<Self::Target, CaptureError>;

    fn window_context(&self, target: Self::Target) -> Result<Self::WindowContext, CaptureError>;

    fn compatible_context(
        &self,
        window: &Self::WindowContext,
    ) -> Result<Self::MemoryContext, CaptureError>;

    /// Current client-area rectangle of the target
    fn client_rect(&self, target: Self::Target) -> Result<ClientRect, CaptureError>;

    /// Allocate an off-screen surface compatible with `window`
    fn create_surface(
        &self,
        window: &Self::WindowContext,
        width: i32,
        height: i32,
    ) -> Result<Self::Surface, CaptureError>;

    /// Straight copy of `width` x `height` pixels from the window origin
    /// into `surface` through `memory`
    fn blit(
        &self,
        memory: &Self::MemoryContext,
        surface: &Self::Surface,
        window: &Self::WindowContext,
        width: i32,
        height: i32,
    ) -> Result<(), CaptureError>;

    /// Realized dimensions of an allocated surface
    fn surface_size(&self, surface: &Self::Surface) -> Result<(i32, i32), CaptureError>;

    /// Copy the surface pixels into `dst` laid out as `descriptor` describes.
    /// Returns the number of rows copied.
    fn read_bits(
        &self,
        window: &Self::WindowContext,
        surface: &Self::Surface,
        descriptor: &FrameDescriptor,
        dst: &mut [u8],
    ) -> Result<u32, CaptureError>;
}
