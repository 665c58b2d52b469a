// Platform abstractions shared by the capture core and the OS backends

pub mod screen;
pub mod target;

pub use screen::{
    stride_for, CaptureError, CaptureService, ClientRect, DescriptorError, FrameDescriptor,
    RowOrder, BITS_PER_PIXEL, COMPRESSION_NONE, INFO_HEADER_SIZE,
};
pub use target::TargetSpec;
