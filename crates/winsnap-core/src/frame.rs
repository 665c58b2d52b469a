use thiserror::Error;
use winsnap_platform::{DescriptorError, FrameDescriptor};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("pixel buffer is {actual} bytes, descriptor requires {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("pixel data of {0} bytes does not fit a bitmap file")]
    TooLarge(usize),
}

/// Owned pixel rows for one capture, `stride * |height|` bytes long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer(Vec<u8>);

impl PixelBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for PixelBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

/// A captured frame: its layout plus the pixels laid out that way
#[derive(Debug, Clone)]
pub struct Frame {
    pub descriptor: FrameDescriptor,
    pub pixels: PixelBuffer,
}

impl Frame {
    /// Pair a descriptor with its pixels, checking the buffer length
    pub fn new(descriptor: FrameDescriptor, pixels: PixelBuffer) -> Result<Self, FrameError> {
        check_layout(&descriptor, &pixels)?;
        Ok(Self { descriptor, pixels })
    }
}

pub(crate) fn check_layout(
    descriptor: &FrameDescriptor,
    pixels: &PixelBuffer,
) -> Result<(), FrameError> {
    descriptor.validate()?;
    let expected = descriptor.image_len();
    if pixels.len() != expected {
        return Err(FrameError::LengthMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}
