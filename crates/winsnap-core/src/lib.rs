pub mod bitmap;
pub mod config;
pub mod frame;
pub mod grabber;
pub mod naming;
pub mod session;

#[cfg(test)]
mod fake;

pub use bitmap::{write_bitmap, write_frame, WriteError};
pub use frame::{Frame, FrameError, PixelBuffer};
pub use grabber::FrameGrabber;
pub use naming::{numbered_path, OutputNamer};
pub use session::{CaptureSession, CountedTrigger, PromptTrigger, SessionError, Trigger, TriggerSource};
