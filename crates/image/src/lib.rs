//! Pixel buffers for camera frames and pipeline output.
//!
//! Frames are kept in the layout the camera delivered them in; conversion to
//! RGB and luma happens on demand, and JPEG encoding is only used for the UI
//! stream.

pub mod error;
pub mod image;
pub mod jpeg;
pub mod pixelformat;

pub use error::ImageError;
pub use image::{Image, Size};
pub use pixelformat::PixelFormat;
