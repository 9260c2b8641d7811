//! Frame acquisition for the vision workspace.
//!
//! `FrameSource` is the blocking pull contract the per-camera worker consumes
//! and `CameraControls` is how pipeline settings reach the hardware. A
//! `CaptureSource` pumps any `CaptureDevice` on its own thread into a bounded
//! channel and exposes both.

pub mod capture;
pub mod error;
pub mod frame;
pub mod mode;
pub mod source;
pub mod testpattern;

pub use capture::{CaptureConfig, CaptureControls, CaptureDevice, CaptureSource, DeviceCapabilities};
pub use error::VideoError;
pub use frame::Frame;
pub use mode::VideoMode;
pub use source::{CameraControls, FixedControls, FrameSource};
pub use testpattern::TestPattern;
