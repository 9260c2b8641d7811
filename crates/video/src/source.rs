use crate::{Frame, VideoError, VideoMode};

/// Blocking frame supply for one camera.
///
/// `pull_frame` blocks until the camera has a new frame. `Transient` errors
/// mean "skip and pull again"; `Disconnected` means the camera is gone.
pub trait FrameSource: Send {
    fn pull_frame(&mut self) -> Result<Frame, VideoError>;
}

/// Hardware knobs a pipeline may push onto its camera.
pub trait CameraControls: Send + Sync {
    fn video_modes(&self) -> Vec<VideoMode>;

    fn set_video_mode(&self, index: usize) -> Result<(), VideoError>;

    /// Mode the device is running in, for controls that apply changes
    /// asynchronously and can report back.
    fn active_video_mode(&self) -> Option<usize> {
        None
    }

    fn set_exposure(&self, _value: i32) -> Result<(), VideoError> {
        Err(VideoError::Unsupported("exposure".to_string()))
    }

    fn set_brightness(&self, _value: i32) -> Result<(), VideoError> {
        Err(VideoError::Unsupported("brightness".to_string()))
    }
}

/// Controls for a camera with a fixed mode list and no adjustable exposure.
#[derive(Debug, Clone)]
pub struct FixedControls {
    modes: Vec<VideoMode>,
}

impl FixedControls {
    pub fn new(modes: Vec<VideoMode>) -> Self {
        Self { modes }
    }
}

impl CameraControls for FixedControls {
    fn video_modes(&self) -> Vec<VideoMode> {
        self.modes.clone()
    }

    fn set_video_mode(&self, index: usize) -> Result<(), VideoError> {
        if index < self.modes.len() {
            Ok(())
        } else {
            Err(VideoError::InvalidMode(index))
        }
    }
}
