use {std::fmt, video::VideoError};

/// Failure inside a pipeline stage. Absorbed by the worker loop.
#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    EmptyFrame,
    Failed(String),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::EmptyFrame => write!(f, "empty frame"),
            StageError::Failed(msg) => write!(f, "stage failed: {msg}"),
        }
    }
}

impl std::error::Error for StageError {}

#[derive(Debug, Clone, PartialEq)]
pub enum VisionError {
    InvalidPipelineIndex { index: i64, len: usize },
    DuplicatedKey(String),
    UnknownCamera(String),
    InvalidVideoMode(usize),
    NotCalibrating,
    CalibrationActive,
    InsufficientSnapshots { have: usize, need: usize },
    CalibrationCompute(String),
    CalibrationCancelled,
    NoFrameAvailable,
    UnsupportedSetting(String),
    InvalidSetting(String),
    LastPipeline,
    Spawn(String),
    Video(VideoError),
    Stage(StageError),
}

impl fmt::Display for VisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisionError::InvalidPipelineIndex { index, len } => {
                write!(f, "pipeline index {index} out of range ({len} pipelines)")
            }
            VisionError::DuplicatedKey(key) => write!(f, "nickname already in use: {key}"),
            VisionError::UnknownCamera(camera) => write!(f, "unknown camera: {camera}"),
            VisionError::InvalidVideoMode(index) => write!(f, "no video mode with index {index}"),
            VisionError::NotCalibrating => write!(f, "no calibration session is collecting"),
            VisionError::CalibrationActive => write!(f, "a calibration session is already active"),
            VisionError::InsufficientSnapshots { have, need } => {
                write!(f, "not enough snapshots: have {have}, need {need}")
            }
            VisionError::CalibrationCompute(msg) => write!(f, "calibration failed: {msg}"),
            VisionError::CalibrationCancelled => write!(f, "calibration was cancelled"),
            VisionError::NoFrameAvailable => write!(f, "no frame available"),
            VisionError::UnsupportedSetting(setting) => {
                write!(f, "setting not supported by this pipeline: {setting}")
            }
            VisionError::InvalidSetting(msg) => write!(f, "invalid setting: {msg}"),
            VisionError::LastPipeline => write!(f, "cannot delete the only pipeline"),
            VisionError::Spawn(msg) => write!(f, "cannot start worker: {msg}"),
            VisionError::Video(err) => write!(f, "{err}"),
            VisionError::Stage(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for VisionError {}

impl From<VideoError> for VisionError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::InvalidMode(index) => VisionError::InvalidVideoMode(index),
            other => VisionError::Video(other),
        }
    }
}

impl From<StageError> for VisionError {
    fn from(err: StageError) -> Self {
        VisionError::Stage(err)
    }
}

impl From<std::io::Error> for VisionError {
    fn from(err: std::io::Error) -> Self {
        VisionError::Spawn(err.to_string())
    }
}
