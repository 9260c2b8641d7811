use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum VideoError {
    /// The camera is gone. Fatal for the worker that pulls from it.
    Disconnected(String),
    /// A single capture failed. The next pull may succeed.
    Transient(String),
    Unsupported(String),
    InvalidMode(usize),
    Channel(String),
}

impl VideoError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, VideoError::Disconnected(_))
    }
}

impl fmt::Display for VideoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoError::Disconnected(msg) => write!(f, "device disconnected: {msg}"),
            VideoError::Transient(msg) => write!(f, "transient capture error: {msg}"),
            VideoError::Unsupported(control) => write!(f, "unsupported control: {control}"),
            VideoError::InvalidMode(index) => write!(f, "no video mode with index {index}"),
            VideoError::Channel(msg) => write!(f, "channel error: {msg}"),
        }
    }
}

impl std::error::Error for VideoError {}

impl From<std::io::Error> for VideoError {
    fn from(err: std::io::Error) -> Self {
        VideoError::Disconnected(err.to_string())
    }
}

impl From<image::ImageError> for VideoError {
    fn from(err: image::ImageError) -> Self {
        VideoError::Transient(err.to_string())
    }
}
