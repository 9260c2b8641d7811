use {
    image::{PixelFormat, Size},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoMode {
    pub size: Size,
    pub fps: u32,
    pub format: PixelFormat,
}

impl VideoMode {
    pub fn new(width: usize, height: usize, fps: u32, format: PixelFormat) -> Self {
        Self {
            size: Size::new(width, height),
            fps,
            format,
        }
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} fps {:?}", self.size, self.fps, self.format)
    }
}
