use {
    image::Image,
    std::time::{SystemTime, UNIX_EPOCH},
};

/// One captured frame.
///
/// A frame is moved into exactly one worker iteration and dropped at the end
/// of it; nothing else holds on to the pixel buffer.
#[derive(Debug)]
pub struct Frame {
    pub image: Image,
    pub timestamp_nanos: u64,
}

impl Frame {
    pub fn new(image: Image, timestamp_nanos: u64) -> Self {
        Self {
            image,
            timestamp_nanos,
        }
    }

    /// Frame stamped with the current wall clock.
    pub fn now(image: Image) -> Self {
        Self::new(image, now_nanos())
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// Nanoseconds since the unix epoch.
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}
