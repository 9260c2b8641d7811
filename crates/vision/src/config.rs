use std::{env, str::FromStr};

/// Tunables of the vision core.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionConfig {
    ui_rate_hz: u32,
    fps_window: usize,
    snapshot_threshold: usize,
    default_square_size: f64,
    stream_quality: u8,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            ui_rate_hz: 30,
            fps_window: 7,
            snapshot_threshold: 25,
            default_square_size: 1.0,
            stream_quality: 75,
        }
    }
}

impl VisionConfig {
    /// Defaults overridden by `VISION_UI_RATE_HZ`, `VISION_FPS_WINDOW`,
    /// `VISION_SNAPSHOT_THRESHOLD`, `VISION_SQUARE_SIZE` and
    /// `VISION_STREAM_QUALITY`. Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(hz) = env_value("VISION_UI_RATE_HZ") {
            config = config.with_ui_rate_hz(hz);
        }
        if let Some(window) = env_value("VISION_FPS_WINDOW") {
            config = config.with_fps_window(window);
        }
        if let Some(threshold) = env_value("VISION_SNAPSHOT_THRESHOLD") {
            config = config.with_snapshot_threshold(threshold);
        }
        if let Some(size) = env_value("VISION_SQUARE_SIZE") {
            config = config.with_default_square_size(size);
        }
        if let Some(quality) = env_value("VISION_STREAM_QUALITY") {
            config = config.with_stream_quality(quality);
        }
        config
    }

    /// UI broadcast rate of the focused camera.
    pub fn with_ui_rate_hz(mut self, ui_rate_hz: u32) -> Self {
        self.ui_rate_hz = ui_rate_hz;
        self
    }

    /// Samples in the rolling FPS mean.
    pub fn with_fps_window(mut self, fps_window: usize) -> Self {
        self.fps_window = fps_window.max(1);
        self
    }

    /// Snapshots needed before a calibration can be finished.
    pub fn with_snapshot_threshold(mut self, snapshot_threshold: usize) -> Self {
        self.snapshot_threshold = snapshot_threshold.max(1);
        self
    }

    pub fn with_default_square_size(mut self, default_square_size: f64) -> Self {
        self.default_square_size = default_square_size;
        self
    }

    /// JPEG quality of the stream output, 1-100.
    pub fn with_stream_quality(mut self, stream_quality: u8) -> Self {
        self.stream_quality = stream_quality.clamp(1, 100);
        self
    }

    pub fn ui_rate_hz(&self) -> u32 {
        self.ui_rate_hz
    }

    pub fn fps_window(&self) -> usize {
        self.fps_window
    }

    pub fn snapshot_threshold(&self) -> usize {
        self.snapshot_threshold
    }

    pub fn default_square_size(&self) -> f64 {
        self.default_square_size
    }

    pub fn stream_quality(&self) -> u8 {
        self.stream_quality
    }
}

fn env_value<T: FromStr>(var: &str) -> Option<T> {
    let raw = env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid value", var, raw);
            None
        }
    }
}
