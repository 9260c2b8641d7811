use {
    crate::*,
    image::{Image, PixelFormat, Size},
    std::{
        f64::consts::TAU,
        thread,
        time::{Duration, Instant},
    },
};

const DEFAULT_EXPOSURE: i32 = 50;
const DEFAULT_BRIGHTNESS: i32 = 20;

/// Synthetic camera: a bright square circling over a dark background.
///
/// Exposure (0-100) scales the square, brightness (0-100) lifts the
/// background. Capture is paced to the frame rate of the open mode.
#[derive(Debug)]
pub struct TestPattern {
    modes: Vec<VideoMode>,
    mode: Option<VideoMode>,
    frame_index: u64,
    exposure: i32,
    brightness: i32,
    last_capture: Option<Instant>,
}

impl Default for TestPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPattern {
    pub fn new() -> Self {
        Self::with_modes(vec![
            VideoMode::new(320, 240, 30, PixelFormat::Rgb8),
            VideoMode::new(640, 480, 30, PixelFormat::Rgb8),
        ])
    }

    pub fn with_modes(modes: Vec<VideoMode>) -> Self {
        Self {
            modes,
            mode: None,
            frame_index: 0,
            exposure: DEFAULT_EXPOSURE,
            brightness: DEFAULT_BRIGHTNESS,
            last_capture: None,
        }
    }

    /// Center of the square for frame `index` in an image of `size`.
    pub fn square_center(size: Size, index: u64) -> (usize, usize) {
        let angle = (index % 120) as f64 / 120.0 * TAU;
        let radius = (size.width.min(size.height) / 4) as f64;
        let x = size.width as f64 / 2.0 + radius * angle.cos();
        let y = size.height as f64 / 2.0 + radius * angle.sin();
        (x as usize, y as usize)
    }

    fn render(&self, mode: &VideoMode) -> Image {
        let size = mode.size;
        let background = (self.brightness.clamp(0, 100) / 2) as u8;
        let square = (55 + self.exposure.clamp(0, 100) * 2) as u8;
        let half = (size.height / 12).max(1);
        let (cx, cy) = Self::square_center(size, self.frame_index);

        let mut luma = vec![background; size.area()];
        for y in cy.saturating_sub(half)..(cy + half).min(size.height) {
            let row = y * size.width;
            for x in cx.saturating_sub(half)..(cx + half).min(size.width) {
                luma[row + x] = square.max(background);
            }
        }

        match mode.format {
            PixelFormat::Gray8 => Image {
                size,
                format: PixelFormat::Gray8,
                data: luma,
            },
            PixelFormat::Rgb8 => Image {
                size,
                format: PixelFormat::Rgb8,
                data: luma.iter().flat_map(|&l| [l, l, l]).collect(),
            },
            PixelFormat::Yuyv => Image {
                size,
                format: PixelFormat::Yuyv,
                data: luma.iter().flat_map(|&l| [l, 128]).collect(),
            },
        }
    }

    fn pace(&mut self, fps: u32) {
        if fps > 0 {
            let period = Duration::from_secs(1) / fps;
            if let Some(last) = self.last_capture {
                let elapsed = last.elapsed();
                if elapsed < period {
                    thread::sleep(period - elapsed);
                }
            }
        }
        self.last_capture = Some(Instant::now());
    }
}

impl CaptureDevice for TestPattern {
    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            modes: self.modes.clone(),
            exposure: true,
            brightness: true,
        }
    }

    fn open(&mut self, mode: &VideoMode) -> Result<(), VideoError> {
        if !self.modes.contains(mode) {
            return Err(VideoError::Unsupported(format!("mode {mode}")));
        }
        self.mode = Some(*mode);
        self.last_capture = None;
        Ok(())
    }

    fn close(&mut self) {
        self.mode = None;
    }

    fn blocking_capture(&mut self) -> Result<Image, VideoError> {
        let mode = self
            .mode
            .ok_or_else(|| VideoError::Disconnected("test pattern is not open".to_string()))?;
        self.pace(mode.fps);
        let image = self.render(&mode);
        self.frame_index += 1;
        Ok(image)
    }

    fn set_exposure(&mut self, value: i32) -> Result<(), VideoError> {
        self.exposure = value;
        Ok(())
    }

    fn set_brightness(&mut self, value: i32) -> Result<(), VideoError> {
        self.brightness = value;
        Ok(())
    }
}
