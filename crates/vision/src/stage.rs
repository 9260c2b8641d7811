use {
    crate::*,
    image::Image,
    std::sync::Arc,
};

/// One image-processing step: frame and settings in, result out.
///
/// Stages are called from the camera worker thread and must not keep the
/// image beyond the call.
pub trait PipelineStage: Send + Sync {
    fn process(&self, image: &Image, settings: &PipelineSettings) -> Result<PipelineResult, StageError>;
}

/// Stage per pipeline kind, dispatched on the settings variant.
#[derive(Clone)]
pub struct StageSet {
    standard: Arc<dyn PipelineStage>,
    driver: Arc<dyn PipelineStage>,
    calibration: Arc<dyn PipelineStage>,
}

impl StageSet {
    /// Reference stages for a camera with the given horizontal field of view.
    pub fn new(horizontal_fov_deg: f64) -> Self {
        Self {
            standard: Arc::new(ThresholdStage::new(horizontal_fov_deg)),
            driver: Arc::new(DriverStage),
            calibration: Arc::new(CalibrationStage),
        }
    }

    pub fn with_standard(mut self, stage: Arc<dyn PipelineStage>) -> Self {
        self.standard = stage;
        self
    }

    pub fn with_driver(mut self, stage: Arc<dyn PipelineStage>) -> Self {
        self.driver = stage;
        self
    }

    pub fn with_calibration(mut self, stage: Arc<dyn PipelineStage>) -> Self {
        self.calibration = stage;
        self
    }
}

impl PipelineStage for StageSet {
    fn process(&self, image: &Image, settings: &PipelineSettings) -> Result<PipelineResult, StageError> {
        match settings {
            PipelineSettings::Standard(_) => self.standard.process(image, settings),
            PipelineSettings::Driver(_) => self.driver.process(image, settings),
            PipelineSettings::Calibration(_) => self.calibration.process(image, settings),
        }
    }
}

/// Passes the camera image through for the driver.
pub struct DriverStage;

impl PipelineStage for DriverStage {
    fn process(&self, image: &Image, settings: &PipelineSettings) -> Result<PipelineResult, StageError> {
        if image.is_empty() {
            return Err(StageError::EmptyFrame);
        }
        Ok(PipelineResult::new(ResultPayload::Driver)
            .with_output(image.downscale(settings.stream_divisor())))
    }
}

/// Shows the camera image while calibration snapshots are collected.
pub struct CalibrationStage;

impl PipelineStage for CalibrationStage {
    fn process(&self, image: &Image, settings: &PipelineSettings) -> Result<PipelineResult, StageError> {
        if image.is_empty() {
            return Err(StageError::EmptyFrame);
        }
        Ok(PipelineResult::new(ResultPayload::Calibration)
            .with_output(image.downscale(settings.stream_divisor())))
    }
}

/// Finds bright blobs: pixels inside the luma band, grouped by 4-connectivity,
/// filtered by area and sorted largest first. Angles come from a pinhole
/// model of the camera's horizontal field of view.
pub struct ThresholdStage {
    horizontal_fov_deg: f64,
}

struct Blob {
    pixels: usize,
    sum_x: usize,
    sum_y: usize,
}

impl ThresholdStage {
    pub fn new(horizontal_fov_deg: f64) -> Self {
        Self { horizontal_fov_deg }
    }

    fn blobs(image: &Image, luma: (u8, u8)) -> Vec<Blob> {
        let (width, height) = (image.width(), image.height());
        let mut mask = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let l = image.luma_at(x, y);
                mask.push(l >= luma.0 && l <= luma.1);
            }
        }

        let mut blobs = Vec::new();
        let mut stack = Vec::new();
        for start in 0..mask.len() {
            if !mask[start] {
                continue;
            }
            mask[start] = false;
            stack.push(start);
            let mut blob = Blob {
                pixels: 0,
                sum_x: 0,
                sum_y: 0,
            };
            while let Some(i) = stack.pop() {
                let (x, y) = (i % width, i / width);
                blob.pixels += 1;
                blob.sum_x += x;
                blob.sum_y += y;
                let mut visit = |j: usize| {
                    if mask[j] {
                        mask[j] = false;
                        stack.push(j);
                    }
                };
                if x > 0 {
                    visit(i - 1);
                }
                if x + 1 < width {
                    visit(i + 1);
                }
                if y > 0 {
                    visit(i - width);
                }
                if y + 1 < height {
                    visit(i + width);
                }
            }
            blobs.push(blob);
        }
        blobs
    }

    fn target(&self, blob: &Blob, image: &Image) -> Target {
        let (width, height) = (image.width() as f64, image.height() as f64);
        let cx = blob.sum_x as f64 / blob.pixels as f64;
        let cy = blob.sum_y as f64 / blob.pixels as f64;
        let focal = (width / 2.0) / (self.horizontal_fov_deg.to_radians() / 2.0).tan();
        Target {
            pitch: ((height - 1.0) / 2.0 - cy).atan2(focal).to_degrees(),
            yaw: (cx - (width - 1.0) / 2.0).atan2(focal).to_degrees(),
            area: blob.pixels as f64 * 100.0 / (width * height),
            center: (cx, cy),
            pose: None,
        }
    }
}

impl PipelineStage for ThresholdStage {
    fn process(&self, image: &Image, settings: &PipelineSettings) -> Result<PipelineResult, StageError> {
        let PipelineSettings::Standard(standard) = settings else {
            return Err(StageError::Failed(format!(
                "threshold stage cannot run {:?} settings",
                settings.kind()
            )));
        };
        if image.is_empty() {
            return Err(StageError::EmptyFrame);
        }

        let mut targets: Vec<Target> = Self::blobs(image, standard.luma)
            .iter()
            .map(|blob| self.target(blob, image))
            .filter(|t| t.area >= standard.area.0 && t.area <= standard.area.1)
            .collect();
        targets.sort_by(|a, b| b.area.total_cmp(&a.area));
        targets.truncate(standard.max_targets);

        Ok(PipelineResult::new(ResultPayload::Standard { targets })
            .with_output(image.downscale(standard.stream_divisor)))
    }
}
