use {
    image::Image,
    serde::{Deserialize, Serialize},
};

/// Camera-relative position of a target on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2d {
    pub x: f64,
    pub y: f64,
    pub rotation_deg: f64,
}

/// One detected target. Angles are in degrees, area in percent of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub pitch: f64,
    pub yaw: f64,
    pub area: f64,
    /// Centre in pixels of the processed image.
    pub center: (f64, f64),
    pub pose: Option<Pose2d>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    /// Targets sorted best first.
    Standard { targets: Vec<Target> },
    Driver,
    Calibration,
}

/// Outcome of running one pipeline on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub payload: ResultPayload,
    pub process_time_nanos: u64,
    pub capture_timestamp_nanos: u64,
    /// Selected pipeline index when the frame was processed.
    pub pipeline_index: usize,
    pub driver_mode: bool,
    /// Image for the UI stream. Taken out before the result is stored.
    pub output: Option<Image>,
}

impl PipelineResult {
    pub fn new(payload: ResultPayload) -> Self {
        Self {
            payload,
            process_time_nanos: 0,
            capture_timestamp_nanos: 0,
            pipeline_index: 0,
            driver_mode: false,
            output: None,
        }
    }

    pub fn with_output(mut self, output: Image) -> Self {
        self.output = Some(output);
        self
    }

    pub fn targets(&self) -> &[Target] {
        match &self.payload {
            ResultPayload::Standard { targets } => targets,
            ResultPayload::Driver | ResultPayload::Calibration => &[],
        }
    }

    pub fn has_target(&self) -> bool {
        !self.targets().is_empty()
    }

    pub fn best_target(&self) -> Option<&Target> {
        self.targets().first()
    }

    /// Process time in milliseconds, rounded to three decimals.
    pub fn latency_ms(&self) -> f64 {
        round3(self.process_time_nanos as f64 / 1_000_000.0)
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Flat values published on a camera's structured telemetry channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntries {
    pub is_valid: bool,
    pub pitch: f64,
    pub yaw: f64,
    pub area: f64,
    pub latency_ms: f64,
    pub timestamp_nanos: u64,
    /// `[pitch, yaw, area]` of every target, best first.
    pub aux_targets: Vec<[f64; 3]>,
    pub poses: Vec<Pose2d>,
    pub pipeline: usize,
    pub driver_mode: bool,
}

impl From<&PipelineResult> for TableEntries {
    fn from(result: &PipelineResult) -> Self {
        let best = result.best_target();
        Self {
            is_valid: best.is_some(),
            pitch: best.map_or(0.0, |t| t.pitch),
            yaw: best.map_or(0.0, |t| t.yaw),
            area: best.map_or(0.0, |t| t.area),
            latency_ms: result.latency_ms(),
            timestamp_nanos: result.capture_timestamp_nanos,
            aux_targets: result
                .targets()
                .iter()
                .map(|t| [t.pitch, t.yaw, t.area])
                .collect(),
            poses: result.targets().iter().filter_map(|t| t.pose).collect(),
            pipeline: result.pipeline_index,
            driver_mode: result.driver_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiTarget {
    pub pitch: f64,
    pub yaw: f64,
    pub area: f64,
    pub pose: Option<Pose2d>,
}

impl From<&Target> for UiTarget {
    fn from(target: &Target) -> Self {
        Self {
            pitch: target.pitch,
            yaw: target.yaw,
            area: target.area,
            pose: target.pose,
        }
    }
}

/// Rate-limited point update for the UI of the focused camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSnapshot {
    pub camera: String,
    pub fps: f64,
    pub latency_ms: f64,
    pub targets: Vec<UiTarget>,
    /// Pixel centre of the best target.
    pub raw_point: Option<(f64, f64)>,
}

impl UiSnapshot {
    /// All targets when `multiple` is set, otherwise only the best one.
    pub fn new(camera: impl Into<String>, result: &PipelineResult, multiple: bool, fps: f64) -> Self {
        let shown = if multiple {
            result.targets()
        } else {
            &result.targets()[..result.targets().len().min(1)]
        };
        Self {
            camera: camera.into(),
            fps: round3(fps),
            latency_ms: result.latency_ms(),
            targets: shown.iter().map(UiTarget::from).collect(),
            raw_point: result.best_target().map(|t| t.center),
        }
    }
}
