use {
    crate::*,
    image::Size,
    serde::{Deserialize, Serialize},
    std::sync::{Arc, Mutex, MutexGuard},
    video::{CameraControls, VideoError, VideoMode},
};

/// Lens model for one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub resolution: Size,
    /// Row-major 3x3 camera matrix.
    pub camera_matrix: [f64; 9],
    pub dist_coeffs: Vec<f64>,
    pub snapshot_count: usize,
}

impl Intrinsics {
    pub fn focal_length(&self) -> f64 {
        self.camera_matrix[0]
    }
}

/// Persistent description of a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIdentity {
    pub name: String,
    pub nickname: String,
    pub video_modes: Vec<VideoMode>,
    pub video_mode_index: usize,
    pub fov: f64,
    pub calibrations: Vec<Intrinsics>,
}

/// A camera: its identity plus the control handle of the device.
pub struct Camera {
    identity: Mutex<CameraIdentity>,
    controls: Arc<dyn CameraControls>,
}

impl Camera {
    pub fn new(identity: CameraIdentity, controls: Arc<dyn CameraControls>) -> Self {
        Self {
            identity: Mutex::new(identity),
            controls,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CameraIdentity> {
        self.identity.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the identity, with the video mode the device runs in.
    pub fn identity(&self) -> CameraIdentity {
        let mut identity = self.lock().clone();
        if let Some(active) = self.controls.active_video_mode() {
            identity.video_mode_index = active;
        }
        identity
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn nickname(&self) -> String {
        self.lock().nickname.clone()
    }

    pub fn set_nickname(&self, nickname: impl Into<String>) {
        self.lock().nickname = nickname.into();
    }

    pub fn video_modes(&self) -> Vec<VideoMode> {
        self.lock().video_modes.clone()
    }

    pub fn mode_count(&self) -> usize {
        self.lock().video_modes.len()
    }

    pub fn video_mode(&self, index: usize) -> Option<VideoMode> {
        self.lock().video_modes.get(index).copied()
    }

    /// Video mode the device runs in. Controls that cannot report it leave
    /// the last requested mode.
    pub fn video_mode_index(&self) -> usize {
        let requested = self.lock().video_mode_index;
        self.controls.active_video_mode().unwrap_or(requested)
    }

    pub fn fov(&self) -> f64 {
        self.lock().fov
    }

    pub fn set_fov(&self, fov: f64) {
        self.lock().fov = fov;
    }

    /// Switch the device to another video mode. A request the device did
    /// not follow is sent again.
    pub fn set_video_mode(&self, index: usize) -> Result<(), VisionError> {
        let mut identity = self.lock();
        if index >= identity.video_modes.len() {
            return Err(VisionError::InvalidVideoMode(index));
        }
        let running = self
            .controls
            .active_video_mode()
            .unwrap_or(identity.video_mode_index);
        if identity.video_mode_index != index || running != index {
            self.controls.set_video_mode(index)?;
            identity.video_mode_index = index;
        }
        Ok(())
    }

    /// Stored intrinsics for the resolution of video mode `index`.
    pub fn intrinsics(&self, index: usize) -> Option<Intrinsics> {
        let identity = self.lock();
        let mode = identity.video_modes.get(index)?;
        identity
            .calibrations
            .iter()
            .find(|c| c.resolution == mode.size)
            .cloned()
    }

    pub fn is_calibrated(&self, index: usize) -> bool {
        self.intrinsics(index).is_some()
    }

    /// Store intrinsics, replacing any for the same resolution.
    pub fn store_intrinsics(&self, intrinsics: Intrinsics) {
        let mut identity = self.lock();
        identity
            .calibrations
            .retain(|c| c.resolution != intrinsics.resolution);
        log::info!(
            "{}: stored intrinsics for {}",
            identity.name,
            intrinsics.resolution
        );
        identity.calibrations.push(intrinsics);
    }

    /// Push a pipeline's camera settings to the device. Controls the device
    /// lacks are skipped.
    pub fn apply_settings(&self, settings: &CameraSettings) {
        let name = self.name();
        for (control, outcome) in [
            ("exposure", self.controls.set_exposure(settings.exposure)),
            ("brightness", self.controls.set_brightness(settings.brightness)),
        ] {
            match outcome {
                Ok(()) => {}
                Err(VideoError::Unsupported(_)) => {
                    log::debug!("{}: no {} control", name, control)
                }
                Err(e) => log::warn!("{}: cannot set {}: {}", name, control, e),
            }
        }
        if let Err(e) = self.set_video_mode(settings.video_mode_index) {
            log::warn!("{}: cannot switch video mode: {}", name, e);
        }
    }
}
