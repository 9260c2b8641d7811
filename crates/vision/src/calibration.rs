use {
    crate::{pipeline::check_square_size, *},
    image::Image,
    serde::{Deserialize, Serialize},
    std::sync::{Arc, Mutex, MutexGuard},
    video::VideoMode,
};

/// Computes intrinsics from a set of calibration snapshots.
pub trait IntrinsicsSolver: Send + Sync + 'static {
    fn solve(&self, snapshots: &[Image], square_size: f64, mode: &VideoMode) -> Result<Intrinsics, String>;
}

/// Nominal pinhole intrinsics from the horizontal field of view, after
/// checking that every snapshot shows something (a board has contrast).
pub struct FovSolver {
    horizontal_fov_deg: f64,
    min_contrast: u8,
}

impl FovSolver {
    pub fn new(horizontal_fov_deg: f64) -> Self {
        Self {
            horizontal_fov_deg,
            min_contrast: 32,
        }
    }

    pub fn with_min_contrast(mut self, min_contrast: u8) -> Self {
        self.min_contrast = min_contrast;
        self
    }
}

impl IntrinsicsSolver for FovSolver {
    fn solve(&self, snapshots: &[Image], _square_size: f64, mode: &VideoMode) -> Result<Intrinsics, String> {
        if snapshots.is_empty() {
            return Err("no snapshots".to_string());
        }
        for (i, snapshot) in snapshots.iter().enumerate() {
            if snapshot.size != mode.size {
                return Err(format!(
                    "snapshot {} is {}, expected {}",
                    i, snapshot.size, mode.size
                ));
            }
            let (mut lo, mut hi) = (u8::MAX, u8::MIN);
            // every 4th pixel of every 4th row is plenty to find the spread
            for y in (0..snapshot.height()).step_by(4) {
                for x in (0..snapshot.width()).step_by(4) {
                    let l = snapshot.luma_at(x, y);
                    lo = lo.min(l);
                    hi = hi.max(l);
                }
            }
            if hi.saturating_sub(lo) < self.min_contrast {
                return Err(format!("no board visible in snapshot {i}"));
            }
        }
        if !(1.0..180.0).contains(&self.horizontal_fov_deg) {
            return Err(format!("unusable field of view {}", self.horizontal_fov_deg));
        }

        let (width, height) = (mode.size.width as f64, mode.size.height as f64);
        let focal = (width / 2.0) / (self.horizontal_fov_deg.to_radians() / 2.0).tan();
        Ok(Intrinsics {
            resolution: mode.size,
            camera_matrix: [
                focal,
                0.0,
                (width - 1.0) / 2.0,
                0.0,
                focal,
                (height - 1.0) / 2.0,
                0.0,
                0.0,
                1.0,
            ],
            dist_coeffs: vec![0.0; 5],
            snapshot_count: snapshots.len(),
        })
    }
}

/// Latest frame of a calibrating camera, written by its worker.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    latest: Mutex<Option<Image>>,
}

impl SnapshotSlot {
    pub fn offer(&self, image: &Image) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(image.clone());
    }

    pub fn latest(&self) -> Option<Image> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    Inactive,
    Collecting,
    Computing,
}

struct Session {
    square_size: f64,
    video_mode_index: usize,
    snapshots: Vec<Image>,
}

struct Inner {
    state: CalibrationState,
    session: Option<Session>,
    // bumped on every session end; a computation finding a different value
    // was cancelled
    generation: u64,
}

/// Interactive intrinsic calibration of one camera.
pub struct CalibrationController {
    manager: Arc<PipelineManager>,
    slot: Arc<SnapshotSlot>,
    solver: Arc<dyn IntrinsicsSolver>,
    threshold: usize,
    inner: Mutex<Inner>,
}

impl CalibrationController {
    pub fn new(
        manager: Arc<PipelineManager>,
        slot: Arc<SnapshotSlot>,
        solver: Arc<dyn IntrinsicsSolver>,
        threshold: usize,
    ) -> Self {
        Self {
            manager,
            slot,
            solver,
            threshold: threshold.max(1),
            inner: Mutex::new(Inner {
                state: CalibrationState::Inactive,
                session: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> CalibrationState {
        self.lock().state
    }

    pub fn snapshot_count(&self) -> usize {
        self.lock()
            .session
            .as_ref()
            .map_or(0, |s| s.snapshots.len())
    }

    pub fn required_snapshots(&self) -> usize {
        self.threshold
    }

    pub fn square_size(&self) -> Option<f64> {
        self.lock().session.as_ref().map(|s| s.square_size)
    }

    /// Start a session: switch the camera to `video_mode_index` and run the
    /// calibration pipeline until the session ends.
    pub fn enter_calibration(&self, square_size: f64, video_mode_index: usize) -> Result<(), VisionError> {
        let mut inner = self.lock();
        if inner.state != CalibrationState::Inactive {
            return Err(VisionError::CalibrationActive);
        }
        if self.manager.camera().video_mode(video_mode_index).is_none() {
            return Err(VisionError::InvalidVideoMode(video_mode_index));
        }
        check_square_size(square_size)?;

        self.slot.clear();
        self.manager
            .begin_calibration(Pipeline::calibration(square_size, video_mode_index))?;
        inner.session = Some(Session {
            square_size,
            video_mode_index,
            snapshots: Vec::new(),
        });
        inner.state = CalibrationState::Collecting;
        log::info!(
            "{}: calibration started in mode {}",
            self.manager.camera().name(),
            video_mode_index
        );
        Ok(())
    }

    /// Keep a copy of the camera's latest frame. Returns the snapshot count
    /// and whether it is enough to finish.
    pub fn take_snapshot(&self) -> Result<(usize, bool), VisionError> {
        let mut inner = self.lock();
        if inner.state != CalibrationState::Collecting {
            return Err(VisionError::NotCalibrating);
        }
        let Some(session) = inner.session.as_mut() else {
            return Err(VisionError::NotCalibrating);
        };
        let mode = self
            .manager
            .camera()
            .video_mode(session.video_mode_index)
            .ok_or(VisionError::InvalidVideoMode(session.video_mode_index))?;
        let image = self.slot.latest().ok_or(VisionError::NoFrameAvailable)?;
        // frames still in flight from before the mode switch don't count
        if image.size != mode.size {
            return Err(VisionError::NoFrameAvailable);
        }
        session.snapshots.push(image);
        let count = session.snapshots.len();
        Ok((count, count >= self.threshold))
    }

    /// Change the board square size of the running session.
    pub fn set_square_size(&self, square_size: f64) -> Result<(), VisionError> {
        check_square_size(square_size)?;
        let mut inner = self.lock();
        let Some(session) = inner.session.as_mut() else {
            return Err(VisionError::NotCalibrating);
        };
        session.square_size = square_size;
        if inner.state == CalibrationState::Collecting {
            self.manager
                .update_setting(SettingUpdate::SquareSize(square_size))?;
        }
        Ok(())
    }

    /// Solve for intrinsics on a blocking task and end the session.
    ///
    /// With too few snapshots nothing changes. Otherwise the session ends
    /// whatever the outcome and the prior pipeline is restored; intrinsics
    /// are only stored on success.
    pub async fn finish_calibration(&self) -> Result<Intrinsics, VisionError> {
        let (snapshots, square_size, mode, generation) = {
            let mut inner = self.lock();
            if inner.state != CalibrationState::Collecting {
                return Err(VisionError::NotCalibrating);
            }
            let generation = inner.generation;
            let Some(session) = inner.session.as_mut() else {
                return Err(VisionError::NotCalibrating);
            };
            let have = session.snapshots.len();
            if have < self.threshold {
                return Err(VisionError::InsufficientSnapshots {
                    have,
                    need: self.threshold,
                });
            }
            let mode = self
                .manager
                .camera()
                .video_mode(session.video_mode_index)
                .ok_or(VisionError::InvalidVideoMode(session.video_mode_index))?;
            let snapshots = std::mem::take(&mut session.snapshots);
            let square_size = session.square_size;
            inner.state = CalibrationState::Computing;
            (snapshots, square_size, mode, generation)
        };

        let solver = Arc::clone(&self.solver);
        let outcome = tokio::task::spawn_blocking(move || solver.solve(&snapshots, square_size, &mode))
            .await
            .unwrap_or_else(|e| Err(format!("solver task failed: {e}")));

        {
            let mut inner = self.lock();
            if inner.generation != generation {
                return Err(VisionError::CalibrationCancelled);
            }
            inner.generation += 1;
            inner.session = None;
            inner.state = CalibrationState::Inactive;
        }
        self.slot.clear();
        self.manager.end_calibration();

        let camera = self.manager.camera();
        match outcome {
            Ok(intrinsics) => {
                camera.store_intrinsics(intrinsics.clone());
                Ok(intrinsics)
            }
            Err(msg) => {
                log::warn!("{}: calibration failed: {}", camera.name(), msg);
                Err(VisionError::CalibrationCompute(msg))
            }
        }
    }

    /// Drop the session, restoring the prior pipeline and video mode. A
    /// computation still running has its result discarded.
    pub fn cancel_calibration(&self) -> Result<(), VisionError> {
        {
            let mut inner = self.lock();
            if inner.state == CalibrationState::Inactive {
                return Err(VisionError::NotCalibrating);
            }
            inner.generation += 1;
            inner.session = None;
            inner.state = CalibrationState::Inactive;
        }
        self.slot.clear();
        self.manager.end_calibration();
        log::info!("{}: calibration cancelled", self.manager.camera().name());
        Ok(())
    }
}
