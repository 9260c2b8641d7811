use {
    crate::*,
    std::sync::{Arc, Mutex, MutexGuard, RwLock},
    video::{CameraControls, FrameSource},
};

/// Everything needed to attach one camera.
pub struct CameraSetup {
    identity: CameraIdentity,
    source: Box<dyn FrameSource>,
    controls: Arc<dyn CameraControls>,
    pipelines: Vec<Pipeline>,
    stage: Option<Arc<dyn PipelineStage>>,
    solver: Option<Arc<dyn IntrinsicsSolver>>,
}

impl CameraSetup {
    pub fn new(name: impl Into<String>, source: Box<dyn FrameSource>, controls: Arc<dyn CameraControls>) -> Self {
        let name = name.into();
        Self {
            identity: CameraIdentity {
                nickname: name.clone(),
                name,
                video_modes: controls.video_modes(),
                video_mode_index: 0,
                fov: 70.0,
                calibrations: Vec::new(),
            },
            source,
            controls,
            pipelines: Vec::new(),
            stage: None,
            solver: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.identity.nickname = nickname.into();
        self
    }

    /// Horizontal field of view in degrees.
    pub fn with_fov(mut self, fov: f64) -> Self {
        self.identity.fov = fov;
        self
    }

    /// Mode the device was opened in.
    pub fn with_video_mode_index(mut self, index: usize) -> Self {
        self.identity.video_mode_index = index;
        self
    }

    /// Previously saved intrinsics.
    pub fn with_calibrations(mut self, calibrations: Vec<Intrinsics>) -> Self {
        self.identity.calibrations = calibrations;
        self
    }

    /// Previously saved pipelines. A default pipeline is created when empty.
    pub fn with_pipelines(mut self, pipelines: Vec<Pipeline>) -> Self {
        self.pipelines = pipelines;
        self
    }

    /// Replace the reference stages.
    pub fn with_stage(mut self, stage: Arc<dyn PipelineStage>) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Replace the field-of-view solver.
    pub fn with_solver(mut self, solver: Arc<dyn IntrinsicsSolver>) -> Self {
        self.solver = Some(solver);
        self
    }
}

/// An attached camera and its collaborators.
pub struct CameraHandle {
    pub camera: Arc<Camera>,
    pub manager: Arc<PipelineManager>,
    pub calibration: Arc<CalibrationController>,
    worker: Mutex<CameraWorker>,
}

impl CameraHandle {
    fn worker(&self) -> MutexGuard<'_, CameraWorker> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(self.worker().status())
    }

    pub fn worker_state(&self) -> WorkerState {
        self.worker().state()
    }

    pub fn last_result(&self) -> Option<PipelineResult> {
        self.status().last_result()
    }

    pub fn fps(&self) -> f64 {
        self.status().fps()
    }

    pub fn shutdown(&self) {
        self.worker().shutdown();
    }
}

/// Ordered set of attached cameras and which one the UI shows.
pub struct CameraRegistry {
    config: VisionConfig,
    sink: Arc<dyn TelemetrySink>,
    hooks: Arc<dyn LifecycleHooks>,
    focus: Arc<UiFocus>,
    cameras: RwLock<Vec<Arc<CameraHandle>>>,
}

impl CameraRegistry {
    pub fn new(config: VisionConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            config,
            sink,
            hooks: Arc::new(NoHooks),
            focus: Arc::new(UiFocus::default()),
            cameras: RwLock::new(Vec::new()),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn cameras(&self) -> Vec<Arc<CameraHandle>> {
        self.cameras
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Attach a camera and start its worker. The first camera gets the UI
    /// focus. Returns the camera's index.
    pub fn attach(&self, setup: CameraSetup) -> Result<usize, VisionError> {
        let mut cameras = self.cameras.write().unwrap_or_else(|e| e.into_inner());
        let name = setup.identity.name.clone();
        if cameras.iter().any(|c| c.camera.name() == name) {
            return Err(VisionError::DuplicatedKey(name));
        }

        let fov = setup.identity.fov;
        let camera = Arc::new(Camera::new(setup.identity, setup.controls));
        let manager = Arc::new(PipelineManager::new(
            Arc::clone(&camera),
            setup.pipelines,
            Arc::clone(&self.hooks),
        ));
        let slot = Arc::new(SnapshotSlot::default());
        let solver = setup
            .solver
            .unwrap_or_else(|| Arc::new(FovSolver::new(fov)));
        let calibration = Arc::new(CalibrationController::new(
            Arc::clone(&manager),
            Arc::clone(&slot),
            solver,
            self.config.snapshot_threshold(),
        ));
        let stage = setup
            .stage
            .unwrap_or_else(|| Arc::new(StageSet::new(fov)));

        // settings of the seeded selection reach the device before the first frame
        camera.apply_settings(manager.current_pipeline().settings.camera());

        let vision_loop = VisionLoop::new(
            Arc::clone(&manager),
            stage,
            Arc::clone(&self.sink),
            Arc::clone(&self.focus),
            slot,
            &self.config,
        );
        let worker = CameraWorker::spawn(vision_loop, setup.source)?;

        if cameras.is_empty() {
            self.focus.focus(name.clone());
        }
        cameras.push(Arc::new(CameraHandle {
            camera,
            manager,
            calibration,
            worker: Mutex::new(worker),
        }));
        log::info!("attached camera {} as #{}", name, cameras.len() - 1);
        Ok(cameras.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.cameras.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn handles(&self) -> Vec<Arc<CameraHandle>> {
        self.cameras()
    }

    pub fn camera(&self, index: usize) -> Result<Arc<CameraHandle>, VisionError> {
        self.cameras()
            .get(index)
            .cloned()
            .ok_or_else(|| VisionError::UnknownCamera(format!("#{index}")))
    }

    pub fn by_name(&self, name: &str) -> Result<Arc<CameraHandle>, VisionError> {
        self.cameras()
            .into_iter()
            .find(|c| c.camera.name() == name)
            .ok_or_else(|| VisionError::UnknownCamera(name.to_string()))
    }

    /// Index of the UI-focused camera.
    pub fn ui_camera_index(&self) -> Option<usize> {
        let focused = self.focus.focused()?;
        self.cameras()
            .iter()
            .position(|c| c.camera.name() == focused)
    }

    pub fn ui_camera(&self) -> Result<Arc<CameraHandle>, VisionError> {
        let index = self
            .ui_camera_index()
            .ok_or_else(|| VisionError::UnknownCamera("no camera attached".to_string()))?;
        self.camera(index)
    }

    /// Move the UI focus to camera `index`.
    pub fn select_camera(&self, index: usize) -> Result<(), VisionError> {
        let handle = self.camera(index)?;
        self.focus.focus(handle.camera.name());
        Ok(())
    }

    /// Change a camera's nickname and move its telemetry namespace along.
    pub fn rename_camera(&self, index: usize, nickname: impl Into<String>) -> Result<(), VisionError> {
        let nickname = nickname.into();
        // check and set under the write lock
        let cameras = self.cameras.write().unwrap_or_else(|e| e.into_inner());
        let handle = cameras
            .get(index)
            .ok_or_else(|| VisionError::UnknownCamera(format!("#{index}")))?;
        let taken = cameras
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.camera.nickname() == nickname);
        if taken {
            return Err(VisionError::DuplicatedKey(nickname));
        }
        let old = handle.camera.nickname();
        if old != nickname {
            handle.camera.set_nickname(nickname.clone());
            self.sink
                .rebind(&channel_name(&old), &channel_name(&nickname));
        }
        Ok(())
    }

    /// Stop every worker and wait for them.
    pub fn shutdown(&self) {
        for handle in self.cameras() {
            handle.shutdown();
        }
    }
}
