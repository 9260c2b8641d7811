use {
    crate::*,
    base::{RateGate, RollingAverage},
    serde::{Deserialize, Serialize},
    std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, Ordering},
        },
        thread::{self, JoinHandle},
        time::Instant,
    },
    video::{FrameSource, VideoError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Starting,
    Running,
    Stopped,
}

/// What one loop iteration did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Published,
    /// Empty frame or transient capture error.
    Skipped,
    /// The stage failed; the previous result stays.
    StageFailed(StageError),
    /// The camera is gone.
    Disconnected(VideoError),
}

/// State a worker shares with the control side.
#[derive(Debug)]
pub struct WorkerStatus {
    state: Mutex<WorkerState>,
    last_result: Mutex<Option<PipelineResult>>,
    fps: Mutex<f64>,
    stop_reason: Mutex<Option<VideoError>>,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            state: Mutex::new(WorkerState::Starting),
            last_result: Mutex::new(None),
            fps: Mutex::new(0.0),
            stop_reason: Mutex::new(None),
        }
    }
}

impl WorkerStatus {
    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Most recent successful result, without its output image.
    pub fn last_result(&self) -> Option<PipelineResult> {
        self.last_result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Rolling mean of the loop rate.
    pub fn fps(&self) -> f64 {
        *self.fps.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Why the worker stopped, when the camera went away.
    pub fn stop_reason(&self) -> Option<VideoError> {
        self.stop_reason
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// The per-camera processing loop, one `step` per frame.
pub struct VisionLoop {
    camera: Arc<Camera>,
    manager: Arc<PipelineManager>,
    stage: Arc<dyn PipelineStage>,
    sink: Arc<dyn TelemetrySink>,
    focus: Arc<UiFocus>,
    slot: Arc<SnapshotSlot>,
    status: Arc<WorkerStatus>,
    fps: RollingAverage,
    ui_gate: RateGate,
    last_start: Option<Instant>,
}

impl VisionLoop {
    pub fn new(
        manager: Arc<PipelineManager>,
        stage: Arc<dyn PipelineStage>,
        sink: Arc<dyn TelemetrySink>,
        focus: Arc<UiFocus>,
        slot: Arc<SnapshotSlot>,
        config: &VisionConfig,
    ) -> Self {
        Self {
            camera: Arc::clone(manager.camera()),
            manager,
            stage,
            sink,
            focus,
            slot,
            status: Arc::new(WorkerStatus::default()),
            fps: RollingAverage::new(config.fps_window()),
            ui_gate: RateGate::from_hz(config.ui_rate_hz()),
            last_start: None,
        }
    }

    pub fn status(&self) -> &Arc<WorkerStatus> {
        &self.status
    }

    fn measure_fps(&mut self, now: Instant) {
        if let Some(last) = self.last_start {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            if dt > 0.0 {
                let mean = self.fps.push(1.0 / dt);
                *self.status.fps.lock().unwrap_or_else(|e| e.into_inner()) = mean;
            }
        }
        self.last_start = Some(now);
    }

    /// Pull one frame, run the active pipeline on it and publish.
    pub fn step(&mut self, source: &mut dyn FrameSource) -> StepOutcome {
        self.step_at(source, Instant::now())
    }

    /// `step` for an iteration that started at `started`.
    pub fn step_at(&mut self, source: &mut dyn FrameSource, started: Instant) -> StepOutcome {
        self.measure_fps(started);

        let frame = match source.pull_frame() {
            Ok(frame) if frame.is_empty() => {
                log::debug!("{}: empty frame", self.camera.name());
                return StepOutcome::Skipped;
            }
            Ok(frame) => frame,
            Err(e) if e.is_fatal() => return StepOutcome::Disconnected(e),
            Err(e) => {
                log::debug!("{}: {}", self.camera.name(), e);
                return StepOutcome::Skipped;
            }
        };

        let ActivePipeline {
            pipeline,
            index,
            driver_mode,
        } = self.manager.active();
        if pipeline.kind() == PipelineKind::Calibration {
            self.slot.offer(&frame.image);
        }

        let started = Instant::now();
        let processed = self.stage.process(&frame.image, &pipeline.settings);
        let timestamp = frame.timestamp_nanos;
        drop(frame);

        let mut result = match processed {
            Ok(result) => result,
            Err(e) => {
                log::warn!(
                    "{}: pipeline {:?} failed: {}",
                    self.camera.name(),
                    pipeline.nickname,
                    e
                );
                return StepOutcome::StageFailed(e);
            }
        };
        result.process_time_nanos = started.elapsed().as_nanos() as u64;
        result.capture_timestamp_nanos = timestamp;
        result.pipeline_index = index;
        result.driver_mode = driver_mode;

        let identity = self.camera.identity();
        let channel = channel_name(&identity.nickname);
        self.sink.publish_structured(&channel, &result);

        let output = result.output.take();
        if self.focus.is_focused(&identity.name) && self.ui_gate.ready() {
            self.sink.publish_snapshot(UiSnapshot::new(
                identity.nickname.clone(),
                &result,
                pipeline.settings.multiple(),
                self.status.fps(),
            ));
            if let Some(image) = output {
                self.sink.publish_frame(&channel, image);
            }
        }

        *self
            .status
            .last_result
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(result);
        StepOutcome::Published
    }

    /// Step until cancelled or the camera is gone.
    pub fn run(&mut self, source: &mut dyn FrameSource, cancel: &AtomicBool) {
        let name = self.camera.name();
        self.status.set_state(WorkerState::Running);
        log::info!("{}: worker running", name);
        while !cancel.load(Ordering::Relaxed) {
            if let StepOutcome::Disconnected(e) = self.step(source) {
                log::error!("{}: camera lost: {}", name, e);
                *self
                    .status
                    .stop_reason
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(e);
                break;
            }
        }
        self.status.set_state(WorkerState::Stopped);
        log::info!("{}: worker stopped", name);
    }
}

/// A `VisionLoop` on its own named thread.
pub struct CameraWorker {
    status: Arc<WorkerStatus>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CameraWorker {
    pub fn spawn(mut vision_loop: VisionLoop, mut source: Box<dyn FrameSource>) -> Result<Self, VisionError> {
        let status = Arc::clone(vision_loop.status());
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name(vision_loop.camera.name())
            .spawn({
                let cancel = Arc::clone(&cancel);
                move || vision_loop.run(source.as_mut(), &cancel)
            })?;
        Ok(Self {
            status,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn status(&self) -> &Arc<WorkerStatus> {
        &self.status
    }

    pub fn state(&self) -> WorkerState {
        self.status.state()
    }

    /// Ask the loop to stop after the current frame and wait for it.
    pub fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("camera worker panicked");
            }
        }
    }
}

impl Drop for CameraWorker {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
