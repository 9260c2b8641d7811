#![allow(dead_code)]

use {
    image::{Image, PixelFormat, Size},
    std::{
        collections::VecDeque,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    },
    video::{CameraControls, Frame, FrameSource, VideoError, VideoMode},
    vision::*,
};

pub fn modes() -> Vec<VideoMode> {
    vec![
        VideoMode::new(32, 24, 30, PixelFormat::Gray8),
        VideoMode::new(64, 48, 30, PixelFormat::Gray8),
    ]
}

pub fn gray(width: usize, height: usize, value: u8) -> Image {
    Image::new(
        Size::new(width, height),
        PixelFormat::Gray8,
        vec![value; width * height],
    )
    .unwrap()
}

/// Left half black, right half white.
pub fn contrasty(width: usize, height: usize) -> Image {
    let data = (0..width * height)
        .map(|i| if i % width < width / 2 { 0 } else { 255 })
        .collect();
    Image::new(Size::new(width, height), PixelFormat::Gray8, data).unwrap()
}

pub fn frame(timestamp_nanos: u64) -> Frame {
    Frame::new(gray(32, 24, 200), timestamp_nanos)
}

/// Hands out queued frames, then reports the camera as gone.
pub struct ScriptedSource {
    frames: VecDeque<Result<Frame, VideoError>>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Result<Frame, VideoError>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn pull_frame(&mut self) -> Result<Frame, VideoError> {
        self.frames
            .pop_front()
            .unwrap_or_else(|| Err(VideoError::Disconnected("script ended".to_string())))
    }
}

/// Never delivers a frame; keeps a worker alive without publishing.
pub struct IdleSource;

impl FrameSource for IdleSource {
    fn pull_frame(&mut self) -> Result<Frame, VideoError> {
        thread::sleep(Duration::from_millis(5));
        Err(VideoError::Transient("idle".to_string()))
    }
}

/// Delivers a frame every few milliseconds, forever.
pub struct FrameStream;

impl FrameSource for FrameStream {
    fn pull_frame(&mut self) -> Result<Frame, VideoError> {
        thread::sleep(Duration::from_millis(2));
        Ok(frame(7))
    }
}

/// Controls recording every call that reaches the device.
#[derive(Default)]
pub struct RecordingControls {
    pub modes: Vec<VideoMode>,
    pub calls: Mutex<Vec<String>>,
    /// Mode reported as running, if any.
    pub active: Option<usize>,
}

impl RecordingControls {
    pub fn new() -> Self {
        Self {
            modes: modes(),
            calls: Mutex::new(Vec::new()),
            active: None,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CameraControls for RecordingControls {
    fn video_modes(&self) -> Vec<VideoMode> {
        self.modes.clone()
    }

    fn set_video_mode(&self, index: usize) -> Result<(), VideoError> {
        if index >= self.modes.len() {
            return Err(VideoError::InvalidMode(index));
        }
        self.calls.lock().unwrap().push(format!("mode:{index}"));
        Ok(())
    }

    fn active_video_mode(&self) -> Option<usize> {
        self.active
    }

    fn set_exposure(&self, value: i32) -> Result<(), VideoError> {
        self.calls.lock().unwrap().push(format!("exposure:{value}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub structured: Mutex<Vec<(String, PipelineResult)>>,
    pub snapshots: Mutex<Vec<UiSnapshot>>,
    pub frames: Mutex<Vec<(String, Image)>>,
    pub rebinds: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn timestamps(&self) -> Vec<u64> {
        self.structured
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.capture_timestamp_nanos)
            .collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn publish_structured(&self, channel: &str, result: &PipelineResult) {
        self.structured
            .lock()
            .unwrap()
            .push((channel.to_string(), result.clone()));
    }

    fn publish_snapshot(&self, snapshot: UiSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    fn publish_frame(&self, channel: &str, image: Image) {
        self.frames
            .lock()
            .unwrap()
            .push((channel.to_string(), image));
    }

    fn rebind(&self, old: &str, new: &str) {
        self.rebinds
            .lock()
            .unwrap()
            .push((old.to_string(), new.to_string()));
    }
}

/// Stage reporting one target per frame, failing on chosen calls (1-based).
pub struct ScriptedStage {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
}

impl ScriptedStage {
    pub fn new(fail_on: Vec<usize>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }
}

impl PipelineStage for ScriptedStage {
    fn process(&self, image: &Image, settings: &PipelineSettings) -> Result<PipelineResult, StageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(StageError::Failed(format!("call {call}")));
        }
        let payload = match settings.kind() {
            PipelineKind::Standard => ResultPayload::Standard {
                targets: vec![
                    Target {
                        pitch: 1.0,
                        yaw: 2.0,
                        area: 3.0,
                        center: (4.0, 5.0),
                        pose: None,
                    },
                    Target {
                        pitch: -1.0,
                        yaw: -2.0,
                        area: 0.5,
                        center: (1.0, 1.0),
                        pose: None,
                    },
                ],
            },
            PipelineKind::Driver => ResultPayload::Driver,
            PipelineKind::Calibration => ResultPayload::Calibration,
        };
        Ok(PipelineResult::new(payload).with_output(image.clone()))
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    pub events: Mutex<Vec<LifecycleEvent>>,
}

impl LifecycleHooks for RecordingHooks {
    fn notify(&self, _camera: &str, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn identity(name: &str) -> CameraIdentity {
    CameraIdentity {
        name: name.to_string(),
        nickname: name.to_string(),
        video_modes: modes(),
        video_mode_index: 0,
        fov: 70.0,
        calibrations: Vec::new(),
    }
}

pub fn camera(name: &str) -> (Arc<Camera>, Arc<RecordingControls>) {
    let controls = Arc::new(RecordingControls::new());
    let camera = Arc::new(Camera::new(identity(name), controls.clone()));
    (camera, controls)
}

pub fn manager(name: &str) -> (Arc<PipelineManager>, Arc<RecordingControls>, Arc<RecordingHooks>) {
    let (camera, controls) = camera(name);
    let hooks = Arc::new(RecordingHooks::default());
    let manager = Arc::new(PipelineManager::new(camera, Vec::new(), hooks.clone()));
    (manager, controls, hooks)
}

pub fn intrinsics_for(size: Size) -> Intrinsics {
    Intrinsics {
        resolution: size,
        camera_matrix: [100.0, 0.0, 16.0, 0.0, 100.0, 12.0, 0.0, 0.0, 1.0],
        dist_coeffs: vec![0.0; 5],
        snapshot_count: 1,
    }
}
