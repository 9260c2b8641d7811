use {
    crate::*,
    image::Image,
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        thread::{self, JoinHandle},
        time::Duration,
    },
    tokio::sync::{mpsc, oneshot},
};

/// What a capture device can do, reported before it is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    pub modes: Vec<VideoMode>,
    pub exposure: bool,
    pub brightness: bool,
}

/// A camera backend driven from the capture thread.
pub trait CaptureDevice: Send + 'static {
    fn capabilities(&self) -> DeviceCapabilities;
    fn open(&mut self, mode: &VideoMode) -> Result<(), VideoError>; // open (or reopen) in the given mode
    fn close(&mut self); // close the device, if open
    fn blocking_capture(&mut self) -> Result<Image, VideoError>; // wait for and return the next image

    fn set_exposure(&mut self, _value: i32) -> Result<(), VideoError> {
        Err(VideoError::Unsupported("exposure".to_string()))
    }

    fn set_brightness(&mut self, _value: i32) -> Result<(), VideoError> {
        Err(VideoError::Unsupported("brightness".to_string()))
    }
}

/// Configuration for a capture thread.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    name: String,
    mode_index: usize,
    channel_capacity: usize,
    reconnect_delay: Duration,
    reconnect_attempts: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            name: "camera".to_string(),
            mode_index: 0,
            channel_capacity: 2,
            reconnect_delay: Duration::from_millis(100),
            reconnect_attempts: 50,
        }
    }
}

impl CaptureConfig {
    /// Camera name, used for the capture thread name and log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Index into the device's mode list to open with.
    pub fn with_mode_index(mut self, mode_index: usize) -> Self {
        self.mode_index = mode_index;
        self
    }

    /// Frames buffered between the capture thread and the worker.
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity.max(1);
        self
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    /// Reopen attempts after a hard failure before the camera counts as gone.
    pub fn with_reconnect_attempts(mut self, reconnect_attempts: u32) -> Self {
        self.reconnect_attempts = reconnect_attempts;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode_index(&self) -> usize {
        self.mode_index
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }
}

#[derive(Debug, Clone, Copy)]
enum DeviceCommand {
    SetMode(usize),
    SetExposure(i32),
    SetBrightness(i32),
}

type FrameResult = Result<Frame, VideoError>;

/// Frames from a `CaptureDevice` pumped on a dedicated thread.
pub struct CaptureSource {
    receiver: Option<mpsc::Receiver<FrameResult>>,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// Control handle for a running `CaptureSource`. Changes are queued and
/// applied by the capture thread between two captures.
#[derive(Debug, Clone)]
pub struct CaptureControls {
    commands: mpsc::UnboundedSender<DeviceCommand>,
    capabilities: DeviceCapabilities,
    active_mode: Arc<AtomicUsize>,
}

impl CaptureSource {
    /// Open `device` on a new capture thread.
    ///
    /// The device is opened on the capture thread itself, since some backends
    /// are bound to the thread that opened them. Returns once the open
    /// succeeded or failed.
    pub async fn open<D: CaptureDevice>(
        mut device: D,
        config: CaptureConfig,
    ) -> Result<(Self, CaptureControls), VideoError> {
        let capabilities = device.capabilities();
        let mode = *capabilities
            .modes
            .get(config.mode_index())
            .ok_or(VideoError::InvalidMode(config.mode_index()))?;

        let (frame_tx, frame_rx) = mpsc::channel::<FrameResult>(config.channel_capacity());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (init_tx, init_rx) = oneshot::channel::<Result<(), VideoError>>();
        let cancel = Arc::new(AtomicBool::new(false));
        let active_mode = Arc::new(AtomicUsize::new(config.mode_index()));

        let join_handle = thread::Builder::new()
            .name(format!("{} - capture", config.name()))
            .spawn({
                let cancel = Arc::clone(&cancel);
                let active_mode = Arc::clone(&active_mode);
                let modes = capabilities.modes.clone();
                move || {
                    if let Err(error) = device.open(&mode) {
                        let _ = init_tx.send(Err(error));
                        return;
                    }
                    let _ = init_tx.send(Ok(()));
                    let mut pump = Pump {
                        device,
                        mode,
                        active_mode,
                        modes,
                        config,
                        frames: frame_tx,
                        commands: command_rx,
                        cancel,
                    };
                    pump.run();
                    pump.device.close();
                }
            })?;

        init_rx
            .await
            .map_err(|_| VideoError::Channel("capture thread died during open".to_string()))??;

        Ok((
            Self {
                receiver: Some(frame_rx),
                cancel,
                join_handle: Some(join_handle),
            },
            CaptureControls {
                commands: command_tx,
                capabilities,
                active_mode,
            },
        ))
    }
}

impl FrameSource for CaptureSource {
    fn pull_frame(&mut self) -> Result<Frame, VideoError> {
        let receiver = self
            .receiver
            .as_mut()
            .ok_or_else(|| VideoError::Channel("capture source closed".to_string()))?;
        receiver
            .blocking_recv()
            .unwrap_or_else(|| Err(VideoError::Disconnected("capture thread ended".to_string())))
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        // dropping the receiver unblocks a capture thread stuck on a full channel
        drop(self.receiver.take());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl CaptureControls {
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn queue(&self, command: DeviceCommand) -> Result<(), VideoError> {
        self.commands
            .send(command)
            .map_err(|_| VideoError::Channel("capture thread is not running".to_string()))
    }
}

impl CameraControls for CaptureControls {
    fn video_modes(&self) -> Vec<VideoMode> {
        self.capabilities.modes.clone()
    }

    fn set_video_mode(&self, index: usize) -> Result<(), VideoError> {
        if index >= self.capabilities.modes.len() {
            return Err(VideoError::InvalidMode(index));
        }
        self.queue(DeviceCommand::SetMode(index))
    }

    fn active_video_mode(&self) -> Option<usize> {
        Some(self.active_mode.load(Ordering::Acquire))
    }

    fn set_exposure(&self, value: i32) -> Result<(), VideoError> {
        if !self.capabilities.exposure {
            return Err(VideoError::Unsupported("exposure".to_string()));
        }
        self.queue(DeviceCommand::SetExposure(value))
    }

    fn set_brightness(&self, value: i32) -> Result<(), VideoError> {
        if !self.capabilities.brightness {
            return Err(VideoError::Unsupported("brightness".to_string()));
        }
        self.queue(DeviceCommand::SetBrightness(value))
    }
}

struct Pump<D> {
    device: D,
    mode: VideoMode,
    active_mode: Arc<AtomicUsize>,
    modes: Vec<VideoMode>,
    config: CaptureConfig,
    frames: mpsc::Sender<FrameResult>,
    commands: mpsc::UnboundedReceiver<DeviceCommand>,
    cancel: Arc<AtomicBool>,
}

impl<D: CaptureDevice> Pump<D> {
    fn run(&mut self) {
        log::info!("{}: capture started in {}", self.config.name(), self.mode);
        while !self.cancel.load(Ordering::Relaxed) {
            while let Ok(command) = self.commands.try_recv() {
                self.apply(command);
            }
            let result = match self.device.blocking_capture() {
                Ok(image) => Ok(Frame::now(image)),
                Err(error @ VideoError::Transient(_)) => Err(error),
                Err(error) => {
                    log::warn!("{}: capture failed: {}", self.config.name(), error);
                    if self.reconnect() {
                        continue;
                    }
                    Err(VideoError::Disconnected(format!(
                        "{} did not come back after {} attempts",
                        self.config.name(),
                        self.config.reconnect_attempts()
                    )))
                }
            };
            let fatal = matches!(result, Err(VideoError::Disconnected(_)));
            if self.frames.blocking_send(result).is_err() {
                // the source was dropped
                return;
            }
            if fatal {
                return;
            }
        }
    }

    fn apply(&mut self, command: DeviceCommand) {
        let name = self.config.name().to_string();
        let outcome = match command {
            DeviceCommand::SetExposure(value) => self.device.set_exposure(value),
            DeviceCommand::SetBrightness(value) => self.device.set_brightness(value),
            DeviceCommand::SetMode(index) => {
                let new_mode = self.modes[index];
                if new_mode == self.mode {
                    return;
                }
                self.device.close();
                match self.device.open(&new_mode) {
                    Ok(()) => {
                        log::info!("{}: switched to {}", name, new_mode);
                        self.mode = new_mode;
                        self.active_mode.store(index, Ordering::Release);
                        Ok(())
                    }
                    Err(error) => {
                        // fall back to the mode that worked
                        let _ = self.device.open(&self.mode);
                        Err(error)
                    }
                }
            }
        };
        if let Err(error) = outcome {
            log::warn!("{}: {:?} not applied: {}", name, command, error);
        }
    }

    fn reconnect(&mut self) -> bool {
        for attempt in 1..=self.config.reconnect_attempts() {
            if self.cancel.load(Ordering::Relaxed) {
                return false;
            }
            log::info!("{}: reconnecting ({})...", self.config.name(), attempt);
            self.device.close();
            thread::sleep(self.config.reconnect_delay());
            if self.device.open(&self.mode).is_ok() {
                return true;
            }
        }
        false
    }
}
