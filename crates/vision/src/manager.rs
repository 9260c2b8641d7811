use {
    crate::*,
    serde::{Deserialize, Serialize},
    std::sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    EnteredDriverMode,
    ExitedDriverMode,
}

/// Receives pipeline lifecycle transitions of a camera.
///
/// Driver-mode events follow the driver pipeline actually running: while a
/// calibration session holds the camera, turning driver mode on is reported
/// once the session ends.
pub trait LifecycleHooks: Send + Sync {
    fn notify(&self, camera: &str, event: LifecycleEvent);
}

pub struct NoHooks;

impl LifecycleHooks for NoHooks {
    fn notify(&self, _camera: &str, _event: LifecycleEvent) {}
}

/// Everything that decides which pipeline runs, guarded as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub pipelines: Vec<Pipeline>,
    pub current: usize,
    pub driver_mode: bool,
    pub driver: Pipeline,
    pub calibration: Option<Pipeline>,
    // driver override as last reported to the hooks
    driver_announced: bool,
}

/// The pipeline to run plus the selection it was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePipeline {
    pub pipeline: Pipeline,
    pub index: usize,
    pub driver_mode: bool,
}

impl Selection {
    /// Calibration beats driver mode, driver mode beats the index.
    pub fn effective(&self) -> &Pipeline {
        if let Some(calibration) = &self.calibration {
            calibration
        } else if self.driver_mode {
            &self.driver
        } else {
            &self.pipelines[self.current]
        }
    }

    fn effective_mut(&mut self) -> &mut Pipeline {
        if let Some(calibration) = &mut self.calibration {
            calibration
        } else if self.driver_mode {
            &mut self.driver
        } else {
            &mut self.pipelines[self.current]
        }
    }

    fn driver_transition(&mut self) -> Option<LifecycleEvent> {
        let running = self.driver_mode && self.calibration.is_none();
        if running == self.driver_announced {
            return None;
        }
        self.driver_announced = running;
        Some(if running {
            LifecycleEvent::EnteredDriverMode
        } else {
            LifecycleEvent::ExitedDriverMode
        })
    }

    fn nickname_taken(&self, nickname: &str, except: Option<usize>) -> bool {
        self.pipelines
            .iter()
            .enumerate()
            .any(|(i, p)| Some(i) != except && p.nickname == nickname)
    }

    fn unique_nickname(&self, base: &str) -> String {
        if !self.nickname_taken(base, None) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| !self.nickname_taken(candidate, None))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Ordered pipelines of one camera and which of them is active.
pub struct PipelineManager {
    camera: Arc<Camera>,
    hooks: Arc<dyn LifecycleHooks>,
    selection: Mutex<Selection>,
}

impl PipelineManager {
    /// Manager over `pipelines`, seeded with a default pipeline when empty.
    /// The first pipeline is selected.
    pub fn new(camera: Arc<Camera>, mut pipelines: Vec<Pipeline>, hooks: Arc<dyn LifecycleHooks>) -> Self {
        if pipelines.is_empty() {
            pipelines.push(Pipeline::standard(DEFAULT_NICKNAME));
        }
        Self {
            camera,
            hooks,
            selection: Mutex::new(Selection {
                pipelines,
                current: 0,
                driver_mode: false,
                driver: Pipeline::driver(),
                calibration: None,
                driver_announced: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply_effective(&self, selection: &Selection) {
        self.camera
            .apply_settings(selection.effective().settings.camera());
    }

    fn announce(&self, event: Option<LifecycleEvent>) {
        if let Some(event) = event {
            let name = self.camera.name();
            log::info!("{}: {:?}", name, event);
            self.hooks.notify(&name, event);
        }
    }

    pub fn camera(&self) -> &Arc<Camera> {
        &self.camera
    }

    /// Consistent copy of the whole selection state.
    pub fn selection(&self) -> Selection {
        self.lock().clone()
    }

    /// The pipeline the worker should run now.
    pub fn current_pipeline(&self) -> Pipeline {
        self.lock().effective().clone()
    }

    /// The pipeline to run with the index and driver flag, from one read.
    pub fn active(&self) -> ActivePipeline {
        let selection = self.lock();
        ActivePipeline {
            pipeline: selection.effective().clone(),
            index: selection.current,
            driver_mode: selection.driver_mode,
        }
    }

    pub fn current_index(&self) -> usize {
        self.lock().current
    }

    pub fn driver_mode(&self) -> bool {
        self.lock().driver_mode
    }

    pub fn is_calibrating(&self) -> bool {
        self.lock().calibration.is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pipelines.is_empty()
    }

    pub fn pipelines(&self) -> Vec<Pipeline> {
        self.lock().pipelines.clone()
    }

    pub fn nicknames(&self) -> Vec<String> {
        self.lock()
            .pipelines
            .iter()
            .map(|p| p.nickname.clone())
            .collect()
    }

    /// Select pipeline `index` and push its camera settings to the device.
    pub fn set_current_pipeline(&self, index: usize) -> Result<(), VisionError> {
        let mut selection = self.lock();
        let len = selection.pipelines.len();
        if index >= len {
            return Err(VisionError::InvalidPipelineIndex { index: index as i64, len });
        }
        selection.current = index;
        self.apply_effective(&selection);
        log::info!("{}: selected pipeline {}", self.camera.name(), index);
        Ok(())
    }

    /// Append a pipeline with a unique default nickname. The selection does
    /// not move.
    ///
    /// The video mode is clamped to the camera's modes; any other field out
    /// of range fails with `InvalidSetting` and nothing is added.
    pub fn add_pipeline(&self, initial: Option<PipelineSettings>) -> Result<(usize, Pipeline), VisionError> {
        let mut settings = initial.unwrap_or_default();
        let mode_count = self.camera.mode_count().max(1);
        let camera = settings.camera_mut();
        camera.video_mode_index = camera.video_mode_index.min(mode_count - 1);
        settings.validate(mode_count)?;

        let mut selection = self.lock();
        let pipeline = Pipeline::new(selection.unique_nickname(DEFAULT_NICKNAME), settings);
        selection.pipelines.push(pipeline.clone());
        Ok((selection.pipelines.len() - 1, pipeline))
    }

    /// Deep-copy pipeline `source` and append it to `target` (this manager
    /// when `None`).
    ///
    /// An explicit nickname already used on the destination fails with
    /// `DuplicatedKey`; without one the copy is named "<source> (copy)", made
    /// unique. Copies onto another camera clamp the video mode to that
    /// camera's modes and drop 3-D mode when it has no intrinsics for it.
    pub fn duplicate_pipeline(
        &self,
        source: usize,
        nickname: Option<String>,
        target: Option<&PipelineManager>,
    ) -> Result<Pipeline, VisionError> {
        let mut copy = {
            let selection = self.lock();
            let len = selection.pipelines.len();
            selection
                .pipelines
                .get(source)
                .cloned()
                .ok_or(VisionError::InvalidPipelineIndex { index: source as i64, len })?
        };

        let destination = target.unwrap_or(self);
        if !std::ptr::eq(destination, self) {
            let highest = destination.camera.mode_count().saturating_sub(1);
            let camera = copy.settings.camera_mut();
            camera.video_mode_index = camera.video_mode_index.min(highest);
            let mode_index = camera.video_mode_index;
            if let PipelineSettings::Standard(standard) = &mut copy.settings {
                if standard.is_3d && !destination.camera.is_calibrated(mode_index) {
                    standard.is_3d = false;
                }
            }
        }

        let mut selection = destination.lock();
        copy.nickname = match nickname {
            Some(nickname) if selection.nickname_taken(&nickname, None) => {
                return Err(VisionError::DuplicatedKey(nickname));
            }
            Some(nickname) => nickname,
            None => selection.unique_nickname(&format!("{} (copy)", copy.nickname)),
        };
        selection.pipelines.push(copy.clone());
        Ok(copy)
    }

    /// Remove pipeline `index`. Later entries move down by one; a selection
    /// past the end falls back to the previous entry.
    pub fn delete_pipeline(&self, index: usize) -> Result<Pipeline, VisionError> {
        let mut selection = self.lock();
        let len = selection.pipelines.len();
        if index >= len {
            return Err(VisionError::InvalidPipelineIndex { index: index as i64, len });
        }
        if len == 1 {
            return Err(VisionError::LastPipeline);
        }
        let removed = selection.pipelines.remove(index);
        let was_selected = selection.current == index;
        if selection.current > index {
            selection.current -= 1;
        } else if selection.current >= selection.pipelines.len() {
            selection.current = selection.pipelines.len() - 1;
        }
        if was_selected {
            self.apply_effective(&selection);
        }
        Ok(removed)
    }

    pub fn rename_pipeline(&self, index: usize, nickname: impl Into<String>) -> Result<(), VisionError> {
        let nickname = nickname.into();
        let mut selection = self.lock();
        let len = selection.pipelines.len();
        if index >= len {
            return Err(VisionError::InvalidPipelineIndex { index: index as i64, len });
        }
        if selection.nickname_taken(&nickname, Some(index)) {
            return Err(VisionError::DuplicatedKey(nickname));
        }
        selection.pipelines[index].nickname = nickname;
        Ok(())
    }

    /// Turn the driver override on or off. Returns whether the mode changed;
    /// hooks only hear about transitions of the running pipeline.
    pub fn set_driver_mode(&self, active: bool) -> bool {
        let (changed, event) = {
            let mut selection = self.lock();
            if selection.driver_mode == active {
                (false, None)
            } else {
                selection.driver_mode = active;
                self.apply_effective(&selection);
                (true, selection.driver_transition())
            }
        };
        self.announce(event);
        changed
    }

    /// Change one field of the active pipeline.
    pub fn update_setting(&self, update: SettingUpdate) -> Result<(), VisionError> {
        let mut selection = self.lock();
        let mode_count = self.camera.mode_count();
        let effective = selection.effective_mut();
        let mut settings = effective.settings.clone();
        update.apply(&mut settings, mode_count)?;
        if let SettingUpdate::Is3d(true) = update {
            let mode_index = settings.camera().video_mode_index;
            if !self.camera.is_calibrated(mode_index) {
                return Err(VisionError::InvalidSetting(format!(
                    "3-D mode needs intrinsics for video mode {mode_index}"
                )));
            }
        }
        effective.settings = settings;
        if update.touches_camera() {
            self.apply_effective(&selection);
        }
        Ok(())
    }

    pub(crate) fn begin_calibration(&self, pipeline: Pipeline) -> Result<(), VisionError> {
        let event = {
            let mut selection = self.lock();
            if selection.calibration.is_some() {
                return Err(VisionError::CalibrationActive);
            }
            selection.calibration = Some(pipeline);
            self.apply_effective(&selection);
            selection.driver_transition()
        };
        self.announce(event);
        Ok(())
    }

    /// Drop the calibration override and restore the settings of whatever
    /// was active before.
    pub(crate) fn end_calibration(&self) {
        let event = {
            let mut selection = self.lock();
            if selection.calibration.take().is_none() {
                return;
            }
            self.apply_effective(&selection);
            selection.driver_transition()
        };
        self.announce(event);
    }
}
