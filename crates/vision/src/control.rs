use {
    crate::*,
    image::Size,
    serde::{Deserialize, Serialize},
    video::VideoMode,
};

/// Requests from the UI. All act on the UI-focused camera unless they name
/// another one.
///
/// Pipeline indices are signed on the wire so that a negative index is
/// answered with `InvalidPipelineIndex` instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    RequestSettings,
    SelectCamera {
        camera: usize,
    },
    RenameCamera {
        nickname: String,
    },
    SelectPipeline {
        index: i64,
    },
    SetDriverMode {
        active: bool,
    },
    AddPipeline {
        #[serde(default)]
        settings: Option<PipelineSettings>,
    },
    DuplicatePipeline {
        index: i64,
        #[serde(default)]
        nickname: Option<String>,
        #[serde(default)]
        target_camera: Option<usize>,
    },
    DeletePipeline {
        index: i64,
    },
    RenamePipeline {
        index: i64,
        nickname: String,
    },
    UpdateSetting {
        update: SettingUpdate,
    },
    StartCalibration {
        #[serde(default)]
        square_size: Option<f64>,
        video_mode_index: usize,
    },
    TakeSnapshot,
    SetSquareSize {
        square_size: f64,
    },
    FinishCalibration,
    CancelCalibration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ControlOutcome {
    Done,
    DriverMode { changed: bool },
    PipelineAdded { index: usize, nickname: String },
    PipelineDeleted { nickname: String },
    SnapshotTaken { count: usize, has_enough: bool },
    Calibrated { intrinsics: Intrinsics },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSummary {
    pub name: String,
    pub nickname: String,
    pub video_modes: Vec<VideoMode>,
    pub video_mode_index: usize,
    pub fov: f64,
    pub calibrated: Vec<Size>,
}

/// Everything the UI shows about the focused camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub cameras: Vec<CameraSummary>,
    pub ui_camera: Option<usize>,
    pub pipelines: Vec<String>,
    pub current_pipeline: usize,
    pub driver_mode: bool,
    pub active: Option<Pipeline>,
    pub calibration: CalibrationState,
    pub snapshot_count: usize,
    pub snapshots_required: usize,
}

impl SettingsSnapshot {
    pub fn collect(registry: &CameraRegistry) -> Self {
        let cameras = registry
            .handles()
            .iter()
            .map(|handle| {
                let identity = handle.camera.identity();
                CameraSummary {
                    calibrated: identity.calibrations.iter().map(|c| c.resolution).collect(),
                    name: identity.name,
                    nickname: identity.nickname,
                    video_modes: identity.video_modes,
                    video_mode_index: identity.video_mode_index,
                    fov: identity.fov,
                }
            })
            .collect();

        let mut snapshot = Self {
            cameras,
            ui_camera: registry.ui_camera_index(),
            pipelines: Vec::new(),
            current_pipeline: 0,
            driver_mode: false,
            active: None,
            calibration: CalibrationState::Inactive,
            snapshot_count: 0,
            snapshots_required: registry.config().snapshot_threshold(),
        };
        if let Ok(handle) = registry.ui_camera() {
            let selection = handle.manager.selection();
            snapshot.active = Some(selection.effective().clone());
            snapshot.pipelines = selection.pipelines.iter().map(|p| p.nickname.clone()).collect();
            snapshot.current_pipeline = selection.current;
            snapshot.driver_mode = selection.driver_mode;
            snapshot.calibration = handle.calibration.state();
            snapshot.snapshot_count = handle.calibration.snapshot_count();
            snapshot.snapshots_required = handle.calibration.required_snapshots();
        }
        snapshot
    }
}

/// Answer to a control event: its outcome and the settings after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReply {
    pub outcome: ControlOutcome,
    pub settings: SettingsSnapshot,
}

fn pipeline_index(manager: &PipelineManager, index: i64) -> Result<usize, VisionError> {
    usize::try_from(index).map_err(|_| VisionError::InvalidPipelineIndex {
        index,
        len: manager.len(),
    })
}

/// Run one control event against the registry.
pub async fn dispatch(registry: &CameraRegistry, event: ControlEvent) -> Result<ControlOutcome, VisionError> {
    if let ControlEvent::SelectCamera { camera } = event {
        registry.select_camera(camera)?;
        return Ok(ControlOutcome::Done);
    }

    let handle = registry.ui_camera()?;
    let manager = &handle.manager;
    let calibration = &handle.calibration;
    match event {
        ControlEvent::RequestSettings | ControlEvent::SelectCamera { .. } => Ok(ControlOutcome::Done),
        ControlEvent::RenameCamera { nickname } => {
            let index = registry.ui_camera_index().unwrap_or_default();
            registry.rename_camera(index, nickname)?;
            Ok(ControlOutcome::Done)
        }
        ControlEvent::SelectPipeline { index } => {
            manager.set_current_pipeline(pipeline_index(manager, index)?)?;
            Ok(ControlOutcome::Done)
        }
        ControlEvent::SetDriverMode { active } => Ok(ControlOutcome::DriverMode {
            changed: manager.set_driver_mode(active),
        }),
        ControlEvent::AddPipeline { settings } => {
            let (index, pipeline) = manager.add_pipeline(settings)?;
            Ok(ControlOutcome::PipelineAdded {
                index,
                nickname: pipeline.nickname,
            })
        }
        ControlEvent::DuplicatePipeline {
            index,
            nickname,
            target_camera,
        } => {
            let index = pipeline_index(manager, index)?;
            let target = target_camera.map(|i| registry.camera(i)).transpose()?;
            let pipeline = manager.duplicate_pipeline(
                index,
                nickname,
                target.as_ref().map(|t| t.manager.as_ref()),
            )?;
            let destination = target.as_ref().map_or(manager, |t| &t.manager);
            Ok(ControlOutcome::PipelineAdded {
                index: destination.len() - 1,
                nickname: pipeline.nickname,
            })
        }
        ControlEvent::DeletePipeline { index } => {
            let removed = manager.delete_pipeline(pipeline_index(manager, index)?)?;
            Ok(ControlOutcome::PipelineDeleted {
                nickname: removed.nickname,
            })
        }
        ControlEvent::RenamePipeline { index, nickname } => {
            manager.rename_pipeline(pipeline_index(manager, index)?, nickname)?;
            Ok(ControlOutcome::Done)
        }
        ControlEvent::UpdateSetting { update } => {
            manager.update_setting(update)?;
            Ok(ControlOutcome::Done)
        }
        ControlEvent::StartCalibration {
            square_size,
            video_mode_index,
        } => {
            let square_size = square_size.unwrap_or(registry.config().default_square_size());
            calibration.enter_calibration(square_size, video_mode_index)?;
            Ok(ControlOutcome::Done)
        }
        ControlEvent::TakeSnapshot => {
            let (count, has_enough) = calibration.take_snapshot()?;
            Ok(ControlOutcome::SnapshotTaken { count, has_enough })
        }
        ControlEvent::SetSquareSize { square_size } => {
            calibration.set_square_size(square_size)?;
            Ok(ControlOutcome::Done)
        }
        ControlEvent::FinishCalibration => {
            let intrinsics = calibration.finish_calibration().await?;
            Ok(ControlOutcome::Calibrated { intrinsics })
        }
        ControlEvent::CancelCalibration => {
            calibration.cancel_calibration()?;
            Ok(ControlOutcome::Done)
        }
    }
}

/// Reply for a request that never made it to `dispatch`, such as one that
/// failed to decode.
pub fn rejected(registry: &CameraRegistry, error: impl Into<String>) -> ControlReply {
    ControlReply {
        outcome: ControlOutcome::Failed { error: error.into() },
        settings: SettingsSnapshot::collect(registry),
    }
}

/// `dispatch`, with failures folded into the outcome and the settings
/// snapshot attached.
pub async fn reply(registry: &CameraRegistry, event: ControlEvent) -> ControlReply {
    let outcome = match dispatch(registry, event).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("control event failed: {}", e);
            ControlOutcome::Failed {
                error: e.to_string(),
            }
        }
    };
    ControlReply {
        outcome,
        settings: SettingsSnapshot::collect(registry),
    }
}
