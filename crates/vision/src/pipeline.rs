use {
    crate::VisionError,
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_NICKNAME: &str = "New Pipeline";
pub const DRIVER_NICKNAME: &str = "Driver";
pub const CALIBRATION_NICKNAME: &str = "Calibration";

/// Hardware settings every pipeline carries for its camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub exposure: i32,
    pub brightness: i32,
    pub video_mode_index: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            exposure: 50,
            brightness: 50,
            video_mode_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardSettings {
    pub camera: CameraSettings,
    /// Report camera-relative poses. Needs intrinsics for the video mode.
    pub is_3d: bool,
    /// Show every target in the UI instead of only the best one.
    pub multiple: bool,
    /// Inclusive luma band a pixel must fall in to count as target.
    pub luma: (u8, u8),
    /// Accepted target area, in percent of the frame.
    pub area: (f64, f64),
    pub max_targets: usize,
    pub stream_divisor: usize,
}

impl Default for StandardSettings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            is_3d: false,
            multiple: false,
            luma: (128, 255),
            area: (0.05, 100.0),
            max_targets: 5,
            stream_divisor: 1,
        }
    }
}

/// Driver mode: camera feed for a human, no processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSettings {
    pub camera: CameraSettings,
    pub stream_divisor: usize,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            camera: CameraSettings {
                exposure: 70,
                brightness: 50,
                video_mode_index: 0,
            },
            stream_divisor: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    pub camera: CameraSettings,
    /// Edge length of one checkerboard square.
    pub square_size: f64,
    pub stream_divisor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Standard,
    Driver,
    Calibration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineSettings {
    Standard(StandardSettings),
    Driver(DriverSettings),
    Calibration(CalibrationSettings),
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings::Standard(StandardSettings::default())
    }
}

impl PipelineSettings {
    pub fn kind(&self) -> PipelineKind {
        match self {
            PipelineSettings::Standard(_) => PipelineKind::Standard,
            PipelineSettings::Driver(_) => PipelineKind::Driver,
            PipelineSettings::Calibration(_) => PipelineKind::Calibration,
        }
    }

    pub fn camera(&self) -> &CameraSettings {
        match self {
            PipelineSettings::Standard(s) => &s.camera,
            PipelineSettings::Driver(s) => &s.camera,
            PipelineSettings::Calibration(s) => &s.camera,
        }
    }

    pub fn camera_mut(&mut self) -> &mut CameraSettings {
        match self {
            PipelineSettings::Standard(s) => &mut s.camera,
            PipelineSettings::Driver(s) => &mut s.camera,
            PipelineSettings::Calibration(s) => &mut s.camera,
        }
    }

    pub fn stream_divisor(&self) -> usize {
        match self {
            PipelineSettings::Standard(s) => s.stream_divisor,
            PipelineSettings::Driver(s) => s.stream_divisor,
            PipelineSettings::Calibration(s) => s.stream_divisor,
        }
    }

    pub fn is_3d(&self) -> bool {
        matches!(self, PipelineSettings::Standard(s) if s.is_3d)
    }

    /// Whether the UI should show every target.
    pub fn multiple(&self) -> bool {
        matches!(self, PipelineSettings::Standard(s) if s.multiple)
    }

    /// Check every field against the rules `SettingUpdate::apply` enforces.
    pub fn validate(&self, mode_count: usize) -> Result<(), VisionError> {
        let camera = *self.camera();
        let mut updates = vec![
            SettingUpdate::Exposure(camera.exposure),
            SettingUpdate::Brightness(camera.brightness),
            SettingUpdate::VideoModeIndex(camera.video_mode_index),
            SettingUpdate::StreamDivisor(self.stream_divisor()),
        ];
        match self {
            PipelineSettings::Standard(s) => updates.extend([
                SettingUpdate::LumaRange(s.luma.0, s.luma.1),
                SettingUpdate::AreaRange(s.area.0, s.area.1),
                SettingUpdate::MaxTargets(s.max_targets),
            ]),
            PipelineSettings::Driver(_) => {}
            PipelineSettings::Calibration(s) => updates.push(SettingUpdate::SquareSize(s.square_size)),
        }
        let mut scratch = self.clone();
        updates
            .iter()
            .try_for_each(|update| update.apply(&mut scratch, mode_count))
    }
}

/// A named pipeline configuration. Owned by exactly one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub nickname: String,
    pub settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(nickname: impl Into<String>, settings: PipelineSettings) -> Self {
        Self {
            nickname: nickname.into(),
            settings,
        }
    }

    pub fn standard(nickname: impl Into<String>) -> Self {
        Self::new(nickname, PipelineSettings::default())
    }

    pub fn driver() -> Self {
        Self::new(
            DRIVER_NICKNAME,
            PipelineSettings::Driver(DriverSettings::default()),
        )
    }

    pub fn calibration(square_size: f64, video_mode_index: usize) -> Self {
        Self::new(
            CALIBRATION_NICKNAME,
            PipelineSettings::Calibration(CalibrationSettings {
                camera: CameraSettings {
                    video_mode_index,
                    ..CameraSettings::default()
                },
                square_size,
                stream_divisor: 1,
            }),
        )
    }

    pub fn kind(&self) -> PipelineKind {
        self.settings.kind()
    }
}

/// One typed field change on a pipeline's settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "setting", content = "value", rename_all = "snake_case")]
pub enum SettingUpdate {
    Exposure(i32),
    Brightness(i32),
    VideoModeIndex(usize),
    StreamDivisor(usize),
    Is3d(bool),
    Multiple(bool),
    LumaRange(u8, u8),
    AreaRange(f64, f64),
    MaxTargets(usize),
    SquareSize(f64),
}

impl SettingUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            SettingUpdate::Exposure(_) => "exposure",
            SettingUpdate::Brightness(_) => "brightness",
            SettingUpdate::VideoModeIndex(_) => "video_mode_index",
            SettingUpdate::StreamDivisor(_) => "stream_divisor",
            SettingUpdate::Is3d(_) => "is_3d",
            SettingUpdate::Multiple(_) => "multiple",
            SettingUpdate::LumaRange(..) => "luma_range",
            SettingUpdate::AreaRange(..) => "area_range",
            SettingUpdate::MaxTargets(_) => "max_targets",
            SettingUpdate::SquareSize(_) => "square_size",
        }
    }

    /// Whether the change has to be pushed to the camera hardware.
    pub fn touches_camera(&self) -> bool {
        matches!(
            self,
            SettingUpdate::Exposure(_)
                | SettingUpdate::Brightness(_)
                | SettingUpdate::VideoModeIndex(_)
        )
    }

    /// Validate and apply onto `settings`. `mode_count` is the number of video
    /// modes of the owning camera. On error `settings` is unchanged.
    pub fn apply(&self, settings: &mut PipelineSettings, mode_count: usize) -> Result<(), VisionError> {
        let unsupported = || VisionError::UnsupportedSetting(self.name().to_string());
        match *self {
            SettingUpdate::Exposure(value) => {
                check_percent("exposure", value)?;
                settings.camera_mut().exposure = value;
            }
            SettingUpdate::Brightness(value) => {
                check_percent("brightness", value)?;
                settings.camera_mut().brightness = value;
            }
            SettingUpdate::VideoModeIndex(index) => {
                if index >= mode_count {
                    return Err(VisionError::InvalidVideoMode(index));
                }
                settings.camera_mut().video_mode_index = index;
            }
            SettingUpdate::StreamDivisor(divisor) => {
                if !(1..=8).contains(&divisor) {
                    return Err(VisionError::InvalidSetting(format!(
                        "stream divisor {divisor} not in 1..=8"
                    )));
                }
                match settings {
                    PipelineSettings::Standard(s) => s.stream_divisor = divisor,
                    PipelineSettings::Driver(s) => s.stream_divisor = divisor,
                    PipelineSettings::Calibration(s) => s.stream_divisor = divisor,
                }
            }
            SettingUpdate::Is3d(value) => match settings {
                PipelineSettings::Standard(s) => s.is_3d = value,
                _ => return Err(unsupported()),
            },
            SettingUpdate::Multiple(value) => match settings {
                PipelineSettings::Standard(s) => s.multiple = value,
                _ => return Err(unsupported()),
            },
            SettingUpdate::LumaRange(min, max) => {
                let PipelineSettings::Standard(s) = settings else {
                    return Err(unsupported());
                };
                if min > max {
                    return Err(VisionError::InvalidSetting(format!(
                        "luma range {min}..{max} is inverted"
                    )));
                }
                s.luma = (min, max);
            }
            SettingUpdate::AreaRange(min, max) => {
                let PipelineSettings::Standard(s) = settings else {
                    return Err(unsupported());
                };
                if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) || min > max {
                    return Err(VisionError::InvalidSetting(format!(
                        "area range {min}..{max} is not a percent range"
                    )));
                }
                s.area = (min, max);
            }
            SettingUpdate::MaxTargets(count) => {
                let PipelineSettings::Standard(s) = settings else {
                    return Err(unsupported());
                };
                if count == 0 {
                    return Err(VisionError::InvalidSetting(
                        "max targets must be at least 1".to_string(),
                    ));
                }
                s.max_targets = count;
            }
            SettingUpdate::SquareSize(size) => {
                let PipelineSettings::Calibration(s) = settings else {
                    return Err(unsupported());
                };
                check_square_size(size)?;
                s.square_size = size;
            }
        }
        Ok(())
    }
}

fn check_percent(name: &str, value: i32) -> Result<(), VisionError> {
    if (0..=100).contains(&value) {
        Ok(())
    } else {
        Err(VisionError::InvalidSetting(format!(
            "{name} {value} not in 0..=100"
        )))
    }
}

pub(crate) fn check_square_size(size: f64) -> Result<(), VisionError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(VisionError::InvalidSetting(format!(
            "square size {size} must be positive"
        )))
    }
}
