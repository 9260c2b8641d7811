//! Vision coprocessor core.
//!
//! Every attached camera gets a `CameraWorker`: a named thread pulling frames
//! from its `FrameSource`, running whatever `PipelineManager` says is active
//! through a `PipelineStage`, and publishing to a `TelemetrySink`. Control
//! events mutate the selection and the `CalibrationController` concurrently;
//! the worker picks the changes up on its next frame.

mod calibration;
pub use calibration::*;

mod camera;
pub use camera::*;

mod config;
pub use config::*;

pub mod control;
pub use control::{ControlEvent, ControlOutcome, ControlReply, SettingsSnapshot};

mod error;
pub use error::*;

mod manager;
pub use manager::*;

mod pipeline;
pub use pipeline::*;

mod registry;
pub use registry::*;

mod result;
pub use result::*;

mod stage;
pub use stage::*;

mod telemetry;
pub use telemetry::*;

mod worker;
pub use worker::*;
