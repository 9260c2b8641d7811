//! Shared plumbing for the vision workspace: logging, frame-rate averaging
//! and publication throttling.

pub mod logging;
pub use logging::*;

mod rolling;
pub use rolling::*;

mod throttle;
pub use throttle::*;

// downstream crates log through `base::log::*`
pub use log;
