//! Model interaction: configuration, transient state and the per-frame and
//! click policies of an interactive model.
//!
//! Everything here is free of GPU resources so it can be driven by the
//! event loop as well as by tests with a synthetic clock.

use std::time::Duration;

pub mod config;
pub mod model;
mod state;
mod timer;

pub use config::{InteractionMode, ModelConfiguration, PositionMode, SpinRate, TransformOptions};
pub use model::{FrameInput, InteractiveModel};
pub use state::InteractionState;
pub use timer::ResetTimer;

/// Logical scroll pixels per unit of vertical model offset.
pub const SCROLL_SENSITIVITY: f32 = 500.0;
/// How long a vibrate click keeps the model shaking.
pub const VIBRATE_WINDOW: Duration = Duration::from_millis(500);
/// How long a rotate click keeps the model spinning.
pub const ROTATE_WINDOW: Duration = Duration::from_millis(1064);
/// Angular frequency of the vibration in radians per second.
pub const VIBRATE_FREQUENCY: f32 = 50.0;
pub const VIBRATE_AMPLITUDE: f32 = 0.05;
/// Yaw advance per frame of the rotate interaction.
pub const SPIN_STEP: f32 = 0.1;
