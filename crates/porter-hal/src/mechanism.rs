//! Single-axis mechanism (the gripper, or "stapler") trait.

use std::time::Duration;

use porter_types::{PorterError, StopMode};

/// Result of a stall-seeking motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StallOutcome {
    /// The motor stalled against something and is now held with the
    /// requested stop mode.  `angle_deg` is where it stopped.
    Stalled { angle_deg: f32 },
    /// The time limit ran out before a stall was detected.  The motor has
    /// been stopped.
    TimedOut { after: Duration },
}

/// A single-axis motor with stall detection.
pub trait Mechanism: Send {
    /// Stable identifier, e.g. `"gripper"`.
    fn id(&self) -> &str;

    /// Run at `speed_deg_s` until the motor stalls, then stop with `then`.
    ///
    /// With `limit` set, gives up after that long and returns
    /// [`StallOutcome::TimedOut`].  Without it the call blocks until a
    /// stall happens, however long that takes.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the motor cannot be driven.
    fn run_until_stalled(
        &mut self,
        speed_deg_s: f32,
        then: StopMode,
        limit: Option<Duration>,
    ) -> Result<StallOutcome, PorterError>;

    /// Rotate by `angle_deg` at `speed_deg_s`, then stop with `then`.
    /// Blocks until the motion is over.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the motor cannot be driven.
    fn run_angle(
        &mut self,
        speed_deg_s: f32,
        angle_deg: f32,
        then: StopMode,
    ) -> Result<(), PorterError>;
}
