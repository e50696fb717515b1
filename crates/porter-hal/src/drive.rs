//! Differential-drive base trait.

use std::time::Duration;

use porter_types::{PorterError, StopMode};

/// A two-wheeled differential drive base.
///
/// Rates use the brick's units: linear in millimetres per second, angular in
/// degrees per second (positive turns clockwise seen from above).
pub trait DriveBase: Send {
    /// Stable identifier, e.g. `"drive_base"`.
    fn id(&self) -> &str;

    /// Start driving at the given rates and return immediately.  The base
    /// keeps moving until the next command.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the command cannot be applied.
    fn drive(&mut self, linear_mm_s: f32, angular_deg_s: f32) -> Result<(), PorterError>;

    /// Drive at the given rates for `duration`, then stop.  Blocks the
    /// calling thread until the motion is over.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the command cannot be applied.
    fn drive_timed(
        &mut self,
        linear_mm_s: f32,
        angular_deg_s: f32,
        duration: Duration,
    ) -> Result<(), PorterError>;

    /// Stop both wheels using `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the command cannot be applied.
    fn stop(&mut self, mode: StopMode) -> Result<(), PorterError>;
}
