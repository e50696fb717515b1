//! Polling sensor traits.
//!
//! Sensors are sampled on demand; there is no push or callback model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use porter_types::{ColorClass, PorterError};

/// A downward-facing reflected-color sensor.
pub trait ColorSensor: Send {
    /// Stable identifier, e.g. `"color_s3"`.
    fn id(&self) -> &str;

    /// Sample the sensor once and classify the reading.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the sensor cannot be read.
    fn color(&mut self) -> Result<ColorClass, PorterError>;
}

/// A gyro reporting the robot's accumulated heading.
pub trait OrientationSensor: Send {
    fn id(&self) -> &str;

    /// Heading in degrees.  Signed and unbounded; callers normalise modulo
    /// 360.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the sensor cannot be read.
    fn angle(&mut self) -> Result<f32, PorterError>;
}

/// The operator's "stop the run" input (a touch sensor on the brick).
pub trait AbortSwitch: Send {
    fn id(&self) -> &str;

    /// `true` while an abort is requested.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the switch cannot be read.
    fn is_pressed(&mut self) -> Result<bool, PorterError>;
}

/// An [`AbortSwitch`] backed by a shared flag.
///
/// Clone the flag with [`FlagAbort::handle`] and set it from anywhere, e.g.
/// a Ctrl-C handler.  Once set the switch stays pressed until
/// [`reset`](FlagAbort::reset).
#[derive(Debug, Clone, Default)]
pub struct FlagAbort {
    flag: Arc<AtomicBool>,
}

impl FlagAbort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the underlying flag.
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Request an abort.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Release the switch so another mission can run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl AbortSwitch for FlagAbort {
    fn id(&self) -> &str {
        "abort_flag"
    }

    fn is_pressed(&mut self) -> Result<bool, PorterError> {
        Ok(self.flag.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockColor {
        next: ColorClass,
    }

    impl ColorSensor for MockColor {
        fn id(&self) -> &str {
            "color_s3"
        }

        fn color(&mut self) -> Result<ColorClass, PorterError> {
            Ok(self.next)
        }
    }

    #[test]
    fn mock_color_sensor_reports_sample() {
        let mut sensor = MockColor {
            next: ColorClass::Red,
        };
        assert_eq!(sensor.id(), "color_s3");
        assert_eq!(sensor.color().unwrap(), ColorClass::Red);
    }

    #[test]
    fn flag_abort_starts_released() {
        let mut abort = FlagAbort::new();
        assert!(!abort.is_pressed().unwrap());
    }

    #[test]
    fn flag_abort_trips_through_shared_handle() {
        let mut abort = FlagAbort::new();
        let handle = abort.handle();
        handle.store(true, Ordering::SeqCst);
        assert!(abort.is_pressed().unwrap());
    }

    #[test]
    fn flag_abort_clones_share_state() {
        let mut abort = FlagAbort::new();
        let other = abort.clone();
        other.trigger();
        assert!(abort.is_pressed().unwrap());
    }

    #[test]
    fn flag_abort_reset_releases_switch() {
        let mut abort = FlagAbort::new();
        abort.trigger();
        abort.reset();
        assert!(!abort.is_pressed().unwrap());
    }
}
