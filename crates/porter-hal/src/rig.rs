//! [`Rig`] – the devices a behavior needs, bundled for single ownership.
//!
//! The behavior lane owns the rig outright and lends it to one behavior at a
//! time, so no device is ever commanded from two threads.  The abort switch
//! is deliberately not part of the rig: it belongs to the supervisor.

use crate::cue::CuePlayer;
use crate::drive::DriveBase;
use crate::mechanism::Mechanism;
use crate::sensor::{ColorSensor, OrientationSensor};

pub struct Rig {
    pub color: Box<dyn ColorSensor>,
    pub gyro: Box<dyn OrientationSensor>,
    pub drive: Box<dyn DriveBase>,
    pub gripper: Box<dyn Mechanism>,
    pub speaker: Box<dyn CuePlayer>,
}

impl Rig {
    pub fn new(
        color: Box<dyn ColorSensor>,
        gyro: Box<dyn OrientationSensor>,
        drive: Box<dyn DriveBase>,
        gripper: Box<dyn Mechanism>,
        speaker: Box<dyn CuePlayer>,
    ) -> Self {
        Self {
            color,
            gyro,
            drive,
            gripper,
            speaker,
        }
    }
}

impl std::fmt::Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("color", &self.color.id())
            .field("gyro", &self.gyro.id())
            .field("drive", &self.drive.id())
            .field("gripper", &self.gripper.id())
            .finish_non_exhaustive()
    }
}
