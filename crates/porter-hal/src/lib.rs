//! `porter-hal` – Hardware Abstraction Layer
//!
//! Every device the mission touches is reached through a trait, so behavior
//! code never depends on a concrete brick, motor, or sensor driver.
//!
//! # Modules
//!
//! - [`sensor`] – [`ColorSensor`], [`OrientationSensor`], and
//!   [`AbortSwitch`] polling sources, plus the flag-backed [`FlagAbort`].
//! - [`drive`] – [`DriveBase`]: differential-drive commands, optionally
//!   timed.
//! - [`mechanism`] – [`Mechanism`]: the single-axis gripper with stall-seek
//!   and fixed-angle motions.
//! - [`cue`] – [`CuePlayer`]: audio acknowledgment cues.
//! - [`rig`] – [`Rig`]: the bundle of devices owned by the behavior lane.
//! - [`sim`] – [`SimRig`][sim::SimRig]: in-process simulated devices for
//!   tests and headless runs.

pub mod cue;
pub mod drive;
pub mod mechanism;
pub mod rig;
pub mod sensor;
pub mod sim;

pub use cue::CuePlayer;
pub use drive::DriveBase;
pub use mechanism::{Mechanism, StallOutcome};
pub use rig::Rig;
pub use sensor::{AbortSwitch, ColorSensor, FlagAbort, OrientationSensor};
pub use sim::{SimCommand, SimProbe, SimRig};
