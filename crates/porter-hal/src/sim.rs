//! In-process simulated rig for tests and headless runs.
//!
//! [`SimRig`] builds a [`Rig`] whose devices share one piece of simulated
//! world state.  Every command is recorded so a [`SimProbe`] can assert on
//! exactly what a behavior did, without any physical hardware.
//!
//! # Simulated behaviour
//!
//! | Device | Behaviour |
//! |---|---|
//! | Color sensor | Replays the color script, cycling back to the start when exhausted. |
//! | Gyro | Pops the heading script if one is queued, otherwise reports the heading integrated from timed drives. |
//! | Drive base | Records commands; `drive_timed` integrates `angular × duration` into the heading and sleeps `duration × time_scale`. |
//! | Gripper | Stalls after the configured delay; times out when the delay exceeds the limit. |
//! | Speaker | Records cues. |
//!
//! # Example
//!
//! ```rust
//! use porter_hal::sim::SimRig;
//! use porter_types::ColorClass;
//!
//! let (mut rig, probe) = SimRig::builder()
//!     .with_colors([ColorClass::Blue, ColorClass::Red])
//!     .build();
//!
//! assert_eq!(rig.color.color().unwrap(), ColorClass::Blue);
//! assert_eq!(probe.color_samples(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use porter_types::{ColorClass, Cue, PorterError, StopMode};
use tracing::trace;

use crate::cue::CuePlayer;
use crate::drive::DriveBase;
use crate::mechanism::{Mechanism, StallOutcome};
use crate::rig::Rig;
use crate::sensor::{ColorSensor, OrientationSensor};

// ─────────────────────────────────────────────────────────────────────────────
// Recorded commands
// ─────────────────────────────────────────────────────────────────────────────

/// One command received by a simulated device.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    Drive {
        linear_mm_s: f32,
        angular_deg_s: f32,
    },
    DriveTimed {
        linear_mm_s: f32,
        angular_deg_s: f32,
        duration: Duration,
    },
    Stop(StopMode),
    StallSeek {
        speed_deg_s: f32,
        then: StopMode,
        limit: Option<Duration>,
    },
    RunAngle {
        speed_deg_s: f32,
        angle_deg: f32,
        then: StopMode,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared world
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct SimWorld {
    colors: Vec<ColorClass>,
    color_cursor: usize,
    color_samples: usize,
    heading_deg: f32,
    heading_script: VecDeque<f32>,
    gripper_angle_deg: f32,
    stall_after: Option<Duration>,
    time_scale: f64,
    drive_fault: bool,
    commands: Vec<SimCommand>,
    cues: Vec<Cue>,
}

type World = Arc<Mutex<SimWorld>>;

// A panic inside one sim device must not hide the recorded history from the
// probe, so poisoning is ignored.
fn lock(world: &World) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Non-finite or non-positive scales, and waits too long to represent, do
// not sleep at all.
fn scaled(duration: Duration, time_scale: f64) -> Duration {
    if !time_scale.is_finite() || time_scale <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(duration.as_secs_f64() * time_scale).unwrap_or(Duration::ZERO)
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

struct SimColorSensor {
    world: World,
}

impl ColorSensor for SimColorSensor {
    fn id(&self) -> &str {
        "sim_color"
    }

    fn color(&mut self) -> Result<ColorClass, PorterError> {
        let mut w = lock(&self.world);
        if w.colors.is_empty() {
            return Err(PorterError::HardwareFault {
                component: "sim_color".to_string(),
                details: "color script is empty".to_string(),
            });
        }
        let sample = w.colors[w.color_cursor % w.colors.len()];
        w.color_cursor = (w.color_cursor + 1) % w.colors.len();
        w.color_samples += 1;
        trace!(?sample, "sim color sample");
        Ok(sample)
    }
}

struct SimGyro {
    world: World,
}

impl OrientationSensor for SimGyro {
    fn id(&self) -> &str {
        "sim_gyro"
    }

    fn angle(&mut self) -> Result<f32, PorterError> {
        let mut w = lock(&self.world);
        Ok(match w.heading_script.pop_front() {
            Some(scripted) => scripted,
            None => w.heading_deg,
        })
    }
}

struct SimDrive {
    world: World,
}

impl SimDrive {
    fn check_fault(w: &SimWorld) -> Result<(), PorterError> {
        if w.drive_fault {
            return Err(PorterError::HardwareFault {
                component: "sim_drive".to_string(),
                details: "simulated motor disconnect".to_string(),
            });
        }
        Ok(())
    }
}

impl DriveBase for SimDrive {
    fn id(&self) -> &str {
        "sim_drive"
    }

    fn drive(&mut self, linear_mm_s: f32, angular_deg_s: f32) -> Result<(), PorterError> {
        let mut w = lock(&self.world);
        Self::check_fault(&w)?;
        w.commands.push(SimCommand::Drive {
            linear_mm_s,
            angular_deg_s,
        });
        Ok(())
    }

    fn drive_timed(
        &mut self,
        linear_mm_s: f32,
        angular_deg_s: f32,
        duration: Duration,
    ) -> Result<(), PorterError> {
        let wait = {
            let mut w = lock(&self.world);
            Self::check_fault(&w)?;
            w.commands.push(SimCommand::DriveTimed {
                linear_mm_s,
                angular_deg_s,
                duration,
            });
            w.heading_deg += angular_deg_s * duration.as_secs_f32();
            scaled(duration, w.time_scale)
        };
        pause(wait);
        Ok(())
    }

    fn stop(&mut self, mode: StopMode) -> Result<(), PorterError> {
        let mut w = lock(&self.world);
        Self::check_fault(&w)?;
        w.commands.push(SimCommand::Stop(mode));
        Ok(())
    }
}

struct SimGripper {
    world: World,
}

impl Mechanism for SimGripper {
    fn id(&self) -> &str {
        "sim_gripper"
    }

    fn run_until_stalled(
        &mut self,
        speed_deg_s: f32,
        then: StopMode,
        limit: Option<Duration>,
    ) -> Result<StallOutcome, PorterError> {
        let (outcome, wait) = {
            let mut w = lock(&self.world);
            w.commands.push(SimCommand::StallSeek {
                speed_deg_s,
                then,
                limit,
            });
            let stalls_in = match (w.stall_after, limit) {
                (Some(after), Some(l)) if after > l => None,
                (after, _) => after,
            };
            match (stalls_in, limit) {
                (Some(after), _) => {
                    w.gripper_angle_deg += speed_deg_s * after.as_secs_f32();
                    (
                        StallOutcome::Stalled {
                            angle_deg: w.gripper_angle_deg,
                        },
                        scaled(after, w.time_scale),
                    )
                }
                (None, Some(l)) => (StallOutcome::TimedOut { after: l }, scaled(l, w.time_scale)),
                (None, None) => {
                    return Err(PorterError::HardwareFault {
                        component: "sim_gripper".to_string(),
                        details: "gripper never stalls and no limit was given".to_string(),
                    });
                }
            }
        };
        pause(wait);
        Ok(outcome)
    }

    fn run_angle(
        &mut self,
        speed_deg_s: f32,
        angle_deg: f32,
        then: StopMode,
    ) -> Result<(), PorterError> {
        let wait = {
            let mut w = lock(&self.world);
            w.commands.push(SimCommand::RunAngle {
                speed_deg_s,
                angle_deg,
                then,
            });
            w.gripper_angle_deg += angle_deg * speed_deg_s.signum();
            let secs = if speed_deg_s == 0.0 {
                0.0
            } else {
                (angle_deg as f64 / speed_deg_s as f64).abs()
            };
            let run = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
            scaled(run, w.time_scale)
        };
        pause(wait);
        Ok(())
    }
}

struct SimSpeaker {
    world: World,
}

impl CuePlayer for SimSpeaker {
    fn play(&mut self, cue: Cue) -> Result<(), PorterError> {
        lock(&self.world).cues.push(cue);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only view into a simulated rig's recorded history.
#[derive(Clone)]
pub struct SimProbe {
    world: World,
}

impl SimProbe {
    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<SimCommand> {
        lock(&self.world).commands.clone()
    }

    /// Every cue played so far, in order.
    pub fn cues(&self) -> Vec<Cue> {
        lock(&self.world).cues.clone()
    }

    /// Number of color samples taken.
    pub fn color_samples(&self) -> usize {
        lock(&self.world).color_samples
    }

    /// Heading integrated from timed drives, in degrees (unnormalised).
    pub fn heading(&self) -> f32 {
        lock(&self.world).heading_deg
    }

    /// Make every subsequent drive command fail.
    pub fn inject_drive_fault(&self) {
        lock(&self.world).drive_fault = true;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimRig builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for a simulated [`Rig`].
pub struct SimRig {
    colors: Vec<ColorClass>,
    heading_deg: f32,
    heading_script: VecDeque<f32>,
    stall_after: Option<Duration>,
    time_scale: f64,
    drive_fault: bool,
}

impl Default for SimRig {
    fn default() -> Self {
        Self {
            colors: vec![ColorClass::Red, ColorClass::Green],
            heading_deg: 90.0,
            heading_script: VecDeque::new(),
            stall_after: Some(Duration::from_millis(800)),
            time_scale: 0.0,
            drive_fault: false,
        }
    }
}

impl SimRig {
    /// Start from the defaults: colors `[red, green]`, heading 90°, gripper
    /// stalls after 800 ms, no real-time sleeping.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Replace the color script.  The sensor cycles through it forever.
    pub fn with_colors(mut self, colors: impl IntoIterator<Item = ColorClass>) -> Self {
        self.colors = colors.into_iter().collect();
        self
    }

    /// Initial heading in degrees.
    pub fn with_heading(mut self, heading_deg: f32) -> Self {
        self.heading_deg = heading_deg;
        self
    }

    /// Queue readings the gyro returns before it falls back to the
    /// integrated heading.
    pub fn with_heading_script(mut self, readings: impl IntoIterator<Item = f32>) -> Self {
        self.heading_script = readings.into_iter().collect();
        self
    }

    /// How long the gripper runs before stalling.  `None` means it never
    /// stalls.
    pub fn stall_after(mut self, after: Option<Duration>) -> Self {
        self.stall_after = after;
        self
    }

    /// Fraction of real time that timed motions sleep for.  `0.0` disables
    /// sleeping entirely.
    pub fn time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale;
        self
    }

    /// Start with the drive base disconnected.
    pub fn with_drive_fault(mut self) -> Self {
        self.drive_fault = true;
        self
    }

    /// Consume the builder and return the rig together with its probe.
    pub fn build(self) -> (Rig, SimProbe) {
        let world: World = Arc::new(Mutex::new(SimWorld {
            colors: self.colors,
            color_cursor: 0,
            color_samples: 0,
            heading_deg: self.heading_deg,
            heading_script: self.heading_script,
            gripper_angle_deg: 0.0,
            stall_after: self.stall_after,
            time_scale: self.time_scale,
            drive_fault: self.drive_fault,
            commands: Vec::new(),
            cues: Vec::new(),
        }));

        let rig = Rig::new(
            Box::new(SimColorSensor {
                world: Arc::clone(&world),
            }),
            Box::new(SimGyro {
                world: Arc::clone(&world),
            }),
            Box::new(SimDrive {
                world: Arc::clone(&world),
            }),
            Box::new(SimGripper {
                world: Arc::clone(&world),
            }),
            Box::new(SimSpeaker {
                world: Arc::clone(&world),
            }),
        );
        (rig, SimProbe { world })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
