//! Shared plumbing for the behavior routines.
//!
//! A behavior is a plain blocking function that borrows a
//! [`BehaviorContext`], drives the rig until its job is done, and returns the
//! state the mission should move to next.  It never touches the
//! [`MissionCell`] state itself: the lane writes the returned state once the
//! routine has returned.

use porter_hal::{DriveBase, Rig};
use porter_types::{Behavior, MissionState, PorterError};
use tracing::debug;

use crate::bus::MissionBus;
use crate::carry::deliver_luggage;
use crate::cell::MissionCell;
use crate::config::{MissionConfig, TimedDrive};
use crate::handling::handle_load;
use crate::search::search_luggage;

/// Everything a behavior may touch while it owns the robot.
pub struct BehaviorContext<'a> {
    pub rig: &'a mut Rig,
    pub config: &'a MissionConfig,
    pub cell: &'a MissionCell,
    pub bus: &'a MissionBus,
}

/// Run the routine for `behavior` to completion and return the next state.
pub fn run_behavior(
    behavior: Behavior,
    ctx: &mut BehaviorContext<'_>,
) -> Result<MissionState, PorterError> {
    match behavior {
        Behavior::Search => search_luggage(ctx),
        Behavior::PickUp => handle_load(ctx, true),
        Behavior::Carry => deliver_luggage(ctx),
        Behavior::Deposit => handle_load(ctx, false),
    }
}

/// Run one open-loop drive segment.
pub(crate) fn run_timed(drive: &mut dyn DriveBase, segment: &TimedDrive) -> Result<(), PorterError> {
    drive.drive_timed(
        segment.linear_mm_s,
        segment.angular_deg_s,
        segment.duration(),
    )
}

/// Pivot in place by `degrees` over `duration_ms`.  A zero duration sends
/// nothing.
pub(crate) fn pivot(drive: &mut dyn DriveBase, degrees: f32, duration_ms: u64) -> Result<(), PorterError> {
    match MissionConfig::pivot(degrees, duration_ms) {
        Some(segment) => run_timed(drive, &segment),
        None => {
            debug!(degrees, "zero-duration pivot skipped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_hal::{SimCommand, SimRig};
    use std::time::Duration;

    #[test]
    fn pivot_issues_single_in_place_turn() {
        let (mut rig, probe) = SimRig::builder().with_heading(0.0).build();
        pivot(rig.drive.as_mut(), 190.0, 1000).unwrap();
        assert_eq!(
            probe.commands(),
            vec![SimCommand::DriveTimed {
                linear_mm_s: 0.0,
                angular_deg_s: 190.0,
                duration: Duration::from_secs(1),
            }]
        );
        assert!((probe.heading() - 190.0).abs() < 1e-3);
    }

    #[test]
    fn zero_duration_pivot_sends_nothing() {
        let (mut rig, probe) = SimRig::builder().with_heading(0.0).build();
        pivot(rig.drive.as_mut(), 190.0, 0).unwrap();
        assert!(probe.commands().is_empty());
        assert!(probe.heading().abs() < f32::EPSILON);
    }

    #[test]
    fn run_behavior_routes_carry_to_deliver() {
        let (mut rig, _probe) = SimRig::builder()
            .with_colors([porter_types::ColorClass::Green])
            .build();
        let config = MissionConfig::default();
        let cell = MissionCell::new();
        let bus = MissionBus::default();
        let mut ctx = BehaviorContext {
            rig: &mut rig,
            config: &config,
            cell: &cell,
            bus: &bus,
        };
        assert_eq!(
            run_behavior(Behavior::Carry, &mut ctx).unwrap(),
            MissionState::Depositing
        );
    }
}
