//! Load handling: closing the gripper on the luggage and setting it down.
//!
//! Both directions share one entry point, [`handle_load`], selected by the
//! `pickup` flag.
//!
//! | Direction | Motion | Next state |
//! |---|---|---|
//! | Pick up | stall-seek close, horn | `CarryingLoad` (`Stuck` if the grip never stalls) |
//! | Deposit | back away, turn, release in two steps, retreat | `Searching` |
//!
//! Only a completed deposit touches the delivery counter.

use porter_hal::{Rig, StallOutcome};
use porter_types::{Cue, MissionEventPayload, MissionState, PorterError, StopMode};
use tracing::{info, instrument, warn};

use crate::behavior::{BehaviorContext, pivot, run_timed};
use crate::config::MissionConfig;

const SOURCE: &str = "porter-runtime::handling";

#[instrument(name = "handle_load", skip(ctx))]
pub fn handle_load(ctx: &mut BehaviorContext<'_>, pickup: bool) -> Result<MissionState, PorterError> {
    if pickup {
        grip(ctx)
    } else {
        release(ctx)
    }
}

fn grip(ctx: &mut BehaviorContext<'_>) -> Result<MissionState, PorterError> {
    let cfg = ctx.config;
    let limit = cfg.stall_timeout();
    match ctx
        .rig
        .gripper
        .run_until_stalled(cfg.grip.close_speed_deg_s, StopMode::Hold, limit)?
    {
        StallOutcome::Stalled { angle_deg } => {
            info!(angle_deg, "luggage gripped");
            ctx.rig.speaker.play(Cue::Horn)?;
            Ok(MissionState::CarryingLoad)
        }
        StallOutcome::TimedOut { after } => {
            let after_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
            warn!(after_ms, "gripper never stalled; nothing to carry");
            ctx.bus
                .emit(SOURCE, MissionEventPayload::StallTimeout { after_ms });
            Ok(MissionState::Stuck)
        }
    }
}

fn release(ctx: &mut BehaviorContext<'_>) -> Result<MissionState, PorterError> {
    let cfg = ctx.config;
    set_down(ctx.rig, cfg)?;

    let total = ctx.cell.record_delivery();
    info!(total, "luggage delivered");
    ctx.bus
        .emit(SOURCE, MissionEventPayload::Delivered { total });
    Ok(MissionState::Searching)
}

// Back off, turn so the gripper faces away, open it in two steps with a
// short reverse in between, then clear the zone.
fn set_down(rig: &mut Rig, cfg: &MissionConfig) -> Result<(), PorterError> {
    let dep = &cfg.deposit;
    let [first, second] = cfg.grip.release_angles_deg;
    let speed = cfg.grip.release_speed_deg_s;

    run_timed(rig.drive.as_mut(), &dep.back_away)?;
    pivot(rig.drive.as_mut(), dep.turn_deg, dep.turn_ms)?;
    rig.gripper.run_angle(speed, first, StopMode::Hold)?;
    run_timed(rig.drive.as_mut(), &dep.back_away)?;
    rig.gripper.run_angle(speed, second, StopMode::Hold)?;
    for segment in &dep.retreat {
        run_timed(rig.drive.as_mut(), segment)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MissionBus;
    use crate::cell::MissionCell;
    use porter_hal::{SimCommand, SimRig};
    use std::time::Duration;

    struct Bench {
        config: MissionConfig,
        cell: MissionCell,
        bus: MissionBus,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                config: MissionConfig::default(),
                cell: MissionCell::new(),
                bus: MissionBus::default(),
            }
        }

        fn run(&self, rig: &mut Rig, pickup: bool) -> Result<MissionState, PorterError> {
            let mut ctx = BehaviorContext {
                rig,
                config: &self.config,
                cell: &self.cell,
                bus: &self.bus,
            };
            handle_load(&mut ctx, pickup)
        }
    }

    #[test]
    fn pickup_grips_and_honks_without_counting() {
        let bench = Bench::new();
        let (mut rig, probe) = SimRig::builder().build();

        assert_eq!(bench.run(&mut rig, true).unwrap(), MissionState::CarryingLoad);
        assert_eq!(bench.cell.delivered(), 0);
        assert_eq!(probe.cues(), vec![Cue::Horn]);
        assert_eq!(
            probe.commands(),
            vec![SimCommand::StallSeek {
                speed_deg_s: 20.0,
                then: StopMode::Hold,
                limit: Some(Duration::from_secs(5)),
            }]
        );
    }

    #[test]
    fn pickup_that_never_stalls_is_stuck() {
        let bench = Bench::new();
        let mut rx = bench.bus.subscribe();
        let (mut rig, probe) = SimRig::builder().stall_after(None).build();

        assert_eq!(bench.run(&mut rig, true).unwrap(), MissionState::Stuck);
        assert!(probe.cues().is_empty());
        assert_eq!(
            rx.try_recv().unwrap().payload,
            MissionEventPayload::StallTimeout { after_ms: 5000 }
        );
    }

    #[test]
    fn deposit_counts_exactly_once() {
        let bench = Bench::new();
        let mut rx = bench.bus.subscribe();
        let (mut rig, _probe) = SimRig::builder().build();

        assert_eq!(bench.run(&mut rig, false).unwrap(), MissionState::Searching);
        assert_eq!(bench.cell.delivered(), 1);
        assert_eq!(
            rx.try_recv().unwrap().payload,
            MissionEventPayload::Delivered { total: 1 }
        );

        bench.run(&mut rig, false).unwrap();
        assert_eq!(bench.cell.delivered(), 2);
    }

    #[test]
    fn deposit_motion_order() {
        let bench = Bench::new();
        let (mut rig, probe) = SimRig::builder().build();
        bench.run(&mut rig, false).unwrap();

        let back = SimCommand::DriveTimed {
            linear_mm_s: -50.0,
            angular_deg_s: 0.0,
            duration: Duration::from_secs(1),
        };
        let cmds = probe.commands();
        assert_eq!(cmds.len(), 7);
        assert_eq!(cmds[0], back);
        assert!(matches!(
            cmds[1],
            SimCommand::DriveTimed { linear_mm_s, angular_deg_s, .. }
                if linear_mm_s == 0.0 && (angular_deg_s - 190.0).abs() < 1e-3
        ));
        assert_eq!(
            cmds[2],
            SimCommand::RunAngle {
                speed_deg_s: -50.0,
                angle_deg: 100.0,
                then: StopMode::Hold,
            }
        );
        assert_eq!(cmds[3], back);
        assert_eq!(
            cmds[4],
            SimCommand::RunAngle {
                speed_deg_s: -50.0,
                angle_deg: 25.0,
                then: StopMode::Hold,
            }
        );
        assert!(matches!(cmds[5], SimCommand::DriveTimed { duration, .. } if duration == Duration::from_secs(3)));
        assert!(matches!(cmds[6], SimCommand::DriveTimed { linear_mm_s, .. } if linear_mm_s == 0.0));
    }

    #[test]
    fn failed_deposit_is_not_counted() {
        let bench = Bench::new();
        let (mut rig, probe) = SimRig::builder().build();
        probe.inject_drive_fault();

        assert!(matches!(
            bench.run(&mut rig, false),
            Err(PorterError::HardwareFault { .. })
        ));
        assert_eq!(bench.cell.delivered(), 0);
    }
}
