//! Carry behavior: sweep toward the delivery zone with the luggage held.

use porter_types::{Behavior, MissionEventPayload, MissionState, PorterError, StopMode};
use tracing::{debug, info, instrument};

use crate::behavior::{BehaviorContext, run_timed};

const SOURCE: &str = "porter-runtime::carry";

/// Alternate curved sweeps and obstacle pivots until the delivery color is
/// under the sensor, then hold position and hand off to `Depositing`.
#[instrument(name = "carry", skip_all)]
pub fn deliver_luggage(ctx: &mut BehaviorContext<'_>) -> Result<MissionState, PorterError> {
    let cfg = ctx.config;
    let mut sweeps = 0u32;

    loop {
        let sample = ctx.rig.color.color()?;
        if sample == cfg.delivery_color {
            break;
        }
        if cfg.carry_obstacle_colors.contains(&sample) {
            debug!(?sample, "obstacle while carrying; pivoting");
            run_timed(ctx.rig.drive.as_mut(), &cfg.carry_pivot)?;
            ctx.bus.emit(
                SOURCE,
                MissionEventPayload::AvoidanceManeuver {
                    behavior: Behavior::Carry,
                    color: sample,
                },
            );
        } else {
            run_timed(ctx.rig.drive.as_mut(), &cfg.carry_sweep)?;
            sweeps += 1;
        }
    }

    ctx.rig.drive.stop(StopMode::Hold)?;
    info!(sweeps, "delivery zone reached");
    Ok(MissionState::Depositing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MissionBus;
    use crate::cell::MissionCell;
    use crate::config::MissionConfig;
    use porter_hal::{SimCommand, SimRig};
    use porter_types::ColorClass;
    use std::time::Duration;

    #[test]
    fn sweeps_and_pivots_until_delivery_color() {
        let (mut rig, probe) = SimRig::builder()
            .with_colors([
                ColorClass::Black,
                ColorClass::Blue,
                ColorClass::White,
                ColorClass::Green,
            ])
            .build();
        let config = MissionConfig::default();
        let cell = MissionCell::new();
        let bus = MissionBus::default();
        let mut rx = bus.subscribe();
        let mut ctx = BehaviorContext {
            rig: &mut rig,
            config: &config,
            cell: &cell,
            bus: &bus,
        };

        assert_eq!(deliver_luggage(&mut ctx).unwrap(), MissionState::Depositing);

        let sweep = SimCommand::DriveTimed {
            linear_mm_s: 50.0,
            angular_deg_s: 45.0,
            duration: Duration::from_secs(1),
        };
        let turn = SimCommand::DriveTimed {
            linear_mm_s: 0.0,
            angular_deg_s: 90.0,
            duration: Duration::from_secs(1),
        };
        assert_eq!(
            probe.commands(),
            vec![
                sweep.clone(),
                turn,
                sweep,
                SimCommand::Stop(StopMode::Hold)
            ]
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event.payload,
            MissionEventPayload::AvoidanceManeuver {
                behavior: Behavior::Carry,
                color: ColorClass::Blue,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn already_in_zone_only_holds() {
        let (mut rig, probe) = SimRig::builder()
            .with_colors([ColorClass::Green])
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
        assert_eq!(deliver_luggage(&mut ctx).unwrap(), MissionState::Depositing);
        assert_eq!(probe.commands(), vec![SimCommand::Stop(StopMode::Hold)]);
        assert_eq!(cell.delivered(), 0);
    }
}
