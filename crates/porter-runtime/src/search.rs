//! Search behavior: sweep until the luggage mark shows up under the color
//! sensor, square up on the reference heading, then turn the gripper toward
//! the luggage.
//!
//! # Flow
//!
//! 1. Start the continuous search drive.
//! 2. Sample the color once per pass:
//!    - pickup color → leave the loop;
//!    - boundary color → keep going;
//!    - anything else → avoidance maneuver (stop, short forward run, pivot,
//!      resume).
//! 3. Stop with an active hold so the robot does not roll past the mark.
//! 4. [`correct_heading`].  If the robot was already aligned the stop is
//!    treated as a false positive and the search restarts (`Searching`).
//! 5. Pivot to face the luggage, creep forward, hand off to `PickingUp`.

use porter_hal::Rig;
use porter_types::{Behavior, ColorClass, MissionEventPayload, MissionState, PorterError, StopMode};
use tracing::{debug, info, instrument};

use crate::behavior::{BehaviorContext, pivot, run_timed};
use crate::bus::MissionBus;
use crate::config::MissionConfig;
use crate::heading::{is_aligned, normalize_degrees, signed_offset};

const SOURCE: &str = "porter-runtime::search";

#[instrument(name = "search", skip_all)]
pub fn search_luggage(ctx: &mut BehaviorContext<'_>) -> Result<MissionState, PorterError> {
    let cfg = ctx.config;
    let drive = cfg.search_drive;
    ctx.rig.drive.drive(drive.linear_mm_s, drive.angular_deg_s)?;

    let mut avoidances = 0u32;
    loop {
        let sample = ctx.rig.color.color()?;
        if sample == cfg.pickup_color {
            break;
        }
        if cfg.boundary_colors.contains(&sample) {
            continue;
        }
        avoid(ctx.rig, cfg, ctx.bus, sample)?;
        avoidances += 1;
    }

    ctx.rig.drive.stop(StopMode::Hold)?;
    info!(avoidances, "pickup mark detected");

    if !correct_heading(ctx.rig, cfg, ctx.bus)? {
        return Ok(MissionState::Searching);
    }

    pivot(ctx.rig.drive.as_mut(), cfg.face_object_deg, cfg.face_object_ms)?;
    run_timed(ctx.rig.drive.as_mut(), &cfg.approach)?;
    Ok(MissionState::PickingUp)
}

fn avoid(
    rig: &mut Rig,
    cfg: &MissionConfig,
    bus: &MissionBus,
    color: ColorClass,
) -> Result<(), PorterError> {
    debug!(?color, "unexpected color; avoiding");
    rig.drive.stop(StopMode::Brake)?;
    run_timed(rig.drive.as_mut(), &cfg.avoidance_forward)?;
    run_timed(rig.drive.as_mut(), &cfg.avoidance_pivot)?;
    rig.drive
        .drive(cfg.search_drive.linear_mm_s, cfg.search_drive.angular_deg_s)?;
    bus.emit(
        SOURCE,
        MissionEventPayload::AvoidanceManeuver {
            behavior: Behavior::Search,
            color,
        },
    );
    Ok(())
}

/// Square the robot up on the reference heading.
///
/// Returns `false` without moving when the heading is already inside the
/// tolerance band, `true` after a two-stage spin-and-settle: one spin undoing
/// `primary_gain` of the measured offset, then a second undoing
/// `secondary_gain` of whatever is left, each followed by a hold.
pub fn correct_heading(
    rig: &mut Rig,
    cfg: &MissionConfig,
    bus: &MissionBus,
) -> Result<bool, PorterError> {
    let reference = cfg.reference_heading_deg;
    let heading = rig.gyro.angle()?;

    if is_aligned(heading, reference, cfg.heading_tolerance_deg) {
        info!(heading = normalize_degrees(heading), "already aligned; restarting search");
        bus.emit(
            SOURCE,
            MissionEventPayload::AlignmentSkipped {
                heading_deg: normalize_degrees(heading),
            },
        );
        return Ok(false);
    }

    let spin_ms = cfg.correction.spin_ms;
    let offset = signed_offset(heading, reference);
    pivot(rig.drive.as_mut(), -offset * cfg.correction.primary_gain, spin_ms)?;
    rig.drive.stop(StopMode::Hold)?;

    let residual = signed_offset(rig.gyro.angle()?, reference);
    pivot(
        rig.drive.as_mut(),
        -residual * cfg.correction.secondary_gain,
        spin_ms,
    )?;
    rig.drive.stop(StopMode::Hold)?;

    debug!(offset, residual, "heading corrected");
    bus.emit(SOURCE, MissionEventPayload::HeadingCorrected { offset_deg: offset });
    Ok(true)
}
