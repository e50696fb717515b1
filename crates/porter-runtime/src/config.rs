//! [`MissionConfig`] – every tuning constant the behaviors use.
//!
//! Units are part of each field's name.  Defaults are the values the
//! robot was tuned with on the course; retune by editing the `[mission]` table
//! of the CLI config instead of touching control logic.

use std::time::Duration;

use porter_types::ColorClass;
use serde::{Deserialize, Serialize};

/// Continuous drive rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveRate {
    pub linear_mm_s: f32,
    pub angular_deg_s: f32,
}

/// An open-loop drive segment: rates held for a fixed wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedDrive {
    pub linear_mm_s: f32,
    pub angular_deg_s: f32,
    pub duration_ms: u64,
}

impl TimedDrive {
    pub const fn new(linear_mm_s: f32, angular_deg_s: f32, duration_ms: u64) -> Self {
        Self {
            linear_mm_s,
            angular_deg_s,
            duration_ms,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Two-stage spin-and-settle used when the robot stops off-heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Duration of each corrective spin.
    pub spin_ms: u64,
    /// Fraction of the measured offset undone by the first spin.
    pub primary_gain: f32,
    /// Fraction of the remaining offset undone by the second spin.
    pub secondary_gain: f32,
}

/// Gripper motion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GripConfig {
    /// Closing speed for the stall-seek.
    pub close_speed_deg_s: f32,
    /// Give up on the stall-seek after this long.  `None` waits forever.
    pub stall_timeout_ms: Option<u64>,
    /// Release speed; negative opens the gripper.
    pub release_speed_deg_s: f32,
    /// The two release motions, in order.
    pub release_angles_deg: [f32; 2],
}

/// Deposit maneuver parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositConfig {
    /// Reverse segment run before the turn and again between release motions.
    pub back_away: TimedDrive,
    /// Turn before releasing; slightly over 180 to clear the luggage.
    pub turn_deg: f32,
    pub turn_ms: u64,
    /// Segments run after the release to leave the delivery zone.
    pub retreat: Vec<TimedDrive>,
}

/// Tuning constants for a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Supervisor poll period.  Bounds operator stop latency.
    pub poll_interval_ms: u64,

    // ── Search ────────────────────────────────────────────────────────────
    /// Color marking the luggage.
    pub pickup_color: ColorClass,
    /// Colors that keep the search moving without avoidance.
    pub boundary_colors: Vec<ColorClass>,
    pub search_drive: DriveRate,
    pub avoidance_forward: TimedDrive,
    pub avoidance_pivot: TimedDrive,
    pub reference_heading_deg: f32,
    /// Half-width of the "already aligned" band around the reference.
    pub heading_tolerance_deg: f32,
    pub correction: CorrectionConfig,
    /// Pivot that turns the gripper toward the luggage.
    pub face_object_deg: f32,
    pub face_object_ms: u64,
    pub approach: TimedDrive,

    // ── Pick up / deposit ─────────────────────────────────────────────────
    pub grip: GripConfig,
    pub deposit: DepositConfig,

    // ── Carry ─────────────────────────────────────────────────────────────
    /// Color marking the delivery zone.
    pub delivery_color: ColorClass,
    /// Colors that trigger an in-place pivot while carrying.
    pub carry_obstacle_colors: Vec<ColorClass>,
    /// Curved sweep toward the zone; the turn bias is deliberate.
    pub carry_sweep: TimedDrive,
    pub carry_pivot: TimedDrive,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            pickup_color: ColorClass::Red,
            boundary_colors: vec![ColorClass::Blue, ColorClass::White],
            search_drive: DriveRate {
                linear_mm_s: -160.0,
                angular_deg_s: 0.0,
            },
            avoidance_forward: TimedDrive::new(50.0, 0.0, 1000),
            avoidance_pivot: TimedDrive::new(0.0, 45.0, 1000),
            reference_heading_deg: 0.0,
            heading_tolerance_deg: 15.0,
            correction: CorrectionConfig {
                spin_ms: 1000,
                primary_gain: 1.0,
                secondary_gain: 0.5,
            },
            face_object_deg: 190.0,
            face_object_ms: 1000,
            approach: TimedDrive::new(65.0, 0.0, 1000),
            grip: GripConfig {
                close_speed_deg_s: 20.0,
                stall_timeout_ms: Some(5000),
                release_speed_deg_s: -50.0,
                release_angles_deg: [100.0, 25.0],
            },
            deposit: DepositConfig {
                back_away: TimedDrive::new(-50.0, 0.0, 1000),
                turn_deg: 190.0,
                turn_ms: 1000,
                retreat: vec![
                    TimedDrive::new(-113.0 / 3.0, 15.0, 3000),
                    TimedDrive::new(0.0, 15.0, 3000),
                ],
            },
            delivery_color: ColorClass::Green,
            carry_obstacle_colors: vec![ColorClass::Blue],
            carry_sweep: TimedDrive::new(50.0, 45.0, 1000),
            carry_pivot: TimedDrive::new(0.0, 90.0, 1000),
        }
    }
}

impl MissionConfig {
    /// Supervisor poll period, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.grip.stall_timeout_ms.map(Duration::from_millis)
    }

    /// Timed pivot in place covering `degrees` over `duration_ms`.  `None`
    /// for a zero duration, which has no finite rate.
    pub fn pivot(degrees: f32, duration_ms: u64) -> Option<TimedDrive> {
        if duration_ms == 0 {
            return None;
        }
        let secs = duration_ms as f32 / 1000.0;
        Some(TimedDrive::new(0.0, degrees / secs, duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_field_tuning() {
        let cfg = MissionConfig::default();
        assert_eq!(cfg.pickup_color, ColorClass::Red);
        assert_eq!(cfg.delivery_color, ColorClass::Green);
        assert!((cfg.heading_tolerance_deg - 15.0).abs() < f32::EPSILON);
        assert!((cfg.face_object_deg - 190.0).abs() < f32::EPSILON);
        assert_eq!(cfg.stall_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn pivot_spreads_angle_over_duration() {
        let p = MissionConfig::pivot(190.0, 2000).unwrap();
        assert!((p.angular_deg_s - 95.0).abs() < 1e-4);
        assert!(p.linear_mm_s.abs() < f32::EPSILON);
        assert_eq!(p.duration(), Duration::from_secs(2));
    }

    #[test]
    fn zero_duration_pivot_is_none() {
        assert_eq!(MissionConfig::pivot(90.0, 0), None);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let cfg = MissionConfig {
            poll_interval_ms: 0,
            ..MissionConfig::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let cfg: MissionConfig = toml::from_str(
            r#"
            poll_interval_ms = 25
            pickup_color = "yellow"
            boundary_colors = ["white"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.poll_interval_ms, 25);
        assert_eq!(cfg.pickup_color, ColorClass::Yellow);
        assert_eq!(cfg.boundary_colors, vec![ColorClass::White]);
        assert_eq!(cfg.delivery_color, ColorClass::Green);
    }

    #[test]
    fn stall_timeout_can_be_disabled() {
        let mut cfg = MissionConfig::default();
        cfg.grip.stall_timeout_ms = None;
        assert_eq!(cfg.stall_timeout(), None);
    }
}
