//! Heading arithmetic on gyro readings.
//!
//! Gyro readings are unbounded (the gyro keeps counting past 360), so every
//! comparison goes through [`signed_offset`], which folds the difference into
//! `[-180, 180)`.

/// Fold `degrees` into `[0, 360)`.
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest signed rotation from `reference` to `heading`, in `[-180, 180)`.
pub fn signed_offset(heading: f32, reference: f32) -> f32 {
    normalize_degrees(heading - reference + 180.0) - 180.0
}

/// `true` when `heading` lies within `tolerance` degrees of `reference`,
/// measured across the 0°/360° wrap.
pub fn is_aligned(heading: f32, reference: f32, tolerance: f32) -> bool {
    signed_offset(heading, reference).abs() <= tolerance
}
