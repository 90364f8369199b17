//! Formation placement: where each member of a unit stands
//!
//! `place` maps (formation, index, total, scale) to an offset from the unit's
//! anchor. +Z is the unit's facing, +Y is up (only fleet shapes use it).
//! Every formation except `Scattered` ignores the generator and is a pure
//! function of its inputs.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

use crate::battle::formation::Formation;

/// Golden angle in radians, used for even angular spacing
const GOLDEN_ANGLE: f32 = 2.399_963_2; // PI * (3 - sqrt(5))

/// How wide a line is relative to sqrt(total)
const LINE_WIDTH_FACTOR: f32 = 2.0;

/// Maximum sweep of the crane's outermost members
const CRANE_MAX_WING_ANGLE: f32 = PI / 3.0;

/// Offset of member `index` of `total` within `formation`
///
/// `index` past the end is clamped to the last member; `total == 0`
/// yields the origin.
pub fn place<R: Rng + ?Sized>(
    formation: Formation,
    index: usize,
    total: usize,
    scale: f32,
    rng: &mut R,
) -> Vec3 {
    if total == 0 {
        return Vec3::ZERO;
    }
    let index = index.min(total - 1);

    match formation {
        Formation::Line => line_offset(index, total, scale),
        Formation::Wedge => wedge_offset(index, scale),
        Formation::Square => square_offset(index, total, scale),
        Formation::Crane => crane_offset(index, total, scale),
        Formation::Spindle => spindle_offset(index, total, scale),
        Formation::Sphere => sphere_offset(index, total, scale),
        Formation::Scattered => scattered_offset(total, scale, rng),
    }
}

/// Offsets for every member of a unit, in index order
pub fn layout<R: Rng + ?Sized>(
    formation: Formation,
    total: usize,
    scale: f32,
    rng: &mut R,
) -> Vec<Vec3> {
    (0..total)
        .map(|i| place(formation, i, total, scale, rng))
        .collect()
}

/// How many members to draw for a partially destroyed unit
pub fn visible_count(total_models: u32, health_fraction: f32) -> u32 {
    let fraction = if health_fraction.is_nan() {
        0.0
    } else {
        health_fraction.clamp(0.0, 1.0)
    };
    (total_models as f32 * fraction).ceil() as u32
}

fn line_offset(index: usize, total: usize, scale: f32) -> Vec3 {
    let width = (total as f32).sqrt() * scale * LINE_WIDTH_FACTOR;
    let t = if total == 1 {
        0.5
    } else {
        index as f32 / (total - 1) as f32
    };
    Vec3::new((t - 0.5) * width, 0.0, 0.0)
}

fn wedge_offset(index: usize, scale: f32) -> Vec3 {
    // Row r holds indices r^2 ..= r^2 + 2r
    let row = (index as f32).sqrt().floor() as usize;
    let col = index - row * row;
    let x = col as f32 - row as f32 / 2.0;
    let z = -(row as f32);
    Vec3::new(x * scale, 0.0, z * scale)
}

fn square_offset(index: usize, total: usize, scale: f32) -> Vec3 {
    let side = (total as f32).sqrt().ceil().max(1.0) as usize;
    let row = index / side;
    let col = index % side;
    let half = (side - 1) as f32 / 2.0;
    Vec3::new(
        (col as f32 - half) * scale,
        0.0,
        -(row as f32 - half) * scale,
    )
}

fn crane_offset(index: usize, total: usize, scale: f32) -> Vec3 {
    let center = (total - 1) as f32 / 2.0;
    let from_center = index as f32 - center;
    if from_center == 0.0 {
        return Vec3::ZERO;
    }

    let side = from_center.signum();
    let distance = from_center.abs();
    // Outer members sweep further forward, closing the crescent
    let angle = distance / center.max(1.0) * CRANE_MAX_WING_ANGLE;
    let radius = distance * scale;
    Vec3::new(side * radius * angle.cos(), 0.0, radius * angle.sin())
}

fn spindle_offset(index: usize, total: usize, scale: f32) -> Vec3 {
    let t = (index as f32 + 0.5) / total as f32;
    let length = (total as f32).sqrt() * scale * 2.0;
    let max_radius = (total as f32).sqrt() * scale * 0.5;
    // Bulges in the middle, tapers at both tips
    let radial = (PI * t).sin() * max_radius;
    let angle = GOLDEN_ANGLE * index as f32;
    Vec3::new(angle.cos() * radial, angle.sin() * radial, (t - 0.5) * length)
}

fn sphere_offset(index: usize, total: usize, scale: f32) -> Vec3 {
    let radius = (total as f32).cbrt() * scale;
    // Fibonacci lattice: even latitude steps, golden-angle longitude
    let y = 1.0 - 2.0 * (index as f32 + 0.5) / total as f32;
    let ring = (1.0 - y * y).max(0.0).sqrt();
    let theta = GOLDEN_ANGLE * index as f32;
    Vec3::new(theta.cos() * ring, y, theta.sin() * ring) * radius
}

fn scattered_offset<R: Rng + ?Sized>(total: usize, scale: f32, rng: &mut R) -> Vec3 {
    let half = (total as f32).sqrt() * scale.abs();
    if !half.is_finite() || half == 0.0 {
        return Vec3::ZERO;
    }
    let vertical = half * 0.25;
    Vec3::new(
        rng.gen_range(-half..=half),
        rng.gen_range(-vertical..=vertical),
        rng.gen_range(-half..=half),
    )
}
