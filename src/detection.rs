//! Surface probe results.
//!
//! Backends fill [`SurfaceProbe`] with raycast hits around the actor. The jump
//! systems read it to decide whether a forward jump should follow a nearby
//! steep surface instead of going straight up.

use std::f32::consts::FRAC_1_SQRT_2;

use bevy::prelude::*;

/// Directions probed for steep surfaces: right, left and the four diagonals.
pub const PROBE_DIRECTIONS: [Vec2; 6] = [
    Vec2::X,
    Vec2::NEG_X,
    Vec2::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Vec2::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Vec2::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    Vec2::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

/// A raycast hit against a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Surface normal at the hit point.
    pub normal: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity that was hit (if known).
    pub entity: Option<Entity>,
}

impl SurfaceHit {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec2, point: Vec2, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Angle between the surface normal and world up, in radians (`0` = flat floor).
    pub fn angle_from_vertical(&self) -> f32 {
        let normal = self.normal.normalize_or_zero();
        if normal == Vec2::ZERO {
            return 0.0;
        }
        normal.dot(Vec2::Y).clamp(-1.0, 1.0).acos()
    }

    /// Whether the surface is steeper than `threshold` radians.
    pub fn is_steep(&self, threshold: f32) -> bool {
        self.angle_from_vertical() > threshold
    }
}

/// Pick the closest hit whose surface is steeper than `threshold`.
pub fn select_steep_surface(
    hits: impl IntoIterator<Item = SurfaceHit>,
    threshold: f32,
) -> Option<SurfaceHit> {
    hits.into_iter()
        .filter(|hit| hit.is_steep(threshold))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Latest surface probe result for an actor.
///
/// Only refreshed for actors whose [`JumpConfig`](crate::config::JumpConfig)
/// enables surface rotation.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct SurfaceProbe {
    /// Closest steep surface found by the last probe.
    #[reflect(ignore)]
    pub steep_surface: Option<SurfaceHit>,
}

impl SurfaceProbe {
    /// Replace the stored result with the steepest candidate of `hits`.
    pub fn update(&mut self, hits: impl IntoIterator<Item = SurfaceHit>, threshold: f32) {
        self.steep_surface = select_steep_surface(hits, threshold);
    }

    /// Forget the stored result.
    pub fn clear(&mut self) {
        self.steep_surface = None;
    }
}
