//! Controller configuration components.
//!
//! All values here are designer-tunable parameters. They are set when an
//! actor is spawned and read by the controller systems every tick.

use std::f32::consts::FRAC_PI_4;

use bevy::prelude::*;

use crate::error::{non_negative, positive, JumpSetupError};

/// Jump tuning for a single actor.
///
/// Forces are mass-normalized: a force of `12.0` changes the body's velocity
/// by `12.0` units along the jump direction.
///
/// World `+X` is "forward" and `-X` is "backward" for the directional and
/// backward jump settings.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct JumpConfig {
    // === Counting ===
    /// How many jumps may be performed while airborne before touching ground.
    pub max_air_jumps: u32,

    /// Minimum time in seconds between two successful jumps.
    pub jump_cooldown: f32,

    // === Forces ===
    /// Force of a forward (regular) jump.
    pub ground_jump_force: f32,

    /// Force of a backward jump.
    pub backward_jump_force: f32,

    /// Upward speed the body may have right after a jump.
    pub max_upward_velocity: f32,

    // === Backward Jump ===
    /// Horizontal (backward) weight of the backward jump direction.
    pub backward_jump_ratio: f32,

    /// Vertical weight of the backward jump direction.
    pub backward_upward_ratio: f32,

    // === Directional Jump ===
    /// Blend horizontal velocity into forward jumps.
    pub directional_jump_enabled: bool,

    /// Vertical weight of a directional jump.
    pub upward_jump_ratio: f32,

    /// Horizontal weight of a directional jump.
    pub forward_jump_ratio: f32,

    /// Horizontal speed above which a forward jump becomes directional.
    pub min_horizontal_speed: f32,

    /// Strip backward (`-X`) components from forward jump directions.
    pub prevent_backward_jump: bool,

    // === Surface Rotation ===
    /// Jump along the normal of a nearby steep surface.
    pub surface_rotation_enabled: bool,

    /// A surface is steep when its normal is further than this from vertical (radians).
    pub surface_angle_threshold: f32,

    /// How far the surface probes reach from the actor's center.
    pub surface_detection_distance: f32,

    // === Physics Body ===
    /// Ask the backend to enable continuous collision detection on the body.
    pub continuous_collision: bool,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            max_air_jumps: 3,
            jump_cooldown: 0.1,

            ground_jump_force: 12.0,
            backward_jump_force: 10.0,
            max_upward_velocity: 15.0,

            backward_jump_ratio: 0.6,
            backward_upward_ratio: 1.0,

            directional_jump_enabled: true,
            upward_jump_ratio: 1.0,
            forward_jump_ratio: 0.3,
            min_horizontal_speed: 0.5,
            prevent_backward_jump: true,

            surface_rotation_enabled: false,
            surface_angle_threshold: FRAC_PI_4,
            surface_detection_distance: 1.0,

            continuous_collision: true,
        }
    }
}

impl JumpConfig {
    /// Snappy player tuning: higher jumps, shorter cooldown.
    pub fn player() -> Self {
        Self {
            jump_cooldown: 0.08,
            ground_jump_force: 14.0,
            max_upward_velocity: 18.0,
            ..default()
        }
    }

    /// Straight-up jumps only, no blending of run speed.
    pub fn precise() -> Self {
        Self {
            directional_jump_enabled: false,
            surface_rotation_enabled: false,
            ..default()
        }
    }

    /// Kick off walls and steep slopes along their normal.
    pub fn wall_runner() -> Self {
        Self {
            surface_rotation_enabled: true,
            surface_detection_distance: 1.5,
            ..default()
        }
    }

    /// Check that every tunable is usable.
    pub fn validate(&self) -> Result<(), JumpSetupError> {
        non_negative("jump_cooldown", self.jump_cooldown)?;
        non_negative("ground_jump_force", self.ground_jump_force)?;
        non_negative("backward_jump_force", self.backward_jump_force)?;
        positive("max_upward_velocity", self.max_upward_velocity)?;
        non_negative("backward_jump_ratio", self.backward_jump_ratio)?;
        positive("backward_upward_ratio", self.backward_upward_ratio)?;
        positive("upward_jump_ratio", self.upward_jump_ratio)?;
        non_negative("forward_jump_ratio", self.forward_jump_ratio)?;
        non_negative("min_horizontal_speed", self.min_horizontal_speed)?;
        non_negative("surface_angle_threshold", self.surface_angle_threshold)?;
        non_negative("surface_detection_distance", self.surface_detection_distance)?;
        Ok(())
    }

    /// Builder: set the air jump cap.
    pub fn with_max_air_jumps(mut self, jumps: u32) -> Self {
        self.max_air_jumps = jumps;
        self
    }

    /// Builder: set the cooldown between jumps.
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.jump_cooldown = seconds;
        self
    }

    /// Builder: set forward and backward jump forces.
    pub fn with_forces(mut self, ground: f32, backward: f32) -> Self {
        self.ground_jump_force = ground;
        self.backward_jump_force = backward;
        self
    }

    /// Builder: set the upward speed cap.
    pub fn with_max_upward_velocity(mut self, velocity: f32) -> Self {
        self.max_upward_velocity = velocity;
        self
    }

    /// Builder: set the backward jump direction weights.
    pub fn with_backward_ratios(mut self, backward: f32, upward: f32) -> Self {
        self.backward_jump_ratio = backward;
        self.backward_upward_ratio = upward;
        self
    }

    /// Builder: configure directional jumps.
    pub fn with_directional_jump(mut self, upward: f32, forward: f32, min_speed: f32) -> Self {
        self.directional_jump_enabled = true;
        self.upward_jump_ratio = upward;
        self.forward_jump_ratio = forward;
        self.min_horizontal_speed = min_speed;
        self
    }

    /// Builder: disable directional jumps.
    pub fn without_directional_jump(mut self) -> Self {
        self.directional_jump_enabled = false;
        self
    }

    /// Builder: allow or strip backward components of forward jumps.
    pub fn with_prevent_backward_jump(mut self, prevent: bool) -> Self {
        self.prevent_backward_jump = prevent;
        self
    }

    /// Builder: enable surface-normal jumps.
    pub fn with_surface_rotation(mut self, angle_threshold: f32, distance: f32) -> Self {
        self.surface_rotation_enabled = true;
        self.surface_angle_threshold = angle_threshold;
        self.surface_detection_distance = distance;
        self
    }

    /// Builder: enable or disable continuous collision on the body.
    pub fn with_continuous_collision(mut self, enabled: bool) -> Self {
        self.continuous_collision = enabled;
        self
    }
}

/// Tuning for the [`StuckRecoveryMonitor`](crate::stuck::StuckRecoveryMonitor).
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StuckRecoveryConfig {
    /// Speed below which the actor counts as not moving.
    pub stuck_speed_threshold: f32,

    /// How long the actor must stay slow before checks start (seconds).
    pub stuck_duration: f32,

    /// Time between two overlap checks while stuck (seconds).
    pub check_interval: f32,

    /// Offset of the ground check point from the actor's center.
    pub ground_check_offset: Vec2,

    /// Nominal radius of the ground check.
    pub ground_check_radius: f32,

    /// The overlap query uses `ground_check_radius * radius_multiplier`.
    pub radius_multiplier: f32,

    /// No correction while the actor rises faster than this.
    pub rising_velocity_guard: f32,
}

impl Default for StuckRecoveryConfig {
    fn default() -> Self {
        Self {
            stuck_speed_threshold: 0.1,
            stuck_duration: 2.0,
            check_interval: 0.5,
            ground_check_offset: Vec2::new(0.0, -0.5),
            ground_check_radius: 0.2,
            radius_multiplier: 1.5,
            rising_velocity_guard: 2.0,
        }
    }
}

impl StuckRecoveryConfig {
    /// Radius actually used by the overlap query.
    #[inline]
    pub fn query_radius(&self) -> f32 {
        self.ground_check_radius * self.radius_multiplier
    }

    /// Check that every tunable is usable.
    pub fn validate(&self) -> Result<(), JumpSetupError> {
        non_negative("stuck_speed_threshold", self.stuck_speed_threshold)?;
        non_negative("stuck_duration", self.stuck_duration)?;
        positive("check_interval", self.check_interval)?;
        positive("ground_check_radius", self.ground_check_radius)?;
        positive("radius_multiplier", self.radius_multiplier)?;
        non_negative("rising_velocity_guard", self.rising_velocity_guard)?;
        Ok(())
    }

    /// Builder: set how long the actor must be slow before checking.
    pub fn with_stuck_duration(mut self, seconds: f32) -> Self {
        self.stuck_duration = seconds;
        self
    }

    /// Builder: set the interval between checks.
    pub fn with_check_interval(mut self, seconds: f32) -> Self {
        self.check_interval = seconds;
        self
    }

    /// Builder: set the nominal ground check point and radius.
    pub fn with_ground_check(mut self, offset: Vec2, radius: f32) -> Self {
        self.ground_check_offset = offset;
        self.ground_check_radius = radius;
        self
    }
}

/// Policy deciding which contacts count as ground.
///
/// Rules are applied in order and the first match wins. See
/// [`classify_contact`](crate::contact::classify_contact).
///
/// With `solid_fallback` enabled any solid collider of another body counts
/// as ground, walls included. This keeps actors from getting stuck in the
/// airborne state at the cost of occasionally treating a wall as floor.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GroundClassification {
    /// Colliders tagged [`SurfaceTag::Obstacle`](crate::contact::SurfaceTag::Obstacle) count as ground.
    pub obstacle_counts_as_ground: bool,

    /// Case-insensitive substrings of a collider's `Name` that mark ground.
    pub name_patterns: Vec<String>,

    /// Collision group bits that mark ground (`0` disables the rule).
    pub ground_layers: u32,

    /// Any solid, non-sensor collider of another body counts as ground.
    pub solid_fallback: bool,
}

impl Default for GroundClassification {
    fn default() -> Self {
        Self {
            obstacle_counts_as_ground: true,
            name_patterns: vec!["ground".into(), "platform".into(), "floor".into()],
            ground_layers: 0,
            solid_fallback: true,
        }
    }
}

impl GroundClassification {
    /// Only explicit tags, names and layers count; no solid fallback.
    pub fn strict() -> Self {
        Self {
            solid_fallback: false,
            ..default()
        }
    }

    /// Builder: set the ground collision group bits.
    pub fn with_ground_layers(mut self, layers: u32) -> Self {
        self.ground_layers = layers;
        self
    }

    /// Builder: add a name pattern.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_patterns.push(pattern.into());
        self
    }
}
