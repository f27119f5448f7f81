//! The jump controller.
//!
//! [`JumpController`] owns the grounded flag, the air jump count and the
//! cooldown clock of one actor. Ground state only changes through
//! [`on_ground_enter`](JumpController::on_ground_enter) and
//! [`on_ground_exit`](JumpController::on_ground_exit), which the contact
//! systems call on tracker edges before the jump decision of each tick.
//!
//! # Example
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_jump_controller::prelude::*;
//!
//! struct Body(Vec2);
//!
//! impl JumpBody for Body {
//!     fn velocity(&self) -> Vec2 { self.0 }
//!     fn set_velocity(&mut self, velocity: Vec2) { self.0 = velocity; }
//! }
//!
//! let config = JumpConfig::precise();
//! let mut controller = JumpController::new();
//! let mut body = Body(Vec2::ZERO);
//!
//! controller.on_ground_enter();
//! let outcome = controller.perform_jump(JumpDirection::Forward, 0.0, &config, None, &mut body);
//! assert!(outcome.is_performed());
//! assert!(body.0.y > 0.0);
//! ```

use bevy::prelude::*;

use crate::backend::JumpBody;
use crate::config::JumpConfig;
use crate::detection::SurfaceHit;
use crate::intent::JumpIntent;

/// Upward speed above which a jump counts as "already rising fast".
pub const RISING_FAST_THRESHOLD: f32 = 5.0;

/// Force multiplier for jumps started while already rising fast.
pub const RISING_FORCE_DAMPING: f32 = 0.7;

/// Smallest upward component of a surface-normal jump direction.
pub const MIN_SURFACE_JUMP_UPWARD: f32 = 0.3;

/// Which jump input fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum JumpDirection {
    /// Regular jump: up, along the run direction, or off a steep surface.
    Forward,
    /// Fixed up-and-back jump.
    Backward,
}

/// Where the current grounded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum GroundSource {
    /// Not grounded.
    #[default]
    None,
    /// Ground contact reported by the contact tracker.
    Contacts,
    /// Forced by stuck recovery; lasts until the next jump or ground exit.
    Recovery,
}

/// Why a jump attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpRejection {
    /// The controller was disabled by a configuration error.
    Disabled,
    /// The cooldown has not elapsed yet.
    Cooldown {
        /// Seconds until the next jump is allowed.
        remaining: f32,
    },
    /// Airborne and all air jumps are used up.
    AirJumpsExhausted,
}

/// Details of a performed jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpReport {
    /// Which input fired.
    pub direction: JumpDirection,
    /// Unit direction the impulse was applied along.
    pub jump_vector: Vec2,
    /// Effective force after rising damping.
    pub force: f32,
    /// Whether the jump was an air jump.
    pub air_jump: bool,
    /// Body velocity after the jump and upward clamp.
    pub velocity: Vec2,
}

impl JumpReport {
    /// The applied impulse.
    pub fn impulse(&self) -> Vec2 {
        self.jump_vector * self.force
    }
}

/// Emitted by the jump systems for every performed jump.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct JumpPerformed {
    /// The actor that jumped.
    pub actor: Entity,
    /// Which input fired.
    pub direction: JumpDirection,
    /// The applied impulse.
    pub impulse: Vec2,
    /// Whether the jump was an air jump.
    pub air_jump: bool,
    /// Body velocity right after the jump.
    pub velocity: Vec2,
}

impl JumpPerformed {
    /// Build the event for `actor` from a jump report.
    pub fn from_report(actor: Entity, report: &JumpReport) -> Self {
        Self {
            actor,
            direction: report.direction,
            impulse: report.impulse(),
            air_jump: report.air_jump,
            velocity: report.velocity,
        }
    }
}

/// Result of [`JumpController::perform_jump`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpOutcome {
    /// The jump happened.
    Performed(JumpReport),
    /// The attempt was ignored; nothing changed.
    Rejected(JumpRejection),
}

impl JumpOutcome {
    /// Whether the jump happened.
    pub fn is_performed(&self) -> bool {
        matches!(self, Self::Performed(_))
    }
}

/// Jump state of one actor.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct JumpController {
    grounded: bool,
    ground_source: GroundSource,
    air_jumps_used: u32,
    last_jump_time: Option<f64>,
    initialized: bool,
    disabled: bool,
}

impl JumpController {
    /// Create an airborne controller with no jumps used.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the actor is on the ground.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Where the grounded state came from.
    pub fn ground_source(&self) -> GroundSource {
        self.ground_source
    }

    /// Jumps performed while airborne since the last ground contact.
    pub fn air_jumps_used(&self) -> u32 {
        self.air_jumps_used
    }

    /// Air jumps still available.
    pub fn remaining_air_jumps(&self, config: &JumpConfig) -> u32 {
        config.max_air_jumps.saturating_sub(self.air_jumps_used)
    }

    /// Time of the last successful jump.
    pub fn last_jump_time(&self) -> Option<f64> {
        self.last_jump_time
    }

    /// Whether a configuration error disabled this controller.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether the setup check already ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Turn every jump attempt into a no-op.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Ground contact started. Always resets the air jump count.
    pub fn on_ground_enter(&mut self) {
        self.grounded = true;
        self.ground_source = GroundSource::Contacts;
        self.air_jumps_used = 0;
    }

    /// Ground contact ended. Leaves the air jump count alone.
    pub fn on_ground_exit(&mut self) {
        self.grounded = false;
        self.ground_source = GroundSource::None;
    }

    /// Ground-enter forced by stuck recovery.
    ///
    /// No tracker contact backs this state, so it ends on the next jump.
    pub fn on_ground_recovered(&mut self) {
        self.grounded = true;
        self.ground_source = GroundSource::Recovery;
        self.air_jumps_used = 0;
    }

    /// Administrative reset (respawn, checkpoints): air jumps and cooldown.
    pub fn reset_jumps(&mut self) {
        self.air_jumps_used = 0;
        self.last_jump_time = None;
    }

    /// Seconds until the cooldown allows another jump (`0` when ready).
    pub fn cooldown_remaining(&self, now: f64, config: &JumpConfig) -> f32 {
        self.last_jump_time
            .map(|last| (f64::from(config.jump_cooldown) - (now - last)).max(0.0) as f32)
            .unwrap_or(0.0)
    }

    /// Why a jump at `now` would be refused, if it would.
    pub fn check_jump(&self, now: f64, config: &JumpConfig) -> Result<(), JumpRejection> {
        if self.disabled {
            return Err(JumpRejection::Disabled);
        }
        if let Some(last) = self.last_jump_time {
            if now - last < f64::from(config.jump_cooldown) {
                return Err(JumpRejection::Cooldown {
                    remaining: self.cooldown_remaining(now, config),
                });
            }
        }
        if !self.grounded && self.air_jumps_used >= config.max_air_jumps {
            return Err(JumpRejection::AirJumpsExhausted);
        }
        Ok(())
    }

    /// Whether a jump at `now` would succeed.
    pub fn can_jump(&self, now: f64, config: &JumpConfig) -> bool {
        self.check_jump(now, config).is_ok()
    }

    /// Try to jump at `now`.
    ///
    /// `surface` is the closest steep surface found by the probe; it is only
    /// used for forward jumps with surface rotation enabled. Rejected attempts
    /// leave both the controller and the body untouched.
    pub fn perform_jump(
        &mut self,
        direction: JumpDirection,
        now: f64,
        config: &JumpConfig,
        surface: Option<&SurfaceHit>,
        body: &mut impl JumpBody,
    ) -> JumpOutcome {
        if let Err(rejection) = self.check_jump(now, config) {
            return JumpOutcome::Rejected(rejection);
        }

        // Discard downward residual so jumps never fight a fall
        let mut velocity = body.velocity();
        if velocity.y < 0.0 {
            velocity.y = 0.0;
            body.set_velocity(velocity);
        }

        let force = effective_force(direction, velocity, config);
        let jump_vector = match direction {
            JumpDirection::Backward => backward_jump_vector(config),
            JumpDirection::Forward => forward_jump_vector(velocity, surface, config),
        };

        body.apply_impulse(jump_vector * force);

        let mut velocity = body.velocity();
        if velocity.y > config.max_upward_velocity {
            velocity.y = config.max_upward_velocity;
            body.set_velocity(velocity);
        }

        let air_jump = !self.grounded;
        if air_jump {
            self.air_jumps_used += 1;
        } else if self.ground_source == GroundSource::Recovery {
            self.on_ground_exit();
        }
        self.last_jump_time = Some(now);

        JumpOutcome::Performed(JumpReport {
            direction,
            jump_vector,
            force,
            air_jump,
            velocity,
        })
    }

    /// Run one tick of input: try every jump queued in `intent`, forward first.
    ///
    /// The intent is drained whether or not the jumps succeed.
    pub fn process_intent(
        &mut self,
        intent: &mut JumpIntent,
        now: f64,
        config: &JumpConfig,
        surface: Option<&SurfaceHit>,
        body: &mut impl JumpBody,
    ) -> Vec<JumpOutcome> {
        std::iter::from_fn(|| intent.next_request())
            .map(|direction| self.perform_jump(direction, now, config, surface, &mut *body))
            .collect()
    }
}

/// Base force for `direction`, damped when the body is already rising fast.
pub fn effective_force(direction: JumpDirection, velocity: Vec2, config: &JumpConfig) -> f32 {
    let base = match direction {
        JumpDirection::Forward => config.ground_jump_force,
        JumpDirection::Backward => config.backward_jump_force,
    };
    if velocity.y > RISING_FAST_THRESHOLD {
        base * RISING_FORCE_DAMPING
    } else {
        base
    }
}

/// Unit direction of a backward jump. Independent of the body's velocity.
pub fn backward_jump_vector(config: &JumpConfig) -> Vec2 {
    Vec2::new(-config.backward_jump_ratio, config.backward_upward_ratio).normalize_or(Vec2::Y)
}

/// Unit direction of a forward jump.
///
/// Priority: steep surface normal (surface rotation), then directional blend
/// (directional jump), then straight up.
pub fn forward_jump_vector(
    velocity: Vec2,
    surface: Option<&SurfaceHit>,
    config: &JumpConfig,
) -> Vec2 {
    if config.surface_rotation_enabled {
        if let Some(hit) = surface.filter(|hit| hit.is_steep(config.surface_angle_threshold)) {
            return surface_jump_vector(hit.normal, config);
        }
    }

    if config.directional_jump_enabled && velocity.x.abs() > config.min_horizontal_speed {
        let mut horizontal = config.forward_jump_ratio * velocity.x.signum();
        if config.prevent_backward_jump && horizontal < 0.0 {
            horizontal = 0.0;
        }
        return Vec2::new(horizontal, config.upward_jump_ratio).normalize_or(Vec2::Y);
    }

    Vec2::Y
}

/// Jump direction off a steep surface with the given normal.
pub fn surface_jump_vector(normal: Vec2, config: &JumpConfig) -> Vec2 {
    let mut direction = normal.normalize_or(Vec2::Y);
    // Overhangs: keep pushing away horizontally, but upward
    if direction.y < 0.0 {
        direction.y = -direction.y;
    }
    direction.y = direction.y.max(MIN_SURFACE_JUMP_UPWARD);
    if config.prevent_backward_jump && direction.x < 0.0 {
        direction.x = 0.0;
    }
    direction.normalize_or(Vec2::Y)
}
