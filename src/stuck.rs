//! Stuck recovery.
//!
//! Contact events can get lost (tunneling, several colliders ending in the
//! same step). When an actor has barely moved for a while, the monitor asks
//! the backend for an overlap query around its feet, and if that finds solid
//! ground while the controller still thinks it is airborne, it forces a
//! ground-enter.
//!
//! A recovered ground state has no contact that could end it, so while it
//! lasts the monitor keeps checking every interval and drops the actor back
//! to airborne once the ground is gone.

use bevy::prelude::*;

use crate::config::StuckRecoveryConfig;
use crate::controller::{GroundSource, JumpController};

/// Result of [`StuckRecoveryMonitor::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No overlap result was pending.
    Idle,
    /// The actor is rising too fast to be judged.
    SuppressedRising,
    /// Tracked state already matches the overlap result.
    InSync,
    /// Solid ground was found while airborne; a ground-enter was forced.
    Corrected,
    /// Recovered ground is gone; the actor is airborne again.
    Released,
}

/// Optional per-actor desync detector.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct StuckRecoveryMonitor {
    slow_time: f32,
    since_check: Option<f32>,
    check_pending: bool,
    overlap_result: Option<bool>,
    corrections: u32,
}

impl StuckRecoveryMonitor {
    /// Create an idle monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// How long the actor has been below the stuck speed.
    pub fn slow_time(&self) -> f32 {
        self.slow_time
    }

    /// Whether the backend should run an overlap query this tick.
    pub fn check_pending(&self) -> bool {
        self.check_pending
    }

    /// How many times the monitor corrected the controller.
    pub fn corrections(&self) -> u32 {
        self.corrections
    }

    /// Advance the timers. Returns `true` when an overlap check is due.
    ///
    /// While `controller` stands on recovered ground, checks run every
    /// interval regardless of speed.
    pub fn tick(
        &mut self,
        dt: f32,
        velocity: Vec2,
        controller: &JumpController,
        config: &StuckRecoveryConfig,
    ) -> bool {
        if controller.ground_source() == GroundSource::Recovery {
            return self.advance_check(dt, config);
        }

        if velocity.length() >= config.stuck_speed_threshold {
            self.slow_time = 0.0;
            self.since_check = None;
            self.check_pending = false;
            return false;
        }

        self.slow_time += dt;
        if self.slow_time < config.stuck_duration {
            return false;
        }

        self.advance_check(dt, config)
    }

    fn advance_check(&mut self, dt: f32, config: &StuckRecoveryConfig) -> bool {
        // First check fires right away
        let elapsed = self
            .since_check
            .map_or(config.check_interval, |since| since + dt);
        if elapsed >= config.check_interval {
            self.since_check = Some(0.0);
            self.check_pending = true;
        } else {
            self.since_check = Some(elapsed);
        }
        self.check_pending
    }

    /// Store the result of the backend's overlap query.
    pub fn report_overlap(&mut self, solid_ground_found: bool) {
        self.check_pending = false;
        self.overlap_result = Some(solid_ground_found);
    }

    /// Apply a pending overlap result to `controller`.
    pub fn resolve(
        &mut self,
        velocity: Vec2,
        controller: &mut JumpController,
        config: &StuckRecoveryConfig,
    ) -> RecoveryOutcome {
        let Some(ground_found) = self.overlap_result.take() else {
            return RecoveryOutcome::Idle;
        };

        if velocity.y > config.rising_velocity_guard {
            return RecoveryOutcome::SuppressedRising;
        }

        if ground_found && !controller.is_grounded() {
            controller.on_ground_recovered();
            self.corrections += 1;
            RecoveryOutcome::Corrected
        } else if !ground_found && controller.ground_source() == GroundSource::Recovery {
            controller.on_ground_exit();
            RecoveryOutcome::Released
        } else {
            RecoveryOutcome::InSync
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.125;

    fn config() -> StuckRecoveryConfig {
        StuckRecoveryConfig::default()
            .with_stuck_duration(1.0)
            .with_check_interval(0.5)
    }

    fn tick_for(monitor: &mut StuckRecoveryMonitor, seconds: f32, velocity: Vec2) -> usize {
        let config = config();
        let controller = JumpController::new();
        let steps = (seconds / DT).round() as usize;
        (0..steps)
            .filter(|_| monitor.tick(DT, velocity, &controller, &config))
            .count()
    }

    #[test]
    fn no_check_while_moving() {
        let mut monitor = StuckRecoveryMonitor::new();
        assert_eq!(tick_for(&mut monitor, 5.0, Vec2::new(3.0, 0.0)), 0);
        assert_eq!(monitor.slow_time(), 0.0);
    }

    #[test]
    fn no_check_before_stuck_duration() {
        let mut monitor = StuckRecoveryMonitor::new();
        assert_eq!(tick_for(&mut monitor, 0.8, Vec2::ZERO), 0);
        assert!(!monitor.check_pending());
    }

    #[test]
    fn check_is_due_once_stuck() {
        let mut monitor = StuckRecoveryMonitor::new();
        monitor.tick(DT, Vec2::new(1.0, 0.0), &JumpController::new(), &config());
        assert!(tick_for(&mut monitor, 1.5, Vec2::ZERO) >= 1);
        assert!(monitor.check_pending());
    }

    #[test]
    fn checks_repeat_every_interval() {
        let mut monitor = StuckRecoveryMonitor::new();
        let controller = JumpController::new();
        let config = config();

        // Stuck from the start: 1.0s until the first check, then every 0.5s
        let mut checks = Vec::new();
        for step in 1..=25 {
            if monitor.tick(DT, Vec2::ZERO, &controller, &config) {
                checks.push(step);
                monitor.report_overlap(false);
            }
        }
        assert_eq!(checks, vec![8, 12, 16, 20, 24]);
    }

    #[test]
    fn movement_resets_stuck_timer() {
        let mut monitor = StuckRecoveryMonitor::new();
        tick_for(&mut monitor, 0.8, Vec2::ZERO);
        monitor.tick(DT, Vec2::new(1.0, 0.0), &JumpController::new(), &config());
        assert_eq!(monitor.slow_time(), 0.0);
        assert!(!monitor.check_pending());
    }

    #[test]
    fn resolve_without_result_is_idle() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();
        assert_eq!(
            monitor.resolve(Vec2::ZERO, &mut controller, &config()),
            RecoveryOutcome::Idle
        );
    }

    #[test]
    fn corrects_airborne_actor_on_ground() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();

        monitor.report_overlap(true);
        assert!(!monitor.check_pending());
        assert_eq!(
            monitor.resolve(Vec2::ZERO, &mut controller, &config()),
            RecoveryOutcome::Corrected
        );
        assert!(controller.is_grounded());
        assert_eq!(controller.ground_source(), GroundSource::Recovery);
        assert_eq!(controller.air_jumps_used(), 0);
        assert_eq!(monitor.corrections(), 1);

        // Result is consumed
        assert_eq!(
            monitor.resolve(Vec2::ZERO, &mut controller, &config()),
            RecoveryOutcome::Idle
        );
    }

    #[test]
    fn correction_is_idempotent() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();

        monitor.report_overlap(true);
        monitor.resolve(Vec2::ZERO, &mut controller, &config());
        monitor.report_overlap(true);
        assert_eq!(
            monitor.resolve(Vec2::ZERO, &mut controller, &config()),
            RecoveryOutcome::InSync
        );
        assert_eq!(monitor.corrections(), 1);
    }

    #[test]
    fn never_corrects_while_rising() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();

        monitor.report_overlap(true);
        assert_eq!(
            monitor.resolve(Vec2::new(0.0, 2.5), &mut controller, &config()),
            RecoveryOutcome::SuppressedRising
        );
        assert!(!controller.is_grounded());
    }

    #[test]
    fn no_ground_found_is_in_sync() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();

        monitor.report_overlap(false);
        assert_eq!(
            monitor.resolve(Vec2::ZERO, &mut controller, &config()),
            RecoveryOutcome::InSync
        );
        assert!(!controller.is_grounded());
    }

    #[test]
    fn recovered_ground_is_released_when_gone() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();

        monitor.report_overlap(true);
        monitor.resolve(Vec2::ZERO, &mut controller, &config());
        assert_eq!(controller.ground_source(), GroundSource::Recovery);

        monitor.report_overlap(false);
        assert_eq!(
            monitor.resolve(Vec2::new(3.0, -1.0), &mut controller, &config()),
            RecoveryOutcome::Released
        );
        assert!(!controller.is_grounded());
        assert_eq!(controller.ground_source(), GroundSource::None);
        assert_eq!(monitor.corrections(), 1);
    }

    #[test]
    fn contact_ground_is_never_released() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();
        controller.on_ground_enter();

        monitor.report_overlap(false);
        assert_eq!(
            monitor.resolve(Vec2::ZERO, &mut controller, &config()),
            RecoveryOutcome::InSync
        );
        assert!(controller.is_grounded());
    }

    #[test]
    fn recovered_ground_is_checked_while_moving() {
        let mut monitor = StuckRecoveryMonitor::new();
        let mut controller = JumpController::new();
        let config = config();
        let walking = Vec2::new(4.0, 0.0);

        monitor.report_overlap(true);
        monitor.resolve(Vec2::ZERO, &mut controller, &config);

        // One check per interval, no stuck time needed
        let checks = (0..8)
            .filter(|_| {
                let due = monitor.tick(DT, walking, &controller, &config);
                if due {
                    monitor.report_overlap(true);
                }
                due
            })
            .count();
        assert_eq!(checks, 2);
        assert_eq!(monitor.slow_time(), 0.0);
    }
}
