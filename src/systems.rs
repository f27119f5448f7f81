//! Core controller systems.
//!
//! These systems connect the controller components to the ECS. They are
//! generic over the physics backend where they touch bodies, and run in the
//! [`JumpControllerSet`](crate::JumpControllerSet) order inside `FixedUpdate`.

use bevy::prelude::*;

use crate::backend::{BackendBody, JumpPhysicsBackend};
use crate::config::{GroundClassification, JumpConfig, StuckRecoveryConfig};
use crate::contact::{
    ContactEvent, GroundContactTracker, GroundSensor, GroundTransition, GroundTransitionEvent,
};
use crate::controller::{JumpController, JumpOutcome, JumpPerformed};
use crate::detection::SurfaceProbe;
use crate::error::JumpSetupError;
use crate::intent::JumpIntent;
use crate::state::{Airborne, Grounded};
use crate::stuck::{RecoveryOutcome, StuckRecoveryMonitor};

/// Elapsed clock time in seconds, as seen by the running schedule.
fn clock_now(world: &World) -> f64 {
    world
        .get_resource::<Time>()
        .map(|t| t.elapsed_secs_f64())
        .unwrap_or(0.0)
}

/// Timestep of the running schedule, with fallback for testing scenarios.
fn clock_delta(world: &World) -> f32 {
    world
        .get_resource::<Time>()
        .map(|t| t.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0)
}

/// Check that an actor can be driven by backend `B` with the given tuning.
pub fn validate_actor<B: JumpPhysicsBackend>(
    world: &World,
    entity: Entity,
    config: &JumpConfig,
    recovery: Option<&StuckRecoveryConfig>,
) -> Result<(), JumpSetupError> {
    config.validate()?;
    if let Some(recovery) = recovery {
        recovery.validate()?;
    }
    if !B::has_body(world, entity) {
        return Err(JumpSetupError::MissingBody { entity });
    }
    Ok(())
}

/// Validate newly spawned actors once.
///
/// Actors failing validation are logged and disabled; every later jump
/// attempt is rejected instead of touching the body.
pub fn initialize_jump_actors<B: JumpPhysicsBackend>(world: &mut World) {
    let pending: Vec<(Entity, JumpConfig, Option<StuckRecoveryConfig>)> = world
        .query::<(Entity, &JumpController, &JumpConfig, Option<&StuckRecoveryConfig>)>()
        .iter(world)
        .filter(|(_, controller, _, _)| !controller.is_initialized())
        .map(|(e, _, config, recovery)| (e, *config, recovery.copied()))
        .collect();

    for (entity, config, recovery) in pending {
        let result = validate_actor::<B>(world, entity, &config, recovery.as_ref());

        if let Some(mut controller) = world.get_mut::<JumpController>(entity) {
            controller.mark_initialized();
            if let Err(error) = &result {
                warn!("{error}");
                controller.disable();
            }
        }

        if result.is_ok() && config.continuous_collision {
            B::enable_continuous_collision(world, entity);
        }
    }
}

/// Advance stuck monitor timers with the body's current velocity.
pub fn tick_stuck_monitors<B: JumpPhysicsBackend>(world: &mut World) {
    let dt = clock_delta(world);

    let monitored: Vec<(Entity, StuckRecoveryConfig)> = world
        .query_filtered::<(Entity, &JumpController, Option<&StuckRecoveryConfig>), With<StuckRecoveryMonitor>>()
        .iter(world)
        .filter(|(_, controller, _)| !controller.is_disabled())
        .map(|(e, _, config)| (e, config.copied().unwrap_or_default()))
        .collect();

    let mut query = world.query::<(&mut StuckRecoveryMonitor, &JumpController)>();

    for (entity, config) in monitored {
        let velocity = B::get_velocity(world, entity);
        if let Ok((mut monitor, controller)) = query.get_mut(world, entity) {
            monitor.tick(dt, velocity, controller, &config);
        }
    }
}

/// Feed backend contacts into the trackers and emit ground transitions.
///
/// Contacts reported for a [`GroundSensor`] are redirected to its actor but
/// stay keyed by the sensor, so the body and its sensors count separately.
/// Contacts for entities without a tracker are dropped.
pub fn track_ground_contacts(
    mut contacts: EventReader<ContactEvent>,
    mut transitions: EventWriter<GroundTransitionEvent>,
    default_policy: Local<GroundClassification>,
    q_sensors: Query<&GroundSensor>,
    mut q_trackers: Query<(&mut GroundContactTracker, Option<&GroundClassification>)>,
) {
    for event in contacts.read() {
        let reported = match event {
            ContactEvent::Began { actor, .. } | ContactEvent::Ended { actor, .. } => *actor,
        };
        let actor = q_sensors
            .get(reported)
            .map(|sensor| sensor.actor)
            .unwrap_or(reported);

        let Ok((mut tracker, policy)) = q_trackers.get_mut(actor) else {
            continue;
        };

        let transition = match event {
            ContactEvent::Began { contact, .. } => tracker.on_contact_begin(
                actor,
                reported,
                contact,
                policy.unwrap_or(&*default_policy),
            ),
            ContactEvent::Ended { collider, .. } => tracker.on_contact_end(reported, *collider),
        };

        if let Some(transition) = transition {
            transitions.write(GroundTransitionEvent { actor, transition });
        }
    }
}

/// Apply ground transitions to the controllers.
pub fn apply_ground_transitions(
    mut transitions: EventReader<GroundTransitionEvent>,
    mut q_controllers: Query<&mut JumpController>,
) {
    for event in transitions.read() {
        let Ok(mut controller) = q_controllers.get_mut(event.actor) else {
            continue;
        };

        match event.transition {
            GroundTransition::Entered => controller.on_ground_enter(),
            GroundTransition::Exited => controller.on_ground_exit(),
        }
        debug!("{} ground transition: {:?}", event.actor, event.transition);
    }
}

/// Apply pending stuck monitor overlap results.
pub fn resolve_stuck_recovery<B: JumpPhysicsBackend>(world: &mut World) {
    let monitored: Vec<Entity> = world
        .query_filtered::<Entity, (With<StuckRecoveryMonitor>, With<JumpController>)>()
        .iter(world)
        .collect();

    let mut query = world.query::<(&mut StuckRecoveryMonitor, &mut JumpController)>();

    for entity in monitored {
        let velocity = B::get_velocity(world, entity);
        let config = world
            .get::<StuckRecoveryConfig>(entity)
            .copied()
            .unwrap_or_default();

        let Ok((mut monitor, mut controller)) = query.get_mut(world, entity) else {
            continue;
        };

        match monitor.resolve(velocity, &mut controller, &config) {
            RecoveryOutcome::Corrected => warn!(
                "{entity} was airborne while standing on ground, forcing ground contact (correction #{})",
                monitor.corrections()
            ),
            RecoveryOutcome::Released => debug!("{entity} left recovered ground"),
            _ => {}
        }
    }
}

/// Consume jump intents and perform the jumps.
///
/// Every pending request is consumed, whether or not the jump succeeds.
pub fn apply_jumps<B: JumpPhysicsBackend>(world: &mut World) {
    let now = clock_now(world);

    let actors: Vec<(Entity, JumpConfig, JumpController, JumpIntent, Option<SurfaceProbe>)> = world
        .query::<(
            Entity,
            &JumpConfig,
            &JumpController,
            &JumpIntent,
            Option<&SurfaceProbe>,
        )>()
        .iter(world)
        .filter(|(_, _, _, intent, _)| intent.has_request())
        .map(|(e, config, controller, intent, probe)| {
            (e, *config, controller.clone(), intent.clone(), probe.copied())
        })
        .collect();

    for (entity, config, mut controller, mut intent, probe) in actors {
        let surface = probe.and_then(|p| p.steep_surface);

        let outcomes = {
            let mut body = BackendBody::<B>::new(world, entity);
            controller.process_intent(&mut intent, now, &config, surface.as_ref(), &mut body)
        };

        for outcome in outcomes {
            match outcome {
                JumpOutcome::Performed(report) => {
                    debug!(
                        "{entity} jumped {:?} (air jump: {}), velocity {}",
                        report.direction, report.air_jump, report.velocity
                    );
                    world.send_event(JumpPerformed::from_report(entity, &report));
                }
                JumpOutcome::Rejected(rejection) => {
                    trace!("{entity} jump rejected: {rejection:?}");
                }
            }
        }

        if let Some(mut stored) = world.get_mut::<JumpController>(entity) {
            *stored = controller;
        }
        if let Some(mut stored) = world.get_mut::<JumpIntent>(entity) {
            *stored = intent;
        }
    }
}

/// Sync state marker components based on the controllers' grounded flag.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &JumpController, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, controller, has_grounded, has_airborne) in &q_controllers {
        if controller.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !controller.is_grounded() && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}
