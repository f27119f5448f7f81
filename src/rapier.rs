//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::backend::JumpPhysicsBackend;
use crate::config::{GroundClassification, JumpConfig, StuckRecoveryConfig};
use crate::contact::{
    classify_contact, ContactEvent, ContactInfo, GroundContactTracker, GroundSensor, SurfaceTag,
};
use crate::detection::{SurfaceHit, SurfaceProbe, PROBE_DIRECTIONS};
use crate::stuck::StuckRecoveryMonitor;
use crate::JumpControllerSet;

/// Rapier2D physics backend for the jump controller.
///
/// Impulses are written straight into [`Velocity`] so the controller sees
/// them, and can cap the upward speed, in the same tick. Contacts and spatial
/// queries are handled by dedicated Rapier systems that receive
/// `RapierContext` as a system parameter.
pub struct Rapier2dBackend;

impl JumpPhysicsBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn has_body(world: &World, entity: Entity) -> bool {
        world.get::<RigidBody>(entity).is_some() && world.get::<Velocity>(entity).is_some()
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation.xy())
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation().xy())
            })
            .unwrap_or(Vec2::ZERO)
    }

    fn enable_continuous_collision(world: &mut World, entity: Entity) {
        if let Ok(mut entity) = world.get_entity_mut(entity) {
            entity.insert(Ccd::enabled());
        }
    }
}

/// Plugin that sets up Rapier2D-specific systems for the jump controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        // Normally registered by RapierPhysicsPlugin; registering twice is a no-op
        app.add_event::<CollisionEvent>();

        // Phase 2: Contacts - translate Rapier collision events before the trackers read them
        app.add_systems(
            FixedUpdate,
            rapier_collect_contacts
                .in_set(JumpControllerSet::Contacts)
                .before(crate::systems::track_ground_contacts),
        );

        // Phase 3: Sensors - Rapier-specific spatial queries
        app.add_systems(
            FixedUpdate,
            (rapier_probe_surfaces, rapier_recovery_overlap).in_set(JumpControllerSet::Sensors),
        );
    }
}

/// Query filter shared by the spatial queries: solid colliders of other bodies.
fn solid_filter<'a>(exclude_entity: Entity) -> QueryFilter<'a> {
    QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
}

/// Describe a collider for the ground classifier.
fn contact_info(
    collider: Entity,
    q_colliders: &Query<(
        Option<&SurfaceTag>,
        Option<&Name>,
        Option<&CollisionGroups>,
        Has<Sensor>,
        Option<&ChildOf>,
    )>,
) -> ContactInfo {
    let Ok((tag, name, groups, is_sensor, parent)) = q_colliders.get(collider) else {
        return ContactInfo::solid(collider);
    };

    ContactInfo {
        collider,
        owner: parent.map(|p| p.parent()),
        tag: tag.copied(),
        name: name.map(|n| n.as_str().to_owned()),
        layers: groups.map(|g| g.memberships.bits()),
        is_sensor,
    }
}

/// Translate Rapier collision events involving jump actors into [`ContactEvent`]s.
///
/// Actor colliders need [`ActiveEvents::COLLISION_EVENTS`]; the
/// [`Rapier2dJumpBundle`] enables it.
fn rapier_collect_contacts(
    mut collisions: EventReader<CollisionEvent>,
    mut contacts: EventWriter<ContactEvent>,
    q_actors: Query<(), Or<(With<GroundContactTracker>, With<GroundSensor>)>>,
    q_colliders: Query<(
        Option<&SurfaceTag>,
        Option<&Name>,
        Option<&CollisionGroups>,
        Has<Sensor>,
        Option<&ChildOf>,
    )>,
) {
    for collision in collisions.read() {
        let (a, b, began) = match collision {
            CollisionEvent::Started(a, b, _) => (*a, *b, true),
            CollisionEvent::Stopped(a, b, _) => (*a, *b, false),
        };

        for (actor, other) in [(a, b), (b, a)] {
            if !q_actors.contains(actor) {
                continue;
            }

            if began {
                contacts.write(ContactEvent::Began {
                    actor,
                    contact: contact_info(other, &q_colliders),
                });
            } else {
                contacts.write(ContactEvent::Ended {
                    actor,
                    collider: other,
                });
            }
        }
    }
}

/// Cast the 6 probe rays for actors with surface rotation enabled.
fn rapier_probe_surfaces(
    rapier_context: ReadRapierContext,
    mut q_actors: Query<(Entity, &GlobalTransform, &JumpConfig, &mut SurfaceProbe)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, mut probe) in &mut q_actors {
        if !config.surface_rotation_enabled {
            if probe.steep_surface.is_some() {
                probe.clear();
            }
            continue;
        }

        let origin = transform.translation().xy();
        let hits = PROBE_DIRECTIONS.iter().filter_map(|&direction| {
            context
                .cast_ray_and_get_normal(
                    origin,
                    direction,
                    config.surface_detection_distance,
                    true,
                    solid_filter(entity),
                )
                .map(|(hit_entity, hit)| {
                    SurfaceHit::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
                })
        });

        probe.update(hits, config.surface_angle_threshold);
    }
}

/// Run the ground overlap query for stuck monitors that asked for one.
///
/// Hits go through the actor's ground classification, so only colliders the
/// contact tracker would accept as ground can be recovered onto.
fn rapier_recovery_overlap(
    rapier_context: ReadRapierContext,
    default_policy: Local<GroundClassification>,
    mut q_monitors: Query<(
        Entity,
        &GlobalTransform,
        &mut StuckRecoveryMonitor,
        Option<&StuckRecoveryConfig>,
        Option<&GroundClassification>,
    )>,
    q_colliders: Query<(
        Option<&SurfaceTag>,
        Option<&Name>,
        Option<&CollisionGroups>,
        Has<Sensor>,
        Option<&ChildOf>,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, mut monitor, config, policy) in &mut q_monitors {
        if !monitor.check_pending() {
            continue;
        }

        let config = config.copied().unwrap_or_default();
        let policy = policy.unwrap_or(&*default_policy);
        let center = transform.translation().xy() + config.ground_check_offset;
        let shape = Collider::ball(config.query_radius());

        let mut ground_found = false;
        context.intersections_with_shape(center, 0.0, &shape, solid_filter(entity), |hit| {
            let contact = contact_info(hit, &q_colliders);
            ground_found = classify_contact(entity, &contact, policy).is_some();
            // Stop at the first ground hit
            !ground_found
        });

        monitor.report_overlap(ground_found);
    }
}

/// Bundle for creating a jump actor with Rapier2D physics.
///
/// This bundle provides the Rapier2D components the jump controller drives:
/// a dynamic rigid body, velocity tracking, axis locking, damping, and
/// collision events so ground contacts reach the tracker.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use msg_jump_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         JumpActorBundle::new(JumpConfig::player()),
///         Rapier2dJumpBundle::rotation_locked(),
///         Collider::capsule_y(0.5, 0.25),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity
/// - `locked_axes`: Empty (rotation enabled)
/// - `damping`: Linear 0.0, Angular 1.0
/// - `active_events`: [`ActiveEvents::COLLISION_EVENTS`]
#[derive(Bundle, Default)]
pub struct Rapier2dJumpBundle {
    /// The rigid body type. Should typically be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Jumps write to this directly.
    pub velocity: Velocity,
    /// Which axes are locked. Use [`LockedAxes::ROTATION_LOCKED`] for simple platformers.
    pub locked_axes: LockedAxes,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Collision events feed the ground contact tracker.
    pub active_events: ActiveEvents,
}

impl Rapier2dJumpBundle {
    /// Create a jump actor bundle with rotation enabled.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::empty(),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 1.0,
            },
            active_events: ActiveEvents::COLLISION_EVENTS,
        }
    }

    /// Create a jump actor bundle with rotation locked.
    ///
    /// This is the most common configuration for 2D platformers.
    pub fn rotation_locked() -> Self {
        Self {
            locked_axes: LockedAxes::ROTATION_LOCKED,
            ..Self::new()
        }
    }

    /// Set the rigid body type.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    /// Set which axes should be locked.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
