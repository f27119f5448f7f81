//! Integration tests for the Rapier2D backend.
//!
//! The contact tests feed hand-made Rapier collision events through the
//! plugin schedule. The sensor tests run real Rapier scenes so the spatial
//! queries hit actual colliders.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::Virtual;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;
use msg_jump_controller::prelude::*;

// ==================== Contact Translation Tests ====================

mod contacts {
    use super::*;

    /// Plugin schedule without a physics world; events are injected by hand.
    fn create_event_app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.add_plugins(JumpControllerPlugin::<Rapier2dBackend>::default());
        app.finish();
        app.cleanup();
        app
    }

    fn tick(app: &mut App) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f64(1.0 / 60.0));
        app.world_mut().run_schedule(FixedUpdate);
    }

    fn spawn_actor(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((
                Transform::default(),
                JumpActorBundle::new(JumpConfig::precise()),
                Rapier2dJumpBundle::rotation_locked(),
                Collider::ball(0.25),
            ))
            .id()
    }

    fn spawn_platform(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((Name::new("Platform"), RigidBody::Fixed, Collider::cuboid(5.0, 0.5)))
            .id()
    }

    fn started(app: &mut App, a: Entity, b: Entity) {
        app.world_mut()
            .send_event(CollisionEvent::Started(a, b, CollisionEventFlags::empty()));
    }

    fn stopped(app: &mut App, a: Entity, b: Entity) {
        app.world_mut()
            .send_event(CollisionEvent::Stopped(a, b, CollisionEventFlags::empty()));
    }

    fn is_grounded(app: &App, actor: Entity) -> bool {
        app.world().get::<JumpController>(actor).unwrap().is_grounded()
    }

    #[test]
    fn collision_events_drive_ground_state() {
        let mut app = create_event_app();
        let actor = spawn_actor(&mut app);
        let platform = spawn_platform(&mut app);

        // Rapier reports pairs in either order
        started(&mut app, platform, actor);
        tick(&mut app);
        assert!(is_grounded(&app, actor));
        assert!(app.world().get::<Grounded>(actor).is_some());

        stopped(&mut app, actor, platform);
        tick(&mut app);
        assert!(!is_grounded(&app, actor));
    }

    #[test]
    fn initialization_enables_ccd() {
        let mut app = create_event_app();
        let actor = spawn_actor(&mut app);
        tick(&mut app);

        let controller = app.world().get::<JumpController>(actor).unwrap();
        assert!(!controller.is_disabled());
        assert_eq!(app.world().get::<Ccd>(actor).map(|ccd| ccd.enabled), Some(true));
    }

    #[test]
    fn actor_without_rigid_body_is_disabled() {
        let mut app = create_event_app();
        let actor = app
            .world_mut()
            .spawn(JumpActorBundle::new(JumpConfig::precise()))
            .id();
        tick(&mut app);

        assert!(app.world().get::<JumpController>(actor).unwrap().is_disabled());
    }

    #[test]
    fn jump_writes_rapier_velocity() {
        let mut app = create_event_app();
        let actor = spawn_actor(&mut app);
        let platform = spawn_platform(&mut app);
        app.world_mut().get_mut::<Velocity>(actor).unwrap().linvel = Vec2::new(1.0, -4.0);

        started(&mut app, actor, platform);
        tick(&mut app);

        app.world_mut()
            .get_mut::<JumpIntent>(actor)
            .unwrap()
            .request(JumpDirection::Forward);
        tick(&mut app);

        let linvel = app.world().get::<Velocity>(actor).unwrap().linvel;
        assert!((linvel.x - 1.0).abs() < 0.0001);
        assert!((linvel.y - 12.0).abs() < 0.0001);
    }

    #[test]
    fn sensor_child_reports_for_actor() {
        let mut app = create_event_app();
        let actor = spawn_actor(&mut app);
        let platform = spawn_platform(&mut app);
        let sensor = app
            .world_mut()
            .spawn((GroundSensor { actor }, Sensor, Collider::ball(0.1), ChildOf(actor)))
            .id();

        started(&mut app, sensor, platform);
        tick(&mut app);

        assert!(is_grounded(&app, actor));
    }

    #[test]
    fn own_colliders_are_not_ground() {
        let mut app = create_event_app();
        let actor = spawn_actor(&mut app);
        let sensor = app
            .world_mut()
            .spawn((GroundSensor { actor }, Sensor, Collider::ball(0.1), ChildOf(actor)))
            .id();

        started(&mut app, sensor, actor);
        tick(&mut app);

        assert!(!is_grounded(&app, actor));
        assert_eq!(
            app.world().get::<GroundContactTracker>(actor).unwrap().contact_count(),
            0
        );
    }

    #[test]
    fn tagged_and_grouped_colliders() {
        let mut app = create_event_app();
        let actor = spawn_actor(&mut app);
        app.world_mut()
            .entity_mut(actor)
            .insert(GroundClassification::strict().with_ground_layers(0b100));

        let crate_box = app
            .world_mut()
            .spawn((RigidBody::Fixed, Collider::cuboid(0.5, 0.5)))
            .id();
        started(&mut app, actor, crate_box);
        tick(&mut app);
        assert!(!is_grounded(&app, actor));

        let layered = app
            .world_mut()
            .spawn((
                RigidBody::Fixed,
                Collider::cuboid(0.5, 0.5),
                CollisionGroups::new(Group::GROUP_3, Group::ALL),
            ))
            .id();
        started(&mut app, actor, layered);
        tick(&mut app);
        assert!(is_grounded(&app, actor));

        let spikes = app
            .world_mut()
            .spawn((Name::new("Ground Spikes"), SurfaceTag::Ignored, Collider::cuboid(0.5, 0.5)))
            .id();
        started(&mut app, actor, spikes);
        tick(&mut app);
        assert_eq!(
            app.world().get::<GroundContactTracker>(actor).unwrap().contact_count(),
            1
        );
    }
}

// ==================== Sensor Tests ====================

mod sensors {
    use super::*;

    /// Create a minimal test app with physics and the jump controller.
    fn create_test_app() -> App {
        let mut app = App::new();

        app.add_plugins(MinimalPlugins);
        app.add_plugins(TransformPlugin);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.add_plugins(JumpControllerPlugin::<Rapier2dBackend>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));

        app.finish();
        app.cleanup();
        app
    }

    /// Run one physics step.
    fn tick(app: &mut App) {
        let timestep = Duration::from_secs_f64(1.0 / 60.0);
        app.world_mut()
            .resource_mut::<Time<Virtual>>()
            .advance_by(timestep);
        app.update();
        app.world_mut().run_schedule(FixedUpdate);
        app.update();
    }

    fn run_frames(app: &mut App, frames: usize) {
        for _ in 0..frames {
            tick(app);
        }
    }

    /// Spawn a static collider.
    fn spawn_block(app: &mut App, position: Vec2, half_size: Vec2) -> Entity {
        let transform = Transform::from_translation(position.extend(0.0));
        app.world_mut()
            .spawn((
                transform,
                GlobalTransform::from(transform),
                RigidBody::Fixed,
                Collider::cuboid(half_size.x, half_size.y),
            ))
            .id()
    }

    /// Spawn a weightless actor that stays where it is put.
    fn spawn_actor(app: &mut App, position: Vec2, config: JumpConfig) -> Entity {
        let transform = Transform::from_translation(position.extend(0.0));
        app.world_mut()
            .spawn((
                transform,
                GlobalTransform::from(transform),
                JumpActorBundle::new(config),
                Rapier2dJumpBundle::rotation_locked(),
                Collider::ball(0.25),
                GravityScale(0.0),
            ))
            .id()
    }

    #[test]
    fn probe_finds_nearby_wall() {
        let mut app = create_test_app();
        spawn_block(&mut app, Vec2::new(1.0, 0.0), Vec2::new(0.2, 2.0));
        let actor = spawn_actor(&mut app, Vec2::ZERO, JumpConfig::wall_runner());

        run_frames(&mut app, 3);

        let probe = app.world().get::<SurfaceProbe>(actor).unwrap();
        let wall = probe.steep_surface.expect("wall should be probed");
        assert!(wall.normal.x < -0.9);
        assert!((wall.distance - 0.8).abs() < 0.05);
    }

    #[test]
    fn probe_is_skipped_without_surface_rotation() {
        let mut app = create_test_app();
        spawn_block(&mut app, Vec2::new(1.0, 0.0), Vec2::new(0.2, 2.0));
        let actor = spawn_actor(&mut app, Vec2::ZERO, JumpConfig::precise());

        run_frames(&mut app, 3);

        assert!(app.world().get::<SurfaceProbe>(actor).unwrap().steep_surface.is_none());
    }

    #[test]
    fn recovery_overlap_finds_ground_below() {
        let mut app = create_test_app();
        // Ground top at y = 0.2; the actor hovers just above it without touching
        spawn_block(&mut app, Vec2::new(0.0, -0.3), Vec2::new(5.0, 0.5));
        let actor = spawn_actor(&mut app, Vec2::new(0.0, 0.6), JumpConfig::precise());
        app.world_mut().entity_mut(actor).insert(StuckRecoveryBundle::new(
            StuckRecoveryConfig::default()
                .with_stuck_duration(0.0)
                .with_check_interval(1.0e-6),
        ));

        run_frames(&mut app, 10);

        let controller = app.world().get::<JumpController>(actor).unwrap();
        assert!(controller.is_grounded());
        assert_eq!(controller.ground_source(), GroundSource::Recovery);
    }

    fn spawn_stuck_actor(app: &mut App, position: Vec2) -> Entity {
        let actor = spawn_actor(app, position, JumpConfig::precise());
        app.world_mut().entity_mut(actor).insert((
            GroundClassification::strict(),
            StuckRecoveryBundle::new(
                StuckRecoveryConfig::default()
                    .with_stuck_duration(0.0)
                    .with_check_interval(1.0e-6),
            ),
        ));
        actor
    }

    #[test]
    fn recovery_overlap_skips_ignored_colliders() {
        let mut app = create_test_app();
        let spikes = spawn_block(&mut app, Vec2::new(0.0, -0.3), Vec2::new(5.0, 0.5));
        app.world_mut()
            .entity_mut(spikes)
            .insert((Name::new("Ground Spikes"), SurfaceTag::Ignored));
        let actor = spawn_stuck_actor(&mut app, Vec2::new(0.0, 0.6));

        run_frames(&mut app, 10);

        let controller = app.world().get::<JumpController>(actor).unwrap();
        assert!(!controller.is_grounded());
        assert_eq!(
            app.world().get::<StuckRecoveryMonitor>(actor).unwrap().corrections(),
            0
        );
    }

    #[test]
    fn recovery_overlap_uses_actor_policy() {
        let mut app = create_test_app();
        // Untagged solids are not ground under the strict policy
        spawn_block(&mut app, Vec2::new(-0.3, -0.3), Vec2::new(0.3, 0.5));
        let floor = spawn_block(&mut app, Vec2::new(0.3, -0.3), Vec2::new(0.3, 0.5));
        let actor = spawn_stuck_actor(&mut app, Vec2::new(0.0, 0.6));

        run_frames(&mut app, 5);
        assert!(!app.world().get::<JumpController>(actor).unwrap().is_grounded());

        app.world_mut().entity_mut(floor).insert(SurfaceTag::Ground);
        run_frames(&mut app, 5);

        let controller = app.world().get::<JumpController>(actor).unwrap();
        assert!(controller.is_grounded());
        assert_eq!(controller.ground_source(), GroundSource::Recovery);
    }

    #[test]
    fn recovery_overlap_ignores_empty_space() {
        let mut app = create_test_app();
        let actor = spawn_actor(&mut app, Vec2::new(0.0, 10.0), JumpConfig::precise());
        app.world_mut().entity_mut(actor).insert(StuckRecoveryBundle::new(
            StuckRecoveryConfig::default()
                .with_stuck_duration(0.0)
                .with_check_interval(1.0e-6),
        ));

        run_frames(&mut app, 10);

        let controller = app.world().get::<JumpController>(actor).unwrap();
        assert!(!controller.is_grounded());
        assert_eq!(
            app.world().get::<StuckRecoveryMonitor>(actor).unwrap().corrections(),
            0
        );
    }
}
