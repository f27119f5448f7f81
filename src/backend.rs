//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the jump controller. The backend only covers body
//! operations; backend-specific systems feed contacts and spatial query
//! results into the controller's components.

use std::marker::PhantomData;

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the jump
/// controller. For an example implementation, see the `rapier` module's
/// `Rapier2dBackend`.
pub trait JumpPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    ///
    /// The plugin is responsible for translating engine contacts into
    /// [`ContactEvent`](crate::contact::ContactEvent)s and for filling
    /// [`SurfaceProbe`](crate::detection::SurfaceProbe) and stuck recovery
    /// overlap results.
    fn plugin() -> impl Plugin;

    /// Whether the entity has a body this backend can drive.
    fn has_body(world: &World, entity: Entity) -> bool;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec2;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2);

    /// Apply a mass-normalized impulse.
    ///
    /// The impulse must be visible in [`get_velocity`](Self::get_velocity)
    /// immediately, so the controller can cap the resulting upward speed in
    /// the same tick.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2) {
        let velocity = Self::get_velocity(world, entity);
        Self::set_velocity(world, entity, velocity + impulse);
    }

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec2;

    /// Switch the body to continuous collision detection.
    fn enable_continuous_collision(_world: &mut World, _entity: Entity) {
        // Default implementation leaves the body as is
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// A body the controller can push around.
///
/// [`BackendBody`] implements it on top of the ECS world; tests and
/// custom hosts can implement it on anything holding a velocity.
pub trait JumpBody {
    /// Current linear velocity.
    fn velocity(&self) -> Vec2;

    /// Overwrite the linear velocity.
    fn set_velocity(&mut self, velocity: Vec2);

    /// Apply a mass-normalized impulse.
    fn apply_impulse(&mut self, impulse: Vec2) {
        let velocity = self.velocity();
        self.set_velocity(velocity + impulse);
    }
}

/// [`JumpBody`] view of one entity through backend `B`.
pub struct BackendBody<'w, B: JumpPhysicsBackend> {
    world: &'w mut World,
    entity: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: JumpPhysicsBackend> BackendBody<'w, B> {
    /// Borrow `entity`'s body from `world`.
    pub fn new(world: &'w mut World, entity: Entity) -> Self {
        Self {
            world,
            entity,
            _marker: PhantomData,
        }
    }
}

impl<B: JumpPhysicsBackend> JumpBody for BackendBody<'_, B> {
    fn velocity(&self) -> Vec2 {
        B::get_velocity(self.world, self.entity)
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        B::set_velocity(self.world, self.entity, velocity);
    }

    fn apply_impulse(&mut self, impulse: Vec2) {
        B::apply_impulse(self.world, self.entity, impulse);
    }
}
