//! State marker components.
//!
//! These components mirror the grounded flag of a [`JumpController`](crate::controller::JumpController)
//! so other systems can filter on it. They are added/removed by
//! [`sync_state_markers`](crate::systems::sync_state_markers) at the end of
//! each fixed tick.

use bevy::prelude::*;

/// Marker component indicating the actor is grounded.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_jump_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn count_grounded(q: Query<(), With<Grounded>>) -> usize {
///     q.iter().count()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the actor is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
