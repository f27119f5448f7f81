//! # `msg_jump_controller`
//!
//! A 2D platformer jump and ground-state controller with physics backend abstraction.
//!
//! This crate provides:
//! - Ground tracking from contact events, with a deterministic ground
//!   classification policy
//! - Ground jumps, a capped number of air jumps, a jump cooldown and a
//!   separate backward jump
//! - Directional jumps that follow the run direction, and optional jumps off
//!   steep surfaces found by a 6-direction probe
//! - An optional stuck recovery monitor that fixes lost ground contacts
//! - A physics backend abstraction (Rapier2D included)
//!
//! ## Architecture
//!
//! Every fixed tick runs the [`JumpControllerSet`]s in order:
//! 1. `Preparation`: validate new actors, advance stuck monitor timers
//! 2. `Contacts`: backend contacts become [`ContactEvent`](contact::ContactEvent)s,
//!    the trackers turn them into ground transitions for the controllers
//! 3. `Sensors`: backend spatial queries (surface probe, recovery overlap)
//! 4. `Recovery`: apply stuck monitor results
//! 5. `Jump`: consume [`JumpIntent`](intent::JumpIntent)s and jump
//! 6. `Sync`: update the [`Grounded`](state::Grounded)/[`Airborne`](state::Airborne) markers
//!
//! Ground transitions are therefore always applied before the jump decision
//! of the same tick.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_jump_controller::prelude::*;
//!
//! // Components for a player actor
//! let actor = JumpActorBundle::new(JumpConfig::player());
//! let recovery = StuckRecoveryBundle::default();
//!
//! // These can be spawned together with a physics body
//! # let _ = (actor, recovery);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod config;
pub mod contact;
pub mod controller;
pub mod detection;
pub mod error;
pub mod intent;
pub mod state;
pub mod stuck;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{JumpBody, JumpPhysicsBackend};
    pub use crate::config::{GroundClassification, JumpConfig, StuckRecoveryConfig};
    pub use crate::contact::{
        ContactEvent, ContactInfo, GroundContactTracker, GroundSensor, GroundTransition,
        GroundTransitionEvent, SurfaceTag,
    };
    pub use crate::controller::{
        GroundSource, JumpController, JumpDirection, JumpOutcome, JumpPerformed, JumpRejection,
    };
    pub use crate::detection::{SurfaceHit, SurfaceProbe};
    pub use crate::error::JumpSetupError;
    pub use crate::intent::JumpIntent;
    pub use crate::state::{Airborne, Grounded};
    pub use crate::stuck::StuckRecoveryMonitor;
    pub use crate::{JumpActorBundle, JumpControllerPlugin, JumpControllerSet, StuckRecoveryBundle};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, Rapier2dJumpBundle};
}

/// System sets of the jump controller, chained in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum JumpControllerSet {
    /// Actor validation and stuck monitor timers.
    Preparation,
    /// Contact collection and ground transitions.
    Contacts,
    /// Backend spatial queries.
    Sensors,
    /// Stuck recovery corrections.
    Recovery,
    /// Jump execution.
    Jump,
    /// State marker sync.
    Sync,
}

/// Main plugin for the jump controller.
///
/// This plugin is generic over a physics backend `B` which provides the
/// body operations and fills contacts and spatial query results.
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use msg_jump_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(JumpControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct JumpControllerPlugin<B: backend::JumpPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::JumpPhysicsBackend> Default for JumpControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::JumpPhysicsBackend> Plugin for JumpControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::JumpConfig>();
        app.register_type::<config::StuckRecoveryConfig>();
        app.register_type::<config::GroundClassification>();
        app.register_type::<contact::SurfaceTag>();
        app.register_type::<contact::GroundSensor>();
        app.register_type::<contact::GroundContactTracker>();
        app.register_type::<controller::JumpController>();
        app.register_type::<detection::SurfaceProbe>();
        app.register_type::<intent::JumpIntent>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<stuck::StuckRecoveryMonitor>();

        app.add_event::<contact::ContactEvent>();
        app.add_event::<contact::GroundTransitionEvent>();
        app.add_event::<controller::JumpPerformed>();

        app.configure_sets(
            FixedUpdate,
            (
                JumpControllerSet::Preparation,
                JumpControllerSet::Contacts,
                JumpControllerSet::Sensors,
                JumpControllerSet::Recovery,
                JumpControllerSet::Jump,
                JumpControllerSet::Sync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::initialize_jump_actors::<B>,
                systems::tick_stuck_monitors::<B>,
            )
                .chain()
                .in_set(JumpControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::track_ground_contacts,
                systems::apply_ground_transitions,
            )
                .chain()
                .in_set(JumpControllerSet::Contacts),
        );
        app.add_systems(
            FixedUpdate,
            systems::resolve_stuck_recovery::<B>.in_set(JumpControllerSet::Recovery),
        );
        app.add_systems(
            FixedUpdate,
            systems::apply_jumps::<B>.in_set(JumpControllerSet::Jump),
        );
        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(JumpControllerSet::Sync),
        );
    }
}

/// The components every jump actor needs, apart from its physics body.
#[derive(Bundle, Default)]
pub struct JumpActorBundle {
    /// Jump state.
    pub controller: controller::JumpController,
    /// Jump tuning.
    pub config: config::JumpConfig,
    /// Jump requests.
    pub intent: intent::JumpIntent,
    /// Ground contacts.
    pub tracker: contact::GroundContactTracker,
    /// Steep surface probe result.
    pub probe: detection::SurfaceProbe,
}

impl JumpActorBundle {
    /// Create an actor bundle with the given tuning.
    pub fn new(config: config::JumpConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }
}

/// Opt-in stuck recovery for a jump actor.
#[derive(Bundle, Default)]
pub struct StuckRecoveryBundle {
    /// Timers and overlap result.
    pub monitor: stuck::StuckRecoveryMonitor,
    /// Tuning.
    pub config: config::StuckRecoveryConfig,
}

impl StuckRecoveryBundle {
    /// Create a recovery bundle with the given tuning.
    pub fn new(config: config::StuckRecoveryConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }
}
