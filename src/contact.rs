//! Ground contact tracking.
//!
//! Physics backends report raw contacts as [`ContactEvent`]s. Each actor's
//! [`GroundContactTracker`] classifies them and keeps the ground contacts it
//! currently has, per reporting collider. Only the transitions between "no ground
//! contact" and "some ground contact" leave the tracker, as
//! [`GroundTransitionEvent`]s.

use bevy::ecs::entity::{EntityHashMap, EntityHashSet};
use bevy::prelude::*;

use crate::config::GroundClassification;

/// Designer-assigned category of a collider.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[reflect(Component)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurfaceTag {
    /// Always ground.
    Ground,
    /// An obstacle; ground when the policy says obstacles count.
    Obstacle,
    /// Never ground, even as a solid fallback (pickups, decorations, hazards).
    Ignored,
}

/// Marks a collider (usually a sensor child) that reports contacts for `actor`.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub struct GroundSensor {
    /// Entity holding the [`GroundContactTracker`].
    pub actor: Entity,
}

/// Everything the classifier needs to know about the other side of a contact.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
    /// The collider entity.
    pub collider: Entity,
    /// The body or parent entity the collider belongs to, if different.
    pub owner: Option<Entity>,
    /// Designer tag, if any.
    pub tag: Option<SurfaceTag>,
    /// The collider's `Name`, if any.
    pub name: Option<String>,
    /// Collision group membership bits, if any.
    pub layers: Option<u32>,
    /// Whether the collider is a sensor (trigger) rather than a solid.
    pub is_sensor: bool,
}

impl ContactInfo {
    /// A solid, untagged, unnamed collider.
    pub fn solid(collider: Entity) -> Self {
        Self {
            collider,
            owner: None,
            tag: None,
            name: None,
            layers: None,
            is_sensor: false,
        }
    }

    /// A sensor collider.
    pub fn sensor(collider: Entity) -> Self {
        Self {
            is_sensor: true,
            ..Self::solid(collider)
        }
    }

    /// Builder: set the owning body.
    pub fn with_owner(mut self, owner: Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Builder: set the tag.
    pub fn with_tag(mut self, tag: SurfaceTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Builder: set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set the collision group membership bits.
    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = Some(layers);
        self
    }
}

/// Why a contact was classified as ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundReason {
    /// Tagged [`SurfaceTag::Ground`].
    Tagged,
    /// Tagged [`SurfaceTag::Obstacle`] and obstacles count as ground.
    Obstacle,
    /// Name matched a ground pattern.
    NameMatch,
    /// Collision groups intersect the ground layers.
    LayerMatch,
    /// Solid collider of another body.
    SolidFallback,
}

/// Classify a contact for `actor`. `None` means "not ground".
pub fn classify_contact(
    actor: Entity,
    contact: &ContactInfo,
    policy: &GroundClassification,
) -> Option<GroundReason> {
    if contact.collider == actor || contact.owner == Some(actor) {
        return None;
    }

    match contact.tag {
        Some(SurfaceTag::Ground) => return Some(GroundReason::Tagged),
        Some(SurfaceTag::Obstacle) if policy.obstacle_counts_as_ground => {
            return Some(GroundReason::Obstacle)
        }
        Some(SurfaceTag::Ignored) => return None,
        _ => {}
    }

    if let Some(name) = contact.name.as_deref() {
        let name = name.to_lowercase();
        if policy
            .name_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && name.contains(&pattern.to_lowercase()))
        {
            return Some(GroundReason::NameMatch);
        }
    }

    if policy.ground_layers != 0 && contact.layers.unwrap_or(0) & policy.ground_layers != 0 {
        return Some(GroundReason::LayerMatch);
    }

    if policy.solid_fallback && !contact.is_sensor {
        return Some(GroundReason::SolidFallback);
    }

    None
}

/// Edge between "no ground contact" and "some ground contact".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum GroundTransition {
    /// Contact count went from 0 to 1.
    Entered,
    /// Contact count went back to 0.
    Exited,
}

/// Raw contact reported by a physics backend.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum ContactEvent {
    /// A collider started overlapping the actor.
    Began {
        /// The reporting collider: the actor itself or one of its [`GroundSensor`]s.
        actor: Entity,
        /// The other collider.
        contact: ContactInfo,
    },
    /// A collider stopped overlapping the actor.
    Ended {
        /// The reporting collider: the actor itself or one of its [`GroundSensor`]s.
        actor: Entity,
        /// The other collider.
        collider: Entity,
    },
}

/// A ground transition of one actor, emitted by the contact systems.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundTransitionEvent {
    /// The actor whose ground state changed.
    pub actor: Entity,
    /// The transition.
    pub transition: GroundTransition,
}

/// Ground contacts currently touching one actor.
///
/// A contact is a pair of the reporting collider (the actor's body or one of
/// its [`GroundSensor`]s) and the ground collider. The same floor touched by
/// the body and a sensor counts twice and only ends when both separate. A
/// pair is counted once no matter how many begin events it produces, and an
/// end event for a pair that was never counted is ignored, so the count can
/// never go below zero.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct GroundContactTracker {
    /// Ground collider to the reporters touching it.
    #[reflect(ignore)]
    contacts: EntityHashMap<EntityHashSet>,
}

impl GroundContactTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (reporter, ground collider) pairs currently touching.
    pub fn contact_count(&self) -> usize {
        self.contacts.values().map(|reporters| reporters.len()).sum()
    }

    /// Whether any ground collider touches.
    pub fn is_grounded(&self) -> bool {
        !self.contacts.is_empty()
    }

    /// Whether `collider` is counted as a ground contact by any reporter.
    pub fn is_tracking(&self, collider: Entity) -> bool {
        self.contacts.contains_key(&collider)
    }

    /// Handle a contact starting between `reporter` and `contact`.
    ///
    /// Returns [`GroundTransition::Entered`] on the first ground contact.
    pub fn on_contact_begin(
        &mut self,
        actor: Entity,
        reporter: Entity,
        contact: &ContactInfo,
        policy: &GroundClassification,
    ) -> Option<GroundTransition> {
        classify_contact(actor, contact, policy)?;

        let was_grounded = self.is_grounded();
        if !self
            .contacts
            .entry(contact.collider)
            .or_default()
            .insert(reporter)
        {
            return None;
        }
        (!was_grounded).then_some(GroundTransition::Entered)
    }

    /// Handle the contact between `reporter` and `collider` ending.
    ///
    /// Returns [`GroundTransition::Exited`] when the last ground contact ends.
    pub fn on_contact_end(
        &mut self,
        reporter: Entity,
        collider: Entity,
    ) -> Option<GroundTransition> {
        let reporters = self.contacts.get_mut(&collider)?;
        if !reporters.remove(&reporter) {
            return None;
        }
        if reporters.is_empty() {
            self.contacts.remove(&collider);
        }
        (!self.is_grounded()).then_some(GroundTransition::Exited)
    }

    /// Forget all contacts, e.g. on respawn.
    pub fn clear(&mut self) -> Option<GroundTransition> {
        let was_grounded = self.is_grounded();
        self.contacts.clear();
        was_grounded.then_some(GroundTransition::Exited)
    }
}
