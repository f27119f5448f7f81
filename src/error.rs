//! Setup errors.
//!
//! These are the only failures the controller reports. They are raised once
//! when an actor is initialized and logged; the actor's controller is then
//! disabled instead of stopping the simulation.

use std::fmt;

use bevy::prelude::*;

/// Configuration problem detected while initializing a jump actor.
#[derive(Debug, Clone, PartialEq)]
pub enum JumpSetupError {
    /// The actor has no physics body the backend can drive.
    MissingBody {
        /// The actor entity.
        entity: Entity,
    },
    /// A tunable holds a value the controller cannot work with.
    InvalidParameter {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f32,
    },
}

impl JumpSetupError {
    pub(crate) fn invalid(field: &'static str, value: f32) -> Self {
        Self::InvalidParameter { field, value }
    }
}

impl fmt::Display for JumpSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBody { entity } => {
                write!(f, "jump actor {entity} has no physics body, jumping is disabled")
            }
            Self::InvalidParameter { field, value } => {
                write!(f, "invalid jump parameter `{field}` = {value}")
            }
        }
    }
}

impl std::error::Error for JumpSetupError {}

/// Fail with [`JumpSetupError::InvalidParameter`] unless `value` is finite and `>= 0`.
pub(crate) fn non_negative(field: &'static str, value: f32) -> Result<(), JumpSetupError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(JumpSetupError::invalid(field, value))
    }
}

/// Fail with [`JumpSetupError::InvalidParameter`] unless `value` is finite and `> 0`.
pub(crate) fn positive(field: &'static str, value: f32) -> Result<(), JumpSetupError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(JumpSetupError::invalid(field, value))
    }
}
