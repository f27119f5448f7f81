//! Jump intent component.
//!
//! Intents carry "pressed this frame" edges from player input or AI to the
//! jump systems. The jump systems consume every pending request on the next
//! fixed tick, whether or not the jump succeeds.

use bevy::prelude::*;

use crate::controller::JumpDirection;

/// Pending jump requests for one actor.
///
/// # Example
///
/// ```rust
/// use msg_jump_controller::prelude::*;
///
/// let mut intent = JumpIntent::new();
///
/// // Held-button style: only the rising edge creates a request
/// intent.set_jump_pressed(true);
/// intent.set_jump_pressed(true);
/// assert_eq!(intent.next_request(), Some(JumpDirection::Forward));
/// assert_eq!(intent.next_request(), None);
///
/// // Edge style: the input source already detected the press
/// intent.request(JumpDirection::Backward);
/// assert!(intent.has_request());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct JumpIntent {
    /// A forward jump was pressed and not yet consumed.
    pub jump_requested: bool,
    /// A backward jump was pressed and not yet consumed.
    pub backward_jump_requested: bool,
    /// Current held state of the jump input.
    pub jump_pressed: bool,
    /// Current held state of the backward jump input.
    pub backward_jump_pressed: bool,
}

impl JumpIntent {
    /// Create an intent with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a jump for the next tick.
    pub fn request(&mut self, direction: JumpDirection) {
        match direction {
            JumpDirection::Forward => self.jump_requested = true,
            JumpDirection::Backward => self.backward_jump_requested = true,
        }
    }

    /// Set the held state of the jump input; a press queues a forward jump.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        if pressed && !self.jump_pressed {
            self.jump_requested = true;
        }
        self.jump_pressed = pressed;
    }

    /// Set the held state of the backward jump input; a press queues a backward jump.
    pub fn set_backward_jump_pressed(&mut self, pressed: bool) {
        if pressed && !self.backward_jump_pressed {
            self.backward_jump_requested = true;
        }
        self.backward_jump_pressed = pressed;
    }

    /// Whether any jump is queued.
    pub fn has_request(&self) -> bool {
        self.jump_requested || self.backward_jump_requested
    }

    /// Take the next queued jump. Forward jumps come first.
    pub fn next_request(&mut self) -> Option<JumpDirection> {
        if std::mem::take(&mut self.jump_requested) {
            Some(JumpDirection::Forward)
        } else if std::mem::take(&mut self.backward_jump_requested) {
            Some(JumpDirection::Backward)
        } else {
            None
        }
    }

    /// Drop all queued jumps.
    pub fn clear_requests(&mut self) {
        self.jump_requested = false;
        self.backward_jump_requested = false;
    }
}
