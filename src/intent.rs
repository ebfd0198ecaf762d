//! Movement intent component.
//!
//! Intents represent what the player (or AI) wants to do this frame: a 2D
//! axis pair and a jump trigger. Input polling is left to the application;
//! it writes into [`MovementIntent`] and the controller systems sample it.

use bevy::prelude::*;

/// Movement intent from player input or AI.
///
/// `axes.x` moves along world +X, `axes.y` along world +Z. Both are clamped
/// to [-1.0, 1.0] per component, so diagonals may exceed unit length the
/// same way a raw gamepad stick does.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use locomotion_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_axes(Vec2::new(1.0, 0.0));
/// assert!(intent.is_moving());
///
/// // Rising edge of the jump button creates a pending request
/// intent.set_jump_pressed(true);
/// assert!(intent.has_jump_request());
///
/// // Holding the button does not create another one
/// assert!(intent.take_jump_request());
/// intent.set_jump_pressed(true);
/// assert!(!intent.has_jump_request());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Lateral movement intent, each component in [-1.0, 1.0].
    pub axes: Vec2,
    /// Whether the jump action is currently held.
    pub jump_pressed: bool,
    /// Previous frame's `jump_pressed` (for edge detection).
    pub(crate) jump_pressed_prev: bool,
    /// A jump was triggered and has not been handed to the controller yet.
    pub(crate) jump_requested: bool,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement axes, clamping each component to [-1.0, 1.0].
    pub fn set_axes(&mut self, axes: Vec2) {
        self.axes = axes.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    /// Clear movement axes.
    pub fn clear(&mut self) {
        self.axes = Vec2::ZERO;
    }

    /// Check if there is active movement input.
    pub fn is_moving(&self) -> bool {
        self.axes.abs().max_element() > 0.001
    }

    /// Set the jump button state.
    ///
    /// Call this every frame with the current state. A transition from
    /// released to pressed latches a jump request.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        if pressed && !self.jump_pressed_prev {
            self.jump_requested = true;
        }
        self.jump_pressed = pressed;
        self.jump_pressed_prev = pressed;
    }

    /// Request a jump directly, bypassing edge detection.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    /// Check if there's a pending jump request.
    pub fn has_jump_request(&self) -> bool {
        self.jump_requested
    }

    /// Take and consume the pending jump request.
    pub fn take_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }
}
