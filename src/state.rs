//! Ground state and state marker components.
//!
//! The markers mirror the ground state the controller evaluated during its
//! last fixed step. They are added/removed by the controller systems.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Locomotion state evaluated at the start of a fixed step.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroundState {
    /// Direct ground contact this step, or snapped back onto the ground.
    Grounded,
    /// No walkable contact and no successful snap.
    #[default]
    Airborne,
}

impl GroundState {
    /// Whether this is [`GroundState::Grounded`].
    #[inline]
    pub fn is_grounded(self) -> bool {
        self == GroundState::Grounded
    }
}

/// Marker component indicating the character is grounded.
///
/// Added automatically when a fixed step classifies the body as grounded,
/// either through a walkable contact or through ground snapping.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use locomotion_controller::prelude::*;
///
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
