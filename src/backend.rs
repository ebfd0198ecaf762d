//! Physics backend abstraction.
//!
//! The controller never talks to a physics engine directly. A backend
//! provides body velocity and position, installs the sensor systems that
//! feed contacts, gravity and probe hits into [`LocomotionController`], and
//! integrates the body (or lets its engine do it).
//!
//! [`LocomotionController`]: crate::controller::LocomotionController

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to drive the locomotion controller with a physics
/// engine. Two backends ship with the crate: [`KinematicBackend`] (built-in
/// integration, no collision response) and `Rapier3dBackend` behind the
/// `rapier3d` feature.
///
/// A backend plugin is expected to:
/// - add contact normals and the probe hit in [`LocomotionSet::Sensors`]
/// - integrate the body in [`LocomotionSet::Integrate`] if its engine
///   does not do so on its own
///
/// [`KinematicBackend`]: crate::kinematic::KinematicBackend
/// [`LocomotionSet::Sensors`]: crate::LocomotionSet::Sensors
/// [`LocomotionSet::Integrate`]: crate::LocomotionSet::Integrate
pub trait LocomotionBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the current world position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the fixed timestep delta time.
    ///
    /// Falls back to 1/60 s when no fixed clock is running (tests that run
    /// the schedule by hand).
    fn get_fixed_timestep(world: &World) -> f32 {
        fixed_timestep(world)
    }
}

/// Fixed timestep of `world`, or 1/60 s if there is none yet.
pub fn fixed_timestep(world: &World) -> f32 {
    world
        .get_resource::<Time<Fixed>>()
        .map(|t| t.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0)
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
