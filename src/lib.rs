//! # `locomotion_controller`
//!
//! A rigidbody locomotion controller for Bevy with a physics backend
//! abstraction.
//!
//! This crate turns 2D movement intent and a jump button into velocity
//! changes for a physics body:
//! - Classifies the body as grounded from walkable contacts (slope limit)
//! - Snaps the body back onto the ground after small bumps and ledges
//! - Accelerates within separate ground/air budgets, along the slope
//! - Supports a configurable number of air jumps
//! - Abstracts the physics engine (Rapier3D and a kinematic integrator included)
//!
//! ## Architecture
//!
//! The controller is a **velocity filter** sitting between input and physics:
//! 1. Intent is sampled at frame rate into a desired velocity and a sticky jump latch
//! 2. The physics engine reports contact normals, accumulated until the next fixed step
//! 3. The fixed step classifies ground, adjusts velocity and applies the jump
//! 4. The resulting velocity is written back to the body, which the engine integrates
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use locomotion_controller::prelude::*;
//!
//! let mut app = App::new();
//! app.add_plugins(MinimalPlugins)
//!     .add_plugins(LocomotionPlugin::<KinematicBackend>::default())
//!     .insert_resource(KinematicGround::at(0.0));
//!
//! app.world_mut().spawn((
//!     LocomotionConfig::player(),
//!     LocomotionController::new(),
//!     MovementIntent::new(),
//!     KinematicBody::new(0.5),
//!     Transform::from_xyz(0.0, 0.5, 0.0),
//! ));
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod contact;
pub mod controller;
pub mod intent;
pub mod kinematic;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::LocomotionBackend;
    pub use crate::collision::CollisionData;
    pub use crate::config::{ConfigError, LocomotionConfig, ProbeMask};
    pub use crate::controller::{CachedProbe, GroundProbe, LocomotionController, NoProbe};
    pub use crate::intent::MovementIntent;
    pub use crate::kinematic::{KinematicBackend, KinematicBody, KinematicGravity, KinematicGround};
    pub use crate::state::{Airborne, GroundState, Grounded};
    pub use crate::{LocomotionPlugin, LocomotionSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dLocomotionBundle};
}

/// Ordering of the controller's fixed-rate work.
///
/// The sets run chained in `FixedUpdate`. Backends add their systems to
/// [`Sensors`](Self::Sensors) and, when their engine does not integrate on
/// its own, to [`Integrate`](Self::Integrate).
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Derived config values are refreshed after in-place edits.
    Prepare,
    /// Contacts, probe hits and gravity are gathered.
    Sensors,
    /// The controller's fixed step runs and writes body velocity.
    Step,
    /// Bodies are moved (kinematic backend only).
    Integrate,
    /// Marker components are synced to the evaluated ground state.
    Sync,
}

/// Main plugin for the locomotion controller.
///
/// This plugin is generic over a physics backend `B` which provides access
/// to body velocity and position and installs the sensor systems.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use locomotion_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(LocomotionPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct LocomotionPlugin<B: backend::LocomotionBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::LocomotionConfig>();
        app.register_type::<config::ProbeMask>();
        app.register_type::<controller::LocomotionController>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<state::GroundState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();

        app.configure_sets(
            FixedUpdate,
            (
                LocomotionSet::Prepare,
                LocomotionSet::Sensors,
                LocomotionSet::Step,
                LocomotionSet::Integrate,
                LocomotionSet::Sync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        // Input stage runs at frame rate
        app.add_systems(
            Update,
            (systems::refresh_derived_config, systems::sample_movement_intent).chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::refresh_derived_config.in_set(LocomotionSet::Prepare),
                systems::step_locomotion::<B>.in_set(LocomotionSet::Step),
                systems::sync_state_markers.in_set(LocomotionSet::Sync),
            ),
        );
    }
}
