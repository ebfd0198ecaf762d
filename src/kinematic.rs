//! Kinematic backend.
//!
//! A physics-free backend that integrates `Transform` directly. There is no
//! collision response apart from an optional infinite ground plane
//! ([`KinematicGround`]); other contacts are fed by the application through
//! [`LocomotionController::accumulate_contacts`]. Useful for tests, servers
//! without a physics engine, and prototyping.

use bevy::prelude::*;

use crate::backend::LocomotionBackend;
use crate::collision::CollisionData;
use crate::config::LocomotionConfig;
use crate::controller::{LocomotionController, DEFAULT_GRAVITY};
use crate::LocomotionSet;

/// Distance under which the plane counts as touching the body.
const CONTACT_TOLERANCE: f32 = 1e-3;

/// Backend that moves bodies by integrating [`KinematicBody::velocity`].
pub struct KinematicBackend;

impl LocomotionBackend for KinematicBackend {
    fn plugin() -> impl Plugin {
        KinematicBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<KinematicBody>(entity)
            .map(|body| body.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<KinematicBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }
}

/// Velocity state of a kinematic body.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[require(Transform)]
pub struct KinematicBody {
    /// Linear velocity (units/second).
    pub velocity: Vec3,
    /// Multiplier on [`KinematicGravity`].
    pub gravity_scale: f32,
    /// Distance from the body origin down to its bottom (sphere radius,
    /// capsule half height plus radius).
    pub half_height: f32,
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            gravity_scale: 1.0,
            half_height: 0.5,
        }
    }
}

impl KinematicBody {
    /// Body with the given bottom offset.
    pub fn new(half_height: f32) -> Self {
        Self {
            half_height,
            ..default()
        }
    }

    /// Builder: set gravity scale.
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Builder: set initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

/// World gravity applied to kinematic bodies.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Resource)]
pub struct KinematicGravity(pub Vec3);

impl Default for KinematicGravity {
    fn default() -> Self {
        Self(DEFAULT_GRAVITY)
    }
}

/// Infinite horizontal ground plane for kinematic bodies.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Resource)]
pub struct KinematicGround {
    /// World Y of the plane.
    pub height: f32,
    /// Collision groups the plane belongs to (checked against the probe mask).
    pub memberships: u32,
}

impl Default for KinematicGround {
    fn default() -> Self {
        Self {
            height: 0.0,
            memberships: 1,
        }
    }
}

impl KinematicGround {
    /// Plane at the given height in group 0.
    pub fn at(height: f32) -> Self {
        Self {
            height,
            ..default()
        }
    }
}

/// Plugin that sets up the kinematic integration systems.
pub struct KinematicBackendPlugin;

impl Plugin for KinematicBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<KinematicBody>();
        app.register_type::<KinematicGravity>();
        app.register_type::<KinematicGround>();
        app.init_resource::<KinematicGravity>();

        app.add_systems(
            FixedUpdate,
            (kinematic_sync_gravity, kinematic_ground_sensor)
                .chain()
                .in_set(LocomotionSet::Sensors),
        );
        app.add_systems(
            FixedUpdate,
            kinematic_integrate.in_set(LocomotionSet::Integrate),
        );
    }
}

/// Copy the scaled world gravity into each controller.
fn kinematic_sync_gravity(
    gravity: Res<KinematicGravity>,
    mut q_controllers: Query<(&KinematicBody, &mut LocomotionController)>,
) {
    for (body, mut controller) in &mut q_controllers {
        let scaled = gravity.0 * body.gravity_scale;
        if controller.gravity != scaled {
            controller.gravity = scaled;
        }
    }
}

/// Report plane contacts and answer the ground probe.
fn kinematic_ground_sensor(
    ground: Option<Res<KinematicGround>>,
    mut q_controllers: Query<(
        &Transform,
        &KinematicBody,
        &LocomotionConfig,
        &mut LocomotionController,
    )>,
) {
    let Some(ground) = ground else {
        return;
    };

    for (transform, body, config, mut controller) in &mut q_controllers {
        let position = transform.translation;
        let gap = position.y - body.half_height - ground.height;
        if gap <= CONTACT_TOLERANCE {
            controller.accumulate_contacts([Vec3::Y], config);
        }

        let distance = position.y - ground.height;
        controller.probe_hit = (distance >= 0.0
            && config.probe_mask.accepts(ground.memberships))
        .then(|| {
            CollisionData::new(
                distance,
                Vec3::Y,
                Vec3::new(position.x, ground.height, position.z),
                None,
            )
        });
    }
}

/// Apply gravity, move the body and keep it above the ground plane.
fn kinematic_integrate(
    time: Option<Res<Time<Fixed>>>,
    gravity: Res<KinematicGravity>,
    ground: Option<Res<KinematicGround>>,
    mut q_bodies: Query<(&mut Transform, &mut KinematicBody)>,
) {
    let dt = time
        .map(|t| t.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0);

    for (mut transform, mut body) in &mut q_bodies {
        let acceleration = gravity.0 * body.gravity_scale;
        body.velocity += acceleration * dt;
        transform.translation += body.velocity * dt;

        if let Some(ground) = ground.as_deref() {
            let floor = ground.height + body.half_height;
            if transform.translation.y < floor {
                transform.translation.y = floor;
                if body.velocity.y < 0.0 {
                    body.velocity.y = 0.0;
                }
            }
        }
    }
}
