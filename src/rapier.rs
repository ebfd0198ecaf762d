//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature (on by default).
//!
//! Rapier owns integration and collision response. The backend harvests the
//! narrow phase's contact manifolds into the controller, casts the ground
//! probe and keeps the controller's gravity in sync with the physics world.
//! Running Rapier in the fixed schedule
//! (`RapierPhysicsPlugin::default().in_fixed_schedule()`) keeps contacts and
//! steps in lockstep.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::LocomotionBackend;
use crate::collision::CollisionData;
use crate::config::{LocomotionConfig, ProbeMask};
use crate::controller::LocomotionController;
use crate::LocomotionSet;

/// Contact points further apart than this are only predicted, not touching.
const CONTACT_DISTANCE_TOLERANCE: f32 = 0.01;

/// Rapier3D physics backend for the locomotion controller.
///
/// This backend uses `bevy_rapier3d` for velocity manipulation. Collision
/// queries are handled by dedicated Rapier systems that receive
/// `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl LocomotionBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }
}

/// Plugin that sets up Rapier3D-specific systems for the locomotion controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        // Sensors: everything the fixed step reads about the physics world
        app.add_systems(
            FixedUpdate,
            (
                rapier_sync_gravity,
                rapier_collect_contacts,
                rapier_ground_probe,
            )
                .in_set(LocomotionSet::Sensors),
        );
    }
}

/// Copy Rapier's gravity (scaled per body) into each controller.
pub fn rapier_sync_gravity(
    q_configuration: Query<&RapierConfiguration>,
    mut q_controllers: Query<(&mut LocomotionController, Option<&GravityScale>)>,
) {
    let Ok(configuration) = q_configuration.single() else {
        return;
    };

    for (mut controller, gravity_scale) in &mut q_controllers {
        let scale = gravity_scale.map(|g| g.0).unwrap_or(1.0);
        let gravity = configuration.gravity * scale;
        if controller.gravity != gravity {
            controller.gravity = gravity;
        }
    }
}

/// Feed the normals of every touching contact point into the controller.
///
/// Manifold normals point from the pair's first collider toward the second;
/// they are flipped so that they always point away from the other collider,
/// toward the character.
pub fn rapier_collect_contacts(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(Entity, &LocomotionConfig, &mut LocomotionController)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, config, mut controller) in &mut q_controllers {
        let mut normals = Vec::new();

        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }
            let is_first = pair.collider1() == Some(entity);

            for manifold in pair.manifolds() {
                let normal = if is_first {
                    -manifold.normal()
                } else {
                    manifold.normal()
                };
                let touching = manifold
                    .points()
                    .filter(|point| point.dist() <= CONTACT_DISTANCE_TOLERANCE)
                    .count();
                normals.extend(std::iter::repeat_n(normal, touching));
            }
        }

        if !normals.is_empty() {
            controller.accumulate_contacts(normals, config);
        }
    }
}

/// Cast the ground probe ray and store the hit for the next fixed step.
pub fn rapier_ground_probe(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &LocomotionConfig,
        &mut LocomotionController,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, mut controller) in &mut q_controllers {
        controller.probe_hit = rapier_raycast(
            &context,
            transform.translation(),
            Vec3::NEG_Y,
            config.probe_distance,
            entity,
            config.probe_mask,
        );
    }
}

/// Perform a raycast using RapierContext, returning the surface normal.
fn rapier_raycast(
    context: &RapierContext,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    exclude_entity: Entity,
    mask: ProbeMask,
) -> Option<CollisionData> {
    if mask == ProbeMask::NONE {
        return None;
    }

    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(mask.bits()),
        ));

    context
        .cast_ray_and_get_normal(origin, direction, max_distance, true, filter)
        .map(|(hit_entity, hit)| {
            CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
        })
}

/// Bundle of Rapier components for a locomotion-controlled character.
///
/// The controller owns lateral acceleration, so the body has no damping by
/// default. Rotation is locked; the controller's movement basis is world
/// aligned and a rolling body would only fight it.
///
/// # Example
///
/// ```ignore
/// commands.spawn((
///     LocomotionController::new(),
///     LocomotionConfig::player(),
///     MovementIntent::default(),
///     Rapier3dLocomotionBundle::new(),
///     Collider::ball(0.5),
/// ));
/// ```
#[derive(Bundle)]
pub struct Rapier3dLocomotionBundle {
    /// The rigid body type. Should typically be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. The controller overwrites the
    /// linear part every fixed step.
    pub velocity: Velocity,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Friction of the character's collider. Zero so walls do not grab it.
    pub friction: Friction,
}

impl Default for Rapier3dLocomotionBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dLocomotionBundle {
    /// Dynamic, rotation locked, undamped, frictionless.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }

    /// Set the collider friction coefficient.
    pub fn with_friction(mut self, coefficient: f32) -> Self {
        self.friction.coefficient = coefficient;
        self
    }
}
