//! Core controller systems.
//!
//! These systems connect [`LocomotionController`] to the ECS. They are
//! generic over the physics backend where they touch the body, so the same
//! step runs on Rapier or on the kinematic integrator.

use bevy::prelude::*;

use crate::backend::LocomotionBackend;
use crate::config::LocomotionConfig;
use crate::controller::{CachedProbe, LocomotionController};
use crate::intent::MovementIntent;
use crate::state::{Airborne, Grounded};

/// Re-derive cached config values after in-place edits.
///
/// Builders and setters keep `min_ground_dot_product` in sync themselves,
/// but fields written directly (through reflection or plain assignment)
/// are only picked up here. Scheduled in `Update` and in
/// [`LocomotionSet::Prepare`](crate::LocomotionSet::Prepare), so the first
/// fixed step after an edit already sees the new threshold. Only writes when
/// something is stale so the change filter does not re-trigger forever.
pub fn refresh_derived_config(
    mut q_configs: Query<(Entity, &mut LocomotionConfig), Changed<LocomotionConfig>>,
) {
    for (entity, mut config) in &mut q_configs {
        if let Err(err) = config.validate() {
            warn!("locomotion config of {entity} is out of range: {err}");
        }
        if config.needs_refresh() {
            config.refresh();
        }
    }
}

/// Hand movement intent to the controller.
///
/// Runs at frame rate. The desired velocity is overwritten every frame,
/// while jump requests are latched until a fixed step consumes them, so a
/// press between two physics ticks is never lost.
pub fn sample_movement_intent(
    mut q_controllers: Query<(
        &mut MovementIntent,
        &LocomotionConfig,
        &mut LocomotionController,
    )>,
) {
    for (mut intent, config, mut controller) in &mut q_controllers {
        controller.set_intent(intent.axes, config);
        if intent.has_jump_request() {
            intent.take_jump_request();
            controller.request_jump();
        }
    }
}

/// Run the fixed step for every controller and write the result back to
/// the body.
///
/// Contacts and the probe hit were gathered by the backend in
/// [`LocomotionSet::Sensors`](crate::LocomotionSet::Sensors).
pub fn step_locomotion<B: LocomotionBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<(Entity, LocomotionConfig)> = world
        .query::<(Entity, &LocomotionConfig, &LocomotionController)>()
        .iter(world)
        .map(|(e, config, _)| (e, *config))
        .collect();

    for (entity, config) in entities {
        let velocity = B::get_velocity(world, entity);
        let position = B::get_position(world, entity);

        let Some(mut controller) = world.get_mut::<LocomotionController>(entity) else {
            continue;
        };
        let probe = CachedProbe(controller.probe_hit.take());
        let new_velocity = controller.fixed_step(&config, velocity, position, dt, &probe);

        B::set_velocity(world, entity, new_velocity);
    }
}

/// Mirror the controller's ground state into marker components.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &LocomotionController,
        Has<Grounded>,
        Has<Airborne>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne) in &q_controllers {
        let grounded = controller.is_grounded();

        if grounded && !has_grounded {
            trace!("{entity} landed");
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && has_grounded {
            trace!("{entity} left the ground");
            commands.entity(entity).remove::<Grounded>().insert(Airborne);
        } else if !grounded && !has_airborne {
            commands.entity(entity).insert(Airborne);
        }
    }
}
