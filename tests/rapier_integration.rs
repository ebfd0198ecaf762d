//! Integration tests against a real Rapier3D world.
//!
//! These run the physics engine with real contacts, so assertions are kept
//! to outcomes that do not depend on solver details.

#![cfg(feature = "rapier3d")]

use bevy::prelude::*;
use bevy::time::Virtual;
use bevy_rapier3d::prelude::*;
use locomotion_controller::prelude::*;

/// Create a minimal test app with physics and the locomotion controller.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
    app.add_plugins(LocomotionPlugin::<Rapier3dBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a static floor whose top face is at y = 0.
fn spawn_floor(app: &mut App) -> Entity {
    let transform = Transform::from_xyz(0.0, -0.5, 0.0);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Fixed,
            Collider::cuboid(50.0, 0.5, 50.0),
        ))
        .id()
}

/// Spawn a ball character resting on the floor.
fn spawn_character(app: &mut App, config: LocomotionConfig) -> Entity {
    let transform = Transform::from_xyz(0.0, 0.5, 0.0);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            LocomotionController::new(),
            config,
            MovementIntent::default(),
            Rapier3dLocomotionBundle::new(),
            Collider::ball(0.5),
        ))
        .id()
}

/// Run one physics step.
fn tick(app: &mut App) {
    let timestep = std::time::Duration::from_secs_f64(1.0 / 60.0);
    app.world_mut()
        .resource_mut::<Time<Virtual>>()
        .advance_by(timestep);
    app.update();
    app.world_mut().run_schedule(FixedUpdate);
    app.update();
}

/// Run the app for N physics frames.
fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        tick(app);
    }
}

#[test]
fn character_resting_on_floor_is_grounded() {
    let mut app = create_test_app();
    spawn_floor(&mut app);
    let character = spawn_character(&mut app, LocomotionConfig::default());

    run_frames(&mut app, 30);

    assert!(app.world().get::<Grounded>(character).is_some());
    let y = app.world().get::<Transform>(character).unwrap().translation.y;
    assert!(y > 0.3 && y < 0.7, "character should rest on the floor, y = {y}");
}

#[test]
fn controller_picks_up_rapier_gravity() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app, LocomotionConfig::default());

    run_frames(&mut app, 2);

    let controller = app.world().get::<LocomotionController>(character).unwrap();
    assert!(controller.gravity.y < 0.0);
}

#[test]
fn character_without_floor_falls() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app, LocomotionConfig::default());

    run_frames(&mut app, 30);

    assert!(app.world().get::<Airborne>(character).is_some());
    assert!(app.world().get::<Grounded>(character).is_none());
}

#[test]
fn walking_moves_character_along_intent() {
    let mut app = create_test_app();
    spawn_floor(&mut app);
    let character = spawn_character(&mut app, LocomotionConfig::player());
    run_frames(&mut app, 10);

    app.world_mut()
        .get_mut::<MovementIntent>(character)
        .unwrap()
        .set_axes(Vec2::new(1.0, 0.0));
    run_frames(&mut app, 30);

    let velocity = app.world().get::<Velocity>(character).unwrap().linvel;
    assert!(velocity.x > 0.0, "velocity should follow intent: {velocity:?}");
    assert!(velocity.z.abs() < 0.5);
}
