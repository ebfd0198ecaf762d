//! Integration tests for the locomotion controller.
//!
//! These tests drive the full plugin with the kinematic backend. Schedules
//! are run by hand, so the fixed timestep falls back to 1/60 s.

use bevy::prelude::*;
use locomotion_controller::prelude::*;

const DT: f32 = 1.0 / 60.0;

/// Create a minimal test app with a ground plane at y = 0.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(LocomotionPlugin::<KinematicBackend>::default());
    app.insert_resource(KinematicGround::at(0.0));

    app
}

/// Spawn a character with default config, resting on the ground plane.
fn spawn_character(app: &mut App) -> Entity {
    spawn_character_with_config(app, LocomotionConfig::default())
}

/// Spawn a character with custom config, resting on the ground plane.
fn spawn_character_with_config(app: &mut App, config: LocomotionConfig) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_xyz(0.0, 0.5, 0.0),
            KinematicBody::new(0.5),
            LocomotionController::new(),
            config,
            MovementIntent::default(),
        ))
        .id()
}

/// Run one frame followed by one physics step.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(Update);
    app.world_mut().run_schedule(FixedUpdate);
}

/// Run the app for N physics frames.
fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        tick(app);
    }
}

fn set_axes(app: &mut App, entity: Entity, axes: Vec2) {
    if let Some(mut intent) = app.world_mut().get_mut::<MovementIntent>(entity) {
        intent.set_axes(axes);
    }
}

fn request_jump(app: &mut App, entity: Entity) {
    if let Some(mut intent) = app.world_mut().get_mut::<MovementIntent>(entity) {
        intent.request_jump();
    }
}

fn velocity(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<KinematicBody>(entity).unwrap().velocity
}

fn position(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn controller(app: &App, entity: Entity) -> &LocomotionController {
    app.world().get::<LocomotionController>(entity).unwrap()
}

fn is_grounded(app: &App, entity: Entity) -> bool {
    app.world().get::<Grounded>(entity).is_some()
}

// ==================== Ground Detection Tests ====================

#[test]
fn character_on_plane_is_grounded() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app);

    tick(&mut app);

    assert!(is_grounded(&app, character));
    assert!(app.world().get::<Airborne>(character).is_none());
    assert_eq!(controller(&app, character).contact_normal(), Vec3::Y);
}

#[test]
fn falling_character_lands() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app);
    app.world_mut()
        .get_mut::<Transform>(character)
        .unwrap()
        .translation
        .y = 5.0;

    tick(&mut app);
    assert!(app.world().get::<Airborne>(character).is_some());
    assert!(!is_grounded(&app, character));

    run_frames(&mut app, 120);
    assert!(is_grounded(&app, character));
    assert!((position(&app, character).y - 0.5).abs() < 1e-4);
    assert!(velocity(&app, character).y.abs() < 1e-4);
}

#[test]
fn application_contacts_ground_the_body() {
    let mut app = create_test_app();
    app.world_mut().remove_resource::<KinematicGround>();
    let character = app
        .world_mut()
        .spawn((
            Transform::from_xyz(0.0, 10.0, 0.0),
            KinematicBody::new(0.5).with_gravity_scale(0.0),
            LocomotionController::new(),
            LocomotionConfig::default(),
        ))
        .id();

    let config = LocomotionConfig::default();
    app.world_mut()
        .get_mut::<LocomotionController>(character)
        .unwrap()
        .accumulate_contacts([Vec3::new(0.1, 1.0, 0.0).normalize()], &config);
    tick(&mut app);
    assert!(is_grounded(&app, character));

    // Nothing reported for the next step
    tick(&mut app);
    assert!(!is_grounded(&app, character));
}

// ==================== Movement Tests ====================

#[test]
fn walking_accelerates_to_max_speed() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app);
    set_axes(&mut app, character, Vec2::new(1.0, 0.0));

    tick(&mut app);
    let first = velocity(&app, character);
    assert!((first.x - 10.0 * DT).abs() < 1e-4, "one step of 10 u/s^2: {first:?}");

    run_frames(&mut app, 70);
    let v = velocity(&app, character);
    assert!((v.x - 10.0).abs() < 1e-3, "should reach max speed: {v:?}");
    assert!(v.z.abs() < 1e-6);
    assert!(position(&app, character).x > 5.0);
    assert!(is_grounded(&app, character));
}

#[test]
fn intent_y_axis_moves_along_z() {
    let mut app = create_test_app();
    let character = spawn_character_with_config(&mut app, LocomotionConfig::player());
    set_axes(&mut app, character, Vec2::new(0.0, -1.0));

    run_frames(&mut app, 30);

    let v = velocity(&app, character);
    assert!(v.z < -9.9);
    assert!(v.x.abs() < 1e-6);
}

#[test]
fn releasing_intent_decelerates() {
    let mut app = create_test_app();
    let character = spawn_character_with_config(&mut app, LocomotionConfig::player());
    set_axes(&mut app, character, Vec2::new(1.0, 0.0));
    run_frames(&mut app, 30);
    assert!(velocity(&app, character).x > 9.9);

    set_axes(&mut app, character, Vec2::ZERO);
    run_frames(&mut app, 30);
    assert!(velocity(&app, character).x.abs() < 1e-4);
}

#[test]
fn air_control_is_weaker_than_ground_control() {
    let mut app = create_test_app();
    app.world_mut().remove_resource::<KinematicGround>();
    let config = LocomotionConfig::default().with_acceleration(30.0, 3.0);
    let character = spawn_character_with_config(&mut app, config);
    set_axes(&mut app, character, Vec2::new(1.0, 0.0));

    run_frames(&mut app, 10);

    let v = velocity(&app, character);
    assert!((v.x - 3.0 * DT * 10.0).abs() < 1e-3, "air acceleration only: {v:?}");
}

// ==================== Jump Tests ====================

#[test]
fn jump_reaches_configured_height() {
    let mut app = create_test_app();
    let character = spawn_character_with_config(&mut app, LocomotionConfig::default().with_jump_height(2.0));
    tick(&mut app);

    request_jump(&mut app, character);
    tick(&mut app);
    assert!(!app.world().get::<MovementIntent>(character).unwrap().has_jump_request());
    assert_eq!(controller(&app, character).jump_phase(), 1);

    let mut peak = 0.0f32;
    for _ in 0..120 {
        tick(&mut app);
        peak = peak.max(position(&app, character).y);
    }

    let rise = peak - 0.5;
    assert!(rise > 1.85 && rise < 2.05, "rise was {rise}");
    assert!(is_grounded(&app, character));
    assert_eq!(controller(&app, character).jump_phase(), 0);
}

#[test]
fn jump_requested_between_steps_is_not_lost() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app);
    tick(&mut app);

    request_jump(&mut app, character);
    // Several frames without a physics step
    app.world_mut().run_schedule(Update);
    app.world_mut().run_schedule(Update);
    app.world_mut().run_schedule(Update);
    assert!(controller(&app, character).has_pending_jump());

    app.world_mut().run_schedule(FixedUpdate);
    assert!(velocity(&app, character).y > 5.0);
    assert!(!controller(&app, character).has_pending_jump());
}

#[test]
fn air_jumps_are_limited() {
    let mut app = create_test_app();
    let config = LocomotionConfig::agile().with_jump_height(1.0);
    let character = spawn_character_with_config(&mut app, config);
    tick(&mut app);

    let jump_speed = (2.0f32 * 9.81 * 1.0).sqrt();

    for expected_phase in 1..=3 {
        request_jump(&mut app, character);
        tick(&mut app);
        assert_eq!(controller(&app, character).jump_phase(), expected_phase);
        // Integration ran one step of gravity after the jump
        let vy = velocity(&app, character).y;
        assert!((vy - (jump_speed - 9.81 * DT)).abs() < 1e-3, "jump {expected_phase}: {vy}");
        run_frames(&mut app, 5);
    }

    let before = velocity(&app, character).y;
    request_jump(&mut app, character);
    tick(&mut app);
    assert_eq!(controller(&app, character).jump_phase(), 3);
    assert!(velocity(&app, character).y < before);
}

#[test]
fn dropped_jump_is_not_replayed_on_landing() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app);
    tick(&mut app);

    request_jump(&mut app, character);
    tick(&mut app);
    run_frames(&mut app, 10);

    // No air jumps configured
    request_jump(&mut app, character);
    tick(&mut app);
    assert_eq!(controller(&app, character).jump_phase(), 1);

    run_frames(&mut app, 120);
    assert!(is_grounded(&app, character));
    assert!(velocity(&app, character).y.abs() < 1e-4);
}

// ==================== Snapping Tests ====================

/// Ground the character, then drop the plane slightly under it as if it
/// walked over a small crest.
fn step_off_crest(app: &mut App, config: LocomotionConfig) -> Entity {
    let character = spawn_character_with_config(app, config);
    set_axes(app, character, Vec2::new(1.0, 0.0));
    run_frames(app, 5);
    assert!(is_grounded(app, character));

    app.insert_resource(KinematicGround::at(-0.2));
    tick(app);
    character
}

#[test]
fn small_drop_keeps_character_grounded() {
    let mut app = create_test_app();
    let character = step_off_crest(&mut app, LocomotionConfig::default());

    assert!(is_grounded(&app, character));
    assert_eq!(controller(&app, character).last_ground_contact_count(), 1);
    assert_eq!(controller(&app, character).jump_phase(), 0);
}

#[test]
fn snapping_requires_probe_to_see_ground() {
    let mut app = create_test_app();
    let character = step_off_crest(
        &mut app,
        LocomotionConfig::default().with_probe_mask(ProbeMask::NONE),
    );
    assert!(!is_grounded(&app, character));

    let mut app = create_test_app();
    let character = step_off_crest(
        &mut app,
        LocomotionConfig::default().with_probe_distance(0.6),
    );
    assert!(!is_grounded(&app, character));
}

#[test]
fn snapping_is_skipped_above_max_snap_speed() {
    let mut app = create_test_app();
    let character = step_off_crest(
        &mut app,
        LocomotionConfig::default().with_max_snap_speed(0.1),
    );
    assert!(!is_grounded(&app, character));
}

// ==================== Config Tests ====================

/// Contact normal reported every fixed step by [`report_slope_contact`].
#[derive(Component)]
struct SlopeContact(Vec3);

/// Sensor reporting a fixed slope against the config the step will see.
fn report_slope_contact(
    mut q_controllers: Query<(&SlopeContact, &LocomotionConfig, &mut LocomotionController)>,
) {
    for (slope, config, mut controller) in &mut q_controllers {
        controller.accumulate_contacts([slope.0], config);
    }
}

#[test]
fn in_place_angle_edit_takes_effect() {
    let mut app = create_test_app();
    app.world_mut().remove_resource::<KinematicGround>();
    app.add_systems(
        FixedUpdate,
        report_slope_contact.in_set(LocomotionSet::Sensors),
    );
    let character = app
        .world_mut()
        .spawn((
            Transform::from_xyz(0.0, 10.0, 0.0),
            KinematicBody::new(0.5).with_gravity_scale(0.0),
            LocomotionController::new(),
            LocomotionConfig::default(),
            MovementIntent::default(),
            SlopeContact(Vec3::new(0.0, 0.75, 0.66).normalize()),
        ))
        .id();

    tick(&mut app);
    assert!(!is_grounded(&app, character));

    app.world_mut()
        .get_mut::<LocomotionConfig>(character)
        .unwrap()
        .max_ground_angle = 45.0;
    // Fixed steps run before Update within a frame
    app.world_mut().run_schedule(FixedUpdate);

    assert!(is_grounded(&app, character));
    let config = app.world().get::<LocomotionConfig>(character).unwrap();
    assert!(!config.needs_refresh());
    assert!((config.min_ground_dot_product() - 45f32.to_radians().cos()).abs() < 1e-6);
}
