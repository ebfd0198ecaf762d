//! The locomotion controller.
//!
//! [`LocomotionController`] owns all per-character state and runs the fixed
//! step: ground classification (with snapping), slope-projected acceleration
//! and jumping. It does not talk to a physics engine directly; it receives
//! the body velocity and position, a [`GroundProbe`] for ray casts, and
//! returns the velocity to assign back to the body.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::{LocomotionConfig, ProbeMask};
use crate::contact::{ContactAccumulator, GroundContacts};
use crate::state::GroundState;

/// Downward ray cast used for ground snapping.
pub trait GroundProbe {
    /// Cast a ray from `origin` straight down (world -Y) up to `max_distance`,
    /// hitting only groups accepted by `mask`.
    fn cast_down(&self, origin: Vec3, max_distance: f32, mask: ProbeMask) -> Option<CollisionData>;
}

impl<F> GroundProbe for F
where
    F: Fn(Vec3, f32, ProbeMask) -> Option<CollisionData>,
{
    fn cast_down(&self, origin: Vec3, max_distance: f32, mask: ProbeMask) -> Option<CollisionData> {
        self(origin, max_distance, mask)
    }
}

/// Probe that never hits anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl GroundProbe for NoProbe {
    fn cast_down(&self, _origin: Vec3, _max_distance: f32, _mask: ProbeMask) -> Option<CollisionData> {
        None
    }
}

/// Probe result computed ahead of the step (by a backend sensor system).
///
/// The cast was already filtered and aimed by the backend; only the
/// distance is checked against the probe length again.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedProbe(pub Option<CollisionData>);

impl GroundProbe for CachedProbe {
    fn cast_down(&self, _origin: Vec3, max_distance: f32, _mask: ProbeMask) -> Option<CollisionData> {
        self.0.filter(|hit| hit.distance <= max_distance)
    }
}

/// Default gravity used until a backend reports the engine's gravity.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Core locomotion controller component.
///
/// This is the **central hub** for one character's locomotion state.
/// All fields are mutated only by the controller itself; callers feed it
/// intent, contacts and probe results and read back the outcome.
///
/// # Step lifecycle
///
/// 1. [`set_intent`](Self::set_intent) / [`request_jump`](Self::request_jump)
///    at input rate.
/// 2. [`accumulate_contacts`](Self::accumulate_contacts) any number of times.
/// 3. [`fixed_step`](Self::fixed_step) once per physics tick.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct LocomotionController {
    /// Velocity computed by the last step (mirrors the body).
    velocity: Vec3,
    /// Lateral velocity requested by the latest intent. Never has a Y component.
    desired_velocity: Vec3,
    /// Walkable contacts gathered for the upcoming step.
    contacts: ContactAccumulator,
    /// Contacts (with the resolved effective normal) used by the last step.
    last_contacts: GroundContacts,
    /// Jumps taken since the body was last grounded.
    jump_phase: u32,
    /// Sticky jump request, cleared by the step that consumes it.
    desired_jump: bool,
    steps_since_last_grounded: u32,
    steps_since_last_jump: u32,
    /// State evaluated by the last step.
    ground_state: GroundState,

    /// Gravity used for the jump speed. Backends keep this in sync with the
    /// physics engine.
    pub gravity: Vec3,

    /// Ground probe hit stored by a backend sensor system for the next step.
    #[reflect(ignore)]
    pub(crate) probe_hit: Option<CollisionData>,
}

impl Default for LocomotionController {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            desired_velocity: Vec3::ZERO,
            contacts: ContactAccumulator::new(),
            last_contacts: GroundContacts::default(),
            jump_phase: 0,
            desired_jump: false,
            steps_since_last_grounded: 0,
            steps_since_last_jump: 0,
            ground_state: GroundState::Airborne,
            gravity: DEFAULT_GRAVITY,
            probe_hit: None,
        }
    }
}

impl LocomotionController {
    /// Create a new controller with default gravity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new controller with custom gravity.
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..default()
        }
    }

    // === Input stage ===

    /// Sample the intent axes. `axes.x` maps to world X, `axes.y` to world Z.
    pub fn set_intent(&mut self, axes: Vec2, config: &LocomotionConfig) {
        let axes = axes.clamp(Vec2::NEG_ONE, Vec2::ONE);
        self.desired_velocity = Vec3::new(axes.x, 0.0, axes.y) * config.max_speed;
    }

    /// Latch a jump request. Multiple requests before a step collapse into one.
    pub fn request_jump(&mut self) {
        self.desired_jump = true;
    }

    // === Contact stage ===

    /// Record contact normals reported by the physics engine.
    ///
    /// Returns how many of them counted as ground.
    pub fn accumulate_contacts<I>(&mut self, normals: I, config: &LocomotionConfig) -> u32
    where
        I: IntoIterator<Item = Vec3>,
    {
        self.contacts
            .accumulate(normals, config.min_ground_dot_product())
    }

    // === Fixed step ===

    /// Run one fixed step and return the velocity to assign to the body.
    ///
    /// `body_velocity` and `body_position` are the body's current state as
    /// integrated by the physics engine; `dt` is the fixed step duration.
    pub fn fixed_step<P>(
        &mut self,
        config: &LocomotionConfig,
        body_velocity: Vec3,
        body_position: Vec3,
        dt: f32,
        probe: &P,
    ) -> Vec3
    where
        P: GroundProbe + ?Sized,
    {
        self.update_state(config, body_velocity, body_position, probe);
        self.adjust_velocity(config, dt);

        if std::mem::take(&mut self.desired_jump) {
            self.jump(config);
        }

        self.clear_state();
        self.velocity
    }

    fn update_state<P>(
        &mut self,
        config: &LocomotionConfig,
        body_velocity: Vec3,
        body_position: Vec3,
        probe: &P,
    ) where
        P: GroundProbe + ?Sized,
    {
        self.steps_since_last_grounded = self.steps_since_last_grounded.saturating_add(1);
        self.steps_since_last_jump = self.steps_since_last_jump.saturating_add(1);
        self.velocity = body_velocity;

        if self.contacts.is_grounded() || self.snap_to_ground(config, body_position, probe) {
            self.steps_since_last_grounded = 0;
            self.jump_phase = 0;
            if self.contacts.ground_contact_count() > 1 {
                let normal = self.contacts.contact_normal().normalize_or_zero();
                if normal == Vec3::ZERO {
                    debug!(
                        "{} ground contacts cancel out, using world up as contact normal",
                        self.contacts.ground_contact_count()
                    );
                    self.contacts.set_normal(Vec3::Y);
                } else {
                    self.contacts.set_normal(normal);
                }
            }
            self.ground_state = GroundState::Grounded;
        } else {
            self.contacts.set_normal(Vec3::Y);
            self.ground_state = GroundState::Airborne;
        }
    }

    /// Try to reclassify a body that just lost contact as grounded.
    fn snap_to_ground<P>(&mut self, config: &LocomotionConfig, position: Vec3, probe: &P) -> bool
    where
        P: GroundProbe + ?Sized,
    {
        if self.steps_since_last_grounded > 1 || self.steps_since_last_jump <= 2 {
            return false;
        }
        let speed = self.velocity.length();
        if speed > config.max_snap_speed {
            return false;
        }
        let Some(hit) = probe.cast_down(position, config.probe_distance, config.probe_mask) else {
            return false;
        };
        if !config.is_walkable(hit.normal) {
            return false;
        }

        self.contacts.set_single(hit.normal);
        let dot = self.velocity.dot(hit.normal);
        if dot != 0.0 {
            self.velocity = (self.velocity - hit.normal * dot).normalize_or_zero() * speed;
        }
        trace!(
            "snapped to ground {:.3} below, normal {:?}",
            hit.distance,
            hit.normal
        );
        true
    }

    /// Move lateral velocity toward the desired velocity within the
    /// acceleration budget, in the contact plane's basis.
    fn adjust_velocity(&mut self, config: &LocomotionConfig, dt: f32) {
        let normal = self.contacts.contact_normal();
        let x_axis = project_on_plane(Vec3::X, normal).normalize_or_zero();
        let z_axis = project_on_plane(Vec3::Z, normal).normalize_or_zero();

        let current_x = self.velocity.dot(x_axis);
        let current_z = self.velocity.dot(z_axis);

        let acceleration = if self.ground_state.is_grounded() {
            config.max_acceleration
        } else {
            config.max_air_acceleration
        };
        let max_speed_change = acceleration * dt;

        let new_x = move_towards(current_x, self.desired_velocity.x, max_speed_change);
        let new_z = move_towards(current_z, self.desired_velocity.z, max_speed_change);

        self.velocity += x_axis * (new_x - current_x) + z_axis * (new_z - current_z);
    }

    /// Apply a jump if the jump budget allows it. Returns whether it did.
    fn jump(&mut self, config: &LocomotionConfig) -> bool {
        if !self.ground_state.is_grounded() {
            if config.max_air_jumps == 0 || self.jump_phase > config.max_air_jumps {
                trace!("jump dropped at jump phase {}", self.jump_phase);
                return false;
            }
            // Leaving the ground without jumping spends the ground jump
            if self.jump_phase == 0 {
                self.jump_phase = 1;
            }
        }

        self.jump_phase += 1;
        self.steps_since_last_jump = 0;

        let normal = self.contacts.contact_normal();
        let mut jump_speed = jump_speed_for(self.gravity, config.jump_height);
        let aligned_speed = self.velocity.dot(normal);
        if aligned_speed > 0.0 {
            jump_speed = (jump_speed - aligned_speed).max(0.0);
        }
        self.velocity += normal * jump_speed;

        debug!(
            "jump {} ({:?}), added {:.3} along {:?}",
            self.jump_phase, self.ground_state, jump_speed, normal
        );
        true
    }

    fn clear_state(&mut self) {
        self.last_contacts = self.contacts.consume_and_reset();
    }

    /// Forget all step history, e.g. after a teleport or respawn.
    ///
    /// Keeps gravity and the desired velocity.
    pub fn reset(&mut self) {
        *self = Self {
            gravity: self.gravity,
            desired_velocity: self.desired_velocity,
            ..default()
        };
    }

    // === Accessors ===

    /// Velocity produced by the last step.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Lateral velocity requested by the latest intent.
    #[inline]
    pub fn desired_velocity(&self) -> Vec3 {
        self.desired_velocity
    }

    /// Ground state evaluated by the last step.
    #[inline]
    pub fn ground_state(&self) -> GroundState {
        self.ground_state
    }

    /// Whether the last step classified the body as grounded.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground_state.is_grounded()
    }

    /// Effective contact normal used by the last step (world up when airborne).
    #[inline]
    pub fn contact_normal(&self) -> Vec3 {
        self.last_contacts.normal
    }

    /// Ground contacts the last step was based on (1 after a snap).
    #[inline]
    pub fn last_ground_contact_count(&self) -> u32 {
        self.last_contacts.count
    }

    /// Ground contacts accumulated so far for the upcoming step.
    #[inline]
    pub fn pending_ground_contact_count(&self) -> u32 {
        self.contacts.ground_contact_count()
    }

    /// Jumps taken since the body was last grounded.
    #[inline]
    pub fn jump_phase(&self) -> u32 {
        self.jump_phase
    }

    /// Whether a jump request is waiting for the next step.
    #[inline]
    pub fn has_pending_jump(&self) -> bool {
        self.desired_jump
    }

    #[inline]
    pub fn steps_since_last_grounded(&self) -> u32 {
        self.steps_since_last_grounded
    }

    #[inline]
    pub fn steps_since_last_jump(&self) -> u32 {
        self.steps_since_last_jump
    }

    /// Probe hit stored for the next step by a backend, if any.
    #[inline]
    pub fn probe_hit(&self) -> Option<CollisionData> {
        self.probe_hit
    }
}

/// Speed needed to reach `height` against `gravity` (which must point down).
pub fn jump_speed_for(gravity: Vec3, height: f32) -> f32 {
    (-2.0 * gravity.y * height).max(0.0).sqrt()
}

#[inline]
fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    vector - normal * vector.dot(normal)
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}
