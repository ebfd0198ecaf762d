//! Controller configuration.
//!
//! [`LocomotionConfig`] holds the tuning surface of a controller: speeds,
//! acceleration budgets, ground snapping, slope limit and jumping. The slope
//! limit is stored as an angle and cached as the cosine the controller
//! compares contact normals against.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collision groups the ground probe is allowed to hit.
///
/// Bit `n` set means group `n` participates in ground probing. Backends map
/// this onto their own filtering (Rapier `CollisionGroups` filters).
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeMask(pub u32);

impl ProbeMask {
    /// Every group.
    pub const ALL: Self = Self(u32::MAX);
    /// No group. The probe never hits.
    pub const NONE: Self = Self(0);

    /// Mask containing only the given group index (0..32).
    ///
    /// Indices of 32 and above give [`ProbeMask::NONE`], so a probe using
    /// such a mask never hits anything.
    pub fn group(index: u32) -> Self {
        Self(1u32.checked_shl(index).unwrap_or(0))
    }

    /// Add a group index to the mask.
    pub fn with_group(self, index: u32) -> Self {
        Self(self.0 | Self::group(index).0)
    }

    /// Whether any of `memberships` is accepted by this mask.
    #[inline]
    pub fn accepts(&self, memberships: u32) -> bool {
        self.0 & memberships != 0
    }

    /// Raw bits.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl Default for ProbeMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A configuration value outside of the range the controller is tuned for.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} = {value} is outside of [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
}

const SPEED_RANGE: (f32, f32) = (0.0, 100.0);
const JUMP_HEIGHT_RANGE: (f32, f32) = (0.0, 10.0);
const GROUND_ANGLE_RANGE: (f32, f32) = (0.0, 90.0);

/// Upper bound for [`LocomotionConfig::max_air_jumps`].
pub const MAX_AIR_JUMPS_LIMIT: u32 = 5;

/// Configuration parameters for a locomotion controller.
///
/// Values are expected to be validated (see [`LocomotionConfig::validate`])
/// or clamped (see [`LocomotionConfig::clamped`]) before they reach the
/// controller; the per-step algorithm does not check them.
///
/// Mutating `max_ground_angle` directly leaves the cached dot product stale
/// until [`LocomotionConfig::refresh`] runs. The plugin does that for
/// components edited in place; the setters and builders do it themselves.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(from = "LocomotionConfigData", into = "LocomotionConfigData")]
pub struct LocomotionConfig {
    /// Lateral speed reached at full intent (units/second).
    pub max_speed: f32,

    /// Lateral acceleration budget while grounded (units/second^2).
    pub max_acceleration: f32,

    /// Lateral acceleration budget while airborne (units/second^2).
    pub max_air_acceleration: f32,

    /// Above this speed the body is never snapped back onto the ground.
    pub max_snap_speed: f32,

    /// Length of the downward ground probe ray.
    pub probe_distance: f32,

    /// Height reached by a jump from rest under the current gravity.
    pub jump_height: f32,

    /// Jumps allowed after leaving the ground, on top of the ground jump.
    pub max_air_jumps: u32,

    /// Steepest walkable slope, in degrees.
    pub max_ground_angle: f32,

    /// Groups the ground probe can hit.
    pub probe_mask: ProbeMask,

    /// Cosine of `max_ground_angle`. Contacts whose normal has at least this
    /// much up component count as ground.
    #[reflect(ignore)]
    min_ground_dot_product: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            max_acceleration: 10.0,
            max_air_acceleration: 1.0,
            max_snap_speed: 100.0,
            probe_distance: 1.0,
            jump_height: 2.0,
            max_air_jumps: 0,
            max_ground_angle: 25.0,
            probe_mask: ProbeMask::ALL,
            min_ground_dot_product: ground_dot_for(25.0),
        }
    }
}

fn ground_dot_for(angle_degrees: f32) -> f32 {
    angle_degrees.to_radians().cos()
}

impl LocomotionConfig {
    /// Create a config optimized for responsive player control.
    pub fn player() -> Self {
        Self {
            max_acceleration: 40.0,
            max_air_acceleration: 4.0,
            jump_height: 2.0,
            max_ground_angle: 40.0,
            ..default()
        }
        .refreshed()
    }

    /// Create a config with two air jumps and stronger air control.
    pub fn agile() -> Self {
        Self {
            max_acceleration: 60.0,
            max_air_acceleration: 20.0,
            max_air_jumps: 2,
            max_ground_angle: 45.0,
            ..default()
        }
        .refreshed()
    }

    /// Cached cosine of the max ground angle.
    #[inline]
    pub fn min_ground_dot_product(&self) -> f32 {
        self.min_ground_dot_product
    }

    /// Whether a surface normal is walkable under this config.
    #[inline]
    pub fn is_walkable(&self, normal: Vec3) -> bool {
        normal.y >= self.min_ground_dot_product
    }

    /// Recompute the cached dot product from `max_ground_angle`.
    pub fn refresh(&mut self) {
        self.min_ground_dot_product = ground_dot_for(self.max_ground_angle);
    }

    /// Whether the cached dot product disagrees with `max_ground_angle`.
    pub fn needs_refresh(&self) -> bool {
        self.min_ground_dot_product != ground_dot_for(self.max_ground_angle)
    }

    fn refreshed(mut self) -> Self {
        self.refresh();
        self
    }

    /// Set the max ground angle (degrees) and recompute the cached dot product.
    pub fn set_max_ground_angle(&mut self, degrees: f32) {
        self.max_ground_angle = degrees;
        self.refresh();
    }

    /// Check every field against its tuning range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("max_speed", self.max_speed, SPEED_RANGE)?;
        check("max_acceleration", self.max_acceleration, SPEED_RANGE)?;
        check("max_air_acceleration", self.max_air_acceleration, SPEED_RANGE)?;
        check("max_snap_speed", self.max_snap_speed, SPEED_RANGE)?;
        check("probe_distance", self.probe_distance, (0.0, f32::MAX))?;
        check("jump_height", self.jump_height, JUMP_HEIGHT_RANGE)?;
        check("max_ground_angle", self.max_ground_angle, GROUND_ANGLE_RANGE)?;
        if self.max_air_jumps > MAX_AIR_JUMPS_LIMIT {
            return Err(ConfigError::OutOfRange {
                field: "max_air_jumps",
                value: self.max_air_jumps as f32,
                min: 0.0,
                max: MAX_AIR_JUMPS_LIMIT as f32,
            });
        }
        Ok(())
    }

    /// Return a copy with every field forced into its tuning range.
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let clamped = Self {
            max_speed: clamp_field(self.max_speed, defaults.max_speed, SPEED_RANGE),
            max_acceleration: clamp_field(
                self.max_acceleration,
                defaults.max_acceleration,
                SPEED_RANGE,
            ),
            max_air_acceleration: clamp_field(
                self.max_air_acceleration,
                defaults.max_air_acceleration,
                SPEED_RANGE,
            ),
            max_snap_speed: clamp_field(self.max_snap_speed, defaults.max_snap_speed, SPEED_RANGE),
            probe_distance: clamp_field(
                self.probe_distance,
                defaults.probe_distance,
                (0.0, f32::MAX),
            ),
            jump_height: clamp_field(self.jump_height, defaults.jump_height, JUMP_HEIGHT_RANGE),
            max_air_jumps: self.max_air_jumps.min(MAX_AIR_JUMPS_LIMIT),
            max_ground_angle: clamp_field(
                self.max_ground_angle,
                defaults.max_ground_angle,
                GROUND_ANGLE_RANGE,
            ),
            probe_mask: self.probe_mask,
            min_ground_dot_product: 0.0,
        }
        .refreshed();

        if clamped != self.refreshed() {
            debug!("locomotion config clamped into tuning range: {:?}", clamped);
        }
        clamped
    }

    /// Builder: set max speed.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Builder: set ground and air acceleration budgets.
    pub fn with_acceleration(mut self, ground: f32, air: f32) -> Self {
        self.max_acceleration = ground;
        self.max_air_acceleration = air;
        self
    }

    /// Builder: set max snap speed.
    pub fn with_max_snap_speed(mut self, speed: f32) -> Self {
        self.max_snap_speed = speed;
        self
    }

    /// Builder: set ground probe distance.
    pub fn with_probe_distance(mut self, distance: f32) -> Self {
        self.probe_distance = distance;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set the number of air jumps.
    pub fn with_max_air_jumps(mut self, jumps: u32) -> Self {
        self.max_air_jumps = jumps;
        self
    }

    /// Builder: set max ground angle in degrees.
    pub fn with_max_ground_angle(mut self, degrees: f32) -> Self {
        self.set_max_ground_angle(degrees);
        self
    }

    /// Builder: set the probe mask.
    pub fn with_probe_mask(mut self, mask: ProbeMask) -> Self {
        self.probe_mask = mask;
        self
    }
}

fn check(field: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn clamp_field(value: f32, fallback: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Serialized form of [`LocomotionConfig`] without the derived dot product.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct LocomotionConfigData {
    max_speed: f32,
    max_acceleration: f32,
    max_air_acceleration: f32,
    max_snap_speed: f32,
    probe_distance: f32,
    jump_height: f32,
    max_air_jumps: u32,
    max_ground_angle: f32,
    probe_mask: ProbeMask,
}

impl Default for LocomotionConfigData {
    fn default() -> Self {
        LocomotionConfig::default().into()
    }
}

impl From<LocomotionConfigData> for LocomotionConfig {
    fn from(data: LocomotionConfigData) -> Self {
        Self {
            max_speed: data.max_speed,
            max_acceleration: data.max_acceleration,
            max_air_acceleration: data.max_air_acceleration,
            max_snap_speed: data.max_snap_speed,
            probe_distance: data.probe_distance,
            jump_height: data.jump_height,
            max_air_jumps: data.max_air_jumps,
            max_ground_angle: data.max_ground_angle,
            probe_mask: data.probe_mask,
            min_ground_dot_product: 0.0,
        }
        .refreshed()
    }
}

impl From<LocomotionConfig> for LocomotionConfigData {
    fn from(config: LocomotionConfig) -> Self {
        Self {
            max_speed: config.max_speed,
            max_acceleration: config.max_acceleration,
            max_air_acceleration: config.max_air_acceleration,
            max_snap_speed: config.max_snap_speed,
            probe_distance: config.probe_distance,
            jump_height: config.jump_height,
            max_air_jumps: config.max_air_jumps,
            max_ground_angle: config.max_ground_angle,
            probe_mask: config.probe_mask,
        }
    }
}
