//! Probe hit data.
//!
//! Ray casts issued by a backend (or by a test) report their result as a
//! [`CollisionData`]. The controller only reads the distance and normal;
//! point and entity are kept for callers that want to inspect the ground.

use bevy::prelude::*;

/// Information about a ray cast hit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point, pointing away from the surface.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if known).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a hit result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Up component of the hit normal (projection onto world +Y).
    #[inline]
    pub fn up_component(&self) -> f32 {
        self.normal.y
    }
}
