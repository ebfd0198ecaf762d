//! Ground contact accumulation.
//!
//! Physics engines report contacts whenever they feel like it: zero, one or
//! several times before the controller's fixed step runs. The accumulator
//! collects the walkable ones and is only zeroed once the step has consumed
//! it, so nothing reported between two steps is lost.

use bevy::prelude::*;

/// Summary of the walkable contacts gathered for one fixed step.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundContacts {
    /// Number of contact points that counted as ground.
    pub count: u32,
    /// Sum of their normals (or the effective normal once the step resolved it).
    pub normal: Vec3,
}

impl GroundContacts {
    /// Whether any ground contact was recorded.
    #[inline]
    pub fn any(&self) -> bool {
        self.count > 0
    }
}

/// Accumulates walkable contact normals between fixed steps.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactAccumulator {
    ground_contact_count: u32,
    contact_normal: Vec3,
}

impl ContactAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every normal whose up component reaches `min_ground_dot`.
    ///
    /// Steeper contacts (walls, ceilings) are ignored. Returns how many of
    /// the given normals counted as ground.
    pub fn accumulate<I>(&mut self, normals: I, min_ground_dot: f32) -> u32
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut added = 0;
        for normal in normals {
            if normal.y >= min_ground_dot {
                self.ground_contact_count += 1;
                self.contact_normal += normal;
                added += 1;
            }
        }
        added
    }

    /// Number of ground contacts accumulated so far.
    #[inline]
    pub fn ground_contact_count(&self) -> u32 {
        self.ground_contact_count
    }

    /// Current contact normal.
    #[inline]
    pub fn contact_normal(&self) -> Vec3 {
        self.contact_normal
    }

    /// Whether at least one ground contact was accumulated.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground_contact_count > 0
    }

    /// Replace the contents with a single contact (used by ground snapping).
    pub(crate) fn set_single(&mut self, normal: Vec3) {
        self.ground_contact_count = 1;
        self.contact_normal = normal;
    }

    /// Overwrite the normal without touching the count.
    pub(crate) fn set_normal(&mut self, normal: Vec3) {
        self.contact_normal = normal;
    }

    /// Return the accumulated contacts and zero the accumulator.
    pub fn consume_and_reset(&mut self) -> GroundContacts {
        let contacts = self.snapshot();
        *self = Self::default();
        contacts
    }

    /// Current contents without resetting.
    pub fn snapshot(&self) -> GroundContacts {
        GroundContacts {
            count: self.ground_contact_count,
            normal: self.contact_normal,
        }
    }
}
