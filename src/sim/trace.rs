//! Collision and visibility probes
//!
//! The decision engine never owns collision geometry; it asks a
//! [`TraceWorld`] for line-of-sight, swept-hull walkability, and ground
//! height. The two implementations here cover tests and the demo; a real
//! game would back this trait with its physics engine.

use glam::Vec3;

use crate::nav::NavMesh;

/// Result of a ground probe
#[derive(Debug, Clone, Copy)]
pub struct Ground {
    /// Floor height at the probe point
    pub height: f32,
    /// Floor surface normal
    pub normal: Vec3,
}

/// Collision/visibility probe surface consumed by the engine
pub trait TraceWorld {
    /// Fraction of the segment from `from` to `to` that is unobstructed
    /// (1.0 = fully clear, 0.0 = blocked at the start)
    fn line_fraction(&self, from: Vec3, to: Vec3) -> f32;

    /// True if the straight segment is fully unobstructed
    fn line_clear(&self, from: Vec3, to: Vec3) -> bool {
        self.line_fraction(from, to) >= 1.0
    }

    /// True if a box of the given half-extent swept along the segment is
    /// unobstructed
    fn hull_clear(&self, from: Vec3, to: Vec3, half_extent: Vec3) -> bool;

    /// Ground height and normal under the given position
    fn ground(&self, pos: Vec3) -> Option<Ground>;
}

/// A world with no obstructions; ground comes from the mesh
pub struct OpenWorld<'a> {
    mesh: &'a NavMesh,
}

impl<'a> OpenWorld<'a> {
    #[must_use]
    pub fn new(mesh: &'a NavMesh) -> Self {
        Self { mesh }
    }
}

impl TraceWorld for OpenWorld<'_> {
    fn line_fraction(&self, _from: Vec3, _to: Vec3) -> f32 {
        1.0
    }

    fn hull_clear(&self, _from: Vec3, _to: Vec3, _half_extent: Vec3) -> bool {
        true
    }

    fn ground(&self, pos: Vec3) -> Option<Ground> {
        self.mesh.ground_height(pos).map(|height| Ground {
            height,
            normal: Vec3::Z,
        })
    }
}

/// Axis-aligned blocker box
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Grow the box by a half-extent on every side
    #[must_use]
    pub fn inflated(&self, half_extent: Vec3) -> Aabb {
        Aabb {
            min: self.min - half_extent,
            max: self.max + half_extent,
        }
    }

    /// Entry fraction of the segment into this box, if it intersects.
    /// A segment starting inside returns 0.0.
    #[must_use]
    pub fn segment_entry(&self, from: Vec3, to: Vec3) -> Option<f32> {
        let delta = to - from;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;

        for axis in 0..3 {
            let d = delta[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];
            let p = from[axis];
            if d.abs() < f32::EPSILON {
                if p < lo || p > hi {
                    return None;
                }
            } else {
                let mut t0 = (lo - p) / d;
                let mut t1 = (hi - p) / d;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return None;
                }
            }
        }

        Some(t_min.max(0.0))
    }
}

/// A world obstructed by a set of axis-aligned boxes; ground comes from
/// the mesh. Used by tests to inject walls and by the demo for cover.
pub struct BlockedWorld<'a> {
    mesh: &'a NavMesh,
    blockers: Vec<Aabb>,
}

impl<'a> BlockedWorld<'a> {
    #[must_use]
    pub fn new(mesh: &'a NavMesh, blockers: Vec<Aabb>) -> Self {
        Self { mesh, blockers }
    }
}

impl TraceWorld for BlockedWorld<'_> {
    fn line_fraction(&self, from: Vec3, to: Vec3) -> f32 {
        let mut fraction = 1.0_f32;
        for b in &self.blockers {
            if let Some(entry) = b.segment_entry(from, to) {
                fraction = fraction.min(entry);
            }
        }
        fraction
    }

    fn hull_clear(&self, from: Vec3, to: Vec3, half_extent: Vec3) -> bool {
        self.blockers
            .iter()
            .all(|b| b.inflated(half_extent).segment_entry(from, to).is_none())
    }

    fn ground(&self, pos: Vec3) -> Option<Ground> {
        self.mesh.ground_height(pos).map(|height| Ground {
            height,
            normal: Vec3::Z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{CellFlags, NavMeshBuilder};
    use glam::Vec2;

    #[test]
    fn test_segment_entry_hits_box() {
        let b = Aabb::new(Vec3::new(10.0, -5.0, -5.0), Vec3::new(20.0, 5.0, 5.0));
        let entry = b
            .segment_entry(Vec3::ZERO, Vec3::new(40.0, 0.0, 0.0))
            .unwrap();
        assert!((entry - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_segment_entry_misses_box() {
        let b = Aabb::new(Vec3::new(10.0, -5.0, -5.0), Vec3::new(20.0, 5.0, 5.0));
        assert!(
            b.segment_entry(Vec3::new(0.0, 50.0, 0.0), Vec3::new(40.0, 50.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn test_segment_starting_inside_is_blocked_at_zero() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let entry = b.segment_entry(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        assert_eq!(entry, 0.0);
    }

    #[test]
    fn test_blocked_world_line_probe() {
        let mut builder = NavMeshBuilder::new();
        builder.add_cell(Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0, CellFlags::empty());
        let mesh = builder.build();

        let wall = Aabb::new(Vec3::new(40.0, 0.0, 0.0), Vec3::new(60.0, 100.0, 100.0));
        let world = BlockedWorld::new(&mesh, vec![wall]);

        assert!(!world.line_clear(Vec3::new(0.0, 50.0, 30.0), Vec3::new(100.0, 50.0, 30.0)));
        assert!(world.line_clear(Vec3::new(0.0, 50.0, 30.0), Vec3::new(30.0, 50.0, 30.0)));
    }
}
