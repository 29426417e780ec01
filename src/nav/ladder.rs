//! Ladder objects connecting cells vertically

use glam::{Vec2, Vec3};

use super::CellId;

/// Handle to a ladder in the navigation mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LadderId(pub u32);

/// A vertical traversal link between cells.
///
/// The surface normal points away from the climbing surface, toward an
/// agent that is facing the ladder. Up to four cells may touch the top
/// (forward/left/right/behind relative to the normal); exactly one cell
/// sits at the bottom.
#[derive(Debug, Clone)]
pub struct Ladder {
    /// This ladder's handle
    pub id: LadderId,
    /// World position of the top of the climbable surface
    pub top: Vec3,
    /// World position of the bottom of the climbable surface
    pub bottom: Vec3,
    /// Horizontal unit normal of the climbing surface
    pub normal: Vec2,
    /// Cell the climb tops out into, on the far side of the surface
    /// (opposite the normal)
    pub top_forward: Option<CellId>,
    /// Cell to the climber's left at the top
    pub top_left: Option<CellId>,
    /// Cell to the climber's right at the top
    pub top_right: Option<CellId>,
    /// Cell on the normal side of the top, above the climbing face
    pub top_behind: Option<CellId>,
    /// Cell at the bottom
    pub bottom_cell: CellId,
}

impl Ladder {
    /// Climbable length of the ladder
    #[must_use]
    pub fn length(&self) -> f32 {
        self.top.z - self.bottom.z
    }

    /// Point on the ladder axis at the given height, clamped to its extent
    #[must_use]
    pub fn pos_at_height(&self, z: f32) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            return self.bottom;
        }
        let t = ((z - self.bottom.z) / len).clamp(0.0, 1.0);
        self.bottom.lerp(self.top, t)
    }

    /// True if the given cell touches the top of this ladder in a
    /// mountable orientation (behind is excluded; it cannot be entered
    /// while ascending)
    #[must_use]
    pub fn is_mountable_top(&self, cell: CellId) -> bool {
        self.top_forward == Some(cell)
            || self.top_left == Some(cell)
            || self.top_right == Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Ladder {
        Ladder {
            id: LadderId(0),
            top: Vec3::new(0.0, 0.0, 128.0),
            bottom: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec2::new(1.0, 0.0),
            top_forward: Some(CellId(1)),
            top_left: None,
            top_right: None,
            top_behind: Some(CellId(2)),
            bottom_cell: CellId(0),
        }
    }

    #[test]
    fn test_pos_at_height_clamps() {
        let l = ladder();
        assert_eq!(l.pos_at_height(-50.0).z, 0.0);
        assert_eq!(l.pos_at_height(64.0).z, 64.0);
        assert_eq!(l.pos_at_height(500.0).z, 128.0);
    }

    #[test]
    fn test_behind_cell_is_not_mountable() {
        let l = ladder();
        assert!(l.is_mountable_top(CellId(1)));
        assert!(!l.is_mountable_top(CellId(2)));
    }
}
