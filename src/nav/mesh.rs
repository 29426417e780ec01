//! Cells, directional edges, and mesh queries

use bitflags::bitflags;
use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use super::{Ladder, LadderId};

/// Handle to a cell in the navigation mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u32);

impl CellId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One of the two sides in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Alpha,
    Bravo,
}

impl Team {
    /// The opposing team
    #[must_use]
    pub fn other(self) -> Team {
        match self {
            Team::Alpha => Team::Bravo,
            Team::Bravo => Team::Alpha,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Team::Alpha => 0,
            Team::Bravo => 1,
        }
    }
}

/// Cardinal walk direction between adjacent cells (X east, Y north)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    North,
    East,
    South,
    West,
}

impl Dir {
    /// Unit vector of this direction in the ground plane
    #[must_use]
    pub fn vector(self) -> Vec2 {
        match self {
            Dir::North => Vec2::new(0.0, 1.0),
            Dir::East => Vec2::new(1.0, 0.0),
            Dir::South => Vec2::new(0.0, -1.0),
            Dir::West => Vec2::new(-1.0, 0.0),
        }
    }

    /// The reverse direction
    #[must_use]
    pub fn opposite(self) -> Dir {
        match self {
            Dir::North => Dir::South,
            Dir::East => Dir::West,
            Dir::South => Dir::North,
            Dir::West => Dir::East,
        }
    }
}

bitflags! {
    /// Cell attribute mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u16 {
        /// Agents must crouch to traverse this cell
        const CROUCH = 1 << 0;
        /// Agents must jump to traverse this cell
        const JUMP = 1 << 1;
        /// This cell is a staircase
        const STAIRS = 1 << 2;
        /// Agents must come to a stop before leaving this cell
        const STOP = 1 << 3;
        /// Agents must not jump while in this cell
        const NO_JUMP = 1 << 4;
        /// Follow the path exactly; no feeler adjustments
        const PRECISE = 1 << 5;
        /// Agents should run through this cell
        const RUN = 1 << 6;
        /// Agents should walk through this cell
        const WALK = 1 << 7;
        /// The cell currently overlaps fire or another hazard
        const DAMAGING = 1 << 8;
    }
}

/// Vertical slop when testing whether a position is inside a cell.
/// An agent may stand slightly below the floor plane (interpenetration)
/// or well above it (jumping, stair steps).
const CONTAIN_SLOP_BELOW: f32 = 18.0;
const CONTAIN_SLOP_ABOVE: f32 = 72.0;

/// Directional edge to an adjacent cell
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Destination cell
    pub to: CellId,
    /// Walk direction of the traversal
    pub dir: Dir,
}

/// An axis-aligned rectangular walkable region.
///
/// Corner heights allow sloped floors; `height_at` interpolates between
/// them. Corners are ordered (min.x,min.y), (max.x,min.y), (max.x,max.y),
/// (min.x,max.y).
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    min: Vec2,
    max: Vec2,
    corners: [f32; 4],
    flags: CellFlags,
    edges: SmallVec<[Edge; 4]>,
    ladders_up: SmallVec<[LadderId; 1]>,
    ladders_down: SmallVec<[LadderId; 1]>,
    /// Earliest time each team has occupied this cell (infinity if never)
    earliest_occupy: [f32; 2],
}

impl Cell {
    /// This cell's handle
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Attribute mask
    #[must_use]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    /// True if all the given attributes are set
    #[must_use]
    pub fn has(&self, flags: CellFlags) -> bool {
        self.flags.contains(flags)
    }

    /// True if the cell currently overlaps a hazard
    #[must_use]
    pub fn is_damaging(&self) -> bool {
        self.flags.contains(CellFlags::DAMAGING)
    }

    /// Center of the cell, on the floor
    #[must_use]
    pub fn center(&self) -> Vec3 {
        let mid = (self.min + self.max) * 0.5;
        mid.extend(self.height_at(mid))
    }

    /// Floor height at the given (clamped) 2D position, by bilinear
    /// interpolation of the corner heights
    #[must_use]
    pub fn height_at(&self, pos: Vec2) -> f32 {
        let size = self.max - self.min;
        let u = if size.x > f32::EPSILON {
            ((pos.x - self.min.x) / size.x).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let v = if size.y > f32::EPSILON {
            ((pos.y - self.min.y) / size.y).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let south = self.corners[0] + (self.corners[1] - self.corners[0]) * u;
        let north = self.corners[3] + (self.corners[2] - self.corners[3]) * u;
        south + (north - south) * v
    }

    /// True if the position is within the cell footprint and near its floor
    #[must_use]
    pub fn contains(&self, pos: Vec3) -> bool {
        if pos.x < self.min.x || pos.x > self.max.x || pos.y < self.min.y || pos.y > self.max.y {
            return false;
        }
        let floor = self.height_at(pos.truncate());
        pos.z >= floor - CONTAIN_SLOP_BELOW && pos.z <= floor + CONTAIN_SLOP_ABOVE
    }

    /// Closest point inside the cell to the given position, on the floor
    #[must_use]
    pub fn closest_point(&self, pos: Vec3) -> Vec3 {
        let clamped = pos.truncate().clamp(self.min, self.max);
        clamped.extend(self.height_at(clamped))
    }

    /// Directional edges out of this cell
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Ladders whose bottom is in this cell (traversed upward)
    #[must_use]
    pub fn ladders_up(&self) -> &[LadderId] {
        &self.ladders_up
    }

    /// Ladders whose top touches this cell (traversed downward)
    #[must_use]
    pub fn ladders_down(&self) -> &[LadderId] {
        &self.ladders_down
    }

    /// Earliest time the given team has occupied this cell, or infinity
    #[must_use]
    pub fn earliest_occupy(&self, team: Team) -> f32 {
        self.earliest_occupy[team.index()]
    }

    /// 2D extent of the cell
    #[must_use]
    pub fn extent(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }
}

/// The navigation mesh: all cells and ladders plus spatial queries
#[derive(Debug, Clone)]
pub struct NavMesh {
    cells: Vec<Cell>,
    ladders: Vec<Ladder>,
}

impl NavMesh {
    /// Look up a cell by handle
    #[must_use]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// Look up a ladder by handle
    #[must_use]
    pub fn ladder(&self, id: LadderId) -> &Ladder {
        &self.ladders[id.0 as usize]
    }

    /// Number of cells in the mesh
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// All cells
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// All ladders
    pub fn ladders(&self) -> impl Iterator<Item = &Ladder> {
        self.ladders.iter()
    }

    /// The cell containing the given position, if any.
    /// Prefers the cell whose floor is closest beneath the position.
    #[must_use]
    pub fn cell_at(&self, pos: Vec3) -> Option<CellId> {
        let mut best: Option<(CellId, f32)> = None;
        for cell in &self.cells {
            if !cell.contains(pos) {
                continue;
            }
            let gap = (pos.z - cell.height_at(pos.truncate())).abs();
            if best.is_none_or(|(_, g)| gap < g) {
                best = Some((cell.id, gap));
            }
        }
        best.map(|(id, _)| id)
    }

    /// The nearest cell within `max_radius` whose closest point is no more
    /// than `max_up` above the given position
    #[must_use]
    pub fn nearest_cell(&self, pos: Vec3, max_radius: f32, max_up: f32) -> Option<CellId> {
        let mut best: Option<(CellId, f32)> = None;
        for cell in &self.cells {
            let close = cell.closest_point(pos);
            if close.z - pos.z > max_up {
                continue;
            }
            let dist_sq = close.distance_squared(pos);
            if dist_sq > max_radius * max_radius {
                continue;
            }
            if best.is_none_or(|(_, d)| dist_sq < d) {
                best = Some((cell.id, dist_sq));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Floor height under the given position, from the containing cell
    #[must_use]
    pub fn ground_height(&self, pos: Vec3) -> Option<f32> {
        self.cell_at(pos)
            .map(|id| self.cell(id).height_at(pos.truncate()))
    }

    /// True if `from` has a directional edge to `to`
    #[must_use]
    pub fn connected(&self, from: CellId, to: CellId) -> bool {
        self.cell(from).edges.iter().any(|e| e.to == to)
    }

    /// Walk direction of the edge from `from` to `to`, if one exists
    #[must_use]
    pub fn edge_dir(&self, from: CellId, to: CellId) -> Option<Dir> {
        self.cell(from)
            .edges
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.dir)
    }

    /// Point on the shared boundary between two adjacent cells that keeps
    /// the path as straight as possible relative to `incoming`, clamped
    /// `margin` inside the portal ends. Height comes from the source cell.
    #[must_use]
    pub fn portal_point(
        &self,
        from: CellId,
        to: CellId,
        dir: Dir,
        incoming: Vec3,
        margin: f32,
    ) -> Vec3 {
        let a = self.cell(from);
        let b = self.cell(to);

        let point = match dir {
            Dir::East | Dir::West => {
                let x = if dir == Dir::East { a.max.x } else { a.min.x };
                let lo = a.min.y.max(b.min.y);
                let hi = a.max.y.min(b.max.y);
                let m = margin.min((hi - lo) * 0.5);
                Vec2::new(x, incoming.y.clamp(lo + m, hi - m))
            }
            Dir::North | Dir::South => {
                let y = if dir == Dir::North { a.max.y } else { a.min.y };
                let lo = a.min.x.max(b.min.x);
                let hi = a.max.x.min(b.max.x);
                let m = margin.min((hi - lo) * 0.5);
                Vec2::new(incoming.x.clamp(lo + m, hi - m), y)
            }
        };

        point.extend(a.height_at(point))
    }

    /// Record that a team occupied a cell at time `t`; keeps the minimum
    pub fn update_occupy(&mut self, id: CellId, team: Team, t: f32) {
        let slot = &mut self.cells[id.index()].earliest_occupy[team.index()];
        if t < *slot {
            *slot = t;
        }
    }

    /// Set or clear the damaging flag on a cell (fire, hazards)
    pub fn set_damaging(&mut self, id: CellId, damaging: bool) {
        let cell = &mut self.cells[id.index()];
        cell.flags.set(CellFlags::DAMAGING, damaging);
    }
}

/// Builds a [`NavMesh`] programmatically
#[derive(Debug, Default)]
pub struct NavMeshBuilder {
    cells: Vec<Cell>,
    ladders: Vec<Ladder>,
}

impl NavMeshBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flat rectangular cell at height `z`
    pub fn add_cell(&mut self, min: Vec2, max: Vec2, z: f32, flags: CellFlags) -> CellId {
        self.add_cell_sloped(min, max, [z; 4], flags)
    }

    /// Add a cell with explicit corner heights
    pub fn add_cell_sloped(
        &mut self,
        min: Vec2,
        max: Vec2,
        corners: [f32; 4],
        flags: CellFlags,
    ) -> CellId {
        let id = CellId(self.cells.len() as u32);
        self.cells.push(Cell {
            id,
            min,
            max,
            corners,
            flags,
            edges: SmallVec::new(),
            ladders_up: SmallVec::new(),
            ladders_down: SmallVec::new(),
            earliest_occupy: [f32::INFINITY; 2],
        });
        id
    }

    /// Connect two cells with edges in both directions
    pub fn connect(&mut self, a: CellId, b: CellId) {
        self.connect_one_way(a, b);
        self.connect_one_way(b, a);
    }

    /// Connect `a` to `b` only (a jump-down link: there is no way back)
    pub fn connect_one_way(&mut self, a: CellId, b: CellId) {
        let dir = self.infer_dir(a, b);
        self.cells[a.index()].edges.push(Edge { to: b, dir });
    }

    /// Add a ladder and wire it into the cells at each end
    #[allow(clippy::too_many_arguments)]
    pub fn add_ladder(
        &mut self,
        bottom: Vec3,
        top: Vec3,
        normal: Vec2,
        bottom_cell: CellId,
        top_forward: Option<CellId>,
        top_left: Option<CellId>,
        top_right: Option<CellId>,
        top_behind: Option<CellId>,
    ) -> LadderId {
        let id = LadderId(self.ladders.len() as u32);
        self.ladders.push(Ladder {
            id,
            top,
            bottom,
            normal: normal.normalize_or_zero(),
            top_forward,
            top_left,
            top_right,
            top_behind,
            bottom_cell,
        });

        self.cells[bottom_cell.index()].ladders_up.push(id);
        for top_cell in [top_forward, top_left, top_right, top_behind]
            .into_iter()
            .flatten()
        {
            self.cells[top_cell.index()].ladders_down.push(id);
        }
        id
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> NavMesh {
        NavMesh {
            cells: self.cells,
            ladders: self.ladders,
        }
    }

    fn infer_dir(&self, a: CellId, b: CellId) -> Dir {
        let from = (self.cells[a.index()].min + self.cells[a.index()].max) * 0.5;
        let to = (self.cells[b.index()].min + self.cells[b.index()].max) * 0.5;
        let delta = to - from;
        if delta.x.abs() >= delta.y.abs() {
            if delta.x >= 0.0 { Dir::East } else { Dir::West }
        } else if delta.y >= 0.0 {
            Dir::North
        } else {
            Dir::South
        }
    }
}
