//! Path resolution: cell chains to concrete world positions
//!
//! The planner produces cells and traversal kinds; this pass pins each
//! node to a point. Walk nodes land on the shared portal between cells
//! (kept as straight as possible), ladder nodes land on mount points,
//! and one-way drops get pushed past the ledge with a synthetic landing
//! node inserted below. Resolution is a pure function of the chain:
//! running it again over an already-resolved path changes nothing.

use glam::Vec3;

use crate::config::Tunables;
use crate::nav::{Cell, CellId, Ladder, NavMesh};
use crate::sim::TraceWorld;

use super::{How, PathNode};

/// Errors raised while resolving a cell chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// The chain had no nodes
    EmptyChain,
    /// Adjacent chain cells claim a ladder traversal but share no ladder
    LadderNotFound { from: CellId, to: CellId },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::EmptyChain => write!(f, "cannot resolve an empty chain"),
            ResolveError::LadderNotFound { from, to } => {
                write!(f, "no ladder connects cell {} to cell {}", from.0, to.0)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Assign a world position to every node of a cell chain.
///
/// May grow the chain: a one-way drop inserts a landing node on the
/// floor below, up to `max_path_length`. Node 0 is pinned to its cell
/// center.
///
/// # Errors
///
/// Returns [`ResolveError::LadderNotFound`] when a ladder traversal has
/// no matching ladder between its cells.
pub fn resolve_positions(
    mesh: &NavMesh,
    trace: &dyn TraceWorld,
    nodes: &mut Vec<PathNode>,
    tun: &Tunables,
) -> Result<(), ResolveError> {
    if nodes.is_empty() {
        return Err(ResolveError::EmptyChain);
    }

    nodes[0].pos = mesh.cell(nodes[0].cell).center();

    let mut i = 1;
    while i < nodes.len() {
        let prev = nodes[i - 1];
        let node = nodes[i];

        match node.how {
            How::Walk(dir) => {
                let portal =
                    mesh.portal_point(prev.cell, node.cell, dir, prev.pos, tun.body.half_width);
                let mut xy = portal.truncate() + dir.vector() * tun.path.step_in_dist;

                // one-way edge means a drop; push past the ledge and land below
                let drop = !mesh.connected(node.cell, prev.cell);
                if drop {
                    xy += dir.vector() * tun.path.jump_down_push;
                }
                let from_cell = mesh.cell(prev.cell);
                nodes[i].pos = xy.extend(from_cell.height_at(xy));

                if drop {
                    let floor = mesh.cell(node.cell).height_at(xy);
                    let landing = PathNode {
                        cell: node.cell,
                        pos: xy.extend(floor),
                        ladder: None,
                        how: node.how,
                    };
                    // a landing node from an earlier resolution is reused,
                    // not duplicated
                    let already = nodes
                        .get(i + 1)
                        .is_some_and(|n| n.cell == node.cell && n.how == node.how);
                    if already {
                        nodes[i + 1].pos = landing.pos;
                    } else if nodes.len() < tun.path.max_path_length {
                        nodes.insert(i + 1, landing);
                    }
                    i += 1;
                }
            }
            How::LadderUp => {
                let ladder = mesh
                    .cell(prev.cell)
                    .ladders_up()
                    .iter()
                    .map(|&id| mesh.ladder(id))
                    .find(|l| l.is_mountable_top(node.cell))
                    .ok_or(ResolveError::LadderNotFound {
                        from: prev.cell,
                        to: node.cell,
                    })?;
                nodes[i].ladder = Some(ladder.id);
                let mount = ladder.bottom.truncate() + ladder.normal * 2.0 * tun.body.half_width;
                nodes[i].pos = mount.extend(ladder.bottom.z);
            }
            How::LadderDown => {
                let ladder = mesh
                    .cell(prev.cell)
                    .ladders_down()
                    .iter()
                    .map(|&id| mesh.ladder(id))
                    .find(|l| l.bottom_cell == node.cell)
                    .ok_or(ResolveError::LadderNotFound {
                        from: prev.cell,
                        to: node.cell,
                    })?;
                nodes[i].ladder = Some(ladder.id);
                let (approach, _behind) =
                    descend_approach_point(trace, ladder, mesh.cell(prev.cell), tun.body.half_width);
                nodes[i].pos = approach;
            }
            How::None => {}
        }

        i += 1;
    }

    Ok(())
}

/// Where to stand before backing onto a ladder from the top.
///
/// Prefers the point behind the climbing surface (mounting face-out);
/// when the probe from the ladder top to that point is blocked, falls
/// back to the front side (mounting face-in). The point is clamped into
/// the approach cell. Returns the point and whether it is the behind
/// side.
pub(crate) fn descend_approach_point(
    trace: &dyn TraceWorld,
    ladder: &Ladder,
    from: &Cell,
    half_width: f32,
) -> (Vec3, bool) {
    let offset = (ladder.normal * 2.0 * half_width).extend(0.0);
    let behind = ladder.top - offset;
    if trace.line_clear(ladder.top, behind) {
        (from.closest_point(behind), true)
    } else {
        (from.closest_point(ladder.top + offset), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{CellFlags, NavMeshBuilder};
    use crate::sim::OpenWorld;
    use glam::Vec2;

    fn walk_chain(cells: &[(u32, How)]) -> Vec<PathNode> {
        cells
            .iter()
            .map(|&(cell, how)| PathNode {
                cell: CellId(cell),
                pos: Vec3::ZERO,
                ladder: None,
                how,
            })
            .collect()
    }

    fn corridor() -> NavMesh {
        let mut b = NavMeshBuilder::new();
        let a = b.add_cell(Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0, CellFlags::empty());
        let c = b.add_cell(
            Vec2::new(100.0, 0.0),
            Vec2::new(200.0, 100.0),
            0.0,
            CellFlags::empty(),
        );
        b.connect(a, c);
        b.build()
    }

    #[test]
    fn test_walk_node_lands_past_portal() {
        let mesh = corridor();
        let tun = Tunables::default();
        let world = OpenWorld::new(&mesh);
        let mut nodes = walk_chain(&[(0, How::None), (1, How::Walk(crate::nav::Dir::East))]);
        resolve_positions(&mesh, &world, &mut nodes, &tun).unwrap();
        // portal is at x=100; the node steps into the destination cell
        assert!((nodes[1].pos.x - (100.0 + tun.path.step_in_dist)).abs() < 0.001);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_drop_inserts_landing_node() {
        let mut b = NavMeshBuilder::new();
        let ledge = b.add_cell(Vec2::ZERO, Vec2::new(100.0, 100.0), 200.0, CellFlags::empty());
        let floor = b.add_cell(
            Vec2::new(100.0, 0.0),
            Vec2::new(400.0, 100.0),
            0.0,
            CellFlags::empty(),
        );
        b.connect_one_way(ledge, floor);
        let mesh = b.build();
        let tun = Tunables::default();
        let world = OpenWorld::new(&mesh);

        let mut nodes = walk_chain(&[(0, How::None), (1, How::Walk(crate::nav::Dir::East))]);
        resolve_positions(&mesh, &world, &mut nodes, &tun).unwrap();

        assert_eq!(nodes.len(), 3);
        // the ledge node is pushed past the edge but stays at ledge height
        let push = 100.0 + tun.path.step_in_dist + tun.path.jump_down_push;
        assert!((nodes[1].pos.x - push).abs() < 0.001);
        assert_eq!(nodes[1].pos.z, 200.0);
        // the landing node sits on the lower floor directly below
        assert_eq!(nodes[2].pos.truncate(), nodes[1].pos.truncate());
        assert_eq!(nodes[2].pos.z, 0.0);
        assert_eq!(nodes[2].cell, floor);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut b = NavMeshBuilder::new();
        let ledge = b.add_cell(Vec2::ZERO, Vec2::new(100.0, 100.0), 200.0, CellFlags::empty());
        let floor = b.add_cell(
            Vec2::new(100.0, 0.0),
            Vec2::new(400.0, 100.0),
            0.0,
            CellFlags::empty(),
        );
        b.connect_one_way(ledge, floor);
        let mesh = b.build();
        let tun = Tunables::default();
        let world = OpenWorld::new(&mesh);

        let mut nodes = walk_chain(&[(0, How::None), (1, How::Walk(crate::nav::Dir::East))]);
        resolve_positions(&mesh, &world, &mut nodes, &tun).unwrap();
        let first: Vec<Vec3> = nodes.iter().map(|n| n.pos).collect();

        resolve_positions(&mesh, &world, &mut nodes, &tun).unwrap();
        let second: Vec<Vec3> = nodes.iter().map(|n| n.pos).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ladder_up_mount_point() {
        let mut b = NavMeshBuilder::new();
        let low = b.add_cell(Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0, CellFlags::empty());
        let high = b.add_cell(
            Vec2::new(-100.0, 0.0),
            Vec2::new(0.0, 100.0),
            128.0,
            CellFlags::empty(),
        );
        let ladder = b.add_ladder(
            Vec3::new(0.0, 50.0, 0.0),
            Vec3::new(0.0, 50.0, 128.0),
            Vec2::new(1.0, 0.0),
            low,
            Some(high),
            None,
            None,
            None,
        );
        let mesh = b.build();
        let tun = Tunables::default();
        let world = OpenWorld::new(&mesh);

        let mut nodes = walk_chain(&[(low.0, How::None), (high.0, How::LadderUp)]);
        resolve_positions(&mesh, &world, &mut nodes, &tun).unwrap();
        assert_eq!(nodes[1].ladder, Some(ladder));
        // mount point stands off the surface along the normal, at the bottom
        assert!((nodes[1].pos.x - 2.0 * tun.body.half_width).abs() < 0.001);
        assert_eq!(nodes[1].pos.z, 0.0);
    }

    #[test]
    fn test_missing_ladder_is_an_error() {
        let mesh = corridor();
        let tun = Tunables::default();
        let world = OpenWorld::new(&mesh);
        let mut nodes = walk_chain(&[(0, How::None), (1, How::LadderUp)]);
        let err = resolve_positions(&mesh, &world, &mut nodes, &tun).unwrap_err();
        assert_eq!(
            err,
            ResolveError::LadderNotFound {
                from: CellId(0),
                to: CellId(1),
            }
        );
    }
}
