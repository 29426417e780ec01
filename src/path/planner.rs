//! Route planning over the cell graph
//!
//! A* with a straight-line heuristic and deterministic tie-breaking
//! (equal scores pop in insertion order). When the goal is unreachable
//! the search still succeeds, returning the chain to the reachable cell
//! nearest the goal. Route character is a plain value handed to the
//! search rather than anything polymorphic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;
use log::debug;
use rand::Rng;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::agent::Agent;
use crate::nav::{CellId, LadderId, NavMesh};
use crate::sim::TickCtx;

use super::resolve::{ResolveError, resolve_positions};
use super::{How, PathNode};

/// What kind of route to prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Shortest travel distance, hazards ignored
    Fastest,
    /// Strongly avoid hazardous and slow cells
    Safest,
}

/// Edge cost strategy, parameterized by route kind
#[derive(Debug, Clone, Copy)]
pub struct PathCost {
    route: RouteKind,
}

impl PathCost {
    #[must_use]
    pub fn new(route: RouteKind) -> Self {
        Self { route }
    }

    /// Cost of traversing from `from` into `to`
    #[must_use]
    pub fn edge(&self, mesh: &NavMesh, from: CellId, to: CellId, how: How) -> f32 {
        let to_cell = mesh.cell(to);

        let mut cost = match how {
            How::LadderUp | How::LadderDown => {
                // climbing is slow relative to ground distance covered
                let ladder_len = (to_cell.center().z - mesh.cell(from).center().z).abs();
                ladder_len.max(1.0) * 2.0
            }
            _ => mesh.cell(from).center().distance(to_cell.center()),
        };

        if self.route == RouteKind::Safest {
            if to_cell.is_damaging() {
                cost *= 100.0;
            }
            if to_cell.has(crate::nav::CellFlags::CROUCH) {
                cost *= 2.0;
            }
            if to_cell.has(crate::nav::CellFlags::JUMP) {
                cost *= 2.0;
            }
        }

        cost
    }
}

/// One step of a planned chain: the cell, how it is entered, and the
/// ladder used (for ladder traversals)
pub type ChainStep = (CellId, How, Option<LadderId>);

// Min-heap entry: reversed ordering on f, then FIFO on insertion order
// so repeated searches over the same mesh produce the same chain.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenNode {
    f: f32,
    order: u64,
    cell: CellId,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn successors(mesh: &NavMesh, cell: CellId) -> SmallVec<[ChainStep; 8]> {
    let c = mesh.cell(cell);
    let mut out = SmallVec::new();
    for e in c.edges() {
        out.push((e.to, How::Walk(e.dir), None));
    }
    for &lid in c.ladders_up() {
        let l = mesh.ladder(lid);
        for top in [l.top_forward, l.top_left, l.top_right].into_iter().flatten() {
            out.push((top, How::LadderUp, Some(lid)));
        }
    }
    for &lid in c.ladders_down() {
        out.push((mesh.ladder(lid).bottom_cell, How::LadderDown, Some(lid)));
    }
    out
}

/// Find a chain of cells from `start` toward `goal`.
///
/// Returns the chain (always starting with `start`) and whether the goal
/// itself was reached. On an unreachable goal the chain ends at the
/// reachable cell closest to `goal_pos`.
#[must_use]
pub fn search(
    mesh: &NavMesh,
    start: CellId,
    goal: CellId,
    goal_pos: Vec3,
    cost: &PathCost,
) -> (Vec<ChainStep>, bool) {
    let mut open = BinaryHeap::new();
    let mut g: FxHashMap<CellId, f32> = FxHashMap::default();
    let mut came: FxHashMap<CellId, ChainStep> = FxHashMap::default();
    let mut order = 0_u64;

    let h = |cell: CellId| mesh.cell(cell).center().distance(goal_pos);

    g.insert(start, 0.0);
    open.push(OpenNode {
        f: h(start),
        order,
        cell: start,
    });

    let mut closest = (h(start), start);
    let mut reached = false;

    while let Some(OpenNode { cell, .. }) = open.pop() {
        if cell == goal {
            reached = true;
            break;
        }
        let g_here = g[&cell];

        for (next, how, ladder) in successors(mesh, cell) {
            let tentative = g_here + cost.edge(mesh, cell, next, how);
            if g.get(&next).is_none_or(|&known| tentative < known) {
                g.insert(next, tentative);
                came.insert(next, (cell, how, ladder));
                let heuristic = h(next);
                if heuristic < closest.0 {
                    closest = (heuristic, next);
                }
                order += 1;
                open.push(OpenNode {
                    f: tentative + heuristic,
                    order,
                    cell: next,
                });
            }
        }
    }

    let end = if reached { goal } else { closest.1 };
    let mut chain = vec![(end, How::None, None)];
    let mut cur = end;
    while cur != start {
        let (prev, how, ladder) = came[&cur];
        let last = chain.len() - 1;
        chain[last].1 = how;
        chain[last].2 = ladder;
        chain.push((prev, How::None, None));
        cur = prev;
    }
    chain.reverse();
    (chain, reached)
}

/// Errors raised by [`Agent::compute_path`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The repath throttle window has not elapsed; the existing path is
    /// left untouched
    Throttled,
    /// No cell could be anchored under or near the agent
    NoStartCell,
    /// No cell exists anywhere near the goal position
    NoGoalCell,
    /// The chain could not be resolved to world positions
    Resolve(ResolveError),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::Throttled => write!(f, "repath throttled"),
            PlanError::NoStartCell => write!(f, "no cell near the agent"),
            PlanError::NoGoalCell => write!(f, "no cell near the goal"),
            PlanError::Resolve(e) => write!(f, "resolve failed: {e}"),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<ResolveError> for PlanError {
    fn from(e: ResolveError) -> Self {
        PlanError::Resolve(e)
    }
}

impl Agent {
    /// Plan a new path to `goal` and start following it.
    ///
    /// Throttled: calls inside the repath window return
    /// [`PlanError::Throttled`] and leave the current path untouched.
    /// A goal in the agent's own cell produces a two-node direct path.
    /// An unreachable goal is not an error; the path ends at the
    /// reachable cell nearest the goal.
    ///
    /// # Errors
    ///
    /// See [`PlanError`].
    pub fn compute_path(
        &mut self,
        ctx: &mut TickCtx,
        goal: Vec3,
        route: RouteKind,
    ) -> Result<(), PlanError> {
        if !self.repath.is_elapsed(ctx.now) {
            return Err(PlanError::Throttled);
        }
        let window = ctx
            .rng
            .gen_range(ctx.tun.path.repath_interval_min..=ctx.tun.path.repath_interval_max);
        self.repath.start(ctx.now, window);

        self.destroy_path();

        let start = self.anchor_cell(ctx).ok_or(PlanError::NoStartCell)?;
        let goal_cell = ctx
            .mesh
            .nearest_cell(goal, f32::MAX, f32::INFINITY)
            .ok_or(PlanError::NoGoalCell)?;
        let end = Vec3::new(
            goal.x,
            goal.y,
            ctx.mesh.cell(goal_cell).height_at(goal.truncate()),
        );

        if start == goal_cell {
            self.build_direct_path(ctx.mesh, start, end);
        } else {
            let cost = PathCost::new(route);
            let (chain, reached) = search(ctx.mesh, start, goal_cell, end, &cost);
            if chain.len() < 2 {
                self.build_direct_path(ctx.mesh, start, end);
            } else {
                let cap = ctx.tun.path.max_path_length - 1;
                let mut nodes: Vec<PathNode> = chain
                    .into_iter()
                    .take(cap)
                    .map(|(cell, how, ladder)| PathNode {
                        cell,
                        pos: Vec3::ZERO,
                        ladder,
                        how,
                    })
                    .collect();
                resolve_positions(ctx.mesh, ctx.trace, &mut nodes, ctx.tun)?;

                // terminal node is the concrete goal point, not a cell center
                let last = nodes[nodes.len() - 1];
                let terminal = if reached && last.cell == goal_cell {
                    end
                } else {
                    ctx.mesh.cell(last.cell).closest_point(end)
                };
                if nodes.len() < ctx.tun.path.max_path_length {
                    nodes.push(PathNode {
                        cell: last.cell,
                        pos: terminal,
                        ladder: None,
                        how: How::None,
                    });
                } else {
                    let i = nodes.len() - 1;
                    nodes[i].pos = terminal;
                }
                *self.path.nodes_mut() = nodes;
            }
        }

        self.initial_encounter = if self.combat().is_none() {
            self.scan_initial_encounter(ctx.mesh)
        } else {
            None
        };

        self.cell_entered.start(ctx.now);
        self.set_path_cursor(ctx, 1);
        self.goal_pos = self.path.node(self.path.cursor()).pos;
        debug!(
            "agent {} planned {} nodes toward ({:.0}, {:.0}, {:.0})",
            self.id.0,
            self.path.len(),
            goal.x,
            goal.y,
            goal.z
        );
        Ok(())
    }

    /// Cell to start planning from. The tracked cell is reused unless its
    /// floor is out of vertical reach, in which case the agent re-anchors
    /// to the nearest reachable cell.
    fn anchor_cell(&self, ctx: &TickCtx) -> Option<CellId> {
        if let Some(id) = self.cell {
            let close = ctx.mesh.cell(id).closest_point(self.pos);
            if close.z - self.pos.z <= ctx.tun.body.jump_crouch_height {
                return Some(id);
            }
        }
        ctx.mesh
            .nearest_cell(self.pos, ctx.tun.path.snap_radius, ctx.tun.path.snap_height)
    }

    /// Two-node path straight to a goal in the agent's own cell
    fn build_direct_path(&mut self, mesh: &NavMesh, cell: CellId, end: Vec3) {
        let here = self
            .pos
            .truncate()
            .extend(mesh.cell(cell).height_at(self.pos.truncate()));
        let nodes = self.path.nodes_mut();
        nodes.push(PathNode {
            cell,
            pos: here,
            ladder: None,
            how: How::None,
        });
        nodes.push(PathNode {
            cell,
            pos: end,
            ladder: None,
            how: How::None,
        });
    }

    /// First path cell the enemy team historically reaches before ours;
    /// grenades get thrown toward it when the path is followed cold
    fn scan_initial_encounter(&self, mesh: &NavMesh) -> Option<CellId> {
        for node in self.path.nodes() {
            let cell = mesh.cell(node.cell);
            let ours = cell.earliest_occupy(self.team);
            let theirs = cell.earliest_occupy(self.team.other());
            if theirs < ours {
                return Some(node.cell);
            }
        }
        None
    }
}
