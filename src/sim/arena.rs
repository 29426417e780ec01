//! The arena: agents, the mesh, the clock, and the per-tick context
//!
//! An [`Arena`] owns everything one simulation needs, so several can run
//! side by side. Each agent update sees the world only through a
//! [`TickCtx`], which borrows the arena's shared pieces for exactly one
//! tick.

use glam::Vec3;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use crate::agent::{Agent, AgentId, Loadout, Profile};
use crate::combat::CombatInput;
use crate::config::Tunables;
use crate::nav::{LadderId, NavMesh, Team};
use crate::path::{PlanError, RouteKind};
use crate::sim::{Clock, OpenWorld, TraceWorld, apply_simple_locomotion};

/// What other agents expose to each other during a tick
#[derive(Debug, Clone, Copy)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub team: Team,
    /// Feet position
    pub pos: Vec3,
    /// The ladder the agent is traversing, if any
    pub ladder: Option<LadderId>,
}

/// Everything an agent update is allowed to touch.
///
/// Borrowed fresh for each agent each tick; holding one across ticks is
/// impossible by construction.
pub struct TickCtx<'a> {
    pub mesh: &'a NavMesh,
    pub trace: &'a dyn TraceWorld,
    pub tun: &'a Tunables,
    /// Simulation time in seconds
    pub now: f32,
    /// Snapshots of every other agent in the arena
    pub others: &'a [AgentSnapshot],
    pub rng: &'a mut StdRng,
}

/// One self-contained simulation: a mesh, its agents, and a clock
pub struct Arena {
    mesh: NavMesh,
    tun: Tunables,
    clock: Clock,
    rng: StdRng,
    agents: Vec<Agent>,
}

impl Arena {
    /// Create an arena over a mesh. The seed fixes every random draw the
    /// agents make, so a run is reproducible.
    #[must_use]
    pub fn new(mesh: NavMesh, tun: Tunables, seed: u64) -> Self {
        Self {
            mesh,
            tun,
            clock: Clock::new(),
            rng: StdRng::seed_from_u64(seed),
            agents: Vec::new(),
        }
    }

    /// Add an agent and return its handle
    pub fn spawn(&mut self, team: Team, pos: Vec3, profile: Profile, loadout: Loadout) -> AgentId {
        let id = AgentId(self.agents.len() as u32);
        debug!("spawning agent {} ({team:?}) at {pos}", id.0);
        self.agents.push(Agent::new(id, team, pos, profile, loadout));
        id
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0 as usize)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.0 as usize)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    #[must_use]
    pub fn mesh(&self) -> &NavMesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut NavMesh {
        &mut self.mesh
    }

    #[must_use]
    pub fn tunables(&self) -> &Tunables {
        &self.tun
    }

    /// Current simulation time in seconds
    #[must_use]
    pub fn now(&self) -> f32 {
        self.clock.now()
    }

    /// Plan a path for one agent toward a goal position
    pub fn order_move_to(
        &mut self,
        id: AgentId,
        goal: Vec3,
        route: RouteKind,
    ) -> Result<(), PlanError> {
        let Self {
            mesh,
            tun,
            clock,
            rng,
            agents,
        } = self;
        let agent = agents
            .get_mut(id.0 as usize)
            .ok_or(PlanError::NoStartCell)?;
        let trace = OpenWorld::new(mesh);
        let mut ctx = TickCtx {
            mesh,
            trace: &trace,
            tun,
            now: clock.now(),
            others: &[],
            rng,
        };
        agent.compute_path(&mut ctx, goal, route)
    }

    /// Advance the whole arena one fixed step. `inputs` carries each
    /// agent's combat senses for this tick (absent means no threat).
    pub fn tick(&mut self, dt: f32, inputs: &FxHashMap<AgentId, CombatInput>) {
        self.clock.advance(dt);
        let now = self.clock.now();

        let snapshots: Vec<AgentSnapshot> = self
            .agents
            .iter()
            .map(|a| AgentSnapshot {
                id: a.id,
                team: a.team,
                pos: a.pos,
                ladder: a.ladder_motion().map(|m| m.ladder),
            })
            .collect();

        let Self {
            mesh,
            tun,
            rng,
            agents,
            ..
        } = self;
        let trace = OpenWorld::new(mesh);
        let mut occupied = Vec::new();

        for (i, agent) in agents.iter_mut().enumerate() {
            let others: Vec<AgentSnapshot> = snapshots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, s)| *s)
                .collect();
            let mut ctx = TickCtx {
                mesh,
                trace: &trace,
                tun,
                now,
                others: &others,
                rng: &mut *rng,
            };

            agent.controls.clear();
            agent.stuck.update(now, agent.pos);
            if let Some(cell) = agent.update_tracked_cell(&ctx) {
                occupied.push((cell, agent.team));
            }

            let empty = CombatInput::default();
            let input = inputs.get(&agent.id).unwrap_or(&empty);
            agent.update_combat(&mut ctx, input);
            agent.follow_path(&mut ctx);

            apply_simple_locomotion(agent, mesh, tun, dt);
        }
        drop(trace);

        for (cell, team) in occupied {
            mesh.update_occupy(cell, team, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{CellFlags, NavMesh, NavMeshBuilder};
    use glam::Vec2;

    fn corridor() -> NavMesh {
        let mut b = NavMeshBuilder::new();
        let mut prev = None;
        for i in 0..6 {
            let x = i as f32 * 200.0;
            let id = b.add_cell(
                Vec2::new(x, 0.0),
                Vec2::new(x + 200.0, 200.0),
                0.0,
                CellFlags::empty(),
            );
            if let Some(p) = prev {
                b.connect(p, id);
            }
            prev = Some(id);
        }
        b.build()
    }

    #[test]
    fn test_agent_walks_an_ordered_path_to_the_end() {
        let mut arena = Arena::new(corridor(), Tunables::default(), 7);
        let id = arena.spawn(
            Team::Alpha,
            Vec3::new(100.0, 100.0, 0.0),
            Profile::default(),
            Loadout::default(),
        );
        let goal = Vec3::new(1100.0, 100.0, 0.0);

        // the agent needs a tracked cell before it can plan
        arena.tick(0.05, &FxHashMap::default());
        arena.order_move_to(id, goal, RouteKind::Fastest).unwrap();
        assert!(arena.agent(id).unwrap().has_path());

        let inputs = FxHashMap::default();
        for _ in 0..600 {
            arena.tick(0.05, &inputs);
            if !arena.agent(id).unwrap().has_path() {
                break;
            }
        }
        let agent = arena.agent(id).unwrap();
        assert!(!agent.has_path(), "never reached the end of the path");
        assert!(agent.pos.distance(goal) < 60.0, "stopped at {}", agent.pos);
    }

    #[test]
    fn test_tick_records_team_occupancy() {
        let mut arena = Arena::new(corridor(), Tunables::default(), 7);
        let id = arena.spawn(
            Team::Alpha,
            Vec3::new(100.0, 100.0, 0.0),
            Profile::default(),
            Loadout::default(),
        );
        arena.tick(0.05, &FxHashMap::default());
        arena
            .order_move_to(id, Vec3::new(1100.0, 100.0, 0.0), RouteKind::Fastest)
            .unwrap();
        let inputs = FxHashMap::default();
        for _ in 0..600 {
            arena.tick(0.05, &inputs);
            if !arena.agent(id).unwrap().has_path() {
                break;
            }
        }
        // every corridor cell was crossed and stamped for the team
        for cell in arena.mesh().cells() {
            assert!(cell.earliest_occupy(Team::Alpha).is_finite());
            assert!(!cell.earliest_occupy(Team::Bravo).is_finite());
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |seed: u64| -> Vec3 {
            let mut arena = Arena::new(corridor(), Tunables::default(), seed);
            let id = arena.spawn(
                Team::Alpha,
                Vec3::new(100.0, 100.0, 0.0),
                Profile::default(),
                Loadout::default(),
            );
            arena.tick(0.05, &FxHashMap::default());
            arena
                .order_move_to(id, Vec3::new(900.0, 100.0, 0.0), RouteKind::Fastest)
                .unwrap();
            let inputs = FxHashMap::default();
            for _ in 0..100 {
                arena.tick(0.05, &inputs);
            }
            arena.agent(id).unwrap().pos
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_independent_arenas_do_not_interfere() {
        let mut a = Arena::new(corridor(), Tunables::default(), 1);
        let mut b = Arena::new(corridor(), Tunables::default(), 2);
        let ia = a.spawn(
            Team::Alpha,
            Vec3::new(100.0, 100.0, 0.0),
            Profile::default(),
            Loadout::default(),
        );
        b.spawn(
            Team::Bravo,
            Vec3::new(500.0, 100.0, 0.0),
            Profile::default(),
            Loadout::default(),
        );
        a.tick(0.05, &FxHashMap::default());
        b.tick(0.05, &FxHashMap::default());
        assert_eq!(a.agent(ia).unwrap().team, Team::Alpha);
        // occupancy in one arena never leaks into the other
        assert!(
            a.mesh().cells().next().unwrap().earliest_occupy(Team::Bravo)
                == f32::INFINITY
        );
    }
}
