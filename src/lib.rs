//! Autonomous combat agents over a navigation mesh
//!
//! This crate is the decision layer of a bot: given a hand-annotated
//! navigation mesh and per-tick sensory input, it plans routes, follows
//! them (including ladders, drops, and crouch tunnels), and runs the
//! engagement logic of a fight. It never renders, never resolves
//! weapons fire, and never moves a body itself; every tick it fills a
//! set of primitive [`Controls`](agent::Controls) intents that the
//! embedding game consumes.
//!
//! - [`nav`]: cells, ladders, and spatial queries
//! - [`path`]: A* planning, position resolution, following, ladders
//! - [`combat`]: engagement state, dodging, grenades, retreats
//! - [`agent`]: the bot itself and its control outputs
//! - [`sim`]: the arena, clock, and collision probes
//! - [`config`]: every tunable threshold, loadable from RON or JSON

pub mod agent;
pub mod combat;
pub mod config;
pub mod nav;
pub mod path;
pub mod sim;

pub use glam;

/// Common imports for embedding the engine
pub mod prelude {
    pub use crate::agent::{Agent, AgentId, Controls, GrenadeIntent, Loadout, Profile, WeaponKind};
    pub use crate::combat::{CombatInput, Disposition, EnemyInfo};
    pub use crate::config::Tunables;
    pub use crate::nav::{CellFlags, CellId, LadderId, NavMesh, NavMeshBuilder, Team};
    pub use crate::path::{FollowResult, RouteKind};
    pub use crate::sim::{Arena, TickCtx, TraceWorld};
    pub use glam::{Vec2, Vec3};
}
