//! Navigation mesh: walkable cells, directional edges, and ladders
//!
//! The mesh is built once (programmatically, via [`NavMeshBuilder`]) and is
//! read-only during simulation except for two advisory fields: per-team
//! earliest-occupy times and the damaging flag on cells.

mod ladder;
mod mesh;

pub use ladder::{Ladder, LadderId};
pub use mesh::{Cell, CellFlags, CellId, Dir, NavMesh, NavMeshBuilder, Team};
