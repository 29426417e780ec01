//! Simulation context: arena, clock, timers, and collision probes
//!
//! There is no global state. Everything an agent update touches hangs off
//! an [`Arena`] (or is passed in through [`TickCtx`]), so multiple
//! independent simulations can coexist, which is also how the tests work.

mod arena;
mod locomotion;
mod time;
mod trace;

pub use arena::{AgentSnapshot, Arena, TickCtx};
pub use locomotion::apply_simple_locomotion;
pub use time::{Clock, Countdown, Stopwatch};
pub use trace::{Aabb, BlockedWorld, Ground, OpenWorld, TraceWorld};
