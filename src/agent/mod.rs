//! Agent state and per-tick control outputs

mod controls;
mod stuck;
mod weapon;

pub use controls::{Controls, GrenadeIntent};
pub use stuck::StuckMonitor;
pub use weapon::{Loadout, WeaponKind, WeaponSlot};

use glam::{Vec2, Vec3};

use crate::combat::{CombatState, Disposition};
use crate::config::Tunables;
use crate::nav::{CellId, Team};
use crate::path::{LadderMotion, Path};
use crate::sim::{Countdown, Stopwatch, TickCtx};

/// Handle to an agent in an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub u32);

/// Personality traits that scale decisions (both in 0..=1)
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    /// Aiming/reaction competence
    pub skill: f32,
    /// Willingness to push, reluctance to wait or retreat
    pub aggression: f32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            skill: 0.5,
            aggression: 0.5,
        }
    }
}

/// One bot: position, stance, current path, and sub-states.
///
/// The agent owns its path, timers, and combat state exclusively; nothing
/// here is shared between agents.
#[derive(Debug)]
pub struct Agent {
    pub id: AgentId,
    pub team: Team,
    pub profile: Profile,
    /// How readily the agent commits to fights it did not start
    pub disposition: Disposition,

    /// Feet position
    pub pos: Vec3,
    pub vel: Vec3,
    /// View yaw in degrees
    pub eye_yaw: f32,
    /// Set by locomotion when the agent is latched onto a ladder
    pub on_ladder: bool,
    /// Set by locomotion while the agent is in the air
    pub airborne: bool,

    /// Last known containing cell
    pub cell: Option<CellId>,
    pub loadout: Loadout,
    /// Primitive intents for this tick, consumed by locomotion/weapons
    pub controls: Controls,

    pub(crate) crouching: bool,
    pub(crate) running: bool,
    pub(crate) path: Path,
    pub(crate) ladder_motion: Option<LadderMotion>,
    pub(crate) combat: Option<CombatState>,

    /// The point currently steered toward
    pub(crate) goal_pos: Vec3,
    pub(crate) forward_yaw: f32,
    pub(crate) look_ahead_yaw: f32,

    pub(crate) repath: Countdown,
    pub(crate) cell_entered: Stopwatch,
    pub(crate) polite: Countdown,
    pub(crate) friend_check: Countdown,
    pub(crate) friend_in_way: bool,
    pub(crate) waiting_behind_friend: bool,
    pub(crate) wait: Countdown,
    pub(crate) stuck: StuckMonitor,

    /// First path cell where we expect to meet the enemy (grenade target)
    pub(crate) initial_encounter: Option<CellId>,
}

impl Agent {
    /// Create an agent at the given position
    #[must_use]
    pub fn new(id: AgentId, team: Team, pos: Vec3, profile: Profile, loadout: Loadout) -> Self {
        Self {
            id,
            team,
            profile,
            disposition: Disposition::default(),
            pos,
            vel: Vec3::ZERO,
            eye_yaw: 0.0,
            on_ladder: false,
            airborne: false,
            cell: None,
            loadout,
            controls: Controls::default(),
            crouching: false,
            running: true,
            path: Path::default(),
            ladder_motion: None,
            combat: None,
            goal_pos: pos,
            forward_yaw: 0.0,
            look_ahead_yaw: 0.0,
            repath: Countdown::default(),
            cell_entered: Stopwatch::default(),
            polite: Countdown::default(),
            friend_check: Countdown::default(),
            friend_in_way: false,
            waiting_behind_friend: false,
            wait: Countdown::default(),
            stuck: StuckMonitor::default(),
            initial_encounter: None,
        }
    }

    /// Body center
    #[must_use]
    pub fn centroid(&self, tun: &Tunables) -> Vec3 {
        self.pos + Vec3::new(0.0, 0.0, tun.body.half_height)
    }

    /// Eye position (lower while crouched)
    #[must_use]
    pub fn eye(&self, tun: &Tunables) -> Vec3 {
        let height = if self.crouching {
            tun.body.half_height
        } else {
            tun.body.half_height * 1.8
        };
        self.pos + Vec3::new(0.0, 0.0, height)
    }

    #[must_use]
    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn crouch(&mut self) {
        self.crouching = true;
    }

    pub fn stand(&mut self) {
        self.crouching = false;
    }

    pub fn run(&mut self) {
        self.running = true;
    }

    pub fn walk(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn has_path(&self) -> bool {
        self.path.is_valid()
    }

    /// The current path (possibly empty)
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The ladder sub-state, if a ladder traversal is in progress
    #[must_use]
    pub fn ladder_motion(&self) -> Option<&LadderMotion> {
        self.ladder_motion.as_ref()
    }

    /// The combat state, if engaged
    #[must_use]
    pub fn combat(&self) -> Option<&CombatState> {
        self.combat.as_ref()
    }

    /// True if the agent is in its combat state
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.combat.is_some()
    }

    /// First path cell likely to be contested, if the last plan found one
    #[must_use]
    pub fn initial_encounter(&self) -> Option<CellId> {
        self.initial_encounter
    }

    /// Steer toward a point this tick
    pub fn move_towards(&mut self, point: Vec3) {
        self.controls.move_to = Some(point);
    }

    /// Back away from a point this tick
    pub fn move_away_from(&mut self, point: Vec3) {
        self.controls.move_away_from = Some(point);
    }

    /// Re-resolve the containing cell. Keeps the last known cell when the
    /// agent is between cells (mid-air, on a ladder). Returns the new cell
    /// when it changed.
    pub(crate) fn update_tracked_cell(&mut self, ctx: &TickCtx) -> Option<CellId> {
        let found = ctx.mesh.cell_at(self.pos);
        if let Some(id) = found {
            if self.cell != Some(id) {
                self.cell = Some(id);
                self.cell_entered.start(ctx.now);
                self.stuck.reset();
                return Some(id);
            }
        }
        None
    }
}

/// Yaw (degrees) of a direction in the ground plane
#[must_use]
pub fn vec_to_yaw(dir: Vec2) -> f32 {
    normalize_yaw(dir.y.atan2(dir.x).to_degrees())
}

/// Unit vector of a yaw angle in degrees
#[must_use]
pub fn yaw_to_vec(yaw: f32) -> Vec2 {
    let rad = yaw.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

/// Wrap a yaw into [0, 360)
#[must_use]
pub fn normalize_yaw(yaw: f32) -> f32 {
    yaw.rem_euclid(360.0)
}

/// Smallest signed difference between two yaws, in (-180, 180]
#[must_use]
pub fn yaw_delta(a: f32, b: f32) -> f32 {
    let mut d = normalize_yaw(a) - normalize_yaw(b);
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// True if two yaws agree within a tolerance (degrees)
#[must_use]
pub fn yaws_close(a: f32, b: f32, tolerance: f32) -> bool {
    yaw_delta(a, b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_to_yaw_axes() {
        assert!((vec_to_yaw(Vec2::new(1.0, 0.0)) - 0.0).abs() < 1e-4);
        assert!((vec_to_yaw(Vec2::new(0.0, 1.0)) - 90.0).abs() < 1e-4);
        assert!((vec_to_yaw(Vec2::new(-1.0, 0.0)) - 180.0).abs() < 1e-4);
        assert!((vec_to_yaw(Vec2::new(0.0, -1.0)) - 270.0).abs() < 1e-4);
    }

    #[test]
    fn test_yaw_delta_wraps() {
        assert!((yaw_delta(350.0, 10.0) - (-20.0)).abs() < 1e-4);
        assert!((yaw_delta(10.0, 350.0) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_yaws_close() {
        assert!(yaws_close(359.0, 2.0, 5.0));
        assert!(!yaws_close(90.0, 120.0, 5.0));
    }

    #[test]
    fn test_yaw_round_trip() {
        for yaw in [0.0_f32, 45.0, 133.7, 271.0] {
            let back = vec_to_yaw(yaw_to_vec(yaw));
            assert!((yaw_delta(back, yaw)).abs() < 1e-3, "yaw {yaw} -> {back}");
        }
    }
}
