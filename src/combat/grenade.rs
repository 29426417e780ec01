//! Grenade throw sequencing
//!
//! A throw is a short commitment: pull the pin, line up on the target,
//! wait for teammates to clear the blast cone, then release. The
//! machine only emits hold/commit intents; flight and damage belong to
//! the embedding game.

use glam::{Vec3, Vec3Swizzles};
use log::debug;

use crate::agent::{Agent, GrenadeIntent, vec_to_yaw};
use crate::config::Tunables;
use crate::sim::{Countdown, TickCtx};

use super::{CombatInput, CombatState};

/// Phase of the current throw, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrenadeState {
    /// No throw in progress
    #[default]
    Idle,
    /// Pin pulled, waiting for a clear blast cone
    StartThrow,
    /// Cone is clear, committing to the release
    FinishThrow,
}

/// Throw phase plus its safety timers
#[derive(Debug, Clone, Default)]
pub struct GrenadeMachine {
    pub(crate) state: GrenadeState,
    /// Abort the throw if the cone never clears
    pub(crate) timeout: Countdown,
    /// Short delay between a clear cone and the release
    pub(crate) commit: Countdown,
    pub(crate) target: Vec3,
}

impl GrenadeMachine {
    #[must_use]
    pub fn state(&self) -> GrenadeState {
        self.state
    }
}

impl Agent {
    /// Advance the grenade machine for one engaged tick
    pub(crate) fn update_grenade(
        &mut self,
        ctx: &mut TickCtx,
        c: &mut CombatState,
        input: &CombatInput,
    ) {
        let tun = ctx.tun;
        let m = &mut c.grenade;

        match m.state {
            GrenadeState::Idle => {
                if self.loadout.grenades == 0 {
                    return;
                }
                // prefer the choke point we expected to meet them at;
                // otherwise flush an enemy that broke contact
                let target = self
                    .initial_encounter
                    .map(|id| ctx.mesh.cell(id).center())
                    .or(if c.enemy_hidden {
                        Some(c.last_known)
                    } else {
                        None
                    });
                let Some(target) = target else {
                    return;
                };
                m.target = target;
                m.state = GrenadeState::StartThrow;
                m.timeout.start(ctx.now, tun.combat.grenade_hold_timeout);
                self.controls.grenade = GrenadeIntent::Hold;
                debug!(
                    "agent {} winding up a grenade at ({:.0}, {:.0})",
                    self.id.0, target.x, target.y
                );
            }
            GrenadeState::StartThrow => {
                if m.timeout.is_elapsed(ctx.now) {
                    m.state = GrenadeState::Idle;
                    return;
                }
                self.controls.grenade = GrenadeIntent::Hold;
                self.controls.face_yaw = Some(vec_to_yaw((m.target - self.pos).xy()));
                if !friend_in_blast_cone(self.pos, m.target, &input.friends, tun) {
                    m.state = GrenadeState::FinishThrow;
                    m.commit.start(ctx.now, tun.combat.grenade_commit_delay);
                }
            }
            GrenadeState::FinishThrow => {
                if m.commit.is_elapsed(ctx.now) {
                    self.controls.grenade = GrenadeIntent::Commit;
                    self.loadout.grenades -= 1;
                    m.state = GrenadeState::Idle;
                    debug!("agent {} released a grenade", self.id.0);
                } else {
                    self.controls.grenade = GrenadeIntent::Hold;
                }
            }
        }
    }
}

/// True if a teammate stands in the throw lane or near the impact point
#[must_use]
pub fn friend_in_blast_cone(from: Vec3, target: Vec3, friends: &[Vec3], tun: &Tunables) -> bool {
    let to_target = target - from;
    let target_dist = to_target.length();
    let aim = to_target.normalize_or_zero();
    friends.iter().any(|&f| {
        if f.distance(target) < tun.combat.blast_radius {
            return true;
        }
        let offset = f - from;
        let along = offset.dot(aim);
        along > 0.0
            && along < target_dist + tun.combat.blast_radius
            && offset.normalize_or_zero().dot(aim) > tun.combat.blast_cone_dot
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, Loadout, Profile};
    use crate::nav::{CellFlags, NavMesh, NavMeshBuilder, Team};
    use crate::sim::OpenWorld;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn flat_mesh() -> NavMesh {
        let mut b = NavMeshBuilder::new();
        b.add_cell(
            Vec2::new(0.0, 0.0),
            Vec2::new(1200.0, 200.0),
            0.0,
            CellFlags::empty(),
        );
        b.build()
    }

    fn bot() -> Agent {
        Agent::new(
            AgentId(0),
            Team::Alpha,
            Vec3::new(100.0, 100.0, 0.0),
            Profile::default(),
            Loadout::default(),
        )
    }

    fn hidden_state(target: Vec3) -> CombatState {
        CombatState {
            enemy_hidden: true,
            last_known: target,
            ..CombatState::default()
        }
    }

    #[test]
    fn test_holds_while_friend_in_cone() {
        let mesh = flat_mesh();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut agent = bot();
        let target = Vec3::new(1000.0, 100.0, 0.0);
        let mut c = hidden_state(target);

        let input = CombatInput {
            friends: vec![Vec3::new(500.0, 100.0, 0.0)], // in the lane
            ..Default::default()
        };
        let mut now = 0.0;
        for _ in 0..4 {
            let mut ctx = TickCtx {
                mesh: &mesh,
                trace: &world,
                tun: &tun,
                now,
                others: &[],
                rng: &mut rng,
            };
            agent.update_grenade(&mut ctx, &mut c, &input);
            now += 0.2;
        }
        assert_eq!(c.grenade_state(), GrenadeState::StartThrow);
        assert_eq!(agent.controls.grenade, GrenadeIntent::Hold);
        assert_eq!(agent.loadout.grenades, Loadout::default().grenades);
    }

    #[test]
    fn test_commits_once_cone_clears() {
        let mesh = flat_mesh();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut agent = bot();
        let start_count = agent.loadout.grenades;
        let target = Vec3::new(1000.0, 100.0, 0.0);
        let mut c = hidden_state(target);
        let input = CombatInput::default();

        // tick 1: wind up; tick 2: cone clear, start the commit delay
        for now in [0.0, 0.05] {
            let mut ctx = TickCtx {
                mesh: &mesh,
                trace: &world,
                tun: &tun,
                now,
                others: &[],
                rng: &mut rng,
            };
            agent.update_grenade(&mut ctx, &mut c, &input);
        }
        assert_eq!(c.grenade_state(), GrenadeState::FinishThrow);
        assert_eq!(agent.controls.grenade, GrenadeIntent::Hold);

        // past the commit delay the grenade is released
        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.05 + tun.combat.grenade_commit_delay + 0.01,
            others: &[],
            rng: &mut rng,
        };
        agent.update_grenade(&mut ctx, &mut c, &input);
        assert_eq!(agent.controls.grenade, GrenadeIntent::Commit);
        assert_eq!(agent.loadout.grenades, start_count - 1);
        assert_eq!(c.grenade_state(), GrenadeState::Idle);
    }

    #[test]
    fn test_throw_times_out_when_never_clear() {
        let mesh = flat_mesh();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut agent = bot();
        let target = Vec3::new(1000.0, 100.0, 0.0);
        let mut c = hidden_state(target);

        let input = CombatInput {
            friends: vec![Vec3::new(950.0, 100.0, 0.0)], // parked on the target
            ..Default::default()
        };
        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.0,
            others: &[],
            rng: &mut rng,
        };
        agent.update_grenade(&mut ctx, &mut c, &input);
        assert_eq!(c.grenade_state(), GrenadeState::StartThrow);

        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: tun.combat.grenade_hold_timeout + 0.1,
            others: &[],
            rng: &mut rng,
        };
        agent.update_grenade(&mut ctx, &mut c, &input);
        assert_eq!(c.grenade_state(), GrenadeState::Idle);
        assert_eq!(agent.loadout.grenades, Loadout::default().grenades);
    }

    #[test]
    fn test_no_throw_without_a_target_or_grenades() {
        let mesh = flat_mesh();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(3);
        let input = CombatInput::default();

        // visible enemy, no expected encounter cell: nothing to pre-fire
        let mut agent = bot();
        let mut c = CombatState::default();
        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.0,
            others: &[],
            rng: &mut rng,
        };
        agent.update_grenade(&mut ctx, &mut c, &input);
        assert_eq!(c.grenade_state(), GrenadeState::Idle);

        // out of grenades
        let mut agent = bot();
        agent.loadout.grenades = 0;
        let mut c = hidden_state(Vec3::new(1000.0, 100.0, 0.0));
        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.0,
            others: &[],
            rng: &mut rng,
        };
        agent.update_grenade(&mut ctx, &mut c, &input);
        assert_eq!(c.grenade_state(), GrenadeState::Idle);
        assert_eq!(agent.controls.grenade, GrenadeIntent::Idle);
    }
}
