//! Evasive footwork while trading fire
//!
//! A small state machine re-rolled on a random dwell: hold steady,
//! strafe either way across the enemy's aim, or hop. Strafes are
//! validated against the ground first so an agent never dodges off a
//! ledge it cannot survive stepping from.

use glam::{Vec2, Vec3, Vec3Swizzles};
use rand::Rng;

use crate::agent::Agent;
use crate::sim::{Countdown, TickCtx};

use super::CombatState;

/// Current evasive movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DodgeState {
    /// Stand and shoot
    #[default]
    Steady,
    /// Strafe left across the enemy's aim
    SlideLeft,
    /// Strafe right across the enemy's aim
    SlideRight,
    /// Jump in place
    Hop,
}

/// Dodge phase plus the dwell until the next re-roll
#[derive(Debug, Clone, Default)]
pub struct DodgeMachine {
    pub(crate) state: DodgeState,
    pub(crate) dwell: Countdown,
}

impl DodgeMachine {
    #[must_use]
    pub fn state(&self) -> DodgeState {
        self.state
    }
}

impl Agent {
    /// Advance the dodge machine and emit its movement for this tick
    pub(crate) fn update_dodge(&mut self, ctx: &mut TickCtx, c: &mut CombatState, enemy_pos: Vec3) {
        let tun = ctx.tun;
        let m = &mut c.dodge;

        if m.dwell.is_elapsed(ctx.now) {
            m.dwell.start(
                ctx.now,
                ctx.rng
                    .gen_range(tun.combat.dodge_dwell_min..=tun.combat.dodge_dwell_max),
            );
            let roll: f32 = ctx.rng.gen_range(0.0..1.0);
            m.state = if roll < 0.4 {
                DodgeState::Steady
            } else if roll < 0.65 {
                DodgeState::SlideLeft
            } else if roll < 0.9 {
                DodgeState::SlideRight
            } else {
                DodgeState::Hop
            };
        }

        let to_enemy = (enemy_pos - self.pos).xy().normalize_or_zero();
        let left = Vec2::new(-to_enemy.y, to_enemy.x);
        let lateral = match m.state {
            DodgeState::SlideLeft => left,
            DodgeState::SlideRight => -left,
            _ => Vec2::ZERO,
        };

        // never strafe over a drop we cannot step back up from
        if lateral != Vec2::ZERO {
            let probe =
                (self.pos.xy() + lateral * 40.0).extend(self.pos.z + tun.body.half_height);
            let safe = ctx
                .trace
                .ground(probe)
                .is_some_and(|g| self.pos.z - g.height <= tun.body.step_height);
            if !safe {
                m.state = DodgeState::Steady;
            }
        }

        match m.state {
            DodgeState::Steady => {}
            DodgeState::SlideLeft | DodgeState::SlideRight => {
                self.move_towards((self.pos.xy() + lateral * 60.0).extend(self.pos.z));
            }
            DodgeState::Hop => self.controls.jump = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, Loadout, Profile};
    use crate::config::Tunables;
    use crate::nav::{CellFlags, NavMeshBuilder, Team};
    use crate::sim::OpenWorld;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_slide_near_ledge_reverts_to_steady() {
        // a narrow catwalk at height; anything lateral is a long fall
        let mut b = NavMeshBuilder::new();
        b.add_cell(
            Vec2::new(0.0, 0.0),
            Vec2::new(400.0, 60.0),
            200.0,
            CellFlags::empty(),
        );
        let mesh = b.build();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(5);

        let mut bot = Agent::new(
            AgentId(0),
            Team::Alpha,
            Vec3::new(200.0, 30.0, 200.0),
            Profile::default(),
            Loadout::default(),
        );
        let mut combat = CombatState::default();
        // force a slide and pin the dwell so it is not re-rolled
        combat.dodge.state = DodgeState::SlideLeft;
        combat.dodge.dwell.start(0.0, 100.0);

        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.0,
            others: &[],
            rng: &mut rng,
        };
        // enemy straight ahead along the catwalk: left is off the edge
        let enemy = Vec3::new(390.0, 30.0, 200.0);
        bot.update_dodge(&mut ctx, &mut combat, enemy);

        assert_eq!(combat.dodge_state(), DodgeState::Steady);
        assert!(bot.controls.move_to.is_none());
    }

    #[test]
    fn test_slide_over_knee_drop_reverts_to_steady() {
        // a low platform beside the floor: the drop is jumpable back up,
        // but not steppable, so strafing over it is out
        let mut b = NavMeshBuilder::new();
        b.add_cell(
            Vec2::new(0.0, 0.0),
            Vec2::new(400.0, 60.0),
            30.0,
            CellFlags::empty(),
        );
        b.add_cell(
            Vec2::new(0.0, 60.0),
            Vec2::new(400.0, 400.0),
            0.0,
            CellFlags::empty(),
        );
        let mesh = b.build();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(5);

        let mut bot = Agent::new(
            AgentId(0),
            Team::Alpha,
            Vec3::new(200.0, 30.0, 30.0),
            Profile::default(),
            Loadout::default(),
        );
        let mut combat = CombatState::default();
        combat.dodge.state = DodgeState::SlideLeft;
        combat.dodge.dwell.start(0.0, 100.0);

        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.0,
            others: &[],
            rng: &mut rng,
        };
        // enemy east, so a left slide probes north onto the lower floor
        let enemy = Vec3::new(390.0, 30.0, 30.0);
        bot.update_dodge(&mut ctx, &mut combat, enemy);

        assert_eq!(combat.dodge_state(), DodgeState::Steady);
        assert!(bot.controls.move_to.is_none());
    }

    #[test]
    fn test_slide_on_open_ground_moves_laterally() {
        let mut b = NavMeshBuilder::new();
        b.add_cell(
            Vec2::new(0.0, 0.0),
            Vec2::new(400.0, 400.0),
            0.0,
            CellFlags::empty(),
        );
        let mesh = b.build();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(5);

        let mut bot = Agent::new(
            AgentId(0),
            Team::Alpha,
            Vec3::new(200.0, 200.0, 0.0),
            Profile::default(),
            Loadout::default(),
        );
        let mut combat = CombatState::default();
        combat.dodge.state = DodgeState::SlideRight;
        combat.dodge.dwell.start(0.0, 100.0);

        let mut ctx = TickCtx {
            mesh: &mesh,
            trace: &world,
            tun: &tun,
            now: 0.0,
            others: &[],
            rng: &mut rng,
        };
        let enemy = Vec3::new(390.0, 200.0, 0.0); // east
        bot.update_dodge(&mut ctx, &mut combat, enemy);

        // sliding right of an eastward aim moves south
        let target = bot.controls.move_to.expect("slide movement");
        assert!(target.y < bot.pos.y);
        assert_eq!(combat.dodge_state(), DodgeState::SlideRight);
    }

    #[test]
    fn test_dwell_rerolls_eventually() {
        let mut b = NavMeshBuilder::new();
        b.add_cell(
            Vec2::new(0.0, 0.0),
            Vec2::new(400.0, 400.0),
            0.0,
            CellFlags::empty(),
        );
        let mesh = b.build();
        let world = OpenWorld::new(&mesh);
        let tun = Tunables::default();
        let mut rng = StdRng::seed_from_u64(5);

        let mut bot = Agent::new(
            AgentId(0),
            Team::Alpha,
            Vec3::new(200.0, 200.0, 0.0),
            Profile::default(),
            Loadout::default(),
        );
        let mut combat = CombatState::default();
        let enemy = Vec3::new(390.0, 200.0, 0.0);

        // across many dwell windows, more than one state must show up
        let mut seen = std::collections::HashSet::new();
        let mut now = 0.0;
        for _ in 0..200 {
            now += 0.5;
            let mut ctx = TickCtx {
                mesh: &mesh,
                trace: &world,
                tun: &tun,
                now,
                others: &[],
                rng: &mut rng,
            };
            bot.update_dodge(&mut ctx, &mut combat, enemy);
            seen.insert(format!("{:?}", combat.dodge_state()));
            bot.controls.clear();
        }
        assert!(seen.len() > 1, "dodge never varied: {seen:?}");
    }
}
