//! Combat decisions
//!
//! Engagement is a state the agent carries while it has a threat:
//! stance and temperament are drawn once per engagement, then each tick
//! manages facing, fire control, range discipline, retreats, dodging,
//! and grenades. The engine never resolves weapons fire itself; it only
//! emits intents.

mod dodge;
mod grenade;

pub use dodge::DodgeState;
pub use grenade::GrenadeState;

use glam::{Vec3, Vec3Swizzles};
use log::{debug, info};
use rand::Rng;

use crate::agent::{Agent, WeaponKind, WeaponSlot, vec_to_yaw};
use crate::path::RouteKind;
use crate::sim::{Countdown, Stopwatch, TickCtx};

use dodge::DodgeMachine;
use grenade::GrenadeMachine;

/// How readily an agent commits to fights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// Fight, and hunt enemies that break contact
    #[default]
    EngageAndInvestigate,
    /// Fight what shows itself; never chase
    Opportunistic,
    /// Only fight while the threat is in view
    SelfDefense,
}

/// What the embedding game knows about the current threat
#[derive(Debug, Clone, Copy)]
pub struct EnemyInfo {
    pub pos: Vec3,
    pub weapon: WeaponKind,
    /// True if we have line of sight right now
    pub visible: bool,
    /// Seconds since we last saw them
    pub time_since_seen: f32,
    /// True if their back is to us
    pub facing_away: bool,
    /// True if they are aiming at us
    pub aiming_at_me: bool,
}

/// Per-tick sensory input to the combat update
#[derive(Debug, Clone, Default)]
pub struct CombatInput {
    /// The current threat, if any
    pub enemy: Option<EnemyInfo>,
    /// Enemies visible right now
    pub visible_enemies: u32,
    /// Teammates visible right now
    pub visible_friends: u32,
    /// Positions of nearby teammates (for the grenade blast cone)
    pub friends: Vec<Vec3>,
}

/// State carried across an engagement.
///
/// Stance (`crouch_and_hold`), dodging inclination, and cowardice are
/// drawn once when combat begins and held until it ends, so an agent
/// does not flip between postures mid-fight.
#[derive(Debug, Clone)]
pub struct CombatState {
    pub(crate) crouch_and_hold: bool,
    pub(crate) should_dodge: bool,
    pub(crate) coward: bool,
    pub(crate) enemy_hidden: bool,
    /// Earliest time we may fire after re-acquiring a hidden enemy
    pub(crate) reacquire_at: f32,
    /// Runs while someone is aiming at us
    pub(crate) pinned: Stopwatch,
    pub(crate) retreat: Countdown,
    pub(crate) dodge: DodgeMachine,
    pub(crate) grenade: GrenadeMachine,
    pub(crate) last_known: Vec3,
}

impl Default for CombatState {
    fn default() -> Self {
        Self {
            crouch_and_hold: false,
            should_dodge: false,
            coward: false,
            enemy_hidden: false,
            reacquire_at: f32::NEG_INFINITY,
            pinned: Stopwatch::default(),
            retreat: Countdown::default(),
            dodge: DodgeMachine::default(),
            grenade: GrenadeMachine::default(),
            last_known: Vec3::ZERO,
        }
    }
}

impl CombatState {
    /// True if this engagement's stance is to crouch and hold ground
    #[must_use]
    pub fn is_crouch_and_hold(&self) -> bool {
        self.crouch_and_hold
    }

    /// Current dodge phase
    #[must_use]
    pub fn dodge_state(&self) -> DodgeState {
        self.dodge.state()
    }

    /// Current grenade phase
    #[must_use]
    pub fn grenade_state(&self) -> GrenadeState {
        self.grenade.state()
    }

    /// Where the enemy was last seen
    #[must_use]
    pub fn last_known_enemy_pos(&self) -> Vec3 {
        self.last_known
    }
}

impl Agent {
    /// Drive combat for one tick. Enters the combat state when a threat
    /// appears, leaves it when the threat is gone or patience runs out.
    pub fn update_combat(&mut self, ctx: &mut TickCtx, input: &CombatInput) {
        match (self.is_attacking(), input.enemy.as_ref()) {
            (false, None) => return,
            (false, Some(enemy)) => self.enter_combat(ctx, enemy),
            (true, None) => {
                self.leave_combat();
                return;
            }
            (true, Some(_)) => {}
        }

        let Some(mut state) = self.combat.take() else {
            return;
        };
        if self.combat_tick(ctx, input, &mut state) {
            self.combat = Some(state);
        } else {
            if state.crouch_and_hold {
                self.stand();
            }
            debug!("agent {} disengaged", self.id.0);
        }
    }

    /// Draw the engagement posture and remember the threat
    fn enter_combat(&mut self, ctx: &mut TickCtx, enemy: &EnemyInfo) {
        let tun = ctx.tun;
        let p = self.profile;

        let mut state = CombatState {
            last_known: enemy.pos,
            ..CombatState::default()
        };
        state.pinned.start(ctx.now);
        state.coward = ctx.rng.gen_range(0.0..1.0) < (1.0 - p.aggression) * 0.5;
        state.should_dodge = ctx.rng.gen_range(0.0..1.0) < 0.33 + 0.5 * p.skill;

        // patient, skilled agents sometimes dig in, but only when they
        // can still see the threat from a crouch
        let hold_chance = (0.33 + 0.33 * p.skill - 0.33 * p.aggression).clamp(0.0, 1.0);
        if !self.loadout.equipped_kind().is_melee() && ctx.rng.gen_range(0.0..1.0) < hold_chance {
            let crouch_eye = self.pos + Vec3::Z * tun.body.half_height;
            let target = enemy.pos + Vec3::Z * tun.body.half_height;
            if ctx.trace.line_clear(crouch_eye, target) {
                state.crouch_and_hold = true;
                self.crouch();
            }
        }

        debug!(
            "agent {} engaging (hold={} dodge={} coward={})",
            self.id.0, state.crouch_and_hold, state.should_dodge, state.coward
        );
        self.destroy_path();
        self.combat = Some(state);
    }

    fn leave_combat(&mut self) {
        if let Some(state) = self.combat.take() {
            if state.crouch_and_hold {
                self.stand();
            }
        }
        debug!("agent {} lost its target", self.id.0);
    }

    /// One tick of engaged behavior. Returns false to leave combat.
    fn combat_tick(&mut self, ctx: &mut TickCtx, input: &CombatInput, c: &mut CombatState) -> bool {
        let tun = ctx.tun;
        let Some(enemy) = input.enemy.as_ref() else {
            return false;
        };
        let weapon = self.loadout.equipped_kind();
        let dist = (enemy.pos - self.pos).length();

        if enemy.visible {
            c.last_known = enemy.pos;
            if c.enemy_hidden {
                // re-acquired: humans take a beat to snap back on target
                c.enemy_hidden = false;
                c.reacquire_at = ctx.now + tun.combat.reaction_delay * (1.5 - self.profile.skill);
            }
        }

        self.controls.face_yaw = Some(vec_to_yaw((c.last_known - self.pos).xy()));

        // the pinned stopwatch runs only while we are being aimed at
        if !enemy.aiming_at_me {
            c.pinned.start(ctx.now);
        }

        if weapon.is_melee() {
            if dist > tun.combat.melee_range {
                self.move_towards(enemy.pos);
            } else if enemy.facing_away {
                // an oblivious back gets the instant kill, never a wild swing
                self.controls.backstab = true;
            } else {
                self.controls.fire = true;
            }
        } else {
            self.manage_range(ctx, enemy, weapon, dist);
            if enemy.visible && ctx.now >= c.reacquire_at {
                self.controls.fire = true;
            }
        }

        if !enemy.visible {
            if enemy.time_since_seen > tun.combat.hidden_after {
                c.enemy_hidden = true;
            }
            let patience = tun.combat.chase_after
                + if weapon.is_sniper() {
                    tun.combat.sniper_chase_bonus
                } else {
                    0.0
                };
            if enemy.time_since_seen > patience {
                if self.disposition == Disposition::EngageAndInvestigate {
                    info!("agent {} hunting toward last contact", self.id.0);
                    let _ = self.compute_path(ctx, c.last_known, RouteKind::Fastest);
                }
                return false;
            }
        }

        self.consider_retreat(ctx, input, c, enemy, weapon, dist);

        if c.crouch_and_hold {
            self.crouch();
            self.stuck.reset();
        }

        // a knife out of range must keep charging, never strafe in place
        let charging = weapon.is_melee() && dist > tun.combat.melee_range;
        if c.should_dodge
            && !c.crouch_and_hold
            && !weapon.is_sniper()
            && !charging
            && !self.has_path()
            && enemy.visible
        {
            self.update_dodge(ctx, c, enemy.pos);
        }

        self.update_grenade(ctx, c, input);

        true
    }

    /// Keep the fight inside the equipped weapon's envelope
    fn manage_range(&mut self, ctx: &mut TickCtx, enemy: &EnemyInfo, weapon: WeaponKind, dist: f32) {
        if !weapon.range_violated(dist) {
            return;
        }
        let (min, _) = weapon.ideal_range();
        if dist < min {
            // too close for a scoped weapon
            self.controls.switch_to = Some(WeaponSlot::Secondary);
        } else if self.loadout.equipped != WeaponSlot::Secondary
            && !self.loadout.secondary.range_violated(dist)
        {
            self.controls.switch_to = Some(WeaponSlot::Secondary);
        } else if !self.has_path() {
            // nothing we carry reaches; close the distance
            let _ = self.compute_path(ctx, enemy.pos, RouteKind::Fastest);
        }
    }

    /// Break contact when pinned down, outnumbered and timid, or outranged
    /// by a sniper
    fn consider_retreat(
        &mut self,
        ctx: &mut TickCtx,
        input: &CombatInput,
        c: &mut CombatState,
        enemy: &EnemyInfo,
        weapon: WeaponKind,
        dist: f32,
    ) {
        let tun = ctx.tun;
        if !c.retreat.is_elapsed(ctx.now) {
            return;
        }
        // never break contact unless someone visible has a bead on us
        if !(enemy.visible && enemy.aiming_at_me) {
            return;
        }

        let pinned_down = c.pinned.elapsed(ctx.now) > tun.combat.pinned_down_duration;
        let outnumbered = input.visible_enemies > input.visible_friends + 1;
        let sniper_threat = enemy.weapon.is_sniper()
            && !weapon.is_sniper()
            && enemy.visible
            && dist > WeaponKind::Sniper.ideal_range().0;

        if !(pinned_down || (outnumbered && c.coward) || sniper_threat) {
            return;
        }

        if let Some(spot) =
            find_hidden_spot(ctx, self.pos, c.last_known, tun.combat.hide_search_radius)
        {
            info!(
                "agent {} retreating to ({:.0}, {:.0})",
                self.id.0, spot.x, spot.y
            );
            c.crouch_and_hold = false;
            self.stand();
            let _ = self.compute_path(ctx, spot, RouteKind::Fastest);
            c.retreat.start(ctx.now, tun.combat.retreat_cooldown);
            c.pinned.start(ctx.now);
        }
    }
}

/// Nearest cell center within `radius` that the threat cannot see
#[must_use]
pub fn find_hidden_spot(ctx: &TickCtx, from: Vec3, threat: Vec3, radius: f32) -> Option<Vec3> {
    let eye = threat + Vec3::Z * ctx.tun.body.half_height * 1.8;
    let mut best: Option<(f32, Vec3)> = None;
    for cell in ctx.mesh.cells() {
        let spot = cell.center();
        let d = spot.distance(from);
        if d > radius {
            continue;
        }
        if ctx
            .trace
            .line_clear(eye, spot + Vec3::Z * ctx.tun.body.half_height)
        {
            continue;
        }
        if best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, spot));
        }
    }
    best.map(|(_, p)| p)
}
