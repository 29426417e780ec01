//! Per-tick primitive intents handed to the locomotion and weapon systems
//!
//! The decision engine never moves an agent itself; it fills one of these
//! each tick and the embedding game consumes it. Everything here is
//! cleared at the start of the next tick.

use glam::Vec3;

use super::WeaponSlot;

/// Grenade trigger intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrenadeIntent {
    /// Not interacting with the grenade trigger
    #[default]
    Idle,
    /// Holding the trigger, lining up the throw
    Hold,
    /// Releasing the trigger, committing the throw
    Commit,
}

/// Movement and action intents for one tick
#[derive(Debug, Clone, Default)]
pub struct Controls {
    /// Move toward this point
    pub move_to: Option<Vec3>,
    /// Back directly away from this point (overrides `move_to`)
    pub move_away_from: Option<Vec3>,
    /// Turn the view toward this yaw (degrees)
    pub face_yaw: Option<f32>,
    /// Jump if the movement system allows it
    pub jump: bool,
    /// Jump even while ducking or mid-recovery
    pub must_jump: bool,
    /// Make small random lateral movements (stuck recovery)
    pub wiggle: bool,
    /// Fire the equipped weapon
    pub fire: bool,
    /// Melee attack against an unaware enemy's back
    pub backstab: bool,
    /// Switch to this weapon slot
    pub switch_to: Option<WeaponSlot>,
    /// Grenade trigger state
    pub grenade: GrenadeIntent,
}

impl Controls {
    /// Reset all intents; called at the start of every tick
    pub fn clear(&mut self) {
        *self = Controls::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_resets_everything() {
        let mut c = Controls {
            move_to: Some(Vec3::ONE),
            jump: true,
            fire: true,
            grenade: GrenadeIntent::Hold,
            ..Default::default()
        };
        c.clear();
        assert!(c.move_to.is_none());
        assert!(!c.jump);
        assert!(!c.fire);
        assert_eq!(c.grenade, GrenadeIntent::Idle);
    }
}
