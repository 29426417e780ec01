//! Weapon classes and effective-range bookkeeping
//!
//! Only the *which weapon / when* decisions live in this crate; ballistics
//! and damage are the game's problem.

/// Broad weapon class; drives range management and stance decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    Knife,
    Pistol,
    Smg,
    Shotgun,
    Rifle,
    Sniper,
}

impl WeaponKind {
    /// Effective engagement range (min, max) in world units
    #[must_use]
    pub fn ideal_range(self) -> (f32, f32) {
        match self {
            WeaponKind::Knife => (0.0, 64.0),
            WeaponKind::Pistol => (0.0, 1500.0),
            WeaponKind::Smg => (0.0, 1200.0),
            WeaponKind::Shotgun => (0.0, 400.0),
            WeaponKind::Rifle => (0.0, 3000.0),
            WeaponKind::Sniper => (750.0, f32::INFINITY),
        }
    }

    /// True for scoped precision weapons (no dodging while using one)
    #[must_use]
    pub fn is_sniper(self) -> bool {
        matches!(self, WeaponKind::Sniper)
    }

    #[must_use]
    pub fn is_melee(self) -> bool {
        matches!(self, WeaponKind::Knife)
    }

    /// True if the target distance violates this weapon's effective range
    #[must_use]
    pub fn range_violated(self, distance: f32) -> bool {
        let (min, max) = self.ideal_range();
        distance < min || distance > max
    }
}

/// Which carried weapon is in hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponSlot {
    Primary,
    Secondary,
    Melee,
}

/// The weapons an agent carries
#[derive(Debug, Clone, Copy)]
pub struct Loadout {
    pub primary: WeaponKind,
    pub secondary: WeaponKind,
    /// Grenades remaining
    pub grenades: u32,
    pub equipped: WeaponSlot,
}

impl Loadout {
    /// A rifle/pistol loadout with one grenade
    #[must_use]
    pub fn rifleman() -> Self {
        Self {
            primary: WeaponKind::Rifle,
            secondary: WeaponKind::Pistol,
            grenades: 1,
            equipped: WeaponSlot::Primary,
        }
    }

    /// The weapon class currently in hand
    #[must_use]
    pub fn equipped_kind(&self) -> WeaponKind {
        match self.equipped {
            WeaponSlot::Primary => self.primary,
            WeaponSlot::Secondary => self.secondary,
            WeaponSlot::Melee => WeaponKind::Knife,
        }
    }
}

impl Default for Loadout {
    fn default() -> Self {
        Self::rifleman()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniper_min_range() {
        assert!(WeaponKind::Sniper.range_violated(100.0));
        assert!(!WeaponKind::Sniper.range_violated(2000.0));
    }

    #[test]
    fn test_shotgun_max_range() {
        assert!(!WeaponKind::Shotgun.range_violated(100.0));
        assert!(WeaponKind::Shotgun.range_violated(800.0));
    }

    #[test]
    fn test_equipped_kind_follows_slot() {
        let mut loadout = Loadout::rifleman();
        assert_eq!(loadout.equipped_kind(), WeaponKind::Rifle);
        loadout.equipped = WeaponSlot::Melee;
        assert_eq!(loadout.equipped_kind(), WeaponKind::Knife);
    }
}
