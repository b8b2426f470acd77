//! Hero Instances
//!
//! Live, per-match hero state: hit points, status effects, and the buff
//! sets managed by the aura engine. Definitions come from the catalog and
//! are never mutated; everything mutable lives here.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::catalog::{HeroDefinition, Stat};

/// Stable identity of a hero within a match: `player-hero` indices.
///
/// Survives deaths and turn-order rebuilds, unlike positions in the derived
/// turn sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HeroId {
    /// Owning player slot (0 or 1).
    pub player: u8,
    /// Index into the owning slot's team (0..3).
    pub hero: u8,
}

impl HeroId {
    /// Create a hero id.
    pub const fn new(player: u8, hero: u8) -> Self {
        Self { player, hero }
    }

    /// The opposing player slot index.
    pub fn opponent(&self) -> u8 {
        1 - self.player
    }
}

impl fmt::Display for HeroId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.player, self.hero)
    }
}

/// Status conditions on a hero.
///
/// Mutated only by effect application and end-of-turn processing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    /// Poison stacks; each ticks for 1 damage at the victim's end of turn,
    /// then the count decrements.
    pub poison: u32,

    /// Hero currently forcing this hero's target selection.
    pub taunted_by: Option<HeroId>,

    /// Accuracy stacks spent by the next attack roll (+2 each).
    pub inspiration: u32,

    /// Silenced heroes cannot use abilities (basic attacks still allowed).
    pub silenced: bool,

    /// Untargetable heroes cannot be selected as targets.
    pub untargetable: bool,
}

impl StatusEffects {
    /// Clear conditions that expire at the owner's end of turn.
    /// Poison stacks are handled separately by the poison tick.
    pub fn clear_expiring(&mut self) {
        self.taunted_by = None;
        self.silenced = false;
        self.untargetable = false;
    }
}

/// A standing stat modifier granted by a passive aura.
///
/// Keyed by (source, stat): recomputation re-derives the whole set, and
/// permanent grants are matched by key so they never double-stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveBuff {
    /// Name of the hero that granted the buff.
    pub source: String,
    /// Stat modified.
    pub stat: Stat,
    /// Signed amount.
    pub amount: i32,
    /// Permanent buffs survive the source's death and aura recomputation.
    pub permanent: bool,
}

/// A timed stat modifier applied by an ability (buff or debuff).
///
/// Counts down at the owner's end of turn; removed at zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatModifier {
    /// Name of the hero that applied it.
    pub source: String,
    /// Stat modified.
    pub stat: Stat,
    /// Signed amount (negative for debuffs).
    pub amount: i32,
    /// Remaining turns of the owner.
    pub turns_remaining: u32,
}

/// A live hero in a match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeroInstance {
    /// Stable identity within the match.
    pub id: HeroId,

    /// Snapshot of the catalog definition at draft time.
    pub definition: HeroDefinition,

    /// Current hit points, always in [0, max_hp].
    pub current_hp: i32,

    /// Status conditions.
    pub status: StatusEffects,

    /// Aura-managed buffs (see `game::auras`).
    pub buffs: Vec<PassiveBuff>,

    /// Ability-applied timed modifiers.
    pub modifiers: Vec<StatModifier>,

    /// Whether this hero took any action this battle (outcome manifest).
    pub acted: bool,
}

impl HeroInstance {
    /// Create a hero at full health.
    pub fn new(id: HeroId, definition: HeroDefinition) -> Self {
        let current_hp = definition.max_hp;
        Self {
            id,
            definition,
            current_hp,
            status: StatusEffects::default(),
            buffs: Vec::new(),
            modifiers: Vec::new(),
            acted: false,
        }
    }

    /// Hero display name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Whether the hero is alive.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    /// Sum of buff and modifier contributions to a stat.
    pub fn stat_bonus(&self, stat: Stat) -> i32 {
        let from_buffs: i32 = self.buffs.iter()
            .filter(|b| b.stat == stat)
            .map(|b| b.amount)
            .sum();
        let from_modifiers: i32 = self.modifiers.iter()
            .filter(|m| m.stat == stat)
            .map(|m| m.amount)
            .sum();
        from_buffs + from_modifiers
    }

    /// Aura-modified accuracy (inspiration is added at roll time, not here).
    pub fn accuracy(&self) -> i32 {
        self.definition.accuracy + self.stat_bonus(Stat::Accuracy)
    }

    /// Aura-modified bonus added to damage rolls.
    pub fn attack_bonus(&self) -> i32 {
        self.stat_bonus(Stat::Attack)
    }

    /// Aura-modified armor class.
    pub fn armor_class(&self) -> i32 {
        self.definition.armor_class + self.stat_bonus(Stat::Defense)
    }

    /// Apply damage, flooring HP at 0. Returns true if this killed the hero.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if amount <= 0 || !self.is_alive() {
            return false;
        }
        self.current_hp = (self.current_hp - amount).max(0);
        self.current_hp == 0
    }

    /// Heal, capping HP at max. Dead heroes cannot be healed.
    /// Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || !self.is_alive() {
            return 0;
        }
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount).min(self.definition.max_hp);
        self.current_hp - before
    }

    /// Attach or refresh a timed modifier, keyed by (source, stat).
    pub fn apply_modifier(&mut self, modifier: StatModifier) {
        if let Some(existing) = self.modifiers.iter_mut()
            .find(|m| m.source == modifier.source && m.stat == modifier.stat)
        {
            // Refresh duration and overwrite the amount
            *existing = modifier;
        } else {
            self.modifiers.push(modifier);
        }
    }

    /// Tick down timed modifiers at the owner's end of turn.
    pub fn expire_modifiers(&mut self) {
        for m in &mut self.modifiers {
            m.turns_remaining = m.turns_remaining.saturating_sub(1);
        }
        self.modifiers.retain(|m| m.turns_remaining > 0);
    }

    /// Reset to battle-start state: full HP, no statuses, no timed modifiers.
    /// Aura buffs are rebuilt separately by the aura engine.
    pub fn reset_for_battle(&mut self) {
        self.current_hp = self.definition.max_hp;
        self.status = StatusEffects::default();
        self.buffs.clear();
        self.modifiers.clear();
        self.acted = false;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn fighter(id: HeroId) -> HeroInstance {
        HeroInstance::new(id, Catalog::builtin().get("Fighter").unwrap().clone())
    }

    #[test]
    fn test_hero_id_display() {
        assert_eq!(HeroId::new(0, 2).to_string(), "0-2");
        assert_eq!(HeroId::new(1, 0).to_string(), "1-0");
    }

    #[test]
    fn test_damage_floors_at_zero() {
        let mut hero = fighter(HeroId::new(0, 0));
        assert!(!hero.apply_damage(5));
        assert_eq!(hero.current_hp, 15);

        // Overkill clamps to 0 and reports death
        assert!(hero.apply_damage(100));
        assert_eq!(hero.current_hp, 0);
        assert!(!hero.is_alive());

        // Dead heroes take no further damage
        assert!(!hero.apply_damage(5));
        assert_eq!(hero.current_hp, 0);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut hero = fighter(HeroId::new(0, 0));
        hero.apply_damage(10);

        assert_eq!(hero.heal(4), 4);
        assert_eq!(hero.current_hp, 14);

        // Overheal clamps
        assert_eq!(hero.heal(100), 6);
        assert_eq!(hero.current_hp, hero.definition.max_hp);

        // Dead heroes cannot be healed
        hero.apply_damage(100);
        assert_eq!(hero.heal(10), 0);
        assert!(!hero.is_alive());
    }

    #[test]
    fn test_stat_bonus_sums_buffs_and_modifiers() {
        let mut hero = fighter(HeroId::new(0, 0));
        let base_ac = hero.armor_class();

        hero.buffs.push(PassiveBuff {
            source: "Dual Defender".into(),
            stat: Stat::Defense,
            amount: 2,
            permanent: false,
        });
        hero.apply_modifier(StatModifier {
            source: "Shadowdancer".into(),
            stat: Stat::Defense,
            amount: 2,
            turns_remaining: 1,
        });

        assert_eq!(hero.armor_class(), base_ac + 4);
    }

    #[test]
    fn test_modifier_refresh_not_stack() {
        let mut hero = fighter(HeroId::new(0, 0));
        let debuff = StatModifier {
            source: "Dual Defender".into(),
            stat: Stat::Accuracy,
            amount: -2,
            turns_remaining: 2,
        };

        hero.apply_modifier(debuff.clone());
        hero.apply_modifier(debuff);

        // Re-applying refreshes rather than stacking
        assert_eq!(hero.modifiers.len(), 1);
        assert_eq!(hero.accuracy(), hero.definition.accuracy - 2);
    }

    #[test]
    fn test_modifier_expiry() {
        let mut hero = fighter(HeroId::new(0, 0));
        hero.apply_modifier(StatModifier {
            source: "x".into(),
            stat: Stat::Attack,
            amount: 2,
            turns_remaining: 2,
        });

        hero.expire_modifiers();
        assert_eq!(hero.modifiers.len(), 1);

        hero.expire_modifiers();
        assert!(hero.modifiers.is_empty());
        assert_eq!(hero.attack_bonus(), 0);
    }

    #[test]
    fn test_clear_expiring_statuses() {
        let mut status = StatusEffects {
            poison: 3,
            taunted_by: Some(HeroId::new(1, 0)),
            inspiration: 2,
            silenced: true,
            untargetable: true,
        };

        status.clear_expiring();

        // Taunt, silence, untargetable expire; poison and inspiration persist
        assert_eq!(status.taunted_by, None);
        assert!(!status.silenced);
        assert!(!status.untargetable);
        assert_eq!(status.poison, 3);
        assert_eq!(status.inspiration, 2);
    }

    #[test]
    fn test_reset_for_battle() {
        let mut hero = fighter(HeroId::new(0, 0));
        hero.apply_damage(10);
        hero.status.poison = 2;
        hero.acted = true;
        hero.buffs.push(PassiveBuff {
            source: "x".into(),
            stat: Stat::Attack,
            amount: 1,
            permanent: true,
        });

        hero.reset_for_battle();

        assert_eq!(hero.current_hp, hero.definition.max_hp);
        assert_eq!(hero.status, StatusEffects::default());
        assert!(hero.buffs.is_empty());
        assert!(!hero.acted);
    }
}
