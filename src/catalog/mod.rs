//! Hero & Ability Catalog
//!
//! Static, read-only definitions of heroes, their basic attacks, abilities,
//! and passive effects. The catalog is injected into the engine at startup;
//! loading and hot-reloading are collaborator concerns. Nothing in here is
//! ever mutated by a running match.
//!
//! Ability effects are a tagged sum: unrecognized `kind` tags deserialize to
//! [`AbilityEffect::Unknown`] and are logged and skipped at application time
//! instead of failing the whole ability.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::dice::DiceExpr;

/// Stat a buff, debuff, or aura can modify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Added to attack rolls.
    Accuracy,
    /// Added to damage rolls.
    Attack,
    /// Added to armor class.
    Defense,
}

/// Status condition an ability can inflict or grant.
///
/// Poison, taunt, and silence are applied to the selected enemy target;
/// inspiration and untargetable always apply to the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Damage-over-time stacks, ticking at the victim's end of turn.
    Poison,
    /// Forces the victim's next action to target the caster.
    Taunt,
    /// Victim cannot use abilities until their next end of turn.
    Silence,
    /// Caster gains accuracy stacks spent by the next attack roll.
    Inspiration,
    /// Caster cannot be targeted until their next end of turn.
    Untargetable,
}

/// One primitive effect inside an ability's effect list.
///
/// Damage-typed effects (`Damage`, `LifestealDamage`) share a single attack
/// roll per ability; the rest resolve in a second pass (see `game::combat`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityEffect {
    /// Roll damage against the selected target.
    Damage {
        /// Damage expression.
        dice: DiceExpr,
    },

    /// Roll damage against the target and heal the caster for damage dealt.
    LifestealDamage {
        /// Damage expression.
        dice: DiceExpr,
    },

    /// Heal the caster, capped at max HP.
    Heal {
        /// Healing expression.
        dice: DiceExpr,
    },

    /// Grant the caster a timed stat bonus.
    ApplyBuff {
        /// Stat to raise.
        stat: Stat,
        /// Bonus amount.
        amount: i32,
        /// Turns the bonus lasts (measured in the caster's own turns).
        turns: u32,
    },

    /// Inflict a timed stat penalty on the selected target.
    ApplyDebuff {
        /// Stat to lower.
        stat: Stat,
        /// Penalty amount (positive number, subtracted).
        amount: i32,
        /// Turns the penalty lasts (measured in the victim's own turns).
        turns: u32,
    },

    /// Inflict or grant a status condition.
    ApplyStatus {
        /// Which status.
        status: StatusKind,
        /// Stack count for stacking statuses (poison, inspiration).
        #[serde(default = "default_stacks")]
        stacks: u32,
    },

    /// The caster damages itself after the attack connects.
    RecoilDamage {
        /// Self-damage expression.
        dice: DiceExpr,
    },

    /// Unrecognized effect kind. Tolerated: logged and skipped at
    /// application time so new catalog content never bricks a live match.
    #[serde(other)]
    Unknown,
}

fn default_stacks() -> u32 {
    1
}

impl AbilityEffect {
    /// Damage-typed effects resolve in pass 1 against the shared attack roll.
    pub fn is_damage(&self) -> bool {
        matches!(self, AbilityEffect::Damage { .. } | AbilityEffect::LifestealDamage { .. })
    }
}

/// Target rule for a start-of-battle passive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartTarget {
    /// The hero itself.
    SelfHero,
    /// First living ally in team order, falling back to self.
    FirstAlly,
    /// Living ally with the lowest max HP, falling back to self.
    LowestHpAlly,
}

/// Condition for a conditional aura, evaluated inline during combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuraCondition {
    /// Any living ally (including self) is at or below half HP.
    AllyBelowHalfHp,
    /// The hero itself is at or below half HP.
    SelfBelowHalfHp,
}

/// A hero's passive special effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Passive {
    /// Standing stat bonus for all living allies while the source lives.
    TeamAura {
        /// Display name of the aura.
        name: String,
        /// Stat granted.
        stat: Stat,
        /// Bonus amount.
        amount: i32,
    },

    /// Stat bonus that only counts while a condition holds. Never
    /// materialized as a buff; combat checks it at roll time.
    ConditionalAura {
        /// Display name.
        name: String,
        /// Gating condition.
        condition: AuraCondition,
        /// Stat granted while the condition holds.
        stat: Stat,
        /// Bonus amount.
        amount: i32,
    },

    /// One-shot buff applied when the battle starts.
    StartOfGame {
        /// Display name.
        name: String,
        /// Who receives the buff.
        target: StartTarget,
        /// Stat granted.
        stat: Stat,
        /// Bonus amount.
        amount: i32,
        /// Permanent buffs survive the source's death.
        #[serde(default)]
        permanent: bool,
    },

    /// The hero may use both its basic attack and its ability each turn.
    ExtraAction {
        /// Display name.
        name: String,
    },
}

impl Passive {
    /// Display name of the passive.
    pub fn name(&self) -> &str {
        match self {
            Passive::TeamAura { name, .. } => name,
            Passive::ConditionalAura { name, .. } => name,
            Passive::StartOfGame { name, .. } => name,
            Passive::ExtraAction { name } => name,
        }
    }
}

/// An active ability: a named, ordered list of effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Ability name shown to clients.
    pub name: String,
    /// Ordered effect list; resolution order within a pass follows this order.
    pub effects: Vec<AbilityEffect>,
}

impl Ability {
    /// Whether any effect is damage-typed (needs an attack roll).
    pub fn has_damage(&self) -> bool {
        self.effects.iter().any(AbilityEffect::is_damage)
    }
}

/// Immutable definition of a hero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeroDefinition {
    /// Unique hero name (catalog key).
    pub name: String,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Base armor class attack rolls are compared against.
    pub armor_class: i32,
    /// Base accuracy modifier added to attack rolls.
    pub accuracy: i32,
    /// Basic-attack damage expression.
    pub attack_damage: DiceExpr,
    /// Active abilities (index-addressed by `use_ability`).
    pub abilities: Vec<Ability>,
    /// Passive specials.
    pub passives: Vec<Passive>,
    /// Disabled heroes are excluded from drafting and assignment.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl HeroDefinition {
    /// Whether this hero's passives grant a second action per turn.
    pub fn has_extra_action(&self) -> bool {
        self.passives.iter().any(|p| matches!(p, Passive::ExtraAction { .. }))
    }
}

/// Error constructing a catalog.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// Two heroes share a name.
    #[error("duplicate hero name: {0}")]
    DuplicateHero(String),

    /// Catalog JSON failed to parse.
    #[error("invalid catalog data: {0}")]
    InvalidData(String),

    /// Fewer enabled heroes than a draft needs.
    #[error("catalog has {0} enabled heroes, need at least {1}")]
    TooFewHeroes(usize, usize),
}

/// Read-only hero catalog, shared across all sessions.
#[derive(Clone, Debug)]
pub struct Catalog {
    heroes: Arc<BTreeMap<String, HeroDefinition>>,
}

impl Catalog {
    /// Minimum enabled heroes for a draft: 5-card hands for two players.
    pub const MIN_DRAFT_POOL: usize = 10;

    /// Build a catalog from definitions, rejecting duplicate names.
    pub fn new(definitions: Vec<HeroDefinition>) -> Result<Self, CatalogError> {
        let mut heroes = BTreeMap::new();
        for def in definitions {
            if heroes.contains_key(&def.name) {
                return Err(CatalogError::DuplicateHero(def.name));
            }
            heroes.insert(def.name.clone(), def);
        }
        Ok(Self { heroes: Arc::new(heroes) })
    }

    /// Load catalog records from a JSON array of hero definitions.
    pub fn from_json(data: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<HeroDefinition> = serde_json::from_str(data)
            .map_err(|e| CatalogError::InvalidData(e.to_string()))?;
        Self::new(definitions)
    }

    /// Look up a hero by name.
    pub fn get(&self, name: &str) -> Option<&HeroDefinition> {
        self.heroes.get(name)
    }

    /// All enabled heroes, in name order.
    pub fn enabled(&self) -> impl Iterator<Item = &HeroDefinition> {
        self.heroes.values().filter(|h| h.enabled)
    }

    /// Count of enabled heroes.
    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }

    /// Built-in roster used by the demo binary and tests.
    pub fn builtin() -> Self {
        Self::new(builtin_roster()).expect("builtin roster is valid")
    }
}

/// The built-in hero roster.
///
/// Exercises every effect kind and passive category at least once.
fn builtin_roster() -> Vec<HeroDefinition> {
    fn dice(s: &str) -> DiceExpr {
        s.parse().expect("builtin dice expression")
    }

    vec![
        HeroDefinition {
            name: "Fighter".into(),
            max_hp: 20,
            armor_class: 14,
            accuracy: 2,
            attack_damage: dice("1d8+2"),
            abilities: vec![Ability {
                name: "Power Strike".into(),
                effects: vec![AbilityEffect::Damage { dice: dice("2d6+2") }],
            }],
            passives: vec![Passive::ConditionalAura {
                name: "Second Wind".into(),
                condition: AuraCondition::SelfBelowHalfHp,
                stat: Stat::Defense,
                amount: 2,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Cleric".into(),
            max_hp: 18,
            armor_class: 12,
            accuracy: 1,
            attack_damage: dice("1d6"),
            abilities: vec![Ability {
                name: "Healing Word".into(),
                effects: vec![AbilityEffect::Heal { dice: dice("1d8+2") }],
            }],
            passives: vec![Passive::StartOfGame {
                name: "Blessing".into(),
                target: StartTarget::FirstAlly,
                stat: Stat::Accuracy,
                amount: 1,
                permanent: true,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Monk".into(),
            max_hp: 16,
            armor_class: 13,
            accuracy: 3,
            attack_damage: dice("1d6+1"),
            abilities: vec![Ability {
                name: "Stunning Palm".into(),
                effects: vec![
                    AbilityEffect::Damage { dice: dice("1d6") },
                    AbilityEffect::ApplyStatus { status: StatusKind::Silence, stacks: 1 },
                ],
            }],
            passives: vec![Passive::ExtraAction { name: "Flurry".into() }],
            enabled: true,
        },
        HeroDefinition {
            name: "Dual Defender".into(),
            max_hp: 22,
            armor_class: 15,
            accuracy: 1,
            attack_damage: dice("1d8"),
            abilities: vec![Ability {
                name: "Shield Bash".into(),
                effects: vec![
                    AbilityEffect::Damage { dice: dice("1d4+1") },
                    AbilityEffect::ApplyDebuff { stat: Stat::Accuracy, amount: 2, turns: 2 },
                ],
            }],
            passives: vec![Passive::TeamAura {
                name: "Guardian Aura".into(),
                stat: Stat::Defense,
                amount: 2,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Rogue".into(),
            max_hp: 14,
            armor_class: 13,
            accuracy: 4,
            attack_damage: dice("1d4+2"),
            abilities: vec![Ability {
                name: "Envenomed Blade".into(),
                effects: vec![
                    AbilityEffect::Damage { dice: dice("1d4") },
                    AbilityEffect::ApplyStatus { status: StatusKind::Poison, stacks: 2 },
                ],
            }],
            passives: vec![Passive::ConditionalAura {
                name: "Opportunist".into(),
                condition: AuraCondition::AllyBelowHalfHp,
                stat: Stat::Attack,
                amount: 2,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Berserker".into(),
            max_hp: 24,
            armor_class: 11,
            accuracy: 2,
            attack_damage: dice("1d12"),
            abilities: vec![Ability {
                name: "Reckless Swing".into(),
                effects: vec![
                    AbilityEffect::Damage { dice: dice("2d8+2") },
                    AbilityEffect::RecoilDamage { dice: dice("1d4") },
                ],
            }],
            passives: vec![Passive::ConditionalAura {
                name: "Blood Frenzy".into(),
                condition: AuraCondition::SelfBelowHalfHp,
                stat: Stat::Attack,
                amount: 3,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Warden".into(),
            max_hp: 20,
            armor_class: 16,
            accuracy: 1,
            attack_damage: dice("1d8"),
            abilities: vec![Ability {
                name: "Challenge".into(),
                effects: vec![AbilityEffect::ApplyStatus { status: StatusKind::Taunt, stacks: 1 }],
            }],
            passives: vec![Passive::StartOfGame {
                name: "Aegis Oath".into(),
                target: StartTarget::LowestHpAlly,
                stat: Stat::Defense,
                amount: 2,
                permanent: true,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Bard".into(),
            max_hp: 15,
            armor_class: 12,
            accuracy: 2,
            attack_damage: dice("1d6"),
            abilities: vec![Ability {
                name: "Inspire".into(),
                effects: vec![
                    AbilityEffect::ApplyStatus { status: StatusKind::Inspiration, stacks: 2 },
                    AbilityEffect::Heal { dice: dice("1d4") },
                ],
            }],
            passives: vec![Passive::TeamAura {
                name: "Battle Hymn".into(),
                stat: Stat::Attack,
                amount: 1,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Warlock".into(),
            max_hp: 16,
            armor_class: 12,
            accuracy: 3,
            attack_damage: dice("1d6"),
            abilities: vec![Ability {
                name: "Life Drain".into(),
                effects: vec![AbilityEffect::LifestealDamage { dice: dice("1d8+1") }],
            }],
            passives: vec![Passive::StartOfGame {
                name: "Dark Pact".into(),
                target: StartTarget::SelfHero,
                stat: Stat::Attack,
                amount: 1,
                permanent: true,
            }],
            enabled: true,
        },
        HeroDefinition {
            name: "Shadowdancer".into(),
            max_hp: 14,
            armor_class: 14,
            accuracy: 3,
            attack_damage: dice("1d6+1"),
            abilities: vec![Ability {
                name: "Smoke Bomb".into(),
                effects: vec![
                    AbilityEffect::ApplyStatus { status: StatusKind::Untargetable, stacks: 1 },
                    AbilityEffect::ApplyBuff { stat: Stat::Defense, amount: 2, turns: 1 },
                ],
            }],
            passives: vec![Passive::TeamAura {
                name: "Guiding Shadows".into(),
                stat: Stat::Accuracy,
                amount: 1,
            }],
            enabled: true,
        },
    ]
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roster_is_valid() {
        let catalog = Catalog::builtin();
        assert!(catalog.enabled_count() >= Catalog::MIN_DRAFT_POOL);

        // Stats the engine tests rely on
        let fighter = catalog.get("Fighter").unwrap();
        assert_eq!(fighter.accuracy, 2);
        assert_eq!(fighter.attack_damage.to_string(), "1d8+2");

        let cleric = catalog.get("Cleric").unwrap();
        assert_eq!(cleric.armor_class, 12);
        assert_eq!(cleric.max_hp, 18);
    }

    #[test]
    fn test_duplicate_hero_rejected() {
        let def = Catalog::builtin().get("Fighter").unwrap().clone();
        let result = Catalog::new(vec![def.clone(), def]);
        assert!(matches!(result, Err(CatalogError::DuplicateHero(_))));
    }

    #[test]
    fn test_unknown_effect_kind_tolerated() {
        let json = r#"{"kind": "summon_dragon", "dice": "9d9"}"#;
        let effect: AbilityEffect = serde_json::from_str(json).unwrap();
        assert_eq!(effect, AbilityEffect::Unknown);
    }

    #[test]
    fn test_effect_round_trip() {
        let effects = vec![
            AbilityEffect::Damage { dice: "2d6+2".parse().unwrap() },
            AbilityEffect::ApplyStatus { status: StatusKind::Poison, stacks: 2 },
            AbilityEffect::RecoilDamage { dice: "1d4".parse().unwrap() },
        ];
        let json = serde_json::to_string(&effects).unwrap();
        let back: Vec<AbilityEffect> = serde_json::from_str(&json).unwrap();
        assert_eq!(effects, back);
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            {
                "name": "Test Hero",
                "max_hp": 10,
                "armor_class": 12,
                "accuracy": 1,
                "attack_damage": "1d6",
                "abilities": [
                    {"name": "Zap", "effects": [{"kind": "damage", "dice": "1d4"}]}
                ],
                "passives": [{"kind": "extra_action", "name": "Quick"}]
            }
        ]"#;
        let catalog = Catalog::from_json(json).unwrap();
        let hero = catalog.get("Test Hero").unwrap();
        assert!(hero.enabled, "enabled defaults to true");
        assert!(hero.has_extra_action());
    }

    #[test]
    fn test_catalog_from_json_rejects_bad_dice() {
        let json = r#"[
            {
                "name": "Broken",
                "max_hp": 10,
                "armor_class": 12,
                "accuracy": 1,
                "attack_damage": "0d0",
                "abilities": [],
                "passives": []
            }
        ]"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::InvalidData(_))));
    }

    #[test]
    fn test_ability_has_damage() {
        let catalog = Catalog::builtin();
        assert!(catalog.get("Fighter").unwrap().abilities[0].has_damage());
        assert!(!catalog.get("Cleric").unwrap().abilities[0].has_damage());
        assert!(catalog.get("Warlock").unwrap().abilities[0].has_damage());
    }
}
