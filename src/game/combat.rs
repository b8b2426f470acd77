//! Combat Resolution
//!
//! Attack rolls, basic attacks, and the two-pass ability pipeline.
//!
//! Resolution of a damaging ability is a unit: every damage-typed effect in
//! the ability shares ONE attack roll (pass 1), then the remaining effects
//! apply in pass 2, with hit-gated kinds suppressed if the shared roll
//! missed. Unknown effect kinds are logged and skipped, never an error.

use tracing::warn;

use crate::catalog::{AbilityEffect, Stat, StatusKind};
use crate::core::dice::DiceExpr;
use crate::core::rng::DeterministicRng;
use crate::game::auras;
use crate::game::events::BattleEvent;
use crate::game::hero::{HeroId, StatModifier};
use crate::game::{hero, hero_mut, Teams};

/// A resolved d20 attack roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackRoll {
    /// The raw d20.
    pub roll: i32,
    /// Accuracy modifier applied (auras, conditionals, inspiration).
    pub accuracy: i32,
    /// `roll + accuracy`.
    pub total: i32,
    /// Natural 20: damage dice are doubled.
    pub crit: bool,
}

impl AttackRoll {
    /// Hit rule: total meets or beats the target's armor class.
    #[inline]
    pub fn hits(&self, armor_class: i32) -> bool {
        self.total >= armor_class
    }
}

/// Roll a d20 attack with the given accuracy modifier.
pub fn roll_attack(rng: &mut DeterministicRng, accuracy: i32) -> AttackRoll {
    let roll = rng.d20();
    AttackRoll {
        roll,
        accuracy,
        total: roll + accuracy,
        crit: roll == 20,
    }
}

/// Attacker's effective accuracy for one roll: aura-modified accuracy plus
/// conditional auras plus inspiration stacks (+2 each, consumed here).
fn attack_accuracy(teams: &mut Teams, attacker: HeroId) -> i32 {
    let conditional = auras::conditional_bonus(teams, attacker, Stat::Accuracy);
    let Some(hero) = hero_mut(teams, attacker) else {
        return conditional;
    };
    let inspiration = hero.status.inspiration;
    hero.status.inspiration = 0;
    hero.accuracy() + conditional + inspiration as i32 * 2
}

/// Attacker's effective bonus added to damage rolls.
fn damage_bonus(teams: &Teams, attacker: HeroId) -> i32 {
    let conditional = auras::conditional_bonus(teams, attacker, Stat::Attack);
    hero(teams, attacker).map(|h| h.attack_bonus()).unwrap_or(0) + conditional
}

/// Target's effective armor class.
fn effective_armor_class(teams: &Teams, target: HeroId) -> i32 {
    let conditional = auras::conditional_bonus(teams, target, Stat::Defense);
    hero(teams, target).map(|h| h.armor_class()).unwrap_or(10) + conditional
}

/// Apply damage to a hero, emitting events and running death cleanup.
/// Returns the damage actually dealt (bounded by remaining HP).
fn deal_damage(
    teams: &mut Teams,
    source: HeroId,
    target: HeroId,
    amount: i32,
    events: &mut Vec<BattleEvent>,
) -> i32 {
    let Some(victim) = hero_mut(teams, target) else {
        return 0;
    };
    if !victim.is_alive() {
        return 0;
    }
    let before = victim.current_hp;
    let died = victim.apply_damage(amount);
    let dealt = before - victim.current_hp;

    events.push(BattleEvent::DamageDealt { source, target, amount: dealt });

    if died {
        events.push(BattleEvent::HeroDied { hero: target });
        // Death cleanup: strip the dead hero's non-permanent grants
        auras::recompute(teams);
    }
    dealt
}

/// Resolve a basic attack. Validation (turn, flags, target legality) is the
/// session's job; this assumes attacker and target are alive.
pub fn resolve_basic_attack(
    teams: &mut Teams,
    rng: &mut DeterministicRng,
    attacker: HeroId,
    target: HeroId,
    events: &mut Vec<BattleEvent>,
) {
    let accuracy = attack_accuracy(teams, attacker);
    let armor_class = effective_armor_class(teams, target);
    let attack = roll_attack(rng, accuracy);

    events.push(BattleEvent::AttackResolved {
        attacker,
        target,
        roll: attack.roll,
        accuracy: attack.accuracy,
        total: attack.total,
        armor_class,
        hit: attack.hits(armor_class),
        crit: attack.crit,
    });

    if !attack.hits(armor_class) {
        return;
    }

    let dice = hero(teams, attacker)
        .map(|h| h.definition.attack_damage)
        .unwrap_or(DiceExpr::flat(0));
    let rolled = if attack.crit { dice.roll_crit(rng) } else { dice.roll(rng) };
    let amount = rolled + damage_bonus(teams, attacker);

    deal_damage(teams, attacker, target, amount, events);

    if let Some(h) = hero_mut(teams, attacker) {
        h.acted = true;
    }
}

/// Hit-gated pass-2 kinds: suppressed when a damaging ability misses.
/// Self/ally kinds (heal, buff, inspiration, untargetable) always apply.
fn is_hit_gated(effect: &AbilityEffect) -> bool {
    match effect {
        AbilityEffect::ApplyDebuff { .. } => true,
        AbilityEffect::RecoilDamage { .. } => true,
        AbilityEffect::ApplyStatus { status, .. } => matches!(
            status,
            StatusKind::Poison | StatusKind::Taunt | StatusKind::Silence
        ),
        _ => false,
    }
}

/// Resolve an ability through the two-pass pipeline.
///
/// Pass 1: all damage-typed effects against one shared attack roll.
/// Pass 2: everything else, hit-gated kinds suppressed on a miss.
/// Finishes with an aura recompute so membership changes settle before the
/// win check.
pub fn resolve_ability(
    teams: &mut Teams,
    rng: &mut DeterministicRng,
    caster: HeroId,
    target: HeroId,
    ability_index: usize,
    events: &mut Vec<BattleEvent>,
) {
    let Some(ability) = hero(teams, caster)
        .and_then(|h| h.definition.abilities.get(ability_index))
        .cloned()
    else {
        return;
    };

    events.push(BattleEvent::AbilityUsed {
        caster,
        ability: ability.name.clone(),
        target,
    });

    let has_damage = ability.has_damage();
    let mut hit = true;
    let mut crit = false;

    // Pass 1: damage effects share a single attack roll; the ability hits
    // or misses as a unit.
    if has_damage {
        let accuracy = attack_accuracy(teams, caster);
        let armor_class = effective_armor_class(teams, target);
        let attack = roll_attack(rng, accuracy);
        hit = attack.hits(armor_class);
        crit = attack.crit;

        events.push(BattleEvent::AttackResolved {
            attacker: caster,
            target,
            roll: attack.roll,
            accuracy: attack.accuracy,
            total: attack.total,
            armor_class,
            hit,
            crit,
        });

        if hit {
            for effect in ability.effects.iter().filter(|e| e.is_damage()) {
                let dice = match effect {
                    AbilityEffect::Damage { dice } => *dice,
                    AbilityEffect::LifestealDamage { dice } => *dice,
                    _ => unreachable!("filtered to damage effects"),
                };
                let rolled = if crit { dice.roll_crit(rng) } else { dice.roll(rng) };
                let amount = rolled + damage_bonus(teams, caster);
                let dealt = deal_damage(teams, caster, target, amount, events);

                if matches!(effect, AbilityEffect::LifestealDamage { .. }) && dealt > 0 {
                    if let Some(h) = hero_mut(teams, caster) {
                        let restored = h.heal(dealt);
                        if restored > 0 {
                            events.push(BattleEvent::Healed { target: caster, amount: restored });
                        }
                    }
                }
            }
        }
    }

    // Pass 2: remaining effect kinds, in catalog order.
    for effect in ability.effects.iter().filter(|e| !e.is_damage()) {
        if has_damage && !hit && is_hit_gated(effect) {
            continue;
        }
        apply_secondary_effect(teams, rng, caster, target, &ability.name, effect, events);
    }

    if let Some(h) = hero_mut(teams, caster) {
        h.acted = true;
    }

    // Pipeline tail: settle auras after any membership change.
    auras::recompute(teams);
}

/// Apply one pass-2 effect primitive.
fn apply_secondary_effect(
    teams: &mut Teams,
    rng: &mut DeterministicRng,
    caster: HeroId,
    target: HeroId,
    ability_name: &str,
    effect: &AbilityEffect,
    events: &mut Vec<BattleEvent>,
) {
    let caster_name = hero(teams, caster)
        .map(|h| h.name().to_string())
        .unwrap_or_default();

    match effect {
        AbilityEffect::Heal { dice } => {
            let amount = dice.roll(rng);
            if let Some(h) = hero_mut(teams, caster) {
                let restored = h.heal(amount);
                if restored > 0 {
                    events.push(BattleEvent::Healed { target: caster, amount: restored });
                }
            }
        }

        AbilityEffect::ApplyBuff { stat, amount, turns } => {
            if let Some(h) = hero_mut(teams, caster) {
                h.apply_modifier(StatModifier {
                    source: caster_name,
                    stat: *stat,
                    amount: *amount,
                    turns_remaining: *turns,
                });
                events.push(BattleEvent::ModifierApplied {
                    source: caster,
                    target: caster,
                    stat: format!("{stat:?}").to_lowercase(),
                    amount: *amount,
                    turns: *turns,
                });
            }
        }

        AbilityEffect::ApplyDebuff { stat, amount, turns } => {
            let Some(victim) = hero_mut(teams, target) else { return };
            if !victim.is_alive() {
                return;
            }
            victim.apply_modifier(StatModifier {
                source: caster_name,
                stat: *stat,
                amount: -amount,
                turns_remaining: *turns,
            });
            events.push(BattleEvent::ModifierApplied {
                source: caster,
                target,
                stat: format!("{stat:?}").to_lowercase(),
                amount: -amount,
                turns: *turns,
            });
        }

        AbilityEffect::ApplyStatus { status, stacks } => {
            let (recipient, recipient_id) = match status {
                // Harmful statuses land on the selected target
                StatusKind::Poison | StatusKind::Taunt | StatusKind::Silence => {
                    (hero_mut(teams, target), target)
                }
                // Beneficial statuses land on the caster
                StatusKind::Inspiration | StatusKind::Untargetable => {
                    (hero_mut(teams, caster), caster)
                }
            };
            let Some(h) = recipient else { return };
            if !h.is_alive() {
                return;
            }
            match status {
                StatusKind::Poison => h.status.poison += stacks,
                StatusKind::Taunt => h.status.taunted_by = Some(caster),
                StatusKind::Silence => h.status.silenced = true,
                StatusKind::Inspiration => h.status.inspiration += stacks,
                StatusKind::Untargetable => h.status.untargetable = true,
            }
            events.push(BattleEvent::StatusApplied {
                source: caster,
                target: recipient_id,
                status: format!("{status:?}").to_lowercase(),
                stacks: *stacks,
            });
        }

        AbilityEffect::RecoilDamage { dice } => {
            let amount = dice.roll(rng);
            deal_damage(teams, caster, caster, amount, events);
        }

        AbilityEffect::Unknown => {
            warn!(caster = %caster, ability = ability_name, "skipping unknown ability effect kind");
            events.push(BattleEvent::EffectSkipped {
                caster,
                ability: ability_name.to_string(),
            });
        }

        // Damage effects are handled in pass 1
        AbilityEffect::Damage { .. } | AbilityEffect::LifestealDamage { .. } => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::game::hero::HeroInstance;

    fn make_team(player: u8, names: &[&str]) -> Vec<HeroInstance> {
        let catalog = Catalog::builtin();
        names.iter()
            .enumerate()
            .map(|(i, name)| {
                HeroInstance::new(
                    HeroId::new(player, i as u8),
                    catalog.get(name).unwrap().clone(),
                )
            })
            .collect()
    }

    fn standard_teams() -> Teams {
        [
            make_team(0, &["Fighter", "Cleric", "Monk"]),
            make_team(1, &["Rogue", "Warden", "Bard"]),
        ]
    }

    #[test]
    fn test_hit_rule_boundary() {
        // Hit iff roll + accuracy >= AC; equality hits
        let attack = AttackRoll { roll: 10, accuracy: 2, total: 12, crit: false };
        assert!(attack.hits(12));
        assert!(attack.hits(11));
        assert!(!attack.hits(13));
    }

    #[test]
    fn test_fighter_vs_cleric_worked_example() {
        // Fighter (accuracy +2) rolls 10 against Cleric (AC 12):
        // 10 + 2 = 12 >= 12 is a hit; 1d8+2 rolled as 5 drops 18 -> 13.
        let catalog = Catalog::builtin();
        let fighter = catalog.get("Fighter").unwrap();
        let cleric = catalog.get("Cleric").unwrap();

        let attack = AttackRoll {
            roll: 10,
            accuracy: fighter.accuracy,
            total: 10 + fighter.accuracy,
            crit: false,
        };
        assert!(attack.hits(cleric.armor_class));

        let mut target = HeroInstance::new(HeroId::new(1, 0), cleric.clone());
        assert_eq!(target.current_hp, 18);
        target.apply_damage(5);
        assert_eq!(target.current_hp, 13);
    }

    #[test]
    fn test_basic_attack_emits_roll_and_respects_bounds() {
        let mut teams = standard_teams();
        let mut rng = DeterministicRng::new(99);
        let mut events = Vec::new();

        let target_hp_before = hero(&teams, HeroId::new(1, 0)).unwrap().current_hp;
        resolve_basic_attack(
            &mut teams,
            &mut rng,
            HeroId::new(0, 0),
            HeroId::new(1, 0),
            &mut events,
        );

        let roll_event = events.iter().find_map(|e| match e {
            BattleEvent::AttackResolved { roll, hit, .. } => Some((*roll, *hit)),
            _ => None,
        });
        let (roll, hit) = roll_event.expect("attack roll event");
        assert!((1..=20).contains(&roll));

        let target = hero(&teams, HeroId::new(1, 0)).unwrap();
        if hit {
            assert!(target.current_hp < target_hp_before);
        } else {
            assert_eq!(target.current_hp, target_hp_before);
        }
        assert!(target.current_hp >= 0);
        assert!(hero(&teams, HeroId::new(0, 0)).unwrap().acted);
    }

    #[test]
    fn test_inspiration_consumed_by_roll() {
        let mut teams = standard_teams();
        let mut rng = DeterministicRng::new(7);
        let mut events = Vec::new();

        hero_mut(&mut teams, HeroId::new(0, 0)).unwrap().status.inspiration = 2;

        resolve_basic_attack(
            &mut teams,
            &mut rng,
            HeroId::new(0, 0),
            HeroId::new(1, 0),
            &mut events,
        );

        // +2 per stack folded into the roll, stacks spent
        let accuracy = events.iter().find_map(|e| match e {
            BattleEvent::AttackResolved { accuracy, .. } => Some(*accuracy),
            _ => None,
        }).unwrap();
        let base = hero(&teams, HeroId::new(0, 0)).unwrap().accuracy();
        assert_eq!(accuracy, base + 4);
        assert_eq!(hero(&teams, HeroId::new(0, 0)).unwrap().status.inspiration, 0);
    }

    #[test]
    fn test_heal_ability_always_applies() {
        // Cleric's Healing Word has no damage component: it applies even
        // without an attack roll.
        let mut teams = standard_teams();
        let mut rng = DeterministicRng::new(3);
        let mut events = Vec::new();

        let cleric = HeroId::new(0, 1);
        hero_mut(&mut teams, cleric).unwrap().apply_damage(10);
        let hp_before = hero(&teams, cleric).unwrap().current_hp;

        resolve_ability(&mut teams, &mut rng, cleric, cleric, 0, &mut events);

        let healed = hero(&teams, cleric).unwrap().current_hp;
        assert!(healed > hp_before);
        assert!(!events.iter().any(|e| matches!(e, BattleEvent::AttackResolved { .. })));
    }

    #[test]
    fn test_damaging_ability_miss_suppresses_gated_effects() {
        // Monk's Stunning Palm: damage + silence. On a miss, silence must
        // not land.
        let mut teams = standard_teams();
        let monk = HeroId::new(0, 2);
        let target = HeroId::new(1, 1);

        // Force a guaranteed miss: massive accuracy penalty
        hero_mut(&mut teams, monk).unwrap().apply_modifier(StatModifier {
            source: "test".into(),
            stat: Stat::Accuracy,
            amount: -100,
            turns_remaining: 5,
        });

        let mut rng = DeterministicRng::new(11);
        let mut events = Vec::new();
        resolve_ability(&mut teams, &mut rng, monk, target, 0, &mut events);

        let hit = events.iter().find_map(|e| match e {
            BattleEvent::AttackResolved { hit, .. } => Some(*hit),
            _ => None,
        }).unwrap();
        assert!(!hit);
        assert!(!hero(&teams, target).unwrap().status.silenced);
        assert!(!events.iter().any(|e| matches!(e, BattleEvent::StatusApplied { .. })));
    }

    #[test]
    fn test_damaging_ability_hit_applies_gated_effects() {
        let mut teams = standard_teams();
        let monk = HeroId::new(0, 2);
        let target = HeroId::new(1, 1);

        // Force a guaranteed hit
        hero_mut(&mut teams, monk).unwrap().apply_modifier(StatModifier {
            source: "test".into(),
            stat: Stat::Accuracy,
            amount: 100,
            turns_remaining: 5,
        });

        let mut rng = DeterministicRng::new(11);
        let mut events = Vec::new();
        resolve_ability(&mut teams, &mut rng, monk, target, 0, &mut events);

        assert!(hero(&teams, target).unwrap().status.silenced);
    }

    #[test]
    fn test_lifesteal_heals_for_damage_dealt() {
        let mut teams: Teams = [
            make_team(0, &["Warlock", "Cleric", "Monk"]),
            make_team(1, &["Rogue", "Warden", "Bard"]),
        ];
        let warlock = HeroId::new(0, 0);
        let target = HeroId::new(1, 0);

        hero_mut(&mut teams, warlock).unwrap().apply_damage(8);
        hero_mut(&mut teams, warlock).unwrap().apply_modifier(StatModifier {
            source: "test".into(),
            stat: Stat::Accuracy,
            amount: 100,
            turns_remaining: 5,
        });
        let caster_hp_before = hero(&teams, warlock).unwrap().current_hp;
        let target_hp_before = hero(&teams, target).unwrap().current_hp;

        let mut rng = DeterministicRng::new(21);
        let mut events = Vec::new();
        resolve_ability(&mut teams, &mut rng, warlock, target, 0, &mut events);

        let dealt = target_hp_before - hero(&teams, target).unwrap().current_hp;
        assert!(dealt > 0);
        let restored = hero(&teams, warlock).unwrap().current_hp - caster_hp_before;
        assert_eq!(restored, dealt.min(8));
    }

    #[test]
    fn test_recoil_damages_caster_on_hit() {
        let mut teams: Teams = [
            make_team(0, &["Berserker", "Cleric", "Monk"]),
            make_team(1, &["Rogue", "Warden", "Bard"]),
        ];
        let berserker = HeroId::new(0, 0);
        let target = HeroId::new(1, 0);

        hero_mut(&mut teams, berserker).unwrap().apply_modifier(StatModifier {
            source: "test".into(),
            stat: Stat::Accuracy,
            amount: 100,
            turns_remaining: 5,
        });
        let hp_before = hero(&teams, berserker).unwrap().current_hp;

        let mut rng = DeterministicRng::new(5);
        let mut events = Vec::new();
        resolve_ability(&mut teams, &mut rng, berserker, target, 0, &mut events);

        assert!(hero(&teams, berserker).unwrap().current_hp < hp_before);
    }

    #[test]
    fn test_death_strips_auras_mid_resolution() {
        // Killing Dual Defender removes its Guardian Aura from allies
        // immediately via the death-cleanup recompute.
        let mut teams: Teams = [
            make_team(0, &["Fighter", "Cleric", "Monk"]),
            make_team(1, &["Dual Defender", "Monk", "Rogue"]),
        ];
        auras::recompute(&mut teams);

        let ally = HeroId::new(1, 1);
        let buffed_ac = hero(&teams, ally).unwrap().armor_class();

        // Reduce the defender to 1 HP so any hit kills
        let defender = HeroId::new(1, 0);
        {
            let h = hero_mut(&mut teams, defender).unwrap();
            h.current_hp = 1;
        }
        hero_mut(&mut teams, HeroId::new(0, 0)).unwrap().apply_modifier(StatModifier {
            source: "test".into(),
            stat: Stat::Accuracy,
            amount: 100,
            turns_remaining: 5,
        });

        let mut rng = DeterministicRng::new(13);
        let mut events = Vec::new();
        resolve_basic_attack(&mut teams, &mut rng, HeroId::new(0, 0), defender, &mut events);

        assert!(!hero(&teams, defender).unwrap().is_alive());
        let ally_ac = hero(&teams, ally).unwrap().armor_class();
        assert_eq!(ally_ac, buffed_ac - 2);
    }

    #[test]
    fn test_unknown_effect_skipped_not_fatal() {
        let catalog = Catalog::builtin();
        let mut def = catalog.get("Cleric").unwrap().clone();
        def.abilities[0].effects.push(AbilityEffect::Unknown);

        let mut teams: Teams = [
            vec![HeroInstance::new(HeroId::new(0, 0), def)],
            make_team(1, &["Rogue"]),
        ];
        let caster = HeroId::new(0, 0);
        hero_mut(&mut teams, caster).unwrap().apply_damage(5);

        let mut rng = DeterministicRng::new(17);
        let mut events = Vec::new();
        resolve_ability(&mut teams, &mut rng, caster, caster, 0, &mut events);

        // The heal still applied; the unknown kind was recorded as skipped
        assert!(events.iter().any(|e| matches!(e, BattleEvent::Healed { .. })));
        assert!(events.iter().any(|e| matches!(e, BattleEvent::EffectSkipped { .. })));
    }
}
