//! Passive Aura Engine
//!
//! Recomputes every hero's buff set wholesale, never incrementally: on battle
//! start, on every death, and after each ability resolution. A recompute
//! clears all non-permanent buffs and re-derives them from the catalog
//! definitions of the heroes still alive, so a dead hero's grants vanish on
//! the next pass without any targeted removal logic.

use crate::catalog::{AuraCondition, Passive, Stat, StartTarget};
use crate::game::hero::{HeroId, HeroInstance, PassiveBuff};
use crate::game::Teams;

/// Recompute all passive buffs from the current living roster.
///
/// Permanent buffs are retained as-is (they survive their source's death);
/// everything else is cleared and re-granted from living sources.
pub fn recompute(teams: &mut Teams) {
    // Clear non-permanent buffs on everyone
    for team in teams.iter_mut() {
        for hero in team.iter_mut() {
            hero.buffs.retain(|b| b.permanent);
        }
    }

    // Re-grant team auras from living sources to living allies
    for team in teams.iter_mut() {
        let grants: Vec<PassiveBuff> = team.iter()
            .filter(|h| h.is_alive())
            .flat_map(|h| {
                h.definition.passives.iter().filter_map(|p| match p {
                    Passive::TeamAura { stat, amount, .. } => Some(PassiveBuff {
                        source: h.name().to_string(),
                        stat: *stat,
                        amount: *amount,
                        permanent: false,
                    }),
                    _ => None,
                })
            })
            .collect();

        for hero in team.iter_mut().filter(|h| h.is_alive()) {
            hero.buffs.extend(grants.iter().cloned());
        }
    }
}

/// Apply battle-start passives, then run a full recompute.
///
/// `start_of_game` grants are keyed by (source, stat); re-invoking this
/// function never double-stacks a permanent grant.
pub fn apply_battle_start(teams: &mut Teams) {
    for player in 0..2u8 {
        let team_len = teams[player as usize].len();
        for hero_idx in 0..team_len {
            let source = &teams[player as usize][hero_idx];
            if !source.is_alive() {
                continue;
            }
            let source_id = source.id;
            let source_name = source.name().to_string();

            let starts: Vec<(StartTarget, Stat, i32, bool)> = source.definition.passives.iter()
                .filter_map(|p| match p {
                    Passive::StartOfGame { target, stat, amount, permanent, .. } => {
                        Some((*target, *stat, *amount, *permanent))
                    }
                    _ => None,
                })
                .collect();

            for (target_rule, stat, amount, permanent) in starts {
                let target_id = resolve_start_target(teams, source_id, target_rule);
                let Some(target) = crate::game::hero_mut(teams, target_id) else {
                    continue;
                };
                let already = target.buffs.iter()
                    .any(|b| b.source == source_name && b.stat == stat);
                if !already {
                    target.buffs.push(PassiveBuff {
                        source: source_name.clone(),
                        stat,
                        amount,
                        permanent,
                    });
                }
            }
        }
    }

    recompute(teams);
}

/// Pick the recipient of a start-of-battle grant.
fn resolve_start_target(teams: &Teams, source: HeroId, rule: StartTarget) -> HeroId {
    let team = &teams[source.player as usize];
    match rule {
        StartTarget::SelfHero => source,
        StartTarget::FirstAlly => team.iter()
            .find(|h| h.is_alive() && h.id != source)
            .map(|h| h.id)
            .unwrap_or(source),
        StartTarget::LowestHpAlly => team.iter()
            .filter(|h| h.is_alive() && h.id != source)
            .min_by_key(|h| h.definition.max_hp)
            .map(|h| h.id)
            .unwrap_or(source),
    }
}

/// Conditional-aura bonus to a stat, evaluated inline at roll time.
///
/// Conditional auras are never materialized as buffs; they only exist for
/// the duration of this check.
pub fn conditional_bonus(teams: &Teams, id: HeroId, stat: Stat) -> i32 {
    let Some(hero) = crate::game::hero(teams, id) else {
        return 0;
    };
    let team = &teams[id.player as usize];

    hero.definition.passives.iter()
        .filter_map(|p| match p {
            Passive::ConditionalAura { condition, stat: s, amount, .. } if *s == stat => {
                Some((condition, *amount))
            }
            _ => None,
        })
        .filter(|(condition, _)| condition_holds(team, hero, **condition))
        .map(|(_, amount)| amount)
        .sum()
}

fn condition_holds(team: &[HeroInstance], hero: &HeroInstance, condition: AuraCondition) -> bool {
    match condition {
        AuraCondition::AllyBelowHalfHp => team.iter()
            .any(|h| h.is_alive() && h.current_hp * 2 <= h.definition.max_hp),
        AuraCondition::SelfBelowHalfHp => {
            hero.current_hp * 2 <= hero.definition.max_hp
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

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

    #[test]
    fn test_team_aura_grants_allies() {
        // Dual Defender: Guardian Aura, defense +2 to the whole team
        let mut teams: Teams = [
            make_team(0, &["Dual Defender", "Monk", "Rogue"]),
            make_team(1, &["Fighter", "Cleric", "Bard"]),
        ];

        recompute(&mut teams);

        let monk = crate::game::hero(&teams, HeroId::new(0, 1)).unwrap();
        assert_eq!(monk.armor_class(), monk.definition.armor_class + 2);

        // Enemy team gets nothing from it (Bard's own aura is attack, not defense)
        let fighter = crate::game::hero(&teams, HeroId::new(1, 0)).unwrap();
        assert_eq!(fighter.armor_class(), fighter.definition.armor_class);
    }

    #[test]
    fn test_aura_removed_on_source_death() {
        let mut teams: Teams = [
            make_team(0, &["Dual Defender", "Monk", "Rogue"]),
            make_team(1, &["Fighter", "Cleric", "Bard"]),
        ];
        recompute(&mut teams);

        let monk_ac_buffed = crate::game::hero(&teams, HeroId::new(0, 1)).unwrap().armor_class();

        // Kill the aura source
        crate::game::hero_mut(&mut teams, HeroId::new(0, 0)).unwrap().apply_damage(1000);
        recompute(&mut teams);

        let monk = crate::game::hero(&teams, HeroId::new(0, 1)).unwrap();
        assert_eq!(monk.armor_class(), monk.definition.armor_class);
        assert_eq!(monk.armor_class(), monk_ac_buffed - 2);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut teams: Teams = [
            make_team(0, &["Dual Defender", "Monk", "Rogue"]),
            make_team(1, &["Shadowdancer", "Cleric", "Bard"]),
        ];

        recompute(&mut teams);
        let snapshot: Vec<i32> = teams.iter()
            .flat_map(|t| t.iter().map(|h| h.armor_class() + h.accuracy()))
            .collect();

        // Repeated recomputation must not stack anything
        recompute(&mut teams);
        recompute(&mut teams);

        let again: Vec<i32> = teams.iter()
            .flat_map(|t| t.iter().map(|h| h.armor_class() + h.accuracy()))
            .collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_start_of_game_first_ally() {
        // Cleric's Blessing: accuracy +1 to first living ally, permanent
        let mut teams: Teams = [
            make_team(0, &["Cleric", "Monk", "Rogue"]),
            make_team(1, &["Fighter", "Warden", "Bard"]),
        ];

        apply_battle_start(&mut teams);

        let monk = crate::game::hero(&teams, HeroId::new(0, 1)).unwrap();
        assert!(monk.buffs.iter().any(|b| b.source == "Cleric" && b.permanent));
        assert_eq!(monk.accuracy(), monk.definition.accuracy + 1);
    }

    #[test]
    fn test_permanent_grant_never_double_stacks() {
        let mut teams: Teams = [
            make_team(0, &["Cleric", "Monk", "Rogue"]),
            make_team(1, &["Fighter", "Warden", "Bard"]),
        ];

        apply_battle_start(&mut teams);
        apply_battle_start(&mut teams);
        recompute(&mut teams);

        let monk = crate::game::hero(&teams, HeroId::new(0, 1)).unwrap();
        let blessing_count = monk.buffs.iter()
            .filter(|b| b.source == "Cleric" && b.stat == Stat::Accuracy)
            .count();
        assert_eq!(blessing_count, 1);
    }

    #[test]
    fn test_permanent_grant_survives_source_death() {
        let mut teams: Teams = [
            make_team(0, &["Cleric", "Monk", "Rogue"]),
            make_team(1, &["Fighter", "Warden", "Bard"]),
        ];
        apply_battle_start(&mut teams);

        crate::game::hero_mut(&mut teams, HeroId::new(0, 0)).unwrap().apply_damage(1000);
        recompute(&mut teams);

        let monk = crate::game::hero(&teams, HeroId::new(0, 1)).unwrap();
        assert!(monk.buffs.iter().any(|b| b.source == "Cleric"));
    }

    #[test]
    fn test_conditional_aura_tracks_hp() {
        // Berserker's Blood Frenzy: attack +3 while at or below half HP
        let mut teams: Teams = [
            make_team(0, &["Berserker", "Monk", "Rogue"]),
            make_team(1, &["Fighter", "Warden", "Bard"]),
        ];
        let id = HeroId::new(0, 0);

        assert_eq!(conditional_bonus(&teams, id, Stat::Attack), 0);

        crate::game::hero_mut(&mut teams, id).unwrap().apply_damage(12); // 24 -> 12
        assert_eq!(conditional_bonus(&teams, id, Stat::Attack), 3);

        // Never materialized as a buff
        assert!(crate::game::hero(&teams, id).unwrap().buffs.is_empty());
    }

    #[test]
    fn test_start_of_game_lowest_hp_ally() {
        // Warden's Aegis Oath targets the lowest-max-HP living ally
        let mut teams: Teams = [
            make_team(0, &["Warden", "Berserker", "Rogue"]),
            make_team(1, &["Fighter", "Cleric", "Bard"]),
        ];

        apply_battle_start(&mut teams);

        // Rogue (14 max HP) beats Berserker (24)
        let rogue = crate::game::hero(&teams, HeroId::new(0, 2)).unwrap();
        assert!(rogue.buffs.iter().any(|b| b.source == "Warden" && b.stat == Stat::Defense));
    }
}
