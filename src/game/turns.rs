//! Turn Order & End-of-Turn Processing
//!
//! The turn sequence is fully derived: it is rebuilt from the currently
//! living heroes on every lookup, never cached, so deaths can never leave a
//! stale index behind. The cursor is a logical position (the last hero that
//! acted), not an index into any array.

use crate::game::auras;
use crate::game::events::{BattleEvent, Winner};
use crate::game::hero::HeroId;
use crate::game::{hero_mut, living_count, Teams};

/// Build the alternating turn order from living heroes.
///
/// Living heroes of `first_player` and the other slot are interleaved
/// 1-for-1 in team order; once one side runs out, the remainder of the
/// other side is appended in order.
pub fn build_turn_order(teams: &Teams, first_player: u8) -> Vec<HeroId> {
    order_with(teams, first_player, None)
}

/// Same as [`build_turn_order`], but force-includes one (possibly dead)
/// hero so a cursor pointing at a hero that just died still has a defined
/// position to advance from.
fn order_with(teams: &Teams, first_player: u8, include: Option<HeroId>) -> Vec<HeroId> {
    let second_player = 1 - first_player;
    let pick = |player: u8| -> Vec<HeroId> {
        teams[player as usize].iter()
            .filter(|h| h.is_alive() || Some(h.id) == include)
            .map(|h| h.id)
            .collect()
    };
    let first = pick(first_player);
    let second = pick(second_player);

    let mut order = Vec::with_capacity(first.len() + second.len());
    let common = first.len().min(second.len());
    for i in 0..common {
        order.push(first[i]);
        order.push(second[i]);
    }
    order.extend_from_slice(&first[common..]);
    order.extend_from_slice(&second[common..]);
    order
}

/// Whose turn is it?
///
/// With no actor yet, the first entry of the derived order. Otherwise the
/// next living entry after the last actor, which keeps its ordering slot
/// even if it died during its own turn (poison, recoil).
pub fn current_turn(teams: &Teams, first_player: u8, last_acted: Option<HeroId>) -> Option<HeroId> {
    match last_acted {
        None => build_turn_order(teams, first_player).first().copied(),
        Some(last) => {
            let order = order_with(teams, first_player, Some(last));
            let idx = order.iter().position(|&e| e == last)?;
            let len = order.len();
            for step in 1..=len {
                let candidate = order[(idx + step) % len];
                if candidate != last {
                    return Some(candidate);
                }
            }
            None
        }
    }
}

/// Apply the acting hero's end-of-turn effects: poison tick, then expiry of
/// timed modifiers and one-turn statuses.
pub fn apply_end_of_turn(teams: &mut Teams, acting: HeroId, events: &mut Vec<BattleEvent>) {
    let mut died = false;

    if let Some(h) = hero_mut(teams, acting) {
        if h.status.poison > 0 && h.is_alive() {
            let damage = h.status.poison as i32;
            died = h.apply_damage(damage);
            h.status.poison -= 1;
            events.push(BattleEvent::PoisonTick {
                target: acting,
                damage,
                stacks_remaining: h.status.poison,
            });
        }

        h.expire_modifiers();
        h.status.clear_expiring();
    }

    if died {
        events.push(BattleEvent::HeroDied { hero: acting });
        auras::recompute(teams);
    }
}

/// Evaluate the win condition.
///
/// Both sides empty in the same resolution step is a tie, never an
/// arbitrary pick.
pub fn check_winner(teams: &Teams) -> Option<Winner> {
    let alive0 = living_count(teams, 0);
    let alive1 = living_count(teams, 1);

    match (alive0, alive1) {
        (0, 0) => Some(Winner::Tie),
        (0, _) => Some(Winner::Player { slot: 1 }),
        (_, 0) => Some(Winner::Player { slot: 0 }),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
