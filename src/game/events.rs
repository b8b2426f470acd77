//! Battle Events
//!
//! Ordered, serializable records of everything that happens during a match.
//! Each player action drains its events into the action response so the
//! collaborator layer can relay them to clients and score rewards.

use serde::{Serialize, Deserialize};

use crate::game::hero::HeroId;

/// Final result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// The player in this slot won.
    Player {
        /// Winning slot index (0 or 1).
        slot: u8,
    },
    /// Both teams were eliminated in the same resolution step.
    Tie,
}

/// One thing that happened during a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    /// Session phase transition.
    PhaseChanged {
        from: String,
        to: String,
    },

    /// A player banned a card from their draft hand.
    CardBanned {
        slot: u8,
        card: String,
    },

    /// Draft hands swapped between the slots.
    HandsSwapped {
        round: u8,
    },

    /// A player picked a card into their team.
    CardPicked {
        slot: u8,
        card: String,
        round: u8,
    },

    /// Teams assigned without a draft (random/survival/gauntlet, auto-draft).
    TeamsAssigned,

    /// A player rolled initiative.
    InitiativeRolled {
        slot: u8,
        roll: i32,
    },

    /// Both initiative rolls tied and were discarded.
    InitiativeTied {
        roll: i32,
    },

    /// The initiative winner chose who acts first.
    TurnOrderChosen {
        slot: u8,
        goes_first: bool,
    },

    /// Battle began; this hero acts first.
    BattleStarted {
        first: HeroId,
    },

    /// A target was selected (possibly forced by taunt).
    TargetSelected {
        actor: HeroId,
        target: HeroId,
        forced: bool,
    },

    /// An attack roll was resolved.
    AttackResolved {
        attacker: HeroId,
        target: HeroId,
        roll: i32,
        accuracy: i32,
        total: i32,
        armor_class: i32,
        hit: bool,
        crit: bool,
    },

    /// Damage was dealt.
    DamageDealt {
        source: HeroId,
        target: HeroId,
        amount: i32,
    },

    /// An ability was used.
    AbilityUsed {
        caster: HeroId,
        ability: String,
        target: HeroId,
    },

    /// A hero was healed.
    Healed {
        target: HeroId,
        amount: i32,
    },

    /// A status condition was applied.
    StatusApplied {
        source: HeroId,
        target: HeroId,
        status: String,
        stacks: u32,
    },

    /// A timed stat modifier was applied (buff or debuff).
    ModifierApplied {
        source: HeroId,
        target: HeroId,
        stat: String,
        amount: i32,
        turns: u32,
    },

    /// An unrecognized effect kind was skipped.
    EffectSkipped {
        caster: HeroId,
        ability: String,
    },

    /// Poison ticked at end of turn.
    PoisonTick {
        target: HeroId,
        damage: i32,
        stacks_remaining: u32,
    },

    /// A hero died.
    HeroDied {
        hero: HeroId,
    },

    /// A hero's turn ended.
    TurnEnded {
        hero: HeroId,
        next: Option<HeroId>,
    },

    /// A player surrendered.
    Surrendered {
        slot: u8,
    },

    /// A player disconnected (the match keeps waiting).
    PlayerDisconnected {
        slot: u8,
    },

    /// A disconnected player rebound a new connection.
    PlayerReconnected {
        slot: u8,
    },

    /// The match ended.
    MatchEnded {
        winner: Winner,
    },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tags() {
        let event = BattleEvent::AttackResolved {
            attacker: HeroId::new(0, 0),
            target: HeroId::new(1, 0),
            roll: 10,
            accuracy: 2,
            total: 12,
            armor_class: 12,
            hit: true,
            crit: false,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"attack_resolved\""));

        let back: BattleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_winner_tie_is_distinct() {
        let tie = serde_json::to_string(&Winner::Tie).unwrap();
        let p0 = serde_json::to_string(&Winner::Player { slot: 0 }).unwrap();
        assert_ne!(tie, p0);

        let back: Winner = serde_json::from_str(&tie).unwrap();
        assert_eq!(back, Winner::Tie);
    }
}
