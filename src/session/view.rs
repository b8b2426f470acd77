//! Session Views
//!
//! Serializable, spectator-safe projections of session state, suitable for
//! direct network transmission. A view never exposes hidden information:
//! draft hands are reduced to counts for everyone but their owner.
//!
//! JSON is the primary wire form; `MatchSessionView` also round-trips
//! through bincode for a compact binary path.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::events::{BattleEvent, Winner};
use crate::game::hero::{HeroId, StatusEffects};
use crate::session::session::{ActionError, MatchMode, MatchSession, Phase};

/// Who is looking at the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Viewer {
    /// A seated player (slot index); sees their own hand.
    Player(u8),
    /// A read-only spectator; sees no hand contents.
    Spectator,
}

/// Result envelope for every mutating API call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the action applied.
    pub success: bool,
    /// Error message when it did not.
    pub error: Option<String>,
    /// Post-action snapshot for the caller.
    pub snapshot: Option<MatchSessionView>,
    /// Events generated by the action, for broadcast.
    pub events: Vec<BattleEvent>,
}

impl ActionResponse {
    /// Successful action.
    pub fn ok(snapshot: MatchSessionView, events: Vec<BattleEvent>) -> Self {
        Self {
            success: true,
            error: None,
            snapshot: Some(snapshot),
            events,
        }
    }

    /// Failed action; state was not changed.
    pub fn failure(error: &ActionError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            snapshot: None,
            events: Vec::new(),
        }
    }
}

/// One hero as a client sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeroView {
    /// Stable identity.
    pub id: HeroId,
    /// Hero name.
    pub name: String,
    /// Current HP.
    pub current_hp: i32,
    /// Max HP.
    pub max_hp: i32,
    /// Still alive.
    pub alive: bool,
    /// Aura-modified accuracy.
    pub accuracy: i32,
    /// Aura-modified damage bonus.
    pub attack_bonus: i32,
    /// Aura-modified armor class.
    pub armor_class: i32,
    /// Status conditions.
    pub status: StatusEffects,
    /// Took an action this battle.
    pub acted: bool,
}

/// One player slot as a client sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSlotView {
    /// Display name.
    pub name: String,
    /// Connection liveness.
    pub connected: bool,
    /// Initiative roll, once public.
    pub initiative: Option<i32>,
    /// Banned card, if any.
    pub banned: Option<String>,
    /// Hand contents; only present for the hand's owner.
    pub hand: Option<Vec<String>>,
    /// Hand size, visible to everyone.
    pub hand_size: usize,
    /// Team in attack order.
    pub team: Vec<HeroView>,
    /// Basic attack spent this turn.
    pub has_used_attack: bool,
    /// Ability spent this turn.
    pub has_used_ability: bool,
    /// Currently selected target.
    pub selected_target: Option<HeroId>,
}

/// Per-hero outcome facts for the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeroOutcome {
    /// Stable identity.
    pub id: HeroId,
    /// Hero name.
    pub name: String,
    /// Took at least one action.
    pub acted: bool,
    /// Was dead when the match ended.
    pub died: bool,
}

/// The sole hand-off surface to the reward/persistence collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Final result.
    pub winner: Winner,
    /// Manifest of every hero's acted/died facts.
    pub heroes: Vec<HeroOutcome>,
}

/// Serializable projection of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSessionView {
    /// Session id, hex-encoded.
    pub session_id: String,
    /// Match mode.
    pub mode: MatchMode,
    /// Current phase.
    pub phase: Phase,
    /// Draft round (0 = ban, 1..=3 = picks) while drafting.
    pub draft_round: Option<u8>,
    /// Whose turn it is, during battle.
    pub current_turn: Option<HeroId>,
    /// Recorded winner, once ended.
    pub winner: Option<Winner>,
    /// Player slots.
    pub slots: Vec<PlayerSlotView>,
    /// Attached spectators.
    pub spectator_count: usize,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the match ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Outcome manifest, once ended.
    pub outcome: Option<MatchOutcome>,
}

impl MatchSessionView {
    /// Project a session for a viewer.
    pub fn project(session: &MatchSession, viewer: Viewer) -> Self {
        let slots = session.slots().iter().enumerate().map(|(idx, slot)| {
            let own_hand = matches!(viewer, Viewer::Player(p) if p as usize == idx);
            let (hand, hand_size, banned) = match &session.draft {
                Some(draft) => (
                    own_hand.then(|| draft.hand(idx).to_vec()),
                    draft.hand(idx).len(),
                    draft.banned(idx).map(str::to_string),
                ),
                None => (None, 0, None),
            };

            let team = session.teams()[idx].iter().map(|h| HeroView {
                id: h.id,
                name: h.name().to_string(),
                current_hp: h.current_hp,
                max_hp: h.definition.max_hp,
                alive: h.is_alive(),
                accuracy: h.accuracy(),
                attack_bonus: h.attack_bonus(),
                armor_class: h.armor_class(),
                status: h.status.clone(),
                acted: h.acted,
            }).collect();

            PlayerSlotView {
                name: slot.name.clone(),
                connected: slot.connected,
                initiative: slot.initiative,
                banned,
                hand,
                hand_size,
                team,
                has_used_attack: slot.has_used_attack,
                has_used_ability: slot.has_used_ability,
                selected_target: slot.selected_target,
            }
        }).collect();

        Self {
            session_id: hex::encode(session.id),
            mode: session.mode,
            phase: session.phase(),
            draft_round: session.draft.as_ref().map(|d| d.round()),
            current_turn: session.current_turn(),
            winner: session.winner(),
            slots,
            spectator_count: session.spectators.len(),
            created_at: session.created_at,
            ended_at: session.ended_at,
            outcome: outcome_of(session),
        }
    }

    /// Serialize to compact binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from compact binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

/// Build the outcome manifest once a winner is recorded.
fn outcome_of(session: &MatchSession) -> Option<MatchOutcome> {
    let winner = session.winner()?;
    let heroes = session.teams().iter()
        .flat_map(|team| team.iter())
        .map(|h| HeroOutcome {
            id: h.id,
            name: h.name().to_string(),
            acted: h.acted,
            died: !h.is_alive(),
        })
        .collect();
    Some(MatchOutcome { winner, heroes })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::session::session::PlayerId;

    fn p(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    fn draft_session() -> MatchSession {
        let mut session = MatchSession::new([7; 16], MatchMode::Draft, Catalog::builtin(), p(1), "alice");
        session.join_second_player(p(2), "bob").unwrap();
        session
    }

    #[test]
    fn test_hand_hidden_from_opponent_and_spectators() {
        let session = draft_session();

        let own = MatchSessionView::project(&session, Viewer::Player(0));
        assert!(own.slots[0].hand.is_some());
        assert!(own.slots[1].hand.is_none());
        assert_eq!(own.slots[1].hand_size, 5);

        let spectator = MatchSessionView::project(&session, Viewer::Spectator);
        assert!(spectator.slots[0].hand.is_none());
        assert!(spectator.slots[1].hand.is_none());
        assert_eq!(spectator.slots[0].hand_size, 5);
    }

    #[test]
    fn test_view_json_round_trip() {
        let session = draft_session();
        let view = MatchSessionView::project(&session, Viewer::Spectator);

        let json = serde_json::to_string(&view).unwrap();
        let back: MatchSessionView = serde_json::from_str(&json).unwrap();
        assert_eq!(view, back);
    }

    #[test]
    fn test_view_bincode_round_trip() {
        // Note: battle events use #[serde(tag = "type")] and are NOT
        // bincode-compatible; the session view deliberately avoids
        // internally tagged enums so this path works.
        let session = draft_session();
        let view = MatchSessionView::project(&session, Viewer::Spectator);

        let bytes = view.to_bytes().unwrap();
        let back = MatchSessionView::from_bytes(&bytes).unwrap();
        assert_eq!(view, back);
    }

    #[test]
    fn test_outcome_present_only_when_ended() {
        let mut session = draft_session();
        let view = MatchSessionView::project(&session, Viewer::Spectator);
        assert!(view.outcome.is_none());

        session.surrender(p(1)).unwrap();
        let view = MatchSessionView::project(&session, Viewer::Spectator);
        let outcome = view.outcome.unwrap();
        assert_eq!(outcome.winner, crate::game::events::Winner::Player { slot: 1 });
    }

    #[test]
    fn test_failure_response_shape() {
        let response = ActionResponse::failure(&ActionError::NotYourTurn);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("not your turn"));
        assert!(response.snapshot.is_none());
    }
}
