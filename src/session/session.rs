//! Match Session
//!
//! Owns the full lifecycle of one match: waiting → draft → setup →
//! initiative → battle → ended. Every player action is validated against
//! the current phase, applied through the draft/turn/combat components, and
//! leaves events behind for broadcast. A failed action never mutates state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::catalog::Catalog;
use crate::core::rng::{DeterministicRng, derive_match_seed};
use crate::game::combat;
use crate::game::draft::{assign_random_teams, DraftError, DraftState, TEAM_SIZE};
use crate::game::events::{BattleEvent, Winner};
use crate::game::hero::{HeroId, HeroInstance};
use crate::game::turns;
use crate::game::{hero, Teams};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Connection identity (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Current phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum Phase {
    /// Waiting for a second player.
    #[default]
    Waiting,
    /// Ban/pick draft in progress.
    Draft,
    /// Teams assigned, attack order being declared.
    Setup,
    /// Initiative rolls and turn-order choice.
    Initiative,
    /// Battle in progress.
    Battle,
    /// Match over, winner recorded.
    Ended,
}

impl Phase {
    /// Snake-case name for events and views.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Draft => "draft",
            Phase::Setup => "setup",
            Phase::Initiative => "initiative",
            Phase::Battle => "battle",
            Phase::Ended => "ended",
        }
    }
}

/// Match modes.
///
/// Non-draft modes skip the draft and assign shuffled rosters directly.
/// Survival and gauntlet wrap the same engine; their run progression is a
/// collaborator concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Ban/pick draft before battle.
    Draft,
    /// Random roster assignment.
    Random,
    /// Survival run match.
    Survival,
    /// Gauntlet run match.
    Gauntlet,
}

impl MatchMode {
    /// Whether this mode runs the ban/pick draft.
    pub fn uses_draft(&self) -> bool {
        matches!(self, MatchMode::Draft)
    }
}

/// Action errors. All are local and recoverable: a failed action leaves the
/// session unchanged and is reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Action attempted outside its valid phase.
    #[error("action not valid in the current phase")]
    InvalidPhase,

    /// It is not this player's hero's turn.
    #[error("not your turn")]
    NotYourTurn,

    /// Attack or ability already used this turn.
    #[error("already acted this turn")]
    AlreadyActed,

    /// Dead, nonexistent, or rule-violating target.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// No target has been selected.
    #[error("no target selected")]
    NoTargetSelected,

    /// Ability index out of range.
    #[error("unknown ability")]
    UnknownAbility,

    /// Silenced heroes cannot use abilities.
    #[error("hero is silenced")]
    Silenced,

    /// Player is not part of this session.
    #[error("player not found")]
    PlayerNotFound,

    /// No session for this id or player.
    #[error("session not found")]
    SessionNotFound,

    /// Player is already in a session.
    #[error("already in a session")]
    AlreadyInSession,

    /// Draft rule violation.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// Engine invariant violation (should never surface to players).
    #[error("internal error: {0}")]
    Internal(String),
}

/// One player's seat in a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// Connection identity currently bound to this seat.
    pub player_id: PlayerId,
    /// Display name (reconnect key).
    pub name: String,
    /// Whether the connection is live.
    pub connected: bool,
    /// Attack order declared during setup.
    pub order_declared: bool,
    /// Basic attack used this turn.
    pub has_used_attack: bool,
    /// Ability used this turn.
    pub has_used_ability: bool,
    /// Currently selected target.
    pub selected_target: Option<HeroId>,
    /// Initiative roll, once made.
    pub initiative: Option<i32>,
}

impl PlayerSlot {
    fn new(player_id: PlayerId, name: String) -> Self {
        Self {
            player_id,
            name,
            connected: true,
            order_declared: false,
            has_used_attack: false,
            has_used_ability: false,
            selected_target: None,
            initiative: None,
        }
    }

    /// Cleared exactly once per hero-turn boundary.
    fn clear_turn_flags(&mut self) {
        self.has_used_attack = false;
        self.has_used_ability = false;
        self.selected_target = None;
    }
}

/// A match session.
pub struct MatchSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Match mode.
    pub mode: MatchMode,
    pub(crate) phase: Phase,
    pub(crate) slots: Vec<PlayerSlot>,
    pub(crate) teams: Teams,
    pub(crate) draft: Option<DraftState>,
    pub(crate) first_player: u8,
    pub(crate) last_acted: Option<HeroId>,
    pub(crate) winner: Option<Winner>,
    pub(crate) rng: DeterministicRng,
    pub(crate) rng_seed: u64,
    pub(crate) catalog: Catalog,
    pub(crate) spectators: BTreeSet<PlayerId>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pending_events: Vec<BattleEvent>,
}

impl MatchSession {
    /// Create a session with its first (queueing) player.
    pub fn new(id: SessionId, mode: MatchMode, catalog: Catalog, player_id: PlayerId, name: &str) -> Self {
        Self {
            id,
            mode,
            phase: Phase::Waiting,
            slots: vec![PlayerSlot::new(player_id, name.to_string())],
            teams: [Vec::new(), Vec::new()],
            draft: None,
            first_player: 0,
            last_acted: None,
            winner: None,
            rng: DeterministicRng::default(),
            rng_seed: 0,
            catalog,
            spectators: BTreeSet::new(),
            created_at: Utc::now(),
            ended_at: None,
            pending_events: Vec::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Recorded winner, if the match ended.
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// RNG seed derived for this match.
    pub fn seed(&self) -> u64 {
        self.rng_seed
    }

    /// Both teams.
    pub fn teams(&self) -> &Teams {
        &self.teams
    }

    /// Player slots (one while waiting, two afterwards).
    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    /// Slot index for a connection identity.
    pub fn slot_index(&self, player_id: PlayerId) -> Option<usize> {
        self.slots.iter().position(|s| s.player_id == player_id)
    }

    /// Slot index by display name (reconnect key).
    pub fn slot_index_by_name(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Take accumulated events (consumes them).
    pub fn take_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn push_event(&mut self, event: BattleEvent) {
        self.pending_events.push(event);
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.phase;
        self.phase = to;
        self.push_event(BattleEvent::PhaseChanged {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }

    // =========================================================================
    // MATCHMAKING & LIFECYCLE
    // =========================================================================

    /// Add the second player, derive the match seed, and leave `waiting`.
    pub fn join_second_player(&mut self, player_id: PlayerId, name: &str) -> Result<(), ActionError> {
        if self.phase != Phase::Waiting {
            return Err(ActionError::InvalidPhase);
        }
        if self.slot_index(player_id).is_some() {
            return Err(ActionError::AlreadyInSession);
        }

        // Seed from the session id plus both participants, sorted. Computed
        // into locals first so a failure leaves the session unchanged.
        let mut ids = vec![self.slots[0].player_id.0, player_id.0];
        ids.sort();
        let seed = derive_match_seed(&self.id, &ids);
        let mut rng = DeterministicRng::new(seed);

        if self.mode.uses_draft() {
            let draft = DraftState::deal(&self.catalog, &mut rng)?;
            self.slots.push(PlayerSlot::new(player_id, name.to_string()));
            self.rng_seed = seed;
            self.rng = rng;
            self.draft = Some(draft);
            self.set_phase(Phase::Draft);
        } else {
            let rosters = assign_random_teams(&self.catalog, &mut rng, &[])?;
            self.slots.push(PlayerSlot::new(player_id, name.to_string()));
            self.rng_seed = seed;
            self.rng = rng;
            self.materialize_teams(rosters)?;
            self.push_event(BattleEvent::TeamsAssigned);
            self.set_phase(Phase::Setup);
        }
        Ok(())
    }

    /// Remove an unmatched player. Returns true if the session is now empty
    /// and should be discarded.
    pub fn leave_queue(&mut self, player_id: PlayerId) -> Result<bool, ActionError> {
        if self.phase != Phase::Waiting {
            return Err(ActionError::InvalidPhase);
        }
        let idx = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        self.slots.remove(idx);
        Ok(self.slots.is_empty())
    }

    /// Mark a player disconnected. The match keeps waiting: there is no
    /// forfeit timer.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        let idx = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        self.slots[idx].connected = false;
        self.push_event(BattleEvent::PlayerDisconnected { slot: idx as u8 });
        Ok(())
    }

    /// Rebind a new connection identity to the slot with this display name,
    /// preserving all match state. Returns the replaced identity.
    pub fn reconnect(&mut self, new_player_id: PlayerId, name: &str) -> Result<PlayerId, ActionError> {
        let idx = self.slot_index_by_name(name).ok_or(ActionError::PlayerNotFound)?;
        let old = self.slots[idx].player_id;
        self.slots[idx].player_id = new_player_id;
        self.slots[idx].connected = true;
        self.push_event(BattleEvent::PlayerReconnected { slot: idx as u8 });
        Ok(old)
    }

    /// Attach a read-only spectator.
    pub fn add_spectator(&mut self, spectator_id: PlayerId) {
        self.spectators.insert(spectator_id);
    }

    /// Detach a spectator.
    pub fn remove_spectator(&mut self, spectator_id: PlayerId) -> bool {
        self.spectators.remove(&spectator_id)
    }

    /// Concede: the opponent wins immediately.
    pub fn surrender(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        if matches!(self.phase, Phase::Waiting | Phase::Ended) {
            return Err(ActionError::InvalidPhase);
        }
        let idx = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        self.push_event(BattleEvent::Surrendered { slot: idx as u8 });
        self.finish_match(Winner::Player { slot: 1 - idx as u8 });
        Ok(())
    }

    fn finish_match(&mut self, winner: Winner) {
        self.winner = Some(winner);
        self.ended_at = Some(Utc::now());
        self.push_event(BattleEvent::MatchEnded { winner });
        self.set_phase(Phase::Ended);
    }

    /// Build hero instances from two name rosters.
    fn materialize_teams(&mut self, rosters: [Vec<String>; 2]) -> Result<(), ActionError> {
        for (player, roster) in rosters.into_iter().enumerate() {
            let mut team = Vec::with_capacity(TEAM_SIZE);
            for (i, name) in roster.into_iter().enumerate() {
                let def = self.catalog.get(&name)
                    .cloned()
                    .ok_or_else(|| ActionError::Internal(format!("hero missing from catalog: {name}")))?;
                team.push(HeroInstance::new(HeroId::new(player as u8, i as u8), def));
            }
            self.teams[player] = team;
        }
        Ok(())
    }

    // =========================================================================
    // DRAFT
    // =========================================================================

    /// Ban a card from the caller's hand.
    pub fn ban_card(&mut self, player_id: PlayerId, name: &str) -> Result<(), ActionError> {
        if self.phase != Phase::Draft {
            return Err(ActionError::InvalidPhase);
        }
        let slot = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        let draft = self.draft.as_mut().ok_or(ActionError::InvalidPhase)?;

        let advanced = draft.ban(slot, name)?;
        self.push_event(BattleEvent::CardBanned { slot: slot as u8, card: name.to_string() });
        if advanced {
            self.push_event(BattleEvent::HandsSwapped { round: 1 });
        }
        Ok(())
    }

    /// Pick a card into the caller's team.
    pub fn pick_card(&mut self, player_id: PlayerId, name: &str) -> Result<(), ActionError> {
        if self.phase != Phase::Draft {
            return Err(ActionError::InvalidPhase);
        }
        let slot = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        let draft = self.draft.as_mut().ok_or(ActionError::InvalidPhase)?;

        let round = draft.round();
        let advanced = draft.pick(slot, name)?;
        self.push_event(BattleEvent::CardPicked {
            slot: slot as u8,
            card: name.to_string(),
            round,
        });

        if advanced {
            let draft = self.draft.as_ref().ok_or(ActionError::InvalidPhase)?;
            if draft.is_complete() {
                let rosters = self.draft.take()
                    .map(DraftState::into_teams)
                    .ok_or(ActionError::InvalidPhase)?;
                // Team order is pick order; the draft path skips setup.
                self.materialize_teams(rosters)?;
                self.enter_initiative_with_rolls();
            } else {
                self.push_event(BattleEvent::HandsSwapped { round: self.draft.as_ref().map(|d| d.round()).unwrap_or(0) });
            }
        }
        Ok(())
    }

    /// Skip the rest of the draft: exclude banned names, shuffle the enabled
    /// remainder, assign three heroes per slot, and jump to initiative with
    /// rolls already made. Post-condition state shape is identical to the
    /// manual path.
    pub fn auto_draft(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        if self.phase != Phase::Draft {
            return Err(ActionError::InvalidPhase);
        }
        self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;

        let banned = self.draft.as_ref()
            .map(|d| d.banned_names())
            .unwrap_or_default();
        let rosters = assign_random_teams(&self.catalog, &mut self.rng, &banned)?;
        self.draft = None;
        self.materialize_teams(rosters)?;
        self.push_event(BattleEvent::TeamsAssigned);
        self.enter_initiative_with_rolls();
        Ok(())
    }

    // =========================================================================
    // SETUP & INITIATIVE
    // =========================================================================

    /// Declare the team's attack order. The named sequence must be a
    /// permutation of the current team.
    pub fn set_attack_order(&mut self, player_id: PlayerId, order: &[String; 3]) -> Result<(), ActionError> {
        if self.phase != Phase::Setup {
            return Err(ActionError::InvalidPhase);
        }
        let slot = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        if self.slots[slot].order_declared {
            return Err(ActionError::AlreadyActed);
        }

        let team = &mut self.teams[slot];
        let mut current: Vec<&str> = team.iter().map(|h| h.name()).collect();
        let mut declared: Vec<&str> = order.iter().map(String::as_str).collect();
        current.sort_unstable();
        declared.sort_unstable();
        if current != declared {
            return Err(ActionError::InvalidTarget(
                "attack order must name the current team exactly".to_string(),
            ));
        }

        team.sort_by_key(|h| {
            order.iter().position(|n| n.as_str() == h.name()).unwrap_or(TEAM_SIZE)
        });
        // Re-key ids to the new positions
        for (i, h) in team.iter_mut().enumerate() {
            h.id = HeroId::new(slot as u8, i as u8);
        }

        self.slots[slot].order_declared = true;

        if self.slots.iter().all(|s| s.order_declared) {
            self.set_phase(Phase::Initiative);
        }
        Ok(())
    }

    /// Enter initiative with both d20s rolled automatically (draft and
    /// auto-draft paths).
    fn enter_initiative_with_rolls(&mut self) {
        self.set_phase(Phase::Initiative);
        self.roll_both_until_strict();
    }

    /// Roll both initiative d20s until they differ strictly.
    ///
    /// A retry loop, not recursion: ties discard BOTH rolls.
    fn roll_both_until_strict(&mut self) {
        let r0 = self.rng.d20();
        let r1 = self.rng.d20();
        self.push_event(BattleEvent::InitiativeRolled { slot: 0, roll: r0 });
        self.push_event(BattleEvent::InitiativeRolled { slot: 1, roll: r1 });
        let mut rolls = [r0, r1];

        while rolls[0] == rolls[1] {
            self.push_event(BattleEvent::InitiativeTied { roll: rolls[0] });
            rolls[0] = self.rng.d20();
            rolls[1] = self.rng.d20();
            self.push_event(BattleEvent::InitiativeRolled { slot: 0, roll: rolls[0] });
            self.push_event(BattleEvent::InitiativeRolled { slot: 1, roll: rolls[1] });
        }

        self.slots[0].initiative = Some(rolls[0]);
        self.slots[1].initiative = Some(rolls[1]);
    }

    /// Roll initiative explicitly (setup path). Each slot rolls once; when
    /// the second roll lands, ties are re-rolled until strict.
    pub fn roll_initiative(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        if self.phase != Phase::Initiative {
            return Err(ActionError::InvalidPhase);
        }
        let slot = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        if self.slots[slot].initiative.is_some() {
            return Err(ActionError::AlreadyActed);
        }

        let roll = self.rng.d20();
        self.push_event(BattleEvent::InitiativeRolled { slot: slot as u8, roll });

        let other = 1 - slot;
        match self.slots[other].initiative {
            None => {
                self.slots[slot].initiative = Some(roll);
            }
            Some(other_roll) if other_roll == roll => {
                // Tie: both rolls are discarded and re-rolled until strict
                self.slots[other].initiative = None;
                self.push_event(BattleEvent::InitiativeTied { roll });
                self.roll_both_until_strict();
            }
            Some(_) => {
                self.slots[slot].initiative = Some(roll);
            }
        }
        Ok(())
    }

    /// Winning slot of the initiative contest, once both rolls are in.
    pub fn initiative_winner(&self) -> Option<usize> {
        let r0 = self.slots.first()?.initiative?;
        let r1 = self.slots.get(1)?.initiative?;
        if r0 > r1 {
            Some(0)
        } else if r1 > r0 {
            Some(1)
        } else {
            None
        }
    }

    /// The initiative winner chooses which side's first hero acts first.
    /// Confirming starts the battle.
    pub fn choose_turn_order(&mut self, player_id: PlayerId, go_first: bool) -> Result<(), ActionError> {
        if self.phase != Phase::Initiative {
            return Err(ActionError::InvalidPhase);
        }
        let slot = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        let winner = self.initiative_winner().ok_or(ActionError::InvalidPhase)?;
        if slot != winner {
            return Err(ActionError::NotYourTurn);
        }

        self.first_player = if go_first { slot as u8 } else { 1 - slot as u8 };
        self.push_event(BattleEvent::TurnOrderChosen { slot: slot as u8, goes_first: go_first });
        self.begin_battle();
        Ok(())
    }

    /// Reset every hero, run battle-start auras, and open the battle.
    fn begin_battle(&mut self) {
        for team in self.teams.iter_mut() {
            for hero in team.iter_mut() {
                hero.reset_for_battle();
            }
        }
        crate::game::auras::apply_battle_start(&mut self.teams);

        for slot in &mut self.slots {
            slot.clear_turn_flags();
        }
        self.last_acted = None;
        self.set_phase(Phase::Battle);

        if let Some(first) = self.current_turn() {
            self.push_event(BattleEvent::BattleStarted { first });
        }
    }

    // =========================================================================
    // BATTLE
    // =========================================================================

    /// Whose turn is it? Derived from the living rosters on every call.
    pub fn current_turn(&self) -> Option<HeroId> {
        if self.phase != Phase::Battle {
            return None;
        }
        turns::current_turn(&self.teams, self.first_player, self.last_acted)
    }

    /// Validate phase and turn ownership; returns (slot index, acting hero).
    fn require_turn(&self, player_id: PlayerId) -> Result<(usize, HeroId), ActionError> {
        if self.phase != Phase::Battle {
            return Err(ActionError::InvalidPhase);
        }
        let slot = self.slot_index(player_id).ok_or(ActionError::PlayerNotFound)?;
        let actor = self.current_turn().ok_or(ActionError::InvalidPhase)?;
        if actor.player as usize != slot {
            return Err(ActionError::NotYourTurn);
        }
        Ok((slot, actor))
    }

    /// Resolve a requested target against taunt and targeting rules.
    /// Returns the effective target and whether taunt forced it.
    fn resolve_target(&self, actor: HeroId, requested: HeroId) -> Result<(HeroId, bool), ActionError> {
        let attacker = hero(&self.teams, actor)
            .ok_or_else(|| ActionError::Internal(format!("acting hero missing: {actor}")))?;

        // Forced taunt overrides any selection while the taunter lives
        if let Some(taunter) = attacker.status.taunted_by {
            if hero(&self.teams, taunter).map(|h| h.is_alive()).unwrap_or(false) {
                return Ok((taunter, true));
            }
        }

        let target = hero(&self.teams, requested)
            .ok_or_else(|| ActionError::InvalidTarget(format!("no such hero: {requested}")))?;
        if requested.player == actor.player {
            return Err(ActionError::InvalidTarget("must target an enemy hero".to_string()));
        }
        if !target.is_alive() {
            return Err(ActionError::InvalidTarget(format!("{} is dead", target.name())));
        }
        if target.status.untargetable {
            return Err(ActionError::InvalidTarget(format!("{} cannot be targeted", target.name())));
        }
        Ok((requested, false))
    }

    /// Select a target for the acting hero. Forced onto a living taunter.
    pub fn select_target(&mut self, player_id: PlayerId, target: HeroId) -> Result<(), ActionError> {
        let (slot, actor) = self.require_turn(player_id)?;
        let (resolved, forced) = self.resolve_target(actor, target)?;

        self.slots[slot].selected_target = Some(resolved);
        self.push_event(BattleEvent::TargetSelected { actor, target: resolved, forced });
        Ok(())
    }

    /// Gate the per-turn action economy. `using_ability` selects which flag
    /// is being spent.
    fn check_action_economy(&self, slot: usize, actor: HeroId, using_ability: bool) -> Result<(), ActionError> {
        let extra = hero(&self.teams, actor)
            .map(|h| h.definition.has_extra_action())
            .unwrap_or(false);
        let s = &self.slots[slot];

        let spent = if using_ability { s.has_used_ability } else { s.has_used_attack };
        if spent {
            return Err(ActionError::AlreadyActed);
        }
        // Without the extra-action passive, attack and ability are exclusive
        if !extra && (s.has_used_attack || s.has_used_ability) {
            return Err(ActionError::AlreadyActed);
        }
        Ok(())
    }

    /// Execute a basic attack against the selected target.
    pub fn basic_attack(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        let (slot, actor) = self.require_turn(player_id)?;
        self.check_action_economy(slot, actor, false)?;

        let selected = self.slots[slot].selected_target.ok_or(ActionError::NoTargetSelected)?;
        let (target, _) = self.resolve_target(actor, selected)?;

        let mut events = Vec::new();
        combat::resolve_basic_attack(&mut self.teams, &mut self.rng, actor, target, &mut events);
        self.pending_events.extend(events);

        self.slots[slot].has_used_attack = true;
        Ok(())
    }

    /// Use an ability. The target argument overrides the stored selection;
    /// abilities without enemy-directed effects target the caster.
    pub fn use_ability(
        &mut self,
        player_id: PlayerId,
        ability_index: usize,
        target: Option<HeroId>,
    ) -> Result<(), ActionError> {
        let (slot, actor) = self.require_turn(player_id)?;
        self.check_action_economy(slot, actor, true)?;

        let caster = hero(&self.teams, actor)
            .ok_or_else(|| ActionError::Internal(format!("acting hero missing: {actor}")))?;
        if caster.status.silenced {
            return Err(ActionError::Silenced);
        }
        let ability = caster.definition.abilities.get(ability_index)
            .ok_or(ActionError::UnknownAbility)?;

        let enemy_directed = ability.effects.iter().any(|e| {
            use crate::catalog::{AbilityEffect, StatusKind};
            match e {
                AbilityEffect::Damage { .. }
                | AbilityEffect::LifestealDamage { .. }
                | AbilityEffect::ApplyDebuff { .. } => true,
                AbilityEffect::ApplyStatus { status, .. } => matches!(
                    status,
                    StatusKind::Poison | StatusKind::Taunt | StatusKind::Silence
                ),
                _ => false,
            }
        });

        let effective_target = if enemy_directed {
            let requested = target
                .or(self.slots[slot].selected_target)
                .ok_or(ActionError::NoTargetSelected)?;
            let (resolved, _) = self.resolve_target(actor, requested)?;
            resolved
        } else {
            actor
        };

        let mut events = Vec::new();
        combat::resolve_ability(
            &mut self.teams,
            &mut self.rng,
            actor,
            effective_target,
            ability_index,
            &mut events,
        );
        self.pending_events.extend(events);

        self.slots[slot].has_used_ability = true;
        Ok(())
    }

    /// End the acting hero's turn: poison tick and expiries, per-turn flags
    /// cleared, cursor advanced, win condition checked.
    pub fn end_turn(&mut self, player_id: PlayerId) -> Result<(), ActionError> {
        let (slot, actor) = self.require_turn(player_id)?;

        let mut events = Vec::new();
        turns::apply_end_of_turn(&mut self.teams, actor, &mut events);
        self.pending_events.extend(events);

        self.slots[slot].clear_turn_flags();
        self.last_acted = Some(actor);

        if let Some(winner) = turns::check_winner(&self.teams) {
            self.finish_match(winner);
        } else {
            let next = self.current_turn();
            self.push_event(BattleEvent::TurnEnded { hero: actor, next });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
