//! Draft State Machine
//!
//! Ban, then three pick rounds, with hands swapping between the slots after
//! the bans and between rounds. Auto-draft bypasses the whole dance for
//! players who just want a roster.

use serde::{Serialize, Deserialize};

use crate::catalog::Catalog;
use crate::core::rng::DeterministicRng;

/// Cards dealt to each slot when the draft opens.
pub const HAND_SIZE: usize = 5;

/// Heroes on a completed team.
pub const TEAM_SIZE: usize = 3;

/// Draft errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// Action not valid in the current draft round.
    #[error("not valid in this draft round")]
    WrongRound,

    /// Slot already banned this draft.
    #[error("already banned a card")]
    AlreadyBanned,

    /// Slot already picked this round.
    #[error("already picked this round")]
    AlreadyPicked,

    /// Named card is not in the slot's hand.
    #[error("card not in hand: {0}")]
    NotInHand(String),

    /// Catalog cannot support a draft.
    #[error("not enough enabled heroes to draft")]
    PoolTooSmall,
}

/// Live draft state for one session.
///
/// Round 0 is the ban round; rounds 1..=3 are picks. Teams hold hero
/// names; the session materializes instances when the draft completes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DraftState {
    round: u8,
    hands: [Vec<String>; 2],
    banned: [Option<String>; 2],
    teams: [Vec<String>; 2],
}

impl DraftState {
    /// Deal the opening hands: shuffle the enabled catalog and split,
    /// so the hands are distinct and sampled without replacement.
    pub fn deal(catalog: &Catalog, rng: &mut DeterministicRng) -> Result<Self, DraftError> {
        let mut pool: Vec<String> = catalog.enabled().map(|h| h.name.clone()).collect();
        if pool.len() < HAND_SIZE * 2 {
            return Err(DraftError::PoolTooSmall);
        }
        rng.shuffle(&mut pool);

        let hand1 = pool.split_off(pool.len() - HAND_SIZE);
        let hand0 = pool.split_off(pool.len() - HAND_SIZE);

        Ok(Self {
            round: 0,
            hands: [hand0, hand1],
            banned: [None, None],
            teams: [Vec::new(), Vec::new()],
        })
    }

    /// Current round: 0 = ban, 1..=3 = picks.
    pub fn round(&self) -> u8 {
        self.round
    }

    /// Whether all three pick rounds have completed.
    pub fn is_complete(&self) -> bool {
        self.round > TEAM_SIZE as u8
    }

    /// A slot's current hand.
    pub fn hand(&self, slot: usize) -> &[String] {
        &self.hands[slot]
    }

    /// A slot's banned card, if any.
    pub fn banned(&self, slot: usize) -> Option<&str> {
        self.banned[slot].as_deref()
    }

    /// A slot's picked team so far (in pick order).
    pub fn team(&self, slot: usize) -> &[String] {
        &self.teams[slot]
    }

    /// Ban names from both slots, for auto-draft exclusion.
    pub fn banned_names(&self) -> Vec<String> {
        self.banned.iter().flatten().cloned().collect()
    }

    /// Ban a card from the slot's own hand. Valid only in the ban round,
    /// once per slot. Returns true when both bans are in and the draft
    /// advanced to pick round 1 (hands swapped).
    pub fn ban(&mut self, slot: usize, name: &str) -> Result<bool, DraftError> {
        if self.round != 0 {
            return Err(DraftError::WrongRound);
        }
        if self.banned[slot].is_some() {
            return Err(DraftError::AlreadyBanned);
        }
        let pos = self.hands[slot].iter().position(|c| c == name)
            .ok_or_else(|| DraftError::NotInHand(name.to_string()))?;

        self.hands[slot].remove(pos);
        self.banned[slot] = Some(name.to_string());

        if self.banned.iter().all(Option::is_some) {
            // Each player now drafts from the hand their opponent was
            // offered, minus the opponent's ban.
            self.hands.swap(0, 1);
            self.round = 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Pick a card from the slot's hand into its team. Valid only in pick
    /// rounds, exactly once per round. Returns true when the round
    /// advanced (hands swapped) or the draft completed.
    pub fn pick(&mut self, slot: usize, name: &str) -> Result<bool, DraftError> {
        if self.round == 0 || self.is_complete() {
            return Err(DraftError::WrongRound);
        }
        // Exactly one pick per round
        if self.teams[slot].len() != (self.round - 1) as usize {
            return Err(DraftError::AlreadyPicked);
        }
        let pos = self.hands[slot].iter().position(|c| c == name)
            .ok_or_else(|| DraftError::NotInHand(name.to_string()))?;

        let card = self.hands[slot].remove(pos);
        self.teams[slot].push(card);

        let round_done = self.teams.iter()
            .all(|t| t.len() == self.round as usize);
        if round_done {
            self.round += 1;
            if !self.is_complete() {
                self.hands.swap(0, 1);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Consume the draft into the two picked team rosters.
    pub fn into_teams(self) -> [Vec<String>; 2] {
        self.teams
    }
}

/// Assign random teams without a draft: exclude banned names, shuffle the
/// enabled remainder, and deal three heroes to each slot.
///
/// Used by the non-draft modes and the auto-draft fallback; both paths
/// leave the session in the same state shape as a manual draft.
pub fn assign_random_teams(
    catalog: &Catalog,
    rng: &mut DeterministicRng,
    banned: &[String],
) -> Result<[Vec<String>; 2], DraftError> {
    let mut pool: Vec<String> = catalog.enabled()
        .map(|h| h.name.clone())
        .filter(|name| !banned.contains(name))
        .collect();
    if pool.len() < TEAM_SIZE * 2 {
        return Err(DraftError::PoolTooSmall);
    }
    rng.shuffle(&mut pool);

    let team1 = pool.split_off(pool.len() - TEAM_SIZE);
    let team0 = pool.split_off(pool.len() - TEAM_SIZE);
    Ok([team0, team1])
}

// =============================================================================
// TESTS
// =============================================================================
