//! Session Registry
//!
//! Owns every live session and the index from connection identity to
//! session. Matchmaking scans for a compatible waiting session; actions are
//! routed through the index in O(log n) and applied under the session's own
//! exclusive lock, so each match processes its actions run-to-completion
//! while the registry maps stay free for lookups.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Deserialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::game::hero::HeroId;
use crate::session::session::{
    ActionError, MatchMode, MatchSession, Phase, PlayerId, SessionId,
};
use crate::session::view::{ActionResponse, MatchSessionView, Viewer};

/// Result of a queue join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinOutcome {
    /// Queued; waiting for an opponent.
    Waiting {
        /// The waiting session.
        session_id: SessionId,
    },
    /// Matched into a session that just left `waiting`.
    Matched {
        /// The matched session.
        session_id: SessionId,
    },
}

impl JoinOutcome {
    /// The session involved either way.
    pub fn session_id(&self) -> SessionId {
        match self {
            JoinOutcome::Waiting { session_id } => *session_id,
            JoinOutcome::Matched { session_id } => *session_id,
        }
    }
}

/// Manages all active sessions.
pub struct SessionRegistry {
    /// Hero catalog handed to every new session.
    catalog: Catalog,
    /// Active sessions.
    sessions: RwLock<BTreeMap<SessionId, Arc<RwLock<MatchSession>>>>,
    /// Connection identity to session mapping.
    player_index: RwLock<BTreeMap<PlayerId, SessionId>>,
}

impl SessionRegistry {
    /// Create a registry around a catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            sessions: RwLock::new(BTreeMap::new()),
            player_index: RwLock::new(BTreeMap::new()),
        }
    }

    /// Join the matchmaking queue: the first compatible waiting session
    /// wins, otherwise a new one is created.
    pub async fn join_queue(
        &self,
        player_id: PlayerId,
        name: &str,
        mode: MatchMode,
    ) -> Result<JoinOutcome, ActionError> {
        {
            let index = self.player_index.read().await;
            if index.contains_key(&player_id) {
                return Err(ActionError::AlreadyInSession);
            }
        }

        // Scan for the first compatible waiting session
        let mut candidate: Option<(SessionId, Arc<RwLock<MatchSession>>)> = None;
        {
            let sessions = self.sessions.read().await;
            for (id, handle) in sessions.iter() {
                let session = handle.read().await;
                if session.phase() == Phase::Waiting && session.mode == mode {
                    candidate = Some((*id, Arc::clone(handle)));
                    break;
                }
            }
        }

        if let Some((session_id, handle)) = candidate {
            handle.write().await.join_second_player(player_id, name)?;
            self.player_index.write().await.insert(player_id, session_id);
            info!(session = %hex::encode(session_id), player = %player_id.to_uuid_string(), "match found");
            return Ok(JoinOutcome::Matched { session_id });
        }

        // No compatible session: open one
        let session_id: SessionId = uuid::Uuid::new_v4().into_bytes();
        let session = MatchSession::new(session_id, mode, self.catalog.clone(), player_id, name);
        self.sessions.write().await.insert(session_id, Arc::new(RwLock::new(session)));
        self.player_index.write().await.insert(player_id, session_id);
        debug!(session = %hex::encode(session_id), ?mode, "session created");
        Ok(JoinOutcome::Waiting { session_id })
    }

    /// Leave the queue before a match is found. Discards the session if it
    /// is now empty.
    pub async fn cancel_queue(&self, player_id: PlayerId) -> Result<(), ActionError> {
        let session_id = self.session_id_of(player_id).await.ok_or(ActionError::SessionNotFound)?;
        let handle = self.get_session(&session_id).await.ok_or(ActionError::SessionNotFound)?;

        let empty = handle.write().await.leave_queue(player_id)?;
        self.player_index.write().await.remove(&player_id);
        if empty {
            self.sessions.write().await.remove(&session_id);
            debug!(session = %hex::encode(session_id), "empty waiting session discarded");
        }
        Ok(())
    }

    /// Get a session handle by id.
    pub async fn get_session(&self, id: &SessionId) -> Option<Arc<RwLock<MatchSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Session id for a connection identity.
    pub async fn session_id_of(&self, player_id: PlayerId) -> Option<SessionId> {
        let index = self.player_index.read().await;
        index.get(&player_id).copied()
    }

    /// Active session count.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Route an action to the caller's session and run it under the
    /// session's exclusive lock. The response carries the caller's snapshot
    /// and the action's events; a failed action changes nothing.
    async fn with_player_session<F>(&self, player_id: PlayerId, action: F) -> ActionResponse
    where
        F: FnOnce(&mut MatchSession) -> Result<(), ActionError>,
    {
        let Some(session_id) = self.session_id_of(player_id).await else {
            return ActionResponse::failure(&ActionError::SessionNotFound);
        };
        let Some(handle) = self.get_session(&session_id).await else {
            return ActionResponse::failure(&ActionError::SessionNotFound);
        };

        let mut session = handle.write().await;
        match action(&mut session) {
            Ok(()) => {
                let events = session.take_events();
                let viewer = session.slot_index(player_id)
                    .map(|idx| Viewer::Player(idx as u8))
                    .unwrap_or(Viewer::Spectator);
                ActionResponse::ok(MatchSessionView::project(&session, viewer), events)
            }
            Err(err) => ActionResponse::failure(&err),
        }
    }

    /// Ban a card during the draft.
    pub async fn ban_card(&self, player_id: PlayerId, name: &str) -> ActionResponse {
        self.with_player_session(player_id, |s| s.ban_card(player_id, name)).await
    }

    /// Pick a card during the draft.
    pub async fn pick_card(&self, player_id: PlayerId, name: &str) -> ActionResponse {
        self.with_player_session(player_id, |s| s.pick_card(player_id, name)).await
    }

    /// Skip the draft with random assignment.
    pub async fn auto_draft(&self, player_id: PlayerId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.auto_draft(player_id)).await
    }

    /// Declare the team's attack order during setup.
    pub async fn set_attack_order(&self, player_id: PlayerId, order: &[String; 3]) -> ActionResponse {
        self.with_player_session(player_id, |s| s.set_attack_order(player_id, order)).await
    }

    /// Roll initiative.
    pub async fn roll_initiative(&self, player_id: PlayerId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.roll_initiative(player_id)).await
    }

    /// Choose who acts first (initiative winner only).
    pub async fn choose_turn_order(&self, player_id: PlayerId, go_first: bool) -> ActionResponse {
        self.with_player_session(player_id, |s| s.choose_turn_order(player_id, go_first)).await
    }

    /// Select the acting hero's target.
    pub async fn select_target(&self, player_id: PlayerId, target: HeroId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.select_target(player_id, target)).await
    }

    /// Execute a basic attack.
    pub async fn basic_attack(&self, player_id: PlayerId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.basic_attack(player_id)).await
    }

    /// Use an ability.
    pub async fn use_ability(
        &self,
        player_id: PlayerId,
        ability_index: usize,
        target: Option<HeroId>,
    ) -> ActionResponse {
        self.with_player_session(player_id, |s| s.use_ability(player_id, ability_index, target)).await
    }

    /// End the acting hero's turn.
    pub async fn end_turn(&self, player_id: PlayerId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.end_turn(player_id)).await
    }

    /// Concede the match.
    pub async fn surrender(&self, player_id: PlayerId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.surrender(player_id)).await
    }

    /// Mark a player disconnected. The slot stays bound and the match waits.
    pub async fn disconnect(&self, player_id: PlayerId) -> ActionResponse {
        self.with_player_session(player_id, |s| s.disconnect(player_id)).await
    }

    /// Rebind a new connection identity to an existing slot, matched by
    /// display name. All match state is preserved.
    pub async fn reconnect(
        &self,
        new_player_id: PlayerId,
        session_id: SessionId,
        name: &str,
    ) -> ActionResponse {
        let Some(handle) = self.get_session(&session_id).await else {
            return ActionResponse::failure(&ActionError::SessionNotFound);
        };

        let mut session = handle.write().await;
        match session.reconnect(new_player_id, name) {
            Ok(old_player_id) => {
                let mut index = self.player_index.write().await;
                index.remove(&old_player_id);
                index.insert(new_player_id, session_id);
                drop(index);

                let events = session.take_events();
                let viewer = session.slot_index(new_player_id)
                    .map(|idx| Viewer::Player(idx as u8))
                    .unwrap_or(Viewer::Spectator);
                ActionResponse::ok(MatchSessionView::project(&session, viewer), events)
            }
            Err(err) => ActionResponse::failure(&err),
        }
    }

    /// Attach a read-only spectator to a session.
    pub async fn add_spectator(&self, spectator_id: PlayerId, session_id: SessionId) -> ActionResponse {
        let Some(handle) = self.get_session(&session_id).await else {
            return ActionResponse::failure(&ActionError::SessionNotFound);
        };
        let mut session = handle.write().await;
        session.add_spectator(spectator_id);
        ActionResponse::ok(
            MatchSessionView::project(&session, Viewer::Spectator),
            Vec::new(),
        )
    }

    /// Detach a spectator.
    pub async fn remove_spectator(&self, spectator_id: PlayerId, session_id: SessionId) -> ActionResponse {
        let Some(handle) = self.get_session(&session_id).await else {
            return ActionResponse::failure(&ActionError::SessionNotFound);
        };
        let mut session = handle.write().await;
        session.remove_spectator(spectator_id);
        ActionResponse::ok(
            MatchSessionView::project(&session, Viewer::Spectator),
            Vec::new(),
        )
    }

    /// Spectator-safe snapshot of a session.
    pub async fn get_snapshot(&self, session_id: SessionId) -> Result<MatchSessionView, ActionError> {
        let handle = self.get_session(&session_id).await.ok_or(ActionError::SessionNotFound)?;
        let session = handle.read().await;
        Ok(MatchSessionView::project(&session, Viewer::Spectator))
    }

    /// Snapshot of the caller's own session, with their hand visible.
    pub async fn get_player_snapshot(&self, player_id: PlayerId) -> Result<MatchSessionView, ActionError> {
        let session_id = self.session_id_of(player_id).await.ok_or(ActionError::SessionNotFound)?;
        let handle = self.get_session(&session_id).await.ok_or(ActionError::SessionNotFound)?;
        let session = handle.read().await;
        let viewer = session.slot_index(player_id)
            .map(|idx| Viewer::Player(idx as u8))
            .unwrap_or(Viewer::Spectator);
        Ok(MatchSessionView::project(&session, viewer))
    }

    /// Remove ended sessions and unbind their players.
    pub async fn cleanup(&self) {
        let mut ended = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, handle) in sessions.iter() {
                let session = handle.read().await;
                if session.phase() == Phase::Ended {
                    let players: Vec<PlayerId> = session.slots().iter().map(|s| s.player_id).collect();
                    ended.push((*id, players));
                }
            }
        }

        if ended.is_empty() {
            return;
        }

        let mut sessions = self.sessions.write().await;
        let mut index = self.player_index.write().await;
        for (id, players) in ended {
            sessions.remove(&id);
            for player in players {
                index.remove(&player);
            }
            debug!(session = %hex::encode(id), "ended session removed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
