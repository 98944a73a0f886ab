//! Online mode: a room session replicated through the sync bridge.
//!
//! Each participant holds an [`OnlineRoom`]: a read-through mirror of the
//! room document plus the plumbing that keeps it fresh. Mutations go to the
//! bridge; a watcher task folds change notifications back into the mirror
//! and surfaces them as [`GameEvent`]s.
//!
//! Write authority is split by construction: the host writes room setup,
//! and each player writes only their own subtree (`players/<id>`), so no
//! two clients ever contend on a field. Turn advancement itself is never
//! replicated — every client runs the same turn engine over the same
//! replicated inputs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::bridge::{BridgeError, KeyChange, Subscription, SyncBridge};
use crate::config::{GameConfig, ROOM_CODE_LENGTH};
use crate::error::{GameError, GameResult};
use crate::events::{EventSender, GameEvent};
use crate::state::{generate_room_code, validate_name};
use crate::types::{Player, PlayerId, Question, RoomCode, RoomPhase, RoomSession};

fn room_key(code: &str) -> String {
    format!("rooms/{code}")
}

fn player_key(code: &str, id: &str) -> String {
    format!("rooms/{code}/players/{id}")
}

/// Per-player record in the replicated room document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlayerDoc {
    name: String,
    avatar: String,
    score: u32,
    is_host: bool,
    connected: bool,
    joined_at: DateTime<Utc>,
}

impl PlayerDoc {
    fn of(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            avatar: player.avatar.clone(),
            score: player.score,
            is_host: player.is_host,
            connected: player.connected,
            joined_at: player.joined_at,
        }
    }

    fn into_player(self, id: PlayerId) -> Player {
        Player {
            id,
            name: self.name,
            avatar: self.avatar,
            score: self.score,
            is_host: self.is_host,
            connected: self.connected,
            joined_at: self.joined_at,
        }
    }
}

/// Match setup written once by the host at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GameDoc {
    questions: Vec<Question>,
    question_count: usize,
    started_at: DateTime<Utc>,
}

/// The whole room document at `rooms/<code>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomDoc {
    host: PlayerId,
    started: bool,
    question_count: usize,
    created_at: DateTime<Utc>,
    #[serde(default)]
    players: HashMap<PlayerId, PlayerDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    game: Option<GameDoc>,
}

impl RoomDoc {
    fn of_session(session: &RoomSession) -> Self {
        Self {
            host: session.host_id.clone(),
            started: session.phase == RoomPhase::Active,
            question_count: session.question_count,
            created_at: session.created_at,
            players: session
                .roster
                .iter()
                .map(|p| (p.id.clone(), PlayerDoc::of(p)))
                .collect(),
            game: None,
        }
    }

    /// Players in join order. The document map is unordered, so the order
    /// is reconstructed from join timestamps (ties broken by ID).
    fn roster(&self) -> Vec<Player> {
        let mut roster: Vec<Player> = self
            .players
            .iter()
            .map(|(id, doc)| doc.clone().into_player(id.clone()))
            .collect();
        roster.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        roster
    }

    fn next_free_avatar(&self, config: &GameConfig) -> String {
        config
            .avatars
            .iter()
            .find(|token| !self.players.values().any(|p| &&p.avatar == token))
            .cloned()
            .unwrap_or_else(|| format!("#{}", self.players.len() + 1))
    }
}

fn to_json<T: Serialize>(value: &T) -> GameResult<Value> {
    serde_json::to_value(value)
        .map_err(BridgeError::from)
        .map_err(GameError::from)
}

/// One participant's handle on a replicated room.
pub struct OnlineRoom {
    bridge: Arc<dyn SyncBridge>,
    config: GameConfig,
    code: RoomCode,
    player_id: PlayerId,
    session: Arc<RwLock<RoomSession>>,
    events: EventSender,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OnlineRoom {
    /// Create a fresh room and become its host.
    ///
    /// The code is probed against the bridge and regenerated on collision,
    /// so two open rooms can never share one.
    pub async fn create(
        bridge: Arc<dyn SyncBridge>,
        config: GameConfig,
        events: EventSender,
    ) -> GameResult<Arc<Self>> {
        let code = loop {
            let candidate = generate_room_code(ROOM_CODE_LENGTH);
            if bridge.once(&room_key(&candidate)).await?.is_none() {
                break candidate;
            }
            // Collision is vanishingly rare with 36^6 codes; just retry.
            tracing::debug!(code = %candidate, "room code collision, regenerating");
        };

        let session = RoomSession::hosted(code.clone(), &config);
        let player_id = session.host_id.clone();
        let doc = RoomDoc::of_session(&session);
        bridge.set(&room_key(&code), to_json(&doc)?).await?;

        tracing::info!(code = %code, "room created");
        Self::assemble(bridge, config, code, player_id, session, events).await
    }

    /// Join an existing room by code.
    pub async fn join(
        bridge: Arc<dyn SyncBridge>,
        code: &str,
        config: GameConfig,
        events: EventSender,
    ) -> GameResult<Arc<Self>> {
        let code: RoomCode = code.trim().to_uppercase();
        let raw = bridge
            .once(&room_key(&code))
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;
        let doc: RoomDoc =
            serde_json::from_value(raw).map_err(|e| GameError::Bridge(e.into()))?;

        if doc.started {
            return Err(GameError::AlreadyStarted(code));
        }
        if doc.players.len() >= config.max_players {
            return Err(GameError::RoomFull(code));
        }

        let player = Player::new("", doc.next_free_avatar(&config), false);
        let player_id = player.id.clone();
        bridge
            .set(&player_key(&code, &player_id), to_json(&PlayerDoc::of(&player))?)
            .await?;

        let mut session = session_from_doc(&code, &doc);
        session.roster.push(player);

        tracing::info!(code = %code, players = session.roster.len(), "joined room");
        Self::assemble(bridge, config, code, player_id, session, events).await
    }

    async fn assemble(
        bridge: Arc<dyn SyncBridge>,
        config: GameConfig,
        code: RoomCode,
        player_id: PlayerId,
        session: RoomSession,
        events: EventSender,
    ) -> GameResult<Arc<Self>> {
        let subscription = bridge.subscribe(&room_key(&code)).await?;
        let connectivity = bridge.connectivity();

        let room = Arc::new(Self {
            bridge,
            config,
            code,
            player_id,
            session: Arc::new(RwLock::new(session)),
            events,
            tasks: Mutex::new(Vec::new()),
        });

        let watcher = tokio::spawn(Arc::clone(&room).watch(subscription, connectivity));
        let publisher = tokio::spawn(Arc::clone(&room).publish_own_scores());
        room.tasks.lock().await.extend([watcher, publisher]);
        Ok(room)
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// The local mirror, shared with the turn engine.
    pub fn session(&self) -> Arc<RwLock<RoomSession>> {
        Arc::clone(&self.session)
    }

    pub async fn snapshot(&self) -> RoomSession {
        self.session.read().await.clone()
    }

    /// Set this participant's display name, replicated to the roster.
    pub async fn set_name(&self, name: &str) -> GameResult<()> {
        validate_name(name)?;
        let name = name.trim().to_string();

        let mut partial = Map::new();
        partial.insert("name".into(), Value::String(name.clone()));
        self.bridge
            .update(&player_key(&self.code, &self.player_id), partial)
            .await?;

        let mut session = self.session.write().await;
        if let Some(idx) = session.player_index(&self.player_id) {
            session.roster[idx].name = name;
        }
        Ok(())
    }

    /// Claim an avatar token; rejected when another player holds it.
    pub async fn set_avatar(&self, token: &str) -> GameResult<()> {
        {
            let session = self.session.read().await;
            let taken = session
                .roster
                .iter()
                .any(|p| p.id != self.player_id && p.avatar == token);
            if taken {
                return Err(GameError::TokenTaken(token.to_string()));
            }
        }

        let mut partial = Map::new();
        partial.insert("avatar".into(), Value::String(token.to_string()));
        self.bridge
            .update(&player_key(&self.code, &self.player_id), partial)
            .await?;

        let mut session = self.session.write().await;
        if let Some(idx) = session.player_index(&self.player_id) {
            session.roster[idx].avatar = token.to_string();
        }
        Ok(())
    }

    /// Start the match. Host-only; the drawn question snapshot is written
    /// once and every client activates from the replicated document.
    pub async fn begin(&self, pool: &[Question], question_count: usize) -> GameResult<()> {
        let staged = {
            let session = self.session.read().await;
            let mut staged = session.clone();
            staged.begin(&self.player_id, question_count, pool, &self.config)?;
            staged
        };

        let game = GameDoc {
            questions: staged.questions.clone(),
            question_count: staged.question_count,
            started_at: Utc::now(),
        };
        let mut partial = Map::new();
        partial.insert("started".into(), Value::Bool(true));
        partial.insert("game".into(), to_json(&game)?);
        self.bridge.update(&room_key(&self.code), partial).await?;

        let questions = staged.questions.len();
        *self.session.write().await = staged;
        let _ = self.events.send(GameEvent::MatchStarted { questions });
        Ok(())
    }

    /// Leave the room: stop replication, remove our roster entry, migrate
    /// the host role or delete the room when it empties.
    pub async fn leave(&self) -> GameResult<()> {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        self.bridge
            .remove(&player_key(&self.code, &self.player_id))
            .await?;

        let was_host = self.session.read().await.host_id == self.player_id;
        if was_host {
            self.migrate_or_delete().await?;
        }

        let mut session = self.session.write().await;
        session.phase = RoomPhase::Closed;
        drop(session);
        let _ = self.events.send(GameEvent::RoomClosed);
        tracing::info!(code = %self.code, "left room");
        Ok(())
    }

    async fn migrate_or_delete(&self) -> GameResult<()> {
        let raw = match self.bridge.once(&room_key(&self.code)).await? {
            Some(raw) => raw,
            None => return Ok(()),
        };
        let doc: RoomDoc =
            serde_json::from_value(raw).map_err(|e| GameError::Bridge(e.into()))?;

        let survivors = doc.roster();
        let new_host = match survivors.first() {
            Some(p) => p.id.clone(),
            None => {
                self.bridge.remove(&room_key(&self.code)).await?;
                tracing::info!(code = %self.code, "room deleted, roster empty");
                return Ok(());
            }
        };

        let mut room_patch = Map::new();
        room_patch.insert("host".into(), Value::String(new_host.clone()));
        self.bridge.update(&room_key(&self.code), room_patch).await?;

        let mut player_patch = Map::new();
        player_patch.insert("is_host".into(), Value::Bool(true));
        self.bridge
            .update(&player_key(&self.code, &new_host), player_patch)
            .await?;

        tracing::info!(code = %self.code, new_host = %new_host, "host migrated");
        Ok(())
    }

    /// Fold one replicated document into the mirror, emitting events for
    /// the transitions it reveals.
    async fn apply_doc(&self, doc: RoomDoc) {
        let mut pending: Vec<GameEvent> = Vec::new();
        {
            let mut session = self.session.write().await;
            if session.phase == RoomPhase::Closed {
                return;
            }

            let old_host = session.host_id.clone();
            let old_len = session.roster.len();
            let active_id = session.active_player().map(|p| p.id.clone());
            let active_score = session.active_player().map(|p| p.score);

            session.roster = doc.roster();
            session.host_id = doc.host.clone();

            // Keep the turn pointer on the same player across roster churn.
            match active_id.as_ref().and_then(|id| session.player_index(id)) {
                Some(idx) => session.active_turn = idx,
                None => {
                    if session.active_turn >= session.roster.len() {
                        session.active_turn = 0;
                    }
                }
            }

            // The active player's score changing remotely means their answer
            // was resolved on their device; latch so our timer cannot
            // resolve the question a second time.
            if session.phase == RoomPhase::Active && !session.answered {
                let remote_score = session.active_player().map(|p| p.score);
                if active_id.is_some() && remote_score != active_score {
                    session.answered = true;
                }
            }

            if session.roster.is_empty() {
                session.phase = RoomPhase::Closed;
                pending.push(GameEvent::RoomClosed);
            } else if doc.started && session.phase == RoomPhase::Open {
                if let Some(game) = doc.game {
                    session.questions = game.questions;
                    session.question_count = game.question_count;
                    session.active_question = 0;
                    session.active_turn = 0;
                    session.answered = false;
                    session.phase = RoomPhase::Active;
                    pending.push(GameEvent::MatchStarted {
                        questions: session.questions.len(),
                    });
                }
            }

            if session.roster.len() != old_len {
                pending.push(GameEvent::RosterChanged {
                    players: session.roster.len(),
                });
            }
            if session.host_id != old_host {
                pending.push(GameEvent::HostMigrated {
                    new_host: session.host_id.clone(),
                });
            }
        }
        for event in pending {
            let _ = self.events.send(event);
        }
    }

    async fn mark_closed(&self) {
        let mut session = self.session.write().await;
        if session.phase != RoomPhase::Closed {
            session.phase = RoomPhase::Closed;
            drop(session);
            let _ = self.events.send(GameEvent::RoomClosed);
        }
    }

    async fn watch(
        self: Arc<Self>,
        mut subscription: Subscription,
        mut connectivity: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                change = subscription.recv() => match change {
                    Some(KeyChange { value: Some(raw), .. }) => {
                        match serde_json::from_value::<RoomDoc>(raw) {
                            Ok(doc) => self.apply_doc(doc).await,
                            Err(e) => {
                                tracing::warn!(code = %self.code, error = %e, "ignoring malformed room document");
                            }
                        }
                    }
                    Some(KeyChange { value: None, .. }) => {
                        tracing::info!(code = %self.code, "room removed remotely");
                        self.mark_closed().await;
                        break;
                    }
                    None => break,
                },
                changed = connectivity.changed() => match changed {
                    Ok(()) => {
                        let connected = *connectivity.borrow_and_update();
                        tracing::info!(code = %self.code, connected, "bridge connectivity changed");
                        let _ = self.events.send(GameEvent::ConnectivityChanged { connected });
                    }
                    Err(_) => break,
                },
            }
        }
    }

    /// Replicate this participant's own resolved scores. Only the player
    /// whose turn it was writes, so score fields have a single writer.
    async fn publish_own_scores(self: Arc<Self>) {
        let mut events = self.events.subscribe();
        loop {
            match events.recv().await {
                Ok(GameEvent::AnswerResolved { player_id, score, .. })
                    if player_id == self.player_id =>
                {
                    let mut partial = Map::new();
                    partial.insert("score".into(), Value::from(score));
                    if let Err(e) = self
                        .bridge
                        .update(&player_key(&self.code, &self.player_id), partial)
                        .await
                    {
                        tracing::warn!(code = %self.code, error = %e, "score replication failed");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(code = %self.code, skipped, "event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

fn session_from_doc(code: &str, doc: &RoomDoc) -> RoomSession {
    RoomSession {
        code: code.to_string(),
        host_id: doc.host.clone(),
        phase: if doc.started {
            RoomPhase::Active
        } else {
            RoomPhase::Open
        },
        roster: doc.roster(),
        question_count: doc
            .game
            .as_ref()
            .map(|g| g.question_count)
            .unwrap_or(doc.question_count),
        questions: doc
            .game
            .as_ref()
            .map(|g| g.questions.clone())
            .unwrap_or_default(),
        active_question: 0,
        active_turn: 0,
        answered: false,
        created_at: doc.created_at,
    }
}
