//! Room lifecycle: codes, joining, starting and leaving.
//!
//! Transitions follow Open -> Active -> Closed. Every rejected operation
//! leaves the session untouched.

use rand::Rng;

use crate::config::GameConfig;
use crate::deck;
use crate::error::{GameError, GameResult};
use crate::types::{Player, PlayerId, Question, RoomPhase, RoomSession};

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random room code: uppercase alphanumeric, `len` characters.
pub fn generate_room_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl RoomSession {
    /// Add a joining participant. Fails when the room has started or is full.
    pub fn join(&mut self, config: &GameConfig) -> GameResult<PlayerId> {
        if self.phase != RoomPhase::Open {
            return Err(GameError::AlreadyStarted(self.code.clone()));
        }
        if self.roster.len() >= config.max_players {
            return Err(GameError::RoomFull(self.code.clone()));
        }
        let avatar = self.next_free_avatar(config);
        let player = Player::new("", avatar, false);
        let id = player.id.clone();
        self.roster.push(player);
        tracing::info!(code = %self.code, players = self.roster.len(), "player joined room");
        Ok(id)
    }

    /// Start the match: host-only. Draws `question_count` questions from
    /// `pool` and moves the session to Active with zeroed turn pointers.
    pub fn begin(
        &mut self,
        actor: &PlayerId,
        question_count: usize,
        pool: &[Question],
        config: &GameConfig,
    ) -> GameResult<()> {
        if actor != &self.host_id {
            return Err(GameError::NotHost);
        }
        if self.roster.len() < config.min_players {
            return Err(GameError::InsufficientPlayers(config.min_players));
        }
        let host_name_ok = self
            .host()
            .is_some_and(|h| super::roster::validate_name(&h.name).is_ok());
        if !host_name_ok {
            return Err(GameError::NoHostName);
        }

        self.questions = deck::draw(pool, question_count);
        self.question_count = self.questions.len();
        self.active_question = 0;
        self.active_turn = 0;
        self.answered = false;
        self.phase = RoomPhase::Active;
        tracing::info!(
            code = %self.code,
            players = self.roster.len(),
            questions = self.questions.len(),
            "match started"
        );
        Ok(())
    }

    /// Remove a player. When the host leaves, the earliest-joined survivor
    /// is promoted; when the roster empties, the session closes.
    ///
    /// Returns the promoted host's ID when a migration happened.
    pub fn leave(&mut self, player_id: &PlayerId) -> GameResult<Option<PlayerId>> {
        let idx = self
            .player_index(player_id)
            .ok_or_else(|| GameError::NotInRoom(player_id.clone()))?;
        let removed = self.roster.remove(idx);
        tracing::info!(code = %self.code, players = self.roster.len(), "player left room");

        if self.roster.is_empty() {
            self.phase = RoomPhase::Closed;
            tracing::info!(code = %self.code, "room closed, roster empty");
            return Ok(None);
        }

        // Keep the turn pointer on the same player where possible.
        if idx < self.active_turn {
            self.active_turn -= 1;
        }
        if self.active_turn >= self.roster.len() {
            self.active_turn = 0;
        }

        if !removed.is_host {
            return Ok(None);
        }

        let new_host_id = self
            .roster
            .iter()
            .min_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)))
            .map(|p| p.id.clone())
            // Non-empty roster checked above.
            .unwrap_or_default();
        for p in self.roster.iter_mut() {
            p.is_host = p.id == new_host_id;
        }
        self.host_id = new_host_id.clone();
        tracing::info!(code = %self.code, new_host = %new_host_id, "host migrated");
        Ok(Some(new_host_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    fn named_session(players: usize) -> RoomSession {
        let config = config();
        let mut session = RoomSession::hosted(generate_room_code(6), &config);
        for _ in 1..players {
            session.join(&config).unwrap();
        }
        for (i, name) in ["Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi"]
            .iter()
            .take(players)
            .enumerate()
        {
            session.set_name(i, name).unwrap();
        }
        session
    }

    #[test]
    fn test_room_code_shape() {
        for _ in 0..50 {
            let code = generate_room_code(6);
            assert_eq!(code.len(), 6);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_join_rejected_when_full() {
        let config = config();
        let mut session = RoomSession::hosted("FULL01", &config);
        for _ in 1..config.max_players {
            session.join(&config).unwrap();
        }
        assert!(matches!(
            session.join(&config),
            Err(GameError::RoomFull(code)) if code == "FULL01"
        ));
        assert_eq!(session.roster.len(), config.max_players);
    }

    #[test]
    fn test_join_rejected_after_start() {
        let config = config();
        let mut session = named_session(2);
        let host = session.host_id.clone();
        session
            .begin(&host, 3, &deck::fallback_pool(), &config)
            .unwrap();
        assert!(matches!(
            session.join(&config),
            Err(GameError::AlreadyStarted(_))
        ));
    }

    #[test]
    fn test_begin_requires_host() {
        let config = config();
        let mut session = named_session(2);
        let guest = session.roster[1].id.clone();
        assert!(matches!(
            session.begin(&guest, 3, &deck::fallback_pool(), &config),
            Err(GameError::NotHost)
        ));
    }

    #[test]
    fn test_begin_requires_two_players() {
        let config = config();
        let mut session = RoomSession::hosted("LONELY", &config);
        session.set_name(0, "Alice").unwrap();
        let host = session.host_id.clone();
        assert!(matches!(
            session.begin(&host, 3, &deck::fallback_pool(), &config),
            Err(GameError::InsufficientPlayers(2))
        ));
        assert_eq!(session.phase, RoomPhase::Open);
    }

    #[test]
    fn test_begin_requires_host_name() {
        let config = config();
        let mut session = RoomSession::hosted("NONAME", &config);
        session.join(&config).unwrap();
        let host = session.host_id.clone();
        assert!(matches!(
            session.begin(&host, 3, &deck::fallback_pool(), &config),
            Err(GameError::NoHostName)
        ));
    }

    #[test]
    fn test_begin_snapshots_questions() {
        let config = config();
        let mut session = named_session(2);
        let host = session.host_id.clone();
        session
            .begin(&host, 5, &deck::fallback_pool(), &config)
            .unwrap();
        assert_eq!(session.phase, RoomPhase::Active);
        assert_eq!(session.questions.len(), 5);
        assert_eq!(session.question_count, 5);
        assert_eq!(session.active_question, 0);
        assert_eq!(session.active_turn, 0);
    }

    #[test]
    fn test_host_leave_promotes_earliest_joined() {
        let config = config();
        let mut session = named_session(3);
        let host = session.host_id.clone();
        let second = session.roster[1].id.clone();
        let code = session.code.clone();

        let promoted = session.leave(&host).unwrap();
        assert_eq!(promoted, Some(second.clone()));
        assert_eq!(session.roster.len(), 2);
        assert_eq!(session.code, code);
        assert_eq!(session.host_id, second);
        assert_eq!(session.roster.iter().filter(|p| p.is_host).count(), 1);
    }

    #[test]
    fn test_last_leave_closes_room() {
        let config = config();
        let mut session = RoomSession::hosted("EMPTY1", &config);
        let host = session.host_id.clone();
        session.leave(&host).unwrap();
        assert_eq!(session.phase, RoomPhase::Closed);
        assert!(session.roster.is_empty());
    }

    #[test]
    fn test_leave_unknown_player_rejected() {
        let mut session = named_session(2);
        assert!(matches!(
            session.leave(&"nobody".to_string()),
            Err(GameError::NotInRoom(_))
        ));
    }
}
