//! Room session state machine: roster management, lifecycle transitions and
//! turn resolution, split across focused submodules.
//!
//! Everything here is pure state manipulation on an explicitly passed
//! [`RoomSession`]; replication and timers live in `online` and `timer`.

mod roster;
mod session;
mod turn;

pub use roster::validate_name;
pub use session::generate_room_code;

use chrono::Utc;

use crate::config::{GameConfig, ROOM_CODE_LENGTH};
use crate::types::{Player, PlayerId, RoomPhase, RoomSession};

impl RoomSession {
    /// A fresh session seeded with one host player.
    pub fn hosted(code: impl Into<String>, config: &GameConfig) -> Self {
        let host_avatar = config.avatars.first().cloned().unwrap_or_else(|| "#1".into());
        let host = Player::new("", host_avatar, true);
        let host_id = host.id.clone();
        Self {
            code: code.into(),
            host_id,
            phase: RoomPhase::Open,
            roster: vec![host],
            question_count: config.default_question_count,
            questions: Vec::new(),
            active_question: 0,
            active_turn: 0,
            answered: false,
            created_at: Utc::now(),
        }
    }

    /// A single-device session starting with the minimum two players.
    pub fn local(config: &GameConfig) -> Self {
        let mut session = Self::hosted(generate_room_code(ROOM_CODE_LENGTH), config);
        for _ in 1..config.min_players {
            // Cannot fail: the roster is far below the maximum.
            let _ = session.add_player(config);
        }
        session
    }

    pub fn host(&self) -> Option<&Player> {
        self.roster.iter().find(|p| p.is_host)
    }

    pub fn player_index(&self, id: &str) -> Option<usize> {
        self.roster.iter().position(|p| p.id == id)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.id == id)
    }

    /// The player whose turn it is, if the session is active.
    pub fn active_player(&self) -> Option<&Player> {
        if self.phase != RoomPhase::Active {
            return None;
        }
        self.roster.get(self.active_turn)
    }

    /// Whether `id` holds the turn right now.
    pub fn is_turn_of(&self, id: &PlayerId) -> bool {
        self.active_player().is_some_and(|p| &p.id == id)
    }

    pub fn is_over(&self) -> bool {
        self.phase == RoomPhase::Active && self.active_question >= self.questions.len()
    }
}
