use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type RoomCode = String;

/// One of the four fixed answer labels of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerLabel {
    A,
    B,
    C,
    D,
}

impl AnswerLabel {
    pub const ALL: [AnswerLabel; 4] = [
        AnswerLabel::A,
        AnswerLabel::B,
        AnswerLabel::C,
        AnswerLabel::D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLabel::A => "A",
            AnswerLabel::B => "B",
            AnswerLabel::C => "C",
            AnswerLabel::D => "D",
        }
    }
}

impl fmt::Display for AnswerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four choice texts of a question, in fixed A-D order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceSet {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl ChoiceSet {
    pub fn get(&self, label: AnswerLabel) -> &str {
        match label {
            AnswerLabel::A => &self.a,
            AnswerLabel::B => &self.b,
            AnswerLabel::C => &self.c,
            AnswerLabel::D => &self.d,
        }
    }

    /// Choices paired with their labels, in display order.
    pub fn labelled(&self) -> [(AnswerLabel, &str); 4] {
        [
            (AnswerLabel::A, &self.a),
            (AnswerLabel::B, &self.b),
            (AnswerLabel::C, &self.c),
            (AnswerLabel::D, &self.d),
        ]
    }
}

/// A single trivia question. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub choices: ChoiceSet,
    pub correct: AnswerLabel,
}

/// Lifecycle of a room session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    /// Roster assembling, match not started.
    Open,
    /// Questions in flight.
    Active,
    /// Removed or abandoned.
    Closed,
}

/// A participant in a room session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub score: u32,
    pub is_host: bool,
    pub connected: bool,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.into(),
            avatar: avatar.into(),
            score: 0,
            is_host,
            connected: true,
            joined_at: Utc::now(),
        }
    }
}

/// A shared match: roster, turn pointer, question snapshot and lifecycle.
///
/// In online mode this is each client's read-through mirror of the room
/// document replicated by the sync bridge; in local mode a single process
/// owns the value directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSession {
    pub code: RoomCode,
    pub host_id: PlayerId,
    pub phase: RoomPhase,
    /// Players in join order.
    pub roster: Vec<Player>,
    pub question_count: usize,
    /// Drawn question snapshot, fixed once the session is Active.
    pub questions: Vec<Question>,
    pub active_question: usize,
    pub active_turn: usize,
    /// Resolution latch for the active question. Client-local, never replicated.
    #[serde(skip)]
    pub answered: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of resolving one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub player_id: PlayerId,
    pub chosen: Option<AnswerLabel>,
    pub correct_label: AnswerLabel,
    pub correct: bool,
    /// The answering player's score after the update.
    pub score: u32,
}

/// A player's line in a completed-match summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub avatar: String,
    pub score: u32,
}

/// Completed-match record persisted to the local leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub players: Vec<PlayerSnapshot>,
    /// Winner's display name, or `None` for a draw.
    pub winner: Option<String>,
    pub question_count: usize,
    pub finished_at: DateTime<Utc>,
    pub online: bool,
}

impl MatchSummary {
    pub fn from_session(session: &RoomSession, online: bool) -> Self {
        let winners = session.winners();
        let winner = match winners.as_slice() {
            [single] => Some(single.name.clone()),
            _ => None,
        };
        Self {
            players: session
                .roster
                .iter()
                .map(|p| PlayerSnapshot {
                    name: p.name.clone(),
                    avatar: p.avatar.clone(),
                    score: p.score,
                })
                .collect(),
            winner,
            question_count: session.question_count,
            finished_at: Utc::now(),
            online,
        }
    }

    /// Highest score in this match, used for leaderboard ranking.
    pub fn top_score(&self) -> u32 {
        self.players.iter().map(|p| p.score).max().unwrap_or(0)
    }
}
