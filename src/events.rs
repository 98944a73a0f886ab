//! Notification port: typed events the core emits at state transitions.
//!
//! Presentation layers (UI, sound, logging) subscribe to the broadcast
//! channel; the core never calls into them directly.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::{AnswerLabel, PlayerId};

/// Capacity of the event channel; slow subscribers lag rather than block.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum GameEvent {
    /// A question was put in front of the active player.
    QuestionPresented { question: usize, total: usize },
    /// One second of the countdown elapsed.
    TimerTick { question: usize, remaining_secs: u64 },
    /// The countdown for a question ran out.
    TimeExpired { question: usize },
    AnswerResolved {
        player_id: PlayerId,
        chosen: Option<AnswerLabel>,
        correct: bool,
        score: u32,
    },
    TurnAdvanced { question: usize, turn: usize },
    /// The match ended; winner names, ties included.
    GameOver { winners: Vec<String> },
    /// The replicated match setup arrived and the session went Active.
    MatchStarted { questions: usize },
    RosterChanged { players: usize },
    HostMigrated { new_host: PlayerId },
    RoomClosed,
    ConnectivityChanged { connected: bool },
}

pub type EventSender = broadcast::Sender<GameEvent>;
pub type EventReceiver = broadcast::Receiver<GameEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}
