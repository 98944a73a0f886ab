//! Error taxonomy for the match core.
//!
//! Everything here is recoverable: rejected operations leave state untouched
//! and the caller may retry. There is no fatal path — a dead bridge degrades
//! online mode to unavailable rather than crashing.

use crate::bridge::BridgeError;
use crate::types::{PlayerId, RoomCode};

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No question source could be loaded. Callers recover with the
    /// built-in fallback pool; this is never surfaced as fatal.
    #[error("no question source could be loaded")]
    DeckUnavailable,

    #[error("roster is already at the maximum of {0} players")]
    RosterFull(usize),

    #[error("roster is already at the minimum of {0} players")]
    RosterAtMinimum(usize),

    #[error("avatar {0} is already taken by another player")]
    TokenTaken(String),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("room {0} has already started")]
    AlreadyStarted(RoomCode),

    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("at least {0} players are required to start")]
    InsufficientPlayers(usize),

    #[error("the host must set a valid name before starting")]
    NoHostName,

    #[error("only the host may perform this operation")]
    NotHost,

    #[error("player {0} is not in the room")]
    NotInRoom(PlayerId),

    #[error("invalid display name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
