//! Match configuration, loadable from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Length of a shareable room code.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Tunables for a match. `Default` gives the standard rules; `from_env`
/// lets deployments override paths and pacing.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Hard roster ceiling.
    pub max_players: usize,
    /// Roster floor; a match needs at least this many participants.
    pub min_players: usize,
    pub default_question_count: usize,
    /// Per-question countdown.
    pub countdown: Duration,
    pub points_correct: u32,
    /// Deducted on a wrong answer or timeout, floored at zero.
    pub points_wrong: u32,
    /// Avatar tokens players can claim, one per player.
    pub avatars: Vec<String>,
    /// Candidate question files, tried in priority order.
    pub question_paths: Vec<PathBuf>,
    /// Where the local leaderboard is persisted.
    pub leaderboard_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            min_players: 2,
            default_question_count: 10,
            countdown: Duration::from_secs(15),
            points_correct: 10,
            points_wrong: 5,
            avatars: ["⚽", "🏆", "👑", "🎯", "🔥", "⭐", "💎", "🚀"]
                .into_iter()
                .map(String::from)
                .collect(),
            question_paths: ["data/questions.json", "questions.json"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            leaderboard_path: PathBuf::from("leaderboard.json"),
        }
    }
}

impl GameConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(paths) = std::env::var("TRIVIARENA_QUESTION_PATHS") {
            let paths: Vec<PathBuf> = paths
                .split(':')
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .collect();
            if !paths.is_empty() {
                config.question_paths = paths;
            }
        }

        if let Ok(path) = std::env::var("TRIVIARENA_LEADERBOARD_PATH") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                config.leaderboard_path = PathBuf::from(trimmed);
            }
        }

        if let Some(secs) = std::env::var("TRIVIARENA_COUNTDOWN_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.countdown = Duration::from_secs(secs);
        }

        if let Some(count) = std::env::var("TRIVIARENA_QUESTION_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.default_question_count = count;
        }

        tracing::info!(
            question_paths = ?config.question_paths,
            countdown_secs = config.countdown.as_secs(),
            question_count = config.default_question_count,
            "Game config loaded"
        );

        config
    }
}
