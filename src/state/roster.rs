//! Roster operations: adding and removing players, avatar assignment and
//! display-name validation.

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::types::{Player, RoomSession};

/// Maximum display-name length in characters.
const MAX_NAME_CHARS: usize = 20;

/// Substrings rejected in display names, stored in normalized form.
const BANNED_WORDS: &[&str] = &[
    "aptal", "salak", "gerizekali", "mal", "beyinsiz", "dangalak", "budala", "ahmak", "embesil",
];

/// Lowercase and fold Turkish diacritics so the banned-word match cannot be
/// dodged with accented spellings.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'ğ' => 'g',
            'ü' => 'u',
            'ş' => 's',
            'ı' => 'i',
            'ö' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn contains_banned_word(text: &str) -> bool {
    let normalized = normalize(text);
    BANNED_WORDS.iter().any(|word| normalized.contains(word))
}

/// Check a single display name against the roster rules.
pub fn validate_name(name: &str) -> GameResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GameError::InvalidName("name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::InvalidName(format!(
            "name is longer than {MAX_NAME_CHARS} characters"
        )));
    }
    if contains_banned_word(trimmed) {
        return Err(GameError::InvalidName("name contains a banned word".into()));
    }
    Ok(())
}

impl RoomSession {
    /// Append a new unnamed player with the next unused avatar token.
    /// Fails without mutating when the roster is at the maximum.
    pub fn add_player(&mut self, config: &GameConfig) -> GameResult<usize> {
        if self.roster.len() >= config.max_players {
            return Err(GameError::RosterFull(config.max_players));
        }
        let avatar = self.next_free_avatar(config);
        self.roster.push(Player::new("", avatar, false));
        tracing::debug!(players = self.roster.len(), "player added to roster");
        Ok(self.roster.len() - 1)
    }

    /// Remove the most recently added player. Fails without mutating when
    /// the roster is at the minimum.
    pub fn remove_player(&mut self, config: &GameConfig) -> GameResult<Player> {
        if self.roster.len() <= config.min_players {
            return Err(GameError::RosterAtMinimum(config.min_players));
        }
        let removed = match self.roster.pop() {
            Some(p) => p,
            None => return Err(GameError::RosterAtMinimum(config.min_players)),
        };
        tracing::debug!(players = self.roster.len(), "player removed from roster");
        Ok(removed)
    }

    /// Assign an avatar token, rejecting one already held by someone else.
    pub fn set_avatar(&mut self, player: usize, token: &str) -> GameResult<()> {
        let taken = self
            .roster
            .iter()
            .enumerate()
            .any(|(i, p)| i != player && p.avatar == token);
        if taken {
            return Err(GameError::TokenTaken(token.to_string()));
        }
        match self.roster.get_mut(player) {
            Some(p) => {
                p.avatar = token.to_string();
                Ok(())
            }
            None => Err(GameError::NotInRoom(player.to_string())),
        }
    }

    /// Set a player's display name after validating it.
    pub fn set_name(&mut self, player: usize, name: &str) -> GameResult<()> {
        validate_name(name)?;
        match self.roster.get_mut(player) {
            Some(p) => {
                p.name = name.trim().to_string();
                Ok(())
            }
            None => Err(GameError::NotInRoom(player.to_string())),
        }
    }

    /// True iff every roster name passes [`validate_name`].
    pub fn names_valid(&self) -> bool {
        self.roster.iter().all(|p| validate_name(&p.name).is_ok())
    }

    /// Every player at the roster-maximum score; ties included.
    pub fn winners(&self) -> Vec<&Player> {
        let max = match self.roster.iter().map(|p| p.score).max() {
            Some(max) => max,
            None => return Vec::new(),
        };
        self.roster.iter().filter(|p| p.score == max).collect()
    }

    pub(crate) fn next_free_avatar(&self, config: &GameConfig) -> String {
        config
            .avatars
            .iter()
            .find(|token| !self.roster.iter().any(|p| &p.avatar == *token))
            .cloned()
            .unwrap_or_else(|| format!("#{}", self.roster.len() + 1))
    }
}
