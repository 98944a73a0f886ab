//! Turn resolution: scoring, advancement and standings.

use crate::config::GameConfig;
use crate::types::{AnswerLabel, AnswerOutcome, Player, Question, RoomPhase, RoomSession};

impl RoomSession {
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase != RoomPhase::Active {
            return None;
        }
        self.questions.get(self.active_question)
    }

    /// Resolve the active player's answer for the active question.
    ///
    /// `None` is the timeout sentinel and scores as a wrong answer. The
    /// update is a single atomic step, and the per-question latch makes any
    /// further call for the same question a no-op (`None` return).
    pub fn resolve_answer(
        &mut self,
        chosen: Option<AnswerLabel>,
        config: &GameConfig,
    ) -> Option<AnswerOutcome> {
        if self.phase != RoomPhase::Active || self.answered {
            return None;
        }
        let question = self.questions.get(self.active_question)?;
        let correct_label = question.correct;
        let correct = chosen == Some(correct_label);

        let player = self.roster.get_mut(self.active_turn)?;
        if correct {
            player.score += config.points_correct;
        } else {
            player.score = player.score.saturating_sub(config.points_wrong);
        }
        self.answered = true;

        tracing::debug!(
            code = %self.code,
            player = %player.name,
            chosen = ?chosen,
            correct,
            score = player.score,
            "answer resolved"
        );

        Some(AnswerOutcome {
            player_id: player.id.clone(),
            chosen,
            correct_label,
            correct,
            score: player.score,
        })
    }

    /// Move to the next question and pass the turn. Returns true when the
    /// game is over.
    pub fn advance(&mut self) -> bool {
        self.active_question += 1;
        if !self.roster.is_empty() {
            self.active_turn = (self.active_turn + 1) % self.roster.len();
        }
        self.answered = false;
        self.active_question >= self.questions.len()
    }

    /// Roster sorted by score descending; ties keep roster (join) order.
    pub fn standings(&self) -> Vec<Player> {
        let mut sorted = self.roster.clone();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        sorted
    }
}
