//! The turn engine: drives a session through its questions, owning the
//! per-question countdown and the event emission around each step.
//!
//! The same engine runs in both deployment modes. Local mode gives it the
//! only copy of the session; online mode gives every client an engine over
//! its own mirror (obtained from `OnlineRoom::session`) sharing the room's
//! event channel, so resolved answers reach the score publisher.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::GameConfig;
use crate::events::{EventSender, GameEvent};
use crate::timer::QuestionTimer;
use crate::types::{AnswerLabel, AnswerOutcome, Player, PlayerId, Question, RoomSession};

pub struct TurnEngine {
    session: Arc<RwLock<RoomSession>>,
    config: GameConfig,
    events: EventSender,
    /// When set, real answers are accepted only on this player's turn
    /// (online mode: one device, one participant).
    actor: Option<PlayerId>,
    timer: Option<QuestionTimer>,
}

impl TurnEngine {
    /// An engine that accepts answers for every turn (local mode).
    pub fn new(session: Arc<RwLock<RoomSession>>, config: GameConfig, events: EventSender) -> Self {
        Self {
            session,
            config,
            events,
            actor: None,
            timer: None,
        }
    }

    /// An engine bound to one participant (online mode).
    pub fn for_player(
        session: Arc<RwLock<RoomSession>>,
        config: GameConfig,
        events: EventSender,
        actor: PlayerId,
    ) -> Self {
        Self {
            session,
            config,
            events,
            actor: Some(actor),
            timer: None,
        }
    }

    /// Put the active question in front of the players and start its
    /// countdown. Returns `None` when the game is over.
    pub async fn present_question(&mut self) -> Option<Question> {
        let (question, index, total) = {
            let session = self.session.read().await;
            let question = session.current_question()?.clone();
            (question, session.active_question, session.questions.len())
        };

        let _ = self.events.send(GameEvent::QuestionPresented {
            question: index,
            total,
        });

        if let Some(old) = self.timer.take() {
            old.cancel();
        }
        self.timer = Some(QuestionTimer::start(
            index,
            self.config.countdown,
            self.events.clone(),
        ));
        Some(question)
    }

    /// Resolve a real answer for the active question. A no-op (`None`)
    /// when the question is already resolved, or when this engine's
    /// participant does not hold the turn.
    pub async fn submit_answer(&mut self, chosen: AnswerLabel) -> Option<AnswerOutcome> {
        let outcome = {
            let mut session = self.session.write().await;
            if let Some(actor) = &self.actor {
                if !session.is_turn_of(actor) {
                    return None;
                }
            }
            session.resolve_answer(Some(chosen), &self.config)
        };
        self.after_resolution(outcome)
    }

    /// Handle a countdown expiry. Stale expiries (from an earlier question,
    /// or racing an answer that already resolved) are discarded, so the
    /// timeout resolves at most once per question.
    pub async fn handle_time_expired(&mut self, question: usize) -> Option<AnswerOutcome> {
        let outcome = {
            let mut session = self.session.write().await;
            if session.active_question != question {
                return None;
            }
            session.resolve_answer(None, &self.config)
        };
        self.after_resolution(outcome)
    }

    fn after_resolution(&mut self, outcome: Option<AnswerOutcome>) -> Option<AnswerOutcome> {
        let outcome = outcome?;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        let _ = self.events.send(GameEvent::AnswerResolved {
            player_id: outcome.player_id.clone(),
            chosen: outcome.chosen,
            correct: outcome.correct,
            score: outcome.score,
        });
        Some(outcome)
    }

    /// Advance to the next question and turn. Emits the game-over event
    /// (with winners) once the deck is exhausted.
    pub async fn advance(&mut self) -> bool {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        let (done, event) = {
            let mut session = self.session.write().await;
            let done = session.advance();
            let event = if done {
                GameEvent::GameOver {
                    winners: session.winners().iter().map(|p| p.name.clone()).collect(),
                }
            } else {
                GameEvent::TurnAdvanced {
                    question: session.active_question,
                    turn: session.active_turn,
                }
            };
            (done, event)
        };
        let _ = self.events.send(event);
        done
    }

    pub async fn standings(&self) -> Vec<Player> {
        self.session.read().await.standings()
    }
}
