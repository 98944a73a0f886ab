//! Question pool loading and drawing.
//!
//! Pools come from JSON files tried in priority order; when every candidate
//! fails the built-in fallback pool is substituted so a match can always
//! start.

use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{GameError, GameResult};
use crate::types::{AnswerLabel, ChoiceSet, Question};

/// Accepted question-file shapes: a bare array, or an object wrapping
/// the array under `questions` or `pool`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PoolFile {
    Bare(Vec<Question>),
    Questions { questions: Vec<Question> },
    Pool { pool: Vec<Question> },
}

impl PoolFile {
    fn into_questions(self) -> Vec<Question> {
        match self {
            PoolFile::Bare(q) | PoolFile::Questions { questions: q } | PoolFile::Pool { pool: q } => q,
        }
    }
}

/// Parse a question file in any of the accepted shapes.
pub fn parse_pool(raw: &str) -> Result<Vec<Question>, serde_json::Error> {
    serde_json::from_str::<PoolFile>(raw).map(PoolFile::into_questions)
}

/// Try each candidate path in order; the first that reads and parses to a
/// non-empty pool wins.
pub async fn load(paths: &[PathBuf]) -> GameResult<Vec<Question>> {
    for path in paths {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "question file unreadable");
                continue;
            }
        };
        match parse_pool(&raw) {
            Ok(pool) if !pool.is_empty() => {
                tracing::info!(path = %path.display(), questions = pool.len(), "question pool loaded");
                return Ok(pool);
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "question file parsed to an empty pool");
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "question file failed to parse");
            }
        }
    }
    Err(GameError::DeckUnavailable)
}

/// Load from the candidate paths, substituting the built-in pool when every
/// source fails. The fallback keeps the game playable offline.
pub async fn load_or_fallback(paths: &[PathBuf]) -> Vec<Question> {
    match load(paths).await {
        Ok(pool) => pool,
        Err(_) => {
            tracing::warn!("no question source available, using the built-in fallback pool");
            fallback_pool()
        }
    }
}

/// An unbiased (Fisher-Yates) shuffled draw of `count` questions, or the
/// whole pool when it is smaller.
pub fn draw(pool: &[Question], count: usize) -> Vec<Question> {
    let mut drawn = pool.to_vec();
    drawn.shuffle(&mut rand::rng());
    drawn.truncate(count);
    drawn
}

fn question(prompt: &str, choices: [&str; 4], correct: AnswerLabel) -> Question {
    Question {
        prompt: prompt.to_string(),
        choices: ChoiceSet {
            a: choices[0].to_string(),
            b: choices[1].to_string(),
            c: choices[2].to_string(),
            d: choices[3].to_string(),
        },
        correct,
    }
}

/// Built-in questions used when no question file can be loaded.
pub fn fallback_pool() -> Vec<Question> {
    vec![
        question(
            "Which country won the 2018 FIFA World Cup?",
            ["France", "Croatia", "Belgium", "England"],
            AnswerLabel::A,
        ),
        question(
            "Which national team does Lionel Messi play for?",
            ["Spain", "Argentina", "Brazil", "Portugal"],
            AnswerLabel::B,
        ),
        question(
            "What is the name of Real Madrid's stadium?",
            ["Camp Nou", "Wembley", "Santiago Bernabéu", "Old Trafford"],
            AnswerLabel::C,
        ),
        question(
            "Which club has won the most UEFA Champions League titles?",
            ["Barcelona", "Real Madrid", "AC Milan", "Liverpool"],
            AnswerLabel::B,
        ),
        question(
            "How far is the penalty spot from the goal line?",
            ["10 metres", "11 metres", "12 metres", "9 metres"],
            AnswerLabel::B,
        ),
        question(
            "How many players does a team field during a match?",
            ["11", "10", "9", "12"],
            AnswerLabel::A,
        ),
        question(
            "What is the minimum wall distance at a free kick?",
            ["9.15 m", "7.5 m", "5 m", "11 m"],
            AnswerLabel::A,
        ),
        question(
            "How often is the World Cup held?",
            ["Every 2 years", "Every 3 years", "Every 4 years", "Every 5 years"],
            AnswerLabel::C,
        ),
    ]
}
