use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triviarena::config::GameConfig;
use triviarena::engine::TurnEngine;
use triviarena::events::{self, GameEvent};
use triviarena::leaderboard::Leaderboard;
use triviarena::types::{AnswerLabel, MatchSummary, RoomSession};
use triviarena::{deck, share};

/// Self-playing local match: exercises deck loading, the turn engine with
/// its countdown, and the leaderboard, without any frontend attached.
#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triviarena=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Triviarena demo match...");

    let config = GameConfig::from_env();
    let pool = deck::load_or_fallback(&config.question_paths).await;

    let mut session = RoomSession::local(&config);
    session.set_name(0, "Alice").expect("valid name");
    session.set_name(1, "Bob").expect("valid name");
    let host = session.host_id.clone();
    session
        .begin(&host, config.default_question_count, &pool, &config)
        .expect("local match can start");

    tracing::info!(
        join_link = %share::join_url("https://triviarena.example/play", &session.code),
        "shareable link for this session"
    );

    let session = Arc::new(RwLock::new(session));
    let (events_tx, mut events_rx) = events::channel();

    // Narrate events the way a frontend would render them.
    tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            match event {
                GameEvent::QuestionPresented { question, total } => {
                    tracing::info!("question {}/{}", question + 1, total)
                }
                GameEvent::AnswerResolved { correct, score, .. } => {
                    tracing::info!(correct, score, "answer resolved")
                }
                GameEvent::GameOver { winners } => {
                    tracing::info!(?winners, "game over")
                }
                _ => {}
            }
        }
    });

    let mut engine = TurnEngine::new(Arc::clone(&session), config.clone(), events_tx);
    loop {
        let Some(question) = engine.present_question().await else {
            break;
        };

        // Answer like a distracted human: usually a random pick, sometimes
        // the right one.
        let chosen = {
            let mut rng = rand::rng();
            if rng.random_bool(0.5) {
                question.correct
            } else {
                AnswerLabel::ALL[rng.random_range(0..AnswerLabel::ALL.len())]
            }
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        engine.submit_answer(chosen).await;

        if engine.advance().await {
            break;
        }
    }

    for (rank, player) in engine.standings().await.iter().enumerate() {
        tracing::info!(
            "#{} {} {}: {} points",
            rank + 1,
            player.avatar,
            player.name,
            player.score
        );
    }

    let summary = MatchSummary::from_session(&*session.read().await, false);
    let leaderboard = Leaderboard::new(&config.leaderboard_path);
    if let Err(e) = leaderboard.record(&summary) {
        tracing::warn!(error = %e, "could not persist the match result");
    }
}
