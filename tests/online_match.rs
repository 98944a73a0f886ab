//! End-to-end online match: two clients sharing one in-memory bridge.

use std::sync::Arc;
use std::time::Duration;

use triviarena::bridge::MemoryBridge;
use triviarena::config::GameConfig;
use triviarena::engine::TurnEngine;
use triviarena::events::{self, GameEvent};
use triviarena::online::OnlineRoom;
use triviarena::types::{AnswerLabel, RoomPhase};
use triviarena::{deck, share};

fn test_config() -> GameConfig {
    GameConfig {
        // Long enough that no countdown expires while the test drives turns.
        countdown: Duration::from_secs(60),
        ..GameConfig::default()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(40)).await;
}

#[tokio::test]
async fn full_match_between_two_clients() {
    let bridge = Arc::new(MemoryBridge::new());
    let config = test_config();
    let pool = deck::fallback_pool();

    // Host opens a room and shares a join link.
    let (host_tx, _host_rx) = events::channel();
    let host = OnlineRoom::create(bridge.clone(), config.clone(), host_tx.clone())
        .await
        .unwrap();
    host.set_name("Alice").await.unwrap();
    let link = share::join_url("https://triviarena.example/play", host.code());

    // Guest joins through the code carried in the link.
    let code = share::room_code_from_url(&link).unwrap();
    let (guest_tx, mut guest_rx) = events::channel();
    let guest = OnlineRoom::join(bridge.clone(), &code, config.clone(), guest_tx.clone())
        .await
        .unwrap();
    guest.set_name("Bob").await.unwrap();
    settle().await;

    // Roster replicated both ways before start.
    let host_view = host.snapshot().await;
    assert_eq!(host_view.roster.len(), 2);
    assert_eq!(host_view.roster[1].name, "Bob");

    host.begin(&pool, 2).await.unwrap();
    settle().await;

    let guest_view = guest.snapshot().await;
    assert_eq!(guest_view.phase, RoomPhase::Active);
    assert_eq!(guest_view.questions.len(), 2);
    let mut started = false;
    while let Ok(event) = guest_rx.try_recv() {
        if matches!(event, GameEvent::MatchStarted { questions: 2 }) {
            started = true;
        }
    }
    assert!(started);

    // Both sides run identical engines over their own mirrors.
    let mut host_engine = TurnEngine::for_player(
        host.session(),
        config.clone(),
        host_tx.clone(),
        host.player_id().clone(),
    );
    let mut guest_engine = TurnEngine::for_player(
        guest.session(),
        config.clone(),
        guest_tx.clone(),
        guest.player_id().clone(),
    );

    // Question 1: Alice's turn. She answers correctly on her device; the
    // guest cannot resolve a foreign turn.
    let question = host_engine.present_question().await.unwrap();
    assert!(guest_engine.submit_answer(question.correct).await.is_none());
    let outcome = host_engine.submit_answer(question.correct).await.unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.score, 10);
    settle().await;

    // Alice's score replicated into Bob's mirror, and the resolution latch
    // followed it so Bob's countdown cannot re-resolve the question.
    let guest_view = guest.snapshot().await;
    assert_eq!(guest_view.roster[0].score, 10);
    assert!(guest_view.answered);

    assert!(!host_engine.advance().await);
    assert!(!guest_engine.advance().await);

    // Question 2: Bob's turn. He picks a wrong answer; his score floors at
    // zero rather than going negative.
    let question = guest_engine.present_question().await.unwrap();
    let wrong = AnswerLabel::ALL
        .into_iter()
        .find(|l| *l != question.correct)
        .unwrap();
    let outcome = guest_engine.submit_answer(wrong).await.unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.score, 0);
    settle().await;

    assert!(host_engine.advance().await);
    assert!(guest_engine.advance().await);

    // Both mirrors agree on the result.
    for view in [host.snapshot().await, guest.snapshot().await] {
        let standings = view.standings();
        assert_eq!(standings[0].name, "Alice");
        assert_eq!(standings[0].score, 10);
        assert_eq!(standings[1].name, "Bob");
        assert_eq!(standings[1].score, 0);

        let winners = view.winners();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].name, "Alice");
    }

    // Guest departs; the host sees the roster shrink.
    guest.leave().await.unwrap();
    settle().await;
    assert_eq!(host.snapshot().await.roster.len(), 1);

    // Host departs last; the room disappears from the bridge.
    let code = host.code().clone();
    host.leave().await.unwrap();
    let (tx, _rx) = events::channel();
    let rejoin = OnlineRoom::join(bridge, &code, config, tx).await;
    assert!(rejoin.is_err());
}

#[tokio::test]
async fn host_departure_mid_game_keeps_the_room_alive() {
    let bridge = Arc::new(MemoryBridge::new());
    let config = test_config();
    let pool = deck::fallback_pool();

    let (host_tx, _rx) = events::channel();
    let host = OnlineRoom::create(bridge.clone(), config.clone(), host_tx)
        .await
        .unwrap();
    host.set_name("Alice").await.unwrap();
    let code = host.code().clone();

    let (second_tx, mut second_rx) = events::channel();
    let second = OnlineRoom::join(bridge.clone(), &code, config.clone(), second_tx)
        .await
        .unwrap();
    second.set_name("Bob").await.unwrap();

    let (third_tx, _rx) = events::channel();
    let third = OnlineRoom::join(bridge.clone(), &code, config.clone(), third_tx)
        .await
        .unwrap();
    third.set_name("Carol").await.unwrap();
    settle().await;

    host.begin(&pool, 3).await.unwrap();
    settle().await;

    host.leave().await.unwrap();
    settle().await;

    // The earliest-joined survivor hosts; the code is unchanged and the
    // remaining players keep playing.
    let view = third.snapshot().await;
    assert_eq!(view.code, code);
    assert_eq!(view.roster.len(), 2);
    assert_eq!(view.host_id, *second.player_id());
    assert_eq!(view.roster.iter().filter(|p| p.is_host).count(), 1);

    let mut migrated = false;
    while let Ok(event) = second_rx.try_recv() {
        if matches!(event, GameEvent::HostMigrated { ref new_host } if new_host == second.player_id())
        {
            migrated = true;
        }
    }
    assert!(migrated);
}
