//! Per-question countdown.
//!
//! A timer is a spawned task that ticks once a second and delivers a single
//! expiry event tagged with its question index. Cancelling aborts the task;
//! a stale expiry that raced a cancellation is discarded downstream by
//! comparing question indexes against the session's resolution latch.

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::events::{EventSender, GameEvent};

pub struct QuestionTimer {
    question: usize,
    handle: JoinHandle<()>,
}

impl QuestionTimer {
    /// Start the countdown for `question`, emitting ticks and exactly one
    /// `TimeExpired` through `events`.
    pub fn start(question: usize, duration: Duration, events: EventSender) -> Self {
        let handle = tokio::spawn(async move {
            let secs = duration.as_secs();
            if secs == 0 {
                tokio::time::sleep(duration).await;
            } else {
                for elapsed in 1..=secs {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    let _ = events.send(GameEvent::TimerTick {
                        question,
                        remaining_secs: secs - elapsed,
                    });
                }
            }
            let _ = events.send(GameEvent::TimeExpired { question });
        });
        Self { question, handle }
    }

    pub fn question(&self) -> usize {
        self.question
    }

    /// Stop the countdown; no further events are delivered.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
