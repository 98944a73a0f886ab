//! Local match-history leaderboard, persisted as a JSON file.
//!
//! Completed matches are recorded under a daily key and an ISO-week key.
//! Each bucket is capped (20 entries per day, 100 per week) and old buckets
//! are pruned (7 days, 4 weeks) so the file cannot grow without bound.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::MatchSummary;

const DAILY_CAP: usize = 20;
const WEEKLY_CAP: usize = 100;
const DAILY_KEEP: usize = 7;
const WEEKLY_KEEP: usize = 4;

/// Ranked entries shown per day / per week.
const DAILY_TOP: usize = 10;
const WEEKLY_TOP: usize = 20;

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("leaderboard file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("leaderboard file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LeaderboardFile {
    /// `YYYY-MM-DD` -> matches finished that day, oldest first.
    daily: BTreeMap<String, Vec<MatchSummary>>,
    /// `YYYY-Www` (ISO week) -> matches finished that week, oldest first.
    weekly: BTreeMap<String, Vec<MatchSummary>>,
}

fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn week_key(at: DateTime<Utc>) -> String {
    let week = at.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub struct Leaderboard {
    path: PathBuf,
}

impl Leaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> LeaderboardResult<LeaderboardFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(LeaderboardFile::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, file: &LeaderboardFile) -> LeaderboardResult<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(file)?)?;
        Ok(())
    }

    /// Record a completed match under its day and week, applying the
    /// per-bucket caps and pruning expired buckets.
    pub fn record(&self, summary: &MatchSummary) -> LeaderboardResult<()> {
        let mut file = self.load()?;
        let at = summary.finished_at;

        let daily = file.daily.entry(day_key(at)).or_default();
        daily.push(summary.clone());
        cap_bucket(daily, DAILY_CAP);

        let weekly = file.weekly.entry(week_key(at)).or_default();
        weekly.push(summary.clone());
        cap_bucket(weekly, WEEKLY_CAP);

        prune(&mut file.daily, DAILY_KEEP);
        prune(&mut file.weekly, WEEKLY_KEEP);

        self.save(&file)?;
        tracing::info!(
            path = %self.path.display(),
            winner = summary.winner.as_deref().unwrap_or("draw"),
            "match recorded to leaderboard"
        );
        Ok(())
    }

    /// Today's matches ranked by their top score.
    pub fn daily_top(&self, now: DateTime<Utc>) -> LeaderboardResult<Vec<MatchSummary>> {
        let file = self.load()?;
        Ok(ranked(file.daily.get(&day_key(now)), DAILY_TOP))
    }

    /// This ISO week's matches ranked by their top score.
    pub fn weekly_top(&self, now: DateTime<Utc>) -> LeaderboardResult<Vec<MatchSummary>> {
        let file = self.load()?;
        Ok(ranked(file.weekly.get(&week_key(now)), WEEKLY_TOP))
    }
}

/// Keep only the most recent `cap` entries of a bucket.
fn cap_bucket(bucket: &mut Vec<MatchSummary>, cap: usize) {
    if bucket.len() > cap {
        bucket.drain(..bucket.len() - cap);
    }
}

/// Keep only the newest `keep` buckets. Both key formats sort
/// chronologically as strings.
fn prune(buckets: &mut BTreeMap<String, Vec<MatchSummary>>, keep: usize) {
    while buckets.len() > keep {
        let oldest = match buckets.keys().next().cloned() {
            Some(key) => key,
            None => break,
        };
        buckets.remove(&oldest);
    }
}

fn ranked(bucket: Option<&Vec<MatchSummary>>, top: usize) -> Vec<MatchSummary> {
    let mut games = bucket.cloned().unwrap_or_default();
    games.sort_by(|a, b| b.top_score().cmp(&a.top_score()));
    games.truncate(top);
    games
}
