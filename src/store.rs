//! Persistence seams for participants, game results and broadcast problems.
//!
//! The engine only talks to the two traits here. [`MemoryStore`] backs tests
//! and ephemeral deployments; the sqlite store behind the `server` feature
//! implements the same traits for durable state.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::problems::{GameKind, Problem};

pub type ParticipantId = i64;

/// A registered player profile with cumulative scoring state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub class_name: String,
    /// Cumulative points across everything the participant ever played.
    pub points: f64,
    /// Points inside the current monthly contest, absent until the first
    /// monthly answer lands.
    pub month_points: Option<f64>,
    /// Best finished-session score per game variant.
    pub high_scores: HashMap<GameKind, i64>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Participant {
            id,
            name: name.into(),
            class_name: class_name.into(),
            points: 0.0,
            month_points: None,
            high_scores: HashMap::new(),
        }
    }
}

/// Historical record of one finished game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: Uuid,
    pub participant_id: ParticipantId,
    pub kind: GameKind,
    pub score: i64,
    pub attempts: u32,
    pub duration_secs: f64,
    pub finished_at: DateTime<Utc>,
}

/// Rotation period a broadcast problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestCategory {
    Weekly,
    Monthly,
}

impl ContestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestCategory::Weekly => "weekly",
            ContestCategory::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ContestCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContestCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(ContestCategory::Weekly),
            "monthly" => Ok(ContestCategory::Monthly),
            other => Err(format!("unknown contest category: {}", other)),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum StoreError {
    Database(String),
    Serialization(String),
    NotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            StoreError::Database(msg) => {
                write!(f, "Error: Database operation failed: {}", msg)},
            StoreError::Serialization(msg) => {
                write!(f, "Error: Serialization failed: {}", msg)},
            StoreError::NotFound => {
                write!(f, "Error: Record not found.")},
        }
    }
}

impl Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Participant profiles, scoring fields and finished-game history.
pub trait ParticipantStore: Send + Sync {
    fn get(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError>;
    fn upsert(&self, participant: Participant) -> Result<(), StoreError>;
    fn all(&self) -> Result<Vec<Participant>, StoreError>;
    /// Adds to the cumulative point total.
    fn add_points(&self, id: ParticipantId, delta: f64) -> Result<(), StoreError>;
    /// Adds to the monthly total, creating it at zero first if absent.
    fn add_month_points(&self, id: ParticipantId, delta: f64) -> Result<(), StoreError>;
    /// Drops the monthly total entirely.
    fn clear_month_points(&self, id: ParticipantId) -> Result<(), StoreError>;
    /// Stores `score` as the high score for `kind` if it beats the current one.
    fn raise_high_score(
        &self,
        id: ParticipantId,
        kind: GameKind,
        score: i64,
    ) -> Result<(), StoreError>;
    fn record_result(&self, result: GameResult) -> Result<(), StoreError>;
    fn results(&self) -> Result<Vec<GameResult>, StoreError>;
}

/// The broadcast problem slot per contest category.
pub trait ProblemStore: Send + Sync {
    fn current(&self, category: ContestCategory) -> Result<Option<Problem>, StoreError>;
    /// Installs a new problem and forgets who solved the previous one.
    fn replace(&self, category: ContestCategory, problem: Problem) -> Result<(), StoreError>;
    /// Marks the participant as having solved the current problem. Returns
    /// `false` when they were already on the solver list (or no problem is
    /// up), so a second claim never scores.
    fn mark_solved(
        &self,
        category: ContestCategory,
        id: ParticipantId,
    ) -> Result<bool, StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct BroadcastSlot {
    problem: Problem,
    solved_by: HashSet<ParticipantId>,
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    participants: Mutex<HashMap<ParticipantId, Participant>>,
    game_results: Mutex<Vec<GameResult>>,
    broadcasts: Mutex<HashMap<ContestCategory, BroadcastSlot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn mutate<T>(
        &self,
        id: ParticipantId,
        f: impl FnOnce(&mut Participant) -> T,
    ) -> Result<T, StoreError> {
        let mut participants = self
            .participants
            .lock()
            .map_err(|_| StoreError::Database("participant map poisoned".to_string()))?;
        let participant = participants.get_mut(&id).ok_or(StoreError::NotFound)?;
        Ok(f(participant))
    }
}

impl ParticipantStore for MemoryStore {
    fn get(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let participants = self
            .participants
            .lock()
            .map_err(|_| StoreError::Database("participant map poisoned".to_string()))?;
        Ok(participants.get(&id).cloned())
    }

    fn upsert(&self, participant: Participant) -> Result<(), StoreError> {
        let mut participants = self
            .participants
            .lock()
            .map_err(|_| StoreError::Database("participant map poisoned".to_string()))?;
        participants.insert(participant.id, participant);
        Ok(())
    }

    fn all(&self) -> Result<Vec<Participant>, StoreError> {
        let participants = self
            .participants
            .lock()
            .map_err(|_| StoreError::Database("participant map poisoned".to_string()))?;
        Ok(participants.values().cloned().collect())
    }

    fn add_points(&self, id: ParticipantId, delta: f64) -> Result<(), StoreError> {
        self.mutate(id, |p| p.points += delta)
    }

    fn add_month_points(&self, id: ParticipantId, delta: f64) -> Result<(), StoreError> {
        self.mutate(id, |p| {
            p.month_points = Some(p.month_points.unwrap_or(0.0) + delta);
        })
    }

    fn clear_month_points(&self, id: ParticipantId) -> Result<(), StoreError> {
        self.mutate(id, |p| p.month_points = None)
    }

    fn raise_high_score(
        &self,
        id: ParticipantId,
        kind: GameKind,
        score: i64,
    ) -> Result<(), StoreError> {
        self.mutate(id, |p| {
            let best = p.high_scores.entry(kind).or_insert(score);
            if *best < score {
                *best = score;
            }
        })
    }

    fn record_result(&self, result: GameResult) -> Result<(), StoreError> {
        let mut game_results = self
            .game_results
            .lock()
            .map_err(|_| StoreError::Database("result log poisoned".to_string()))?;
        game_results.push(result);
        Ok(())
    }

    fn results(&self) -> Result<Vec<GameResult>, StoreError> {
        let game_results = self
            .game_results
            .lock()
            .map_err(|_| StoreError::Database("result log poisoned".to_string()))?;
        Ok(game_results.clone())
    }
}

impl ProblemStore for MemoryStore {
    fn current(&self, category: ContestCategory) -> Result<Option<Problem>, StoreError> {
        let broadcasts = self
            .broadcasts
            .lock()
            .map_err(|_| StoreError::Database("broadcast map poisoned".to_string()))?;
        Ok(broadcasts.get(&category).map(|slot| slot.problem.clone()))
    }

    fn replace(&self, category: ContestCategory, problem: Problem) -> Result<(), StoreError> {
        let mut broadcasts = self
            .broadcasts
            .lock()
            .map_err(|_| StoreError::Database("broadcast map poisoned".to_string()))?;
        broadcasts.insert(
            category,
            BroadcastSlot {
                problem,
                solved_by: HashSet::new(),
            },
        );
        Ok(())
    }

    fn mark_solved(
        &self,
        category: ContestCategory,
        id: ParticipantId,
    ) -> Result<bool, StoreError> {
        let mut broadcasts = self
            .broadcasts
            .lock()
            .map_err(|_| StoreError::Database("broadcast map poisoned".to_string()))?;
        match broadcasts.get_mut(&category) {
            Some(slot) => Ok(slot.solved_by.insert(id)),
            None => Ok(false),
        }
    }
}
