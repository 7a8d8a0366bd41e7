use std::collections::HashSet;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::problems::{GameKind, Problem};
use crate::store::{
    ContestCategory, GameResult, Participant, ParticipantId, ParticipantStore, ProblemStore,
    StoreError,
};

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// SQLite-backed persistence for participants, results and broadcast slots.
///
/// Rows are stored as JSON blobs keyed by their natural id, so schema changes
/// stay in the serde layer.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

#[derive(Serialize, Deserialize)]
struct SlotRow {
    problem: Problem,
    solved_by: HashSet<ParticipantId>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS game_results (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS broadcast_problems (
                category TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );",
        )?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn mutate(
        &self,
        id: ParticipantId,
        f: impl FnOnce(&mut Participant),
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT data FROM participants WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or(StoreError::NotFound)?;
        let mut participant: Participant = serde_json::from_str(&json)?;
        f(&mut participant);
        let updated = serde_json::to_string(&participant)?;
        conn.execute(
            "UPDATE participants SET data = ?2 WHERE id = ?1",
            params![id, updated],
        )?;
        Ok(())
    }
}

impl ParticipantStore for SqliteStore {
    fn get(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT data FROM participants WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn upsert(&self, participant: Participant) -> Result<(), StoreError> {
        let json = serde_json::to_string(&participant)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO participants (id, data) VALUES (?1, ?2)",
            params![participant.id, json],
        )?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<Participant>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM participants")?;
        let rows = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut participants = Vec::new();
        for row in rows {
            let json = row?;
            participants.push(serde_json::from_str(&json)?);
        }
        Ok(participants)
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
        let json = serde_json::to_string(&result)?;
        let id = result.id.to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO game_results (id, data) VALUES (?1, ?2)",
            params![id, json],
        )?;
        Ok(())
    }

    fn results(&self) -> Result<Vec<GameResult>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM game_results")?;
        let rows = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut results = Vec::new();
        for row in rows {
            let json = row?;
            results.push(serde_json::from_str(&json)?);
        }
        Ok(results)
    }
}

impl ProblemStore for SqliteStore {
    fn current(&self, category: ContestCategory) -> Result<Option<Problem>, StoreError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT data FROM broadcast_problems WHERE category = ?1",
                params![category.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => {
                let slot: SlotRow = serde_json::from_str(&json)?;
                Ok(Some(slot.problem))
            }
            None => Ok(None),
        }
    }

    fn replace(&self, category: ContestCategory, problem: Problem) -> Result<(), StoreError> {
        let slot = SlotRow {
            problem,
            solved_by: HashSet::new(),
        };
        let json = serde_json::to_string(&slot)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO broadcast_problems (category, data) VALUES (?1, ?2)",
            params![category.as_str(), json],
        )?;
        Ok(())
    }

    fn mark_solved(
        &self,
        category: ContestCategory,
        id: ParticipantId,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT data FROM broadcast_problems WHERE category = ?1",
                params![category.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(json) = json else {
            return Ok(false);
        };
        let mut slot: SlotRow = serde_json::from_str(&json)?;
        let newly = slot.solved_by.insert(id);
        if newly {
            let updated = serde_json::to_string(&slot)?;
            conn.execute(
                "UPDATE broadcast_problems SET data = ?2 WHERE category = ?1",
                params![category.as_str(), updated],
            )?;
        }
        Ok(newly)
    }
}
