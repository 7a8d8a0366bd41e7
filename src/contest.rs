//! Weekly and monthly broadcast contests.
//!
//! One problem at a time sits in each category's slot. Announcing replaces
//! the slot and forgets who solved the previous problem; each participant can
//! claim points for a given problem once. Weekly solves pay into the
//! cumulative total, monthly solves pay into the month total that the
//! settlement pass later converts.

use std::sync::Arc;

use rand::thread_rng;
use tracing::info;

use crate::problems::{self, Grade, ProblemKind};
use crate::result::EngineError;
use crate::scoreboard;
use crate::store::{ContestCategory, ParticipantId, ParticipantStore, ProblemStore, StoreError};

/// Reply for answers that arrive while no broadcast problem is up.
pub const NO_CURRENT_PROBLEM: &str =
    "No broadcast problem is up right now. Wait for the next announcement!";

#[derive(Clone)]
pub struct ContestManager {
    participants: Arc<dyn ParticipantStore>,
    problems: Arc<dyn ProblemStore>,
}

impl ContestManager {
    pub fn new(participants: Arc<dyn ParticipantStore>, problems: Arc<dyn ProblemStore>) -> Self {
        ContestManager {
            participants,
            problems,
        }
    }

    /// Generates a fresh problem for the category and installs it, returning
    /// the announcement text.
    pub fn announce(
        &self,
        category: ContestCategory,
        kind: ProblemKind,
    ) -> Result<String, StoreError> {
        let problem = problems::broadcast(kind, &mut thread_rng());
        self.problems.replace(category, problem.clone())?;
        info!(category = %category, kind = ?kind, points = problem.points, "broadcast problem announced");
        Ok(problem.prompt)
    }

    /// Grades one participant's answer to the current broadcast problem.
    pub fn submit(
        &self,
        category: ContestCategory,
        id: ParticipantId,
        text: &str,
    ) -> Result<String, EngineError> {
        if self.participants.get(id)?.is_none() {
            return Err(EngineError::RegistrationRequired);
        }
        let Some(problem) = self.problems.current(category)? else {
            return Ok(NO_CURRENT_PROBLEM.to_string());
        };
        match problem.grade(text) {
            Grade::Invalid => Ok(format!(
                "That does not look like an answer. {}",
                problem.retry_hint()
            )),
            Grade::Wrong => Ok("Not quite. Try again!".to_string()),
            Grade::Correct => {
                if !self.problems.mark_solved(category, id)? {
                    return Ok("You already solved this one. Wait for the next problem!".to_string());
                }
                let points = problem.points as f64;
                match category {
                    ContestCategory::Weekly => self.participants.add_points(id, points)?,
                    ContestCategory::Monthly => self.participants.add_month_points(id, points)?,
                }
                info!(category = %category, participant = id, points, "broadcast problem solved");
                Ok(format!("Correct! You earned {} point(s).", problem.points))
            }
        }
    }

    /// Converts month totals into cumulative points, scaled against the best
    /// month, and resets the month. Returns how many participants settled.
    pub fn settle_month(&self) -> Result<usize, StoreError> {
        let settled = scoreboard::settle_month(self.participants.as_ref())?;
        info!(settled, "monthly contest settled");
        Ok(settled)
    }
}
