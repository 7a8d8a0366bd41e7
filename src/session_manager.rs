//! Concurrent session registry with scheduled expiry.
//!
//! One active session per participant. Starting a new game replaces the old
//! session after its timer is aborted, answers are applied under the session
//! lock, and every session carries an epoch stamp that expiry timers capture
//! when armed. A timer that fires late, after the session it was armed for
//! was replaced, rescheduled or finished, sees a mismatched epoch and does
//! nothing, so a session is finalized exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::problems::GameKind;
use crate::result::EngineError;
use crate::session::{GameConfig, GameSession, Verdict};
use crate::store::{GameResult, ParticipantId, ParticipantStore};

/// Pushed to subscribers when a session ends without the participant's own
/// submission driving it (and on every other ending too, so a transport can
/// deliver all game-over notices from one place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    GameOver {
        participant_id: ParticipantId,
        kind: GameKind,
        message: String,
    },
}

struct ExpiryTimer {
    epoch: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinishReason {
    Expired,
    Lost,
    Finished,
}

enum AfterAnswer {
    Continue(String),
    Rearm {
        text: String,
        epoch: u64,
        delay: Duration,
    },
    Terminal {
        epoch: u64,
        reason: FinishReason,
    },
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<ParticipantId, Arc<Mutex<GameSession>>>>>,
    active_timers: Arc<Mutex<HashMap<ParticipantId, ExpiryTimer>>>,
    participants: Arc<dyn ParticipantStore>,
    config: GameConfig,
    events: broadcast::Sender<SessionEvent>,
    epoch: Arc<AtomicU64>,
}

impl SessionManager {
    pub fn new(participants: Arc<dyn ParticipantStore>, config: GameConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            active_timers: Arc::new(Mutex::new(HashMap::new())),
            participants,
            config,
            events,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to game-over notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Starts a game for a registered participant, replacing any session they
    /// already had. The replaced session is discarded unscored. Returns the
    /// rules line plus the first problem.
    pub fn start_game(&self, id: ParticipantId, kind: GameKind) -> Result<String, EngineError> {
        if self.participants.get(id)?.is_none() {
            return Err(EngineError::RegistrationRequired);
        }
        // The old timer has to die before the new session becomes visible,
        // otherwise it could fire against the replacement.
        self.cancel_timer(id);
        let epoch = self.next_epoch();
        let session = GameSession::new(id, kind, &self.config, epoch, &mut thread_rng());
        let budget = session.time_budget;
        let text = start_text(&self.config, &session);
        {
            let mut sessions = self.sessions.write().map_err(|_| EngineError::Lock)?;
            sessions.insert(id, Arc::new(Mutex::new(session)));
        }
        self.arm_timer(id, epoch, budget);
        debug!(participant = id, kind = %kind, epoch, "session started");
        Ok(text)
    }

    /// Applies one answer to the participant's active session.
    ///
    /// Returns `None` when there is no active session; random chatter is not
    /// an error. Terminal verdicts finalize the session, bank the score and
    /// emit a [`SessionEvent::GameOver`].
    pub fn submit_answer(&self, id: ParticipantId, text: &str) -> Option<String> {
        let session_arc = {
            let sessions = self.sessions.read().ok()?;
            sessions.get(&id)?.clone()
        };

        let outcome = {
            let mut session = session_arc.lock().ok()?;
            let verdict = session.answer(text, &mut thread_rng());
            match &verdict {
                Verdict::Lost { .. } => AfterAnswer::Terminal {
                    epoch: session.epoch,
                    reason: FinishReason::Lost,
                },
                Verdict::Finished { .. } => AfterAnswer::Terminal {
                    epoch: session.epoch,
                    reason: FinishReason::Finished,
                },
                Verdict::Correct { earned: Some(_), .. } => {
                    // The adaptive clock moved. Stamp a fresh epoch so the
                    // old timer is stale before the new one is armed.
                    let epoch = self.next_epoch();
                    session.epoch = epoch;
                    AfterAnswer::Rearm {
                        text: feedback_text(&verdict, &session),
                        epoch,
                        delay: session.remaining(),
                    }
                }
                _ => AfterAnswer::Continue(feedback_text(&verdict, &session)),
            }
        };

        match outcome {
            AfterAnswer::Continue(text) => Some(text),
            AfterAnswer::Rearm { text, epoch, delay } => {
                self.arm_timer(id, epoch, delay);
                Some(text)
            }
            AfterAnswer::Terminal { epoch, reason } => {
                let session = self.take_session(id, epoch)?;
                Some(self.finalize(session, reason))
            }
        }
    }

    /// Cancels the participant's active session without scoring anything.
    /// Safe to call twice; the second call finds nothing and returns `None`.
    pub fn cancel_game(&self, id: ParticipantId) -> Option<String> {
        let removed = {
            let mut sessions = self.sessions.write().ok()?;
            sessions.remove(&id)
        };
        let _session = removed?;
        self.cancel_timer(id);
        debug!(participant = id, "session cancelled");
        Some("Game cancelled. Nothing was scored.".to_string())
    }

    /// The active session's current problem, if any.
    pub fn current_prompt(&self, id: ParticipantId) -> Option<String> {
        let sessions = self.sessions.read().ok()?;
        let session = sessions.get(&id)?.lock().ok()?;
        Some(session.problem.prompt.clone())
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn arm_timer(&self, id: ParticipantId, epoch: u64, delay: Duration) {
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.handle_expiry(id, epoch);
        });
        let mut timers = self.active_timers.lock().unwrap();
        if let Some(old) = timers.insert(id, ExpiryTimer { epoch, handle }) {
            old.handle.abort();
        }
    }

    fn cancel_timer(&self, id: ParticipantId) {
        let mut timers = self.active_timers.lock().unwrap();
        if let Some(timer) = timers.remove(&id) {
            timer.handle.abort();
        }
    }

    fn handle_expiry(&self, id: ParticipantId, epoch: u64) {
        {
            let mut timers = self.active_timers.lock().unwrap();
            // Only drop the bookkeeping if it is still ours; a newer timer
            // may have replaced this entry while we were firing.
            if timers.get(&id).is_some_and(|t| t.epoch == epoch) {
                timers.remove(&id);
            }
        }
        let Some(session) = self.take_session(id, epoch) else {
            // Stale fire: the session was replaced, rescheduled or already
            // finalized by a submission.
            debug!(participant = id, epoch, "expiry fired for a stale session");
            return;
        };
        self.finalize(session, FinishReason::Expired);
    }

    /// Removes and returns the session iff its epoch still matches. Holding
    /// the map write lock across the check and the removal is what makes
    /// exactly-once finalization hold when a submission and an expiry race.
    fn take_session(&self, id: ParticipantId, expected_epoch: u64) -> Option<GameSession> {
        let mut sessions = self.sessions.write().ok()?;
        let current_epoch = {
            let session = sessions.get(&id)?.lock().ok()?;
            session.epoch
        };
        if current_epoch != expected_epoch {
            return None;
        }
        let session_arc = sessions.remove(&id)?;
        drop(sessions);
        self.cancel_timer(id);
        let session = session_arc.lock().ok()?.clone();
        Some(session)
    }

    fn finalize(&self, session: GameSession, reason: FinishReason) -> String {
        let id = session.participant_id;
        let message = final_text(&session, reason);
        if let Err(err) = self.participants.add_points(id, session.score as f64) {
            warn!(participant = id, %err, "failed to bank session points");
        }
        if let Err(err) = self
            .participants
            .raise_high_score(id, session.kind, session.score)
        {
            warn!(participant = id, %err, "failed to update high score");
        }
        let result = GameResult {
            id: Uuid::new_v4(),
            participant_id: id,
            kind: session.kind,
            score: session.score,
            attempts: session.attempts,
            duration_secs: session.started_at.elapsed().as_secs_f64(),
            finished_at: Utc::now(),
        };
        if let Err(err) = self.participants.record_result(result) {
            warn!(participant = id, %err, "failed to record game result");
        }
        let event = SessionEvent::GameOver {
            participant_id: id,
            kind: session.kind,
            message: message.clone(),
        };
        // Ignore send errors (no subscribers).
        let _ = self.events.send(event);
        debug!(participant = id, kind = %session.kind, score = session.score, ?reason, "session finalized");
        message
    }
}

fn start_text(config: &GameConfig, session: &GameSession) -> String {
    let secs = session.time_budget.as_secs();
    let rules = match session.kind {
        GameKind::TwentyFour => format!(
            "Reach-24 started! You have {} seconds. Solve as many boards as you can.",
            secs
        ),
        GameKind::Addition => format!(
            "Addition sprint started! You have {} seconds. Answer as many sums as you can.",
            secs
        ),
        GameKind::Quiz => format!(
            "Quiz started! {} steps, {} lives, {} seconds on the clock.",
            config.quiz_steps, config.quiz_lives, secs
        ),
        GameKind::Adaptive => format!(
            "Adaptive arithmetic started! {} lives, {} seconds to begin with; correct answers buy more time.",
            config.adaptive_lives, secs
        ),
    };
    format!("{}\n\n{}", rules, session.problem.prompt)
}

fn feedback_text(verdict: &Verdict, session: &GameSession) -> String {
    match verdict {
        Verdict::Correct {
            points,
            score,
            earned,
        } => {
            let mut text = format!("Correct! +{} (score {}).", points, score);
            if let Some(earned) = earned {
                text.push_str(&format!(
                    " You earned {:.1} extra seconds.",
                    earned.as_secs_f64()
                ));
            }
            format!("{}\n\n{}", text, session.problem.prompt)
        }
        Verdict::Wrong { lives_left } => match (session.kind, lives_left) {
            (GameKind::TwentyFour, _) => "Not 24. Try again or send `pass`.".to_string(),
            (_, Some(lives)) => format!(
                "Wrong! Lives left: {}.\n\n{}",
                lives, session.problem.prompt
            ),
            (_, None) => format!("Wrong! Try this one:\n\n{}", session.problem.prompt),
        },
        Verdict::Skipped => format!("Skipped.\n\n{}", session.problem.prompt),
        Verdict::Invalid { hint } => format!("That does not fit the expected format. {}", hint),
        // Terminal verdicts are finalized by the manager; routing them here
        // keeps the match total.
        Verdict::Lost { .. } => final_text(session, FinishReason::Lost),
        Verdict::Finished { .. } => final_text(session, FinishReason::Finished),
    }
}

fn final_text(session: &GameSession, reason: FinishReason) -> String {
    match reason {
        FinishReason::Expired => format!("Time's up! Final score: {}.", session.score),
        FinishReason::Lost => format!("No lives left, you lost. Final score: {}.", session.score),
        FinishReason::Finished => format!("Quiz complete! Final score: {}.", session.score),
    }
}
