//! A single participant's active game session.
//!
//! The session is a pure state machine over graded answers. Timing authority
//! lives in the session manager; the session only tracks how much budget it
//! was given and when it started, so the manager can re-arm expiry timers
//! when the adaptive variant earns extra seconds.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::problems::{self, GameKind, Grade, Problem};
use crate::store::ParticipantId;

/// Tunable rules for the game variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub twenty_four_duration: Duration,
    pub addition_duration: Duration,
    pub quiz_duration: Duration,
    pub adaptive_initial_duration: Duration,
    pub quiz_lives: u32,
    pub adaptive_lives: u32,
    pub quiz_steps: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            twenty_four_duration: Duration::from_secs(60),
            addition_duration: Duration::from_secs(30),
            quiz_duration: Duration::from_secs(600),
            adaptive_initial_duration: Duration::from_secs(30),
            quiz_lives: 3,
            adaptive_lives: 3,
            quiz_steps: 30,
        }
    }
}

impl GameConfig {
    /// Time budget a fresh session of `kind` starts with.
    pub fn initial_budget(&self, kind: GameKind) -> Duration {
        match kind {
            GameKind::TwentyFour => self.twenty_four_duration,
            GameKind::Addition => self.addition_duration,
            GameKind::Quiz => self.quiz_duration,
            GameKind::Adaptive => self.adaptive_initial_duration,
        }
    }

    /// Lives a fresh session of `kind` starts with, `None` for variants that
    /// only end on the clock.
    pub fn initial_lives(&self, kind: GameKind) -> Option<u32> {
        match kind {
            GameKind::TwentyFour | GameKind::Addition => None,
            GameKind::Quiz => Some(self.quiz_lives),
            GameKind::Adaptive => Some(self.adaptive_lives),
        }
    }
}

/// What a single submission did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Scored; `earned` is the adaptive time bonus, if any.
    Correct {
        points: i64,
        score: i64,
        earned: Option<Duration>,
    },
    /// Graded wrong; session continues.
    Wrong { lives_left: Option<u32> },
    /// Lives ran out. The session is over.
    Lost { score: i64 },
    /// The quiz program was completed. The session is over.
    Finished { score: i64 },
    /// A reach-24 board was passed and replaced, nothing scored.
    Skipped,
    /// The text did not fit the expected answer shape; nothing consumed.
    Invalid { hint: &'static str },
}

/// Live state of one game.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub participant_id: ParticipantId,
    pub kind: GameKind,
    pub score: i64,
    pub lives: Option<u32>,
    pub attempts: u32,
    pub step: u32,
    pub problem: Problem,
    pub time_budget: Duration,
    pub started_at: Instant,
    /// Generation stamp consumed by expiry timers; a stale timer whose stamp
    /// no longer matches must not finalize this session.
    pub epoch: u64,
    max_steps: u32,
}

impl GameSession {
    pub fn new(
        participant_id: ParticipantId,
        kind: GameKind,
        config: &GameConfig,
        epoch: u64,
        rng: &mut impl Rng,
    ) -> Self {
        GameSession {
            participant_id,
            kind,
            score: 0,
            lives: config.initial_lives(kind),
            attempts: 0,
            step: 1,
            problem: problems::generate(kind, 1, 0, rng),
            time_budget: config.initial_budget(kind),
            started_at: Instant::now(),
            epoch,
            max_steps: config.quiz_steps,
        }
    }

    /// Applies one raw submission and advances the state machine.
    pub fn answer(&mut self, text: &str, rng: &mut impl Rng) -> Verdict {
        if self.kind == GameKind::TwentyFour && text.trim().eq_ignore_ascii_case("pass") {
            self.problem = problems::generate(self.kind, self.step, self.score, rng);
            return Verdict::Skipped;
        }
        match self.problem.grade(text) {
            Grade::Invalid => Verdict::Invalid {
                hint: self.problem.retry_hint(),
            },
            Grade::Correct => {
                self.attempts += 1;
                let points = self.problem.points;
                self.score += points;
                let earned = if self.kind == GameKind::Adaptive {
                    let bonus =
                        Duration::from_secs_f64(problems::time_bonus_secs(self.score, points));
                    self.time_budget += bonus;
                    Some(bonus)
                } else {
                    None
                };
                self.step += 1;
                if self.kind == GameKind::Quiz && self.step > self.max_steps {
                    return Verdict::Finished { score: self.score };
                }
                self.problem = problems::generate(self.kind, self.step, self.score, rng);
                Verdict::Correct {
                    points,
                    score: self.score,
                    earned,
                }
            }
            Grade::Wrong => {
                self.attempts += 1;
                if let Some(lives) = self.lives.as_mut() {
                    *lives = lives.saturating_sub(1);
                    if *lives == 0 {
                        return Verdict::Lost { score: self.score };
                    }
                }
                if self.kind != GameKind::TwentyFour {
                    // A reach-24 board stays up for another try; the other
                    // variants move on to a fresh problem.
                    self.step += 1;
                    if self.kind == GameKind::Quiz && self.step > self.max_steps {
                        return Verdict::Finished { score: self.score };
                    }
                    self.problem = problems::generate(self.kind, self.step, self.score, rng);
                }
                Verdict::Wrong {
                    lives_left: self.lives,
                }
            }
        }
    }

    /// Budget left on the clock right now.
    pub fn remaining(&self) -> Duration {
        self.time_budget.saturating_sub(self.started_at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Answer;
    use crate::solver;
    use rand::thread_rng;

    fn correct_text(problem: &Problem) -> String {
        match &problem.answer {
            Answer::Value(v) => v.to_string(),
            Answer::Factors(fs) => fs
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            Answer::Choice(c) => c.to_string(),
            Answer::Expression(nums) => {
                solver::solve(*nums).unwrap_or_else(|| "pass".to_string())
            }
        }
    }

    #[test]
    fn default_config_matches_the_game_rules() {
        let config = GameConfig::default();
        assert_eq!(config.twenty_four_duration, Duration::from_secs(60));
        assert_eq!(config.addition_duration, Duration::from_secs(30));
        assert_eq!(config.quiz_duration, Duration::from_secs(600));
        assert_eq!(config.adaptive_initial_duration, Duration::from_secs(30));
        assert_eq!(config.quiz_lives, 3);
        assert_eq!(config.adaptive_lives, 3);
        assert_eq!(config.quiz_steps, 30);
    }

    #[test]
    fn quiz_session_runs_on_the_ten_minute_clock() {
        let session =
            GameSession::new(7, GameKind::Quiz, &GameConfig::default(), 1, &mut thread_rng());
        assert_eq!(session.time_budget, Duration::from_secs(600));
        assert_eq!(session.lives, Some(3));
    }

    #[test]
    fn addition_session_scores_without_lives() {
        let mut rng = thread_rng();
        let mut session =
            GameSession::new(1, GameKind::Addition, &GameConfig::default(), 1, &mut rng);
        assert_eq!(session.lives, None);

        let reply = correct_text(&session.problem);
        match session.answer(&reply, &mut rng) {
            Verdict::Correct {
                points,
                score,
                earned,
            } => {
                assert_eq!(points, 1);
                assert_eq!(score, 1);
                assert_eq!(earned, None);
            }
            other => panic!("expected a correct verdict, got {:?}", other),
        }

        // A wrong answer costs nothing but the attempt counter.
        assert_eq!(
            session.answer("999999", &mut rng),
            Verdict::Wrong { lives_left: None }
        );
        assert_eq!(session.score, 1);
        assert_eq!(session.attempts, 2);
    }

    #[test]
    fn quiz_session_loses_after_three_wrong_answers() {
        let mut rng = thread_rng();
        let mut session = GameSession::new(1, GameKind::Quiz, &GameConfig::default(), 1, &mut rng);

        assert_eq!(
            session.answer("7", &mut rng),
            Verdict::Wrong {
                lives_left: Some(2)
            }
        );
        assert_eq!(
            session.answer("7", &mut rng),
            Verdict::Wrong {
                lives_left: Some(1)
            }
        );
        assert_eq!(session.answer("7", &mut rng), Verdict::Lost { score: 0 });
        assert_eq!(session.attempts, 3);
    }

    #[test]
    fn quiz_session_finishes_after_thirty_steps() {
        let mut rng = thread_rng();
        let mut session = GameSession::new(1, GameKind::Quiz, &GameConfig::default(), 1, &mut rng);

        for step in 1..30 {
            let reply = correct_text(&session.problem);
            match session.answer(&reply, &mut rng) {
                Verdict::Correct { .. } => {}
                other => panic!("step {} gave {:?}", step, other),
            }
        }
        let reply = correct_text(&session.problem);
        // 10 factorizations + one root sum worth 2 + 19 pool questions.
        assert_eq!(session.answer(&reply, &mut rng), Verdict::Finished { score: 31 });
    }

    #[test]
    fn invalid_submission_consumes_nothing() {
        let mut rng = thread_rng();
        let mut session = GameSession::new(1, GameKind::Quiz, &GameConfig::default(), 1, &mut rng);
        let before = session.problem.clone();

        match session.answer("what do I do", &mut rng) {
            Verdict::Invalid { hint } => assert!(!hint.is_empty()),
            other => panic!("expected invalid, got {:?}", other),
        }
        assert_eq!(session.attempts, 0);
        assert_eq!(session.lives, Some(3));
        assert_eq!(session.step, 1);
        assert_eq!(session.problem, before);
    }

    #[test]
    fn adaptive_session_earns_time_on_correct_answers() {
        let mut rng = thread_rng();
        let mut session =
            GameSession::new(1, GameKind::Adaptive, &GameConfig::default(), 1, &mut rng);
        let budget_before = session.time_budget;

        let reply = correct_text(&session.problem);
        let earned = match session.answer(&reply, &mut rng) {
            Verdict::Correct {
                earned: Some(earned),
                score: 1,
                ..
            } => earned,
            other => panic!("expected a correct adaptive verdict, got {:?}", other),
        };
        // First point: 1^0.53 / 1.6 seconds.
        assert!((earned.as_secs_f64() - 0.625).abs() < 1e-9);
        assert_eq!(session.time_budget, budget_before + earned);
    }

    #[test]
    fn adaptive_session_loses_lives_without_time_changes() {
        let mut rng = thread_rng();
        let mut session =
            GameSession::new(1, GameKind::Adaptive, &GameConfig::default(), 1, &mut rng);
        let budget_before = session.time_budget;

        assert_eq!(
            session.answer("999999999", &mut rng),
            Verdict::Wrong {
                lives_left: Some(2)
            }
        );
        assert_eq!(session.time_budget, budget_before);
    }

    #[test]
    fn twenty_four_pass_replaces_the_board_unscored() {
        let mut rng = thread_rng();
        let mut session =
            GameSession::new(1, GameKind::TwentyFour, &GameConfig::default(), 1, &mut rng);

        assert_eq!(session.answer("  PASS ", &mut rng), Verdict::Skipped);
        assert_eq!(session.score, 0);
        assert_eq!(session.attempts, 0);
        assert!(matches!(session.problem.answer, Answer::Expression(_)));
    }

    #[test]
    fn twenty_four_wrong_answer_keeps_the_board() {
        let mut rng = thread_rng();
        let mut session =
            GameSession::new(1, GameKind::TwentyFour, &GameConfig::default(), 1, &mut rng);
        let before = session.problem.clone();

        assert_eq!(
            session.answer("1+1+1+1", &mut rng),
            Verdict::Wrong { lives_left: None }
        );
        assert_eq!(session.problem, before);
        assert_eq!(session.attempts, 1);
    }

    #[test]
    fn twenty_four_solution_scores_and_deals_new_board() {
        let mut rng = thread_rng();
        // Draw until the board is solvable; most are.
        let mut session = loop {
            let candidate =
                GameSession::new(1, GameKind::TwentyFour, &GameConfig::default(), 1, &mut rng);
            let Answer::Expression(nums) = &candidate.problem.answer else {
                panic!("reach-24 should expect an expression");
            };
            if solver::solve(*nums).is_some() {
                break candidate;
            }
        };
        let before = session.problem.clone();
        let reply = correct_text(&before);

        match session.answer(&reply, &mut rng) {
            Verdict::Correct {
                points: 1, score: 1, ..
            } => {}
            other => panic!("expected a correct verdict, got {:?}", other),
        }
        assert_eq!(session.score, 1);
    }

    #[test]
    fn remaining_shrinks_from_the_initial_budget() {
        let mut rng = thread_rng();
        let session =
            GameSession::new(1, GameKind::Addition, &GameConfig::default(), 1, &mut rng);
        assert!(session.remaining() <= GameConfig::default().addition_duration);
        assert!(session.remaining() > Duration::from_secs(25));
    }
}
