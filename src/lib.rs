//! A timed math game engine for a class chat: four game modes played in
//! per-participant sessions, plus broadcast contest problems, cumulative
//! points and leaderboards. Sessions expire on a clock; the adaptive mode
//! buys extra time with every correct answer.
//!
//! ## Example usage
//! ```
//! use std::sync::Arc;
//!
//! use mathquiz::{
//!     GameConfig, GameKind, MemoryStore, Participant, ParticipantStore, SessionManager,
//! };
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let store = Arc::new(MemoryStore::new());
//!     store.upsert(Participant::new(1, "Ada", "101")).unwrap();
//!
//!     let manager = SessionManager::new(store.clone(), GameConfig::default());
//!     let intro = manager.start_game(1, GameKind::Addition).unwrap();
//!     assert!(intro.contains("= ?"));
//!
//!     // The sprint never ends on a wrong answer, it just moves on.
//!     let reply = manager.submit_answer(1, "-1").unwrap();
//!     assert!(reply.starts_with("Wrong!"));
//!
//!     manager.cancel_game(1);
//! });
//! ```

pub mod contest;
#[cfg(feature = "server")]
pub mod http;
pub mod problems;
mod result;
pub mod scoreboard;
pub mod session;
pub mod session_manager;
pub mod solver;
#[cfg(feature = "server")]
pub mod sqlite_store;
pub mod store;
#[cfg(feature = "server")]
pub mod validation;

pub use contest::ContestManager;
pub use problems::{Answer, GameKind, Problem, ProblemKind};
pub use result::EngineError;
pub use scoreboard::{LeaderboardRow, LeaderboardScope};
pub use session::{GameConfig, GameSession, Verdict};
pub use session_manager::{SessionEvent, SessionManager};
#[cfg(feature = "server")]
pub use sqlite_store::SqliteStore;
pub use store::{
    ContestCategory, GameResult, MemoryStore, Participant, ParticipantId, ParticipantStore,
    ProblemStore, StoreError,
};
