use std::net::SocketAddr;
use std::sync::Arc;

use mathquiz::http::{router, AppState};
use mathquiz::{
    ContestManager, GameConfig, MemoryStore, ParticipantStore, ProblemStore, SessionEvent,
    SessionManager, SqliteStore,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (participants, problems): (Arc<dyn ParticipantStore>, Arc<dyn ProblemStore>) =
        match std::env::var("MATHQUIZ_DB") {
            Ok(path) => {
                info!(%path, "using sqlite store");
                let store = Arc::new(SqliteStore::open(&path).expect("failed to open database"));
                (store.clone(), store)
            }
            Err(_) => {
                info!("using in-memory store (set MATHQUIZ_DB to persist)");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let sessions = SessionManager::new(participants.clone(), GameConfig::default());
    let contest = ContestManager::new(participants.clone(), problems);

    // Game-over notices go to the log; a chat transport would forward them
    // to the participant instead.
    let mut events = sessions.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::GameOver {
                    participant_id,
                    message,
                    ..
                }) => {
                    info!(participant = participant_id, %message, "game over");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = router(AppState {
        sessions,
        contest,
        participants,
    });

    let addr: SocketAddr = std::env::var("MATHQUIZ_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .expect("MATHQUIZ_ADDR must be a host:port pair");
    println!("Math quiz server listening on {}", addr);
    println!("\nAvailable endpoints:");
    println!("  GET    /                                 - API info");
    println!("  POST   /participants                     - Register a participant");
    println!("  POST   /games                            - Start a game");
    println!("  GET    /games/{{participant_id}}           - Current problem");
    println!("  POST   /games/{{participant_id}}/answer    - Submit an answer");
    println!("  DELETE /games/{{participant_id}}           - Cancel the active game");
    println!("  GET    /leaderboard/{{scope}}              - month, all or a game name");
    println!("  POST   /contest/{{category}}/announce      - Post a contest problem");
    println!("  POST   /contest/{{category}}/answer        - Answer the contest problem");
    println!("  POST   /contest/settle                   - Monthly contest settlement");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
