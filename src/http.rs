//! Axum surface over the engine.
//!
//! The router is built here rather than in the binary so tests can drive the
//! full HTTP stack in process. Session replies use an optional message:
//! `null` means the engine had nothing to say (no active session), which is
//! not an error.

use std::sync::Arc;

use axum::extract::{Path, State as AxumState};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::contest::ContestManager;
use crate::problems::{GameKind, ProblemKind};
use crate::result::EngineError;
use crate::scoreboard::{self, LeaderboardScope};
use crate::session_manager::SessionManager;
use crate::store::{ContestCategory, Participant, ParticipantId, ParticipantStore, StoreError};
use crate::validation;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub contest: ContestManager,
    pub participants: Arc<dyn ParticipantStore>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: ParticipantId,
    pub name: String,
    pub class: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub participant_id: ParticipantId,
    pub kind: GameKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContestAnswerRequest {
    pub participant_id: ParticipantId,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnnounceRequest {
    pub kind: ProblemKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettleResponse {
    pub settled: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/participants", post(register_participant))
        .route("/games", post(start_game))
        .route("/games/{participant_id}", get(game_prompt))
        .route("/games/{participant_id}", delete(cancel_game))
        .route("/games/{participant_id}/answer", post(submit_answer))
        .route("/leaderboard/{scope}", get(leaderboard))
        .route("/contest/settle", post(settle_month))
        .route("/contest/{category}/announce", post(announce_problem))
        .route("/contest/{category}/answer", post(answer_contest))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "mathquiz",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "register": "POST /participants",
            "start_game": "POST /games",
            "current_prompt": "GET /games/{participant_id}",
            "cancel_game": "DELETE /games/{participant_id}",
            "submit_answer": "POST /games/{participant_id}/answer",
            "leaderboard": "GET /leaderboard/{scope}",
            "announce_contest": "POST /contest/{category}/announce",
            "answer_contest": "POST /contest/{category}/answer",
            "settle_month": "POST /contest/settle",
        }
    }))
}

async fn register_participant(
    AxumState(state): AxumState<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let name = validation::validate_display_name(&request.name).map_err(bad_request)?;
    let class = validation::validate_class_tag(&request.class).map_err(bad_request)?;
    // Re-registering updates the profile but keeps everything earned so far.
    let participant = match state.participants.get(request.id).map_err(store_error)? {
        Some(mut existing) => {
            existing.name = name.clone();
            existing.class_name = class.clone();
            existing
        }
        None => Participant::new(request.id, name.clone(), class.clone()),
    };
    state.participants.upsert(participant).map_err(store_error)?;
    Ok(Json(MessageResponse {
        message: format!("Welcome, {} from class {}! Pick a game to play.", name, class),
    }))
}

async fn start_game(
    AxumState(state): AxumState<AppState>,
    Json(request): Json<StartGameRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .sessions
        .start_game(request.participant_id, request.kind)
        .map(|message| Json(MessageResponse { message }))
        .map_err(engine_error)
}

async fn game_prompt(
    AxumState(state): AxumState<AppState>,
    Path(participant_id): Path<ParticipantId>,
) -> Json<ReplyResponse> {
    Json(ReplyResponse {
        message: state.sessions.current_prompt(participant_id),
    })
}

async fn submit_answer(
    AxumState(state): AxumState<AppState>,
    Path(participant_id): Path<ParticipantId>,
    Json(request): Json<AnswerRequest>,
) -> Json<ReplyResponse> {
    Json(ReplyResponse {
        message: state.sessions.submit_answer(participant_id, &request.text),
    })
}

async fn cancel_game(
    AxumState(state): AxumState<AppState>,
    Path(participant_id): Path<ParticipantId>,
) -> Json<ReplyResponse> {
    Json(ReplyResponse {
        message: state.sessions.cancel_game(participant_id),
    })
}

async fn leaderboard(
    AxumState(state): AxumState<AppState>,
    Path(scope): Path<String>,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let scope: LeaderboardScope = scope.parse().map_err(bad_request)?;
    scoreboard::leaderboard_text(state.participants.as_ref(), scope).map_err(store_error)
}

async fn announce_problem(
    AxumState(state): AxumState<AppState>,
    Path(category): Path<String>,
    Json(request): Json<AnnounceRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let category: ContestCategory = category.parse().map_err(bad_request)?;
    state
        .contest
        .announce(category, request.kind)
        .map(|message| Json(MessageResponse { message }))
        .map_err(store_error)
}

async fn answer_contest(
    AxumState(state): AxumState<AppState>,
    Path(category): Path<String>,
    Json(request): Json<ContestAnswerRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let category: ContestCategory = category.parse().map_err(bad_request)?;
    state
        .contest
        .submit(category, request.participant_id, &request.text)
        .map(|message| Json(MessageResponse { message }))
        .map_err(engine_error)
}

async fn settle_month(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<SettleResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .contest
        .settle_month()
        .map(|settled| Json(SettleResponse { settled }))
        .map_err(store_error)
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

fn store_error(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn engine_error(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        EngineError::RegistrationRequired => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
