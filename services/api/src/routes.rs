use crate::error::ApiError;
use crate::ws;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use interview_core::{
    InterviewError, InterviewState, Interviewer, StateParts, Turn, VoiceInterviewer,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_AUDIO_NAME: &str = "recording.webm";

/// Shared handles for every request. Holds no session data.
#[derive(Clone)]
pub struct AppState {
    pub interviewer: Arc<Interviewer>,
    /// Present only when transcription and speech services are configured.
    pub voice: Option<Arc<VoiceInterviewer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl From<WireMessage> for Turn {
    fn from(message: WireMessage) -> Self {
        match message.role {
            WireRole::User => Turn::candidate(message.content),
            WireRole::Ai => Turn::interviewer(message.content),
        }
    }
}

/// Session fields as the browser client carries them between requests.
#[derive(Debug, Default, Deserialize)]
pub struct WireSession {
    pub job_role: String,
    #[serde(default)]
    pub company_context: Option<String>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub interview_step: u32,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(flatten)]
    pub session: WireSession,
    #[serde(default)]
    pub user_input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response_text: String,
    pub interview_step: u32,
    pub is_finished: bool,
    pub feedback: Option<String>,
}

impl ChatResponse {
    fn from_state(state: &InterviewState, reply: String) -> Self {
        Self {
            response_text: reply,
            interview_step: state.progress(),
            is_finished: state.is_finished(),
            feedback: state.report().map(|report| report.content().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AudioChatResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub user_input: String,
    pub response_audio: Option<String>,
}

/// Rebuilds the session a client sent. A client with no history gets a fresh
/// session that already holds the opening question.
pub fn session_from_wire(
    interviewer: &Interviewer,
    session: WireSession,
) -> Result<InterviewState, ApiError> {
    let role = session.job_role.trim();
    if role.is_empty() {
        return Err(ApiError::BadRequest("job_role must not be empty".to_string()));
    }
    if session
        .feedback
        .as_deref()
        .is_some_and(|feedback| !feedback.trim().is_empty())
    {
        return Err(InterviewError::SessionFinished.into());
    }

    let context = session.company_context.unwrap_or_default();
    if session.messages.is_empty() && session.interview_step == 0 {
        return Ok(interviewer.start(role, &context));
    }

    Ok(InterviewState::restore(StateParts {
        role: role.to_string(),
        context,
        transcript: session.messages.into_iter().map(Turn::from).collect(),
        progress: session.interview_step,
        total_questions: interviewer.total_questions(),
        report: None,
    })?)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/chat/audio", post(chat_audio))
        .route("/ws/chat", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "active",
        "service": "adaptive-interview-agent",
    }))
}

async fn chat(
    State(app): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    let user_input = request
        .user_input
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    let fresh = request.session.messages.is_empty();
    let state = session_from_wire(&app.interviewer, request.session)?;

    let (state, reply) = match user_input {
        Some(text) => {
            let advance = app.interviewer.respond(state, &text).await?;
            (advance.state, advance.reply)
        }
        None if fresh => {
            let reply = state.last_turn().map(Turn::display_text).unwrap_or_default();
            (state, reply)
        }
        None => {
            let advance = app.interviewer.advance(state).await?;
            (advance.state, advance.reply)
        }
    };

    Ok(Json(ChatResponse::from_state(&state, reply)))
}

async fn chat_audio(
    State(app): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AudioChatResponse>, ApiError> {
    let voice = app.voice.clone().ok_or(ApiError::VoiceUnavailable)?;

    let mut audio = None;
    let mut file_name = DEFAULT_AUDIO_NAME.to_string();
    let mut session = WireSession::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                if let Some(uploaded) = field.file_name().filter(|n| !n.is_empty()) {
                    file_name = uploaded.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                audio = Some(bytes);
            }
            "job_role" => session.job_role = field_text(field).await?,
            "company_context" => session.company_context = Some(field_text(field).await?),
            "interview_step" => {
                let raw = field_text(field).await?;
                session.interview_step = raw.trim().parse().map_err(|e| {
                    ApiError::Unprocessable(format!("interview_step '{raw}' is invalid: {e}"))
                })?;
            }
            "messages" => {
                let raw = field_text(field).await?;
                session.messages = serde_json::from_str(&raw)
                    .map_err(|e| ApiError::Unprocessable(format!("messages: {e}")))?;
            }
            _ => tracing::debug!(field = %name, "ignoring unknown multipart field"),
        }
    }

    let audio = audio
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("an audio file is required".to_string()))?;
    let state = session_from_wire(&app.interviewer, session)?;

    let turn = voice.respond(state, &audio, &file_name).await?;
    Ok(Json(AudioChatResponse {
        chat: ChatResponse::from_state(&turn.state, turn.reply),
        user_input: turn.heard.unwrap_or_default(),
        response_audio: turn.audio.map(|bytes| STANDARD.encode(bytes)),
    }))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}
