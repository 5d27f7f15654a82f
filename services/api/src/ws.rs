use crate::error::ApiError;
use crate::routes::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use interview_core::{InterviewState, VoiceReply};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const LIVE_AUDIO_NAME: &str = "audio.webm";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Inbound {
    Audio {
        payload: String,
        job_role: String,
        #[serde(default)]
        company_context: Option<String>,
        #[serde(default)]
        interview_step: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Outbound {
    Audio {
        text: String,
        interview_step: u32,
        is_finished: bool,
        feedback: Option<String>,
        audio: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Handles WebSocket upgrade requests for live voice interviews.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

/// Runs one interview per connection. Frames are handled strictly in arrival
/// order and the session is dropped when the socket closes.
async fn handle_socket(mut socket: WebSocket, app: AppState) {
    info!("WebSocket connection established");
    let mut session: Option<InterviewState> = None;

    while let Some(msg) = socket.recv().await {
        let frame = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                // Client disconnected.
                info!("WebSocket error: {}", e);
                break;
            }
        };

        let outbound = match handle_frame(&app, &mut session, frame.as_str()).await {
            Ok(outbound) => outbound,
            Err(e) => {
                warn!(error = %e, "live voice frame rejected");
                Outbound::Error {
                    message: e.to_string(),
                }
            }
        };
        let json = match serde_json::to_string(&outbound) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode outbound frame: {}", e);
                continue;
            }
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    info!(
        finished = session.as_ref().is_some_and(InterviewState::is_finished),
        "WebSocket connection closed"
    );
}

async fn handle_frame(
    app: &AppState,
    session: &mut Option<InterviewState>,
    frame: &str,
) -> Result<Outbound, ApiError> {
    let voice = app.voice.as_ref().ok_or(ApiError::VoiceUnavailable)?;
    let Inbound::Audio {
        payload,
        job_role,
        company_context,
        interview_step,
    } = serde_json::from_str(frame)
        .map_err(|e| ApiError::Unprocessable(format!("invalid frame: {e}")))?;
    let audio = decode_audio(&payload)?;

    let state = match session {
        Some(state) => state.clone(),
        None => {
            let role = job_role.trim();
            if role.is_empty() {
                return Err(ApiError::BadRequest("job_role must not be empty".to_string()));
            }
            app.interviewer
                .start(role, company_context.as_deref().unwrap_or_default())
        }
    };
    if let Some(step) = interview_step.filter(|step| *step != state.progress()) {
        debug!(client_step = step, progress = state.progress(), "client step out of sync");
    }

    let VoiceReply {
        state,
        reply,
        audio,
        ..
    } = voice.respond(state, &audio, LIVE_AUDIO_NAME).await?;
    let outbound = Outbound::Audio {
        text: reply,
        interview_step: state.progress(),
        is_finished: state.is_finished(),
        feedback: state.report().map(|report| report.content().to_string()),
        audio: audio.map(|bytes| STANDARD.encode(bytes)),
    };
    *session = Some(state);
    Ok(outbound)
}

/// Accepts raw base64 or a `data:<mime>;base64,<data>` URL.
fn decode_audio(payload: &str) -> Result<Vec<u8>, ApiError> {
    let data = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => payload,
    };
    let audio = STANDARD
        .decode(data.trim())
        .map_err(|e| ApiError::Unprocessable(format!("audio payload is not valid base64: {e}")))?;
    if audio.is_empty() {
        return Err(ApiError::BadRequest("audio payload is empty".to_string()));
    }
    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeSynthesizer, FakeTranscriber, ScriptedModel, decision};
    use interview_core::{Interviewer, VoiceInterviewer};
    use std::sync::Arc;

    fn app_state(model: ScriptedModel, voice: bool) -> AppState {
        let interviewer = Arc::new(Interviewer::new(Arc::new(model)));
        let voice = voice.then(|| {
            Arc::new(VoiceInterviewer::new(
                interviewer.clone(),
                Arc::new(FakeTranscriber::hearing("I build data pipelines.")),
                Arc::new(FakeSynthesizer),
            ))
        });
        AppState { interviewer, voice }
    }

    fn audio_frame(payload: &str) -> String {
        serde_json::json!({
            "type": "audio",
            "payload": payload,
            "job_role": "Data Engineer",
            "company_context": "Retail",
            "interview_step": 0
        })
        .to_string()
    }

    #[test]
    fn test_decode_audio_accepts_data_urls() {
        let encoded = STANDARD.encode(b"webm");
        assert_eq!(decode_audio(&encoded).unwrap(), b"webm");
        assert_eq!(
            decode_audio(&format!("data:audio/webm;base64,{encoded}")).unwrap(),
            b"webm"
        );
        assert!(matches!(
            decode_audio("not base64!"),
            Err(ApiError::Unprocessable(_))
        ));
        assert!(matches!(decode_audio(""), Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_first_frame_opens_session_and_advances() {
        let app = app_state(
            ScriptedModel::new(vec![Ok(decision(
                "Which orchestration tools have you used?",
                "CONTINUE",
            ))]),
            true,
        );
        let mut session = None;

        let outbound = handle_frame(&app, &mut session, &audio_frame(&STANDARD.encode(b"webm")))
            .await
            .unwrap();

        let json = serde_json::to_value(&outbound).unwrap();
        assert_eq!(json["type"], "audio");
        assert_eq!(json["text"], "Which orchestration tools have you used?");
        assert_eq!(json["interview_step"], 1);
        assert_eq!(json["is_finished"], false);
        assert!(json["audio"].is_string());

        let state = session.expect("session kept for the connection");
        assert_eq!(state.context(), "Retail");
        assert_eq!(state.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_bad_frame_leaves_session_untouched() {
        let app = app_state(ScriptedModel::new(vec![]), true);
        let mut session = None;

        let err = handle_frame(&app, &mut session, &audio_frame("%%%"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));

        let err = handle_frame(&app, &mut session, r#"{"type":"text","payload":"hi"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_frames_rejected_without_voice_services() {
        let app = app_state(ScriptedModel::new(vec![]), false);
        let mut session = None;

        let err = handle_frame(&app, &mut session, &audio_frame(&STANDARD.encode(b"webm")))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::VoiceUnavailable));
        let error = Outbound::Error {
            message: err.to_string(),
        };
        assert_eq!(serde_json::to_value(&error).unwrap()["type"], "error");
    }
}
