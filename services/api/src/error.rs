use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use interview_core::InterviewError;

/// Errors surfaced to HTTP clients as `{"detail": ...}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error(transparent)]
    Interview(#[from] InterviewError),
    #[error("voice services are not configured on this server")]
    VoiceUnavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Interview(InterviewError::SessionFinished)
            | ApiError::Interview(InterviewError::AwaitingCandidate) => StatusCode::CONFLICT,
            ApiError::Interview(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::VoiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(%status, error = %self, "request rejected");
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(InterviewError::SessionFinished).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(InterviewError::InconsistentState("bad".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::VoiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
