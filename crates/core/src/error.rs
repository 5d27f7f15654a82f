/// Failure signal from a language-generation or speech call.
///
/// Every variant is recoverable from the interview's point of view: the router
/// matches on it to choose a canned reply instead of aborting the session.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request to the model provider failed: {0}")]
    Transport(String),
    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model provider did not answer in time")]
    Timeout,
    #[error("model provider returned no content")]
    EmptyResponse,
    #[error("structured decision could not be parsed: {0}")]
    MalformedDecision(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else if let Some(status) = e.status() {
            GenerationError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

/// Invalid input rejected at the boundary of the interview controller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterviewError {
    #[error("question index {index} is outside 1..={total}")]
    QuestionIndexOutOfRange { index: i64, total: u32 },
    #[error("the interview is finished; no further turns are accepted")]
    SessionFinished,
    #[error("the last turn belongs to the interviewer; submit the candidate's answer first")]
    AwaitingCandidate,
    #[error("candidate turn is empty")]
    EmptyCandidateTurn,
    #[error("inconsistent session state: {0}")]
    InconsistentState(String),
}
