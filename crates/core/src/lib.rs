//! Session controller for a role-adaptive AI interview.
//!
//! An [`Interviewer`] opens a session, classifies every candidate turn through
//! a [`LanguageModel`], and hands the finished transcript to the evaluator
//! exactly once. Session state lives with the caller and is passed in and out
//! on every call.

pub mod classifier;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod gemini;
mod http;
pub mod interviewer;
pub mod model;
pub mod openai;
pub mod prompts;
pub mod provider;
pub mod session_state;
pub mod speech;

pub use decision::{Action, Decision, Resolution};
pub use error::{GenerationError, InterviewError};
pub use evaluator::{Recommendation, Report, ReportStatus};
pub use interviewer::{Advance, Interviewer, Stage};
pub use model::{Completion, LanguageModel, ModelSettings};
pub use provider::Provider;
pub use session_state::{
    COMPLETION_SENTINEL, InterviewState, Speaker, StateParts, Turn, strip_sentinel,
};
pub use speech::{SpeechSynthesizer, Transcriber, VoiceInterviewer, VoiceReply};
