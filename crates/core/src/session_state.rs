use crate::error::InterviewError;
use crate::evaluator::Report;
use serde::{Deserialize, Serialize};

/// Number of questions asked when a session does not say otherwise.
pub const DEFAULT_TOTAL_QUESTIONS: u32 = 4;
/// Industry context used when the caller leaves it blank.
pub const DEFAULT_CONTEXT: &str = "General Tech";
/// Out-of-band marker appended to the interviewer's closing remark.
pub const COMPLETION_SENTINEL: &str = "INTERVIEW_FINISHED";

/// Removes the completion sentinel so the text can be shown to a person.
pub fn strip_sentinel(text: &str) -> String {
    text.replace(COMPLETION_SENTINEL, "").trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

impl Speaker {
    /// Label used when the transcript is rendered as a document.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Interviewer => "Interviewer",
            Speaker::Candidate => "Candidate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: String,
}

impl Turn {
    pub fn interviewer(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Interviewer,
            content: content.into(),
        }
    }

    pub fn candidate(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Candidate,
            content: content.into(),
        }
    }

    pub fn has_sentinel(&self) -> bool {
        self.content.contains(COMPLETION_SENTINEL)
    }

    pub fn display_text(&self) -> String {
        strip_sentinel(&self.content)
    }
}

/// A validated, 1-based question number within `1..=total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionIndex {
    index: u32,
    total: u32,
}

impl QuestionIndex {
    pub fn new(index: i64, total: u32) -> Result<Self, InterviewError> {
        match u32::try_from(index) {
            Ok(i) if (1..=total).contains(&i) => Ok(Self { index: i, total }),
            _ => Err(InterviewError::QuestionIndexOutOfRange { index, total }),
        }
    }

    pub fn get(&self) -> u32 {
        self.index
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_final(&self) -> bool {
        self.index == self.total
    }
}

/// Transport-facing fields of a session, validated by [`InterviewState::restore`].
#[derive(Debug, Clone, Deserialize)]
pub struct StateParts {
    pub role: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub transcript: Vec<Turn>,
    #[serde(default)]
    pub progress: u32,
    #[serde(default = "default_total_questions")]
    pub total_questions: u32,
    #[serde(default)]
    pub report: Option<Report>,
}

fn default_total_questions() -> u32 {
    DEFAULT_TOTAL_QUESTIONS
}

/// The full state of one interview, handed in and returned on every call.
///
/// Fields are private: the transcript only grows, `progress` only moves
/// forward through the decision policy, and `report` is written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StateParts")]
pub struct InterviewState {
    role: String,
    context: String,
    transcript: Vec<Turn>,
    progress: u32,
    total_questions: u32,
    report: Option<Report>,
}

impl TryFrom<StateParts> for InterviewState {
    type Error = InterviewError;

    fn try_from(parts: StateParts) -> Result<Self, Self::Error> {
        Self::restore(parts)
    }
}

impl InterviewState {
    pub(crate) fn new(role: &str, context: &str, total_questions: u32) -> Self {
        Self {
            role: role.to_string(),
            context: normalize_context(context),
            transcript: Vec::new(),
            progress: 0,
            total_questions,
            report: None,
        }
    }

    /// Rebuilds a session from the fields a transport carried across requests.
    pub fn restore(parts: StateParts) -> Result<Self, InterviewError> {
        if parts.total_questions == 0 {
            return Err(InterviewError::InconsistentState(
                "total_questions must be at least 1".to_string(),
            ));
        }
        if parts.progress > parts.total_questions {
            return Err(InterviewError::InconsistentState(format!(
                "progress {} exceeds the {} planned questions",
                parts.progress, parts.total_questions
            )));
        }
        if parts.transcript.is_empty() && (parts.progress > 0 || parts.report.is_some()) {
            return Err(InterviewError::InconsistentState(
                "an empty transcript must start from progress 0".to_string(),
            ));
        }
        if parts.report.is_some() && parts.progress < parts.total_questions {
            return Err(InterviewError::InconsistentState(
                "a report is present but the questions are not finished".to_string(),
            ));
        }

        Ok(Self {
            role: parts.role,
            context: normalize_context(&parts.context),
            transcript: parts.transcript,
            progress: parts.progress,
            total_questions: parts.total_questions,
            report: parts.report,
        })
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.report.is_some()
    }

    /// True once every planned question has been answered, whether or not the
    /// report made it back from the client.
    pub fn is_closed(&self) -> bool {
        self.is_finished() || self.progress >= self.total_questions
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.transcript.last()
    }

    /// The question the candidate is currently answering.
    pub fn question_index(&self) -> Result<QuestionIndex, InterviewError> {
        QuestionIndex::new(i64::from(self.progress) + 1, self.total_questions)
    }

    /// Appends the candidate's answer. Blank answers and finished sessions are rejected.
    pub fn append_candidate(&mut self, text: &str) -> Result<(), InterviewError> {
        if self.is_closed() {
            return Err(InterviewError::SessionFinished);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(InterviewError::EmptyCandidateTurn);
        }
        self.transcript.push(Turn::candidate(text));
        Ok(())
    }

    pub(crate) fn push_interviewer(&mut self, text: impl Into<String>) {
        self.transcript.push(Turn::interviewer(text));
    }

    pub(crate) fn set_progress(&mut self, progress: u32) {
        debug_assert!(progress == self.progress || progress == self.progress + 1);
        self.progress = progress;
    }

    pub(crate) fn set_report(&mut self, report: Report) -> Result<(), InterviewError> {
        if self.report.is_some() {
            return Err(InterviewError::SessionFinished);
        }
        self.report = Some(report);
        Ok(())
    }
}

fn normalize_context(context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        DEFAULT_CONTEXT.to_string()
    } else {
        context.to_string()
    }
}
