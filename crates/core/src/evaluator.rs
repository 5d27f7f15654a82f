use crate::error::GenerationError;
use crate::model::{Completion, LanguageModel, MessageRole};
use crate::prompts::PromptSet;
use crate::session_state::{InterviewState, Turn};
use serde::{Deserialize, Serialize};

pub const EMPTY_REPORT: &str = "Report generated but content was empty.";

const TRANSCRIPT_START: &str = "--- INTERVIEW TRANSCRIPT START ---";
const TRANSCRIPT_END: &str = "--- INTERVIEW TRANSCRIPT END ---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Generated,
    Empty,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongHire,
    Hire,
    WeakHire,
    NoHire,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongHire => "Strong Hire",
            Recommendation::Hire => "Hire",
            Recommendation::WeakHire => "Weak Hire",
            Recommendation::NoHire => "No Hire",
        }
    }

    /// Picks the single recommendation named in `text`, if exactly one is.
    fn find_in(text: &str) -> Option<Self> {
        let upper = text.to_uppercase();
        let mut found = Vec::new();
        let mut rest = upper.clone();
        for (phrase, rec) in [
            ("STRONG HIRE", Recommendation::StrongHire),
            ("WEAK HIRE", Recommendation::WeakHire),
            ("NO HIRE", Recommendation::NoHire),
        ] {
            if rest.contains(phrase) {
                found.push(rec);
                rest = rest.replace(phrase, "");
            }
        }
        if rest.contains("HIRE") {
            found.push(Recommendation::Hire);
        }
        match found.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// The evaluator's assessment. The text is kept as the model wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    content: String,
    status: ReportStatus,
}

impl Report {
    pub fn generated(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: ReportStatus::Generated,
        }
    }

    pub fn empty() -> Self {
        Self {
            content: EMPTY_REPORT.to_string(),
            status: ReportStatus::Empty,
        }
    }

    pub fn failed(error: &GenerationError) -> Self {
        Self {
            content: format!("Report generation failed. Error: {error}"),
            status: ReportStatus::Failed,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    /// Best-effort read of the "Overall Score" section.
    pub fn score(&self) -> Option<u8> {
        let rest = self.section("overall score")?.replace("0-100", "");
        let digits: String = rest
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u8>().ok().filter(|score| *score <= 100)
    }

    /// Best-effort read of the "Hiring Recommendation" section.
    pub fn recommendation(&self) -> Option<Recommendation> {
        let mut lines = self.content.lines();
        while let Some(line) = lines.next() {
            let lower = line.to_ascii_lowercase();
            if let Some(pos) = lower.find("hiring recommendation") {
                let rest = &line[pos + "hiring recommendation".len()..];
                return Recommendation::find_in(rest).or_else(|| {
                    lines
                        .find(|l| !l.trim().is_empty())
                        .and_then(Recommendation::find_in)
                });
            }
        }
        None
    }

    fn section(&self, heading: &str) -> Option<String> {
        self.content.lines().find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower
                .find(heading)
                .map(|pos| line[pos + heading.len()..].to_string())
        })
    }
}

/// Renders the transcript as a speaker-labelled document for the evaluator.
pub fn transcript_document(transcript: &[Turn]) -> String {
    let mut doc = String::from(TRANSCRIPT_START);
    doc.push('\n');
    for turn in transcript {
        doc.push_str(turn.speaker.label());
        doc.push_str(": ");
        doc.push_str(&turn.display_text());
        doc.push('\n');
    }
    doc.push_str(TRANSCRIPT_END);
    doc
}

/// Produces the hiring assessment for a session whose questions are finished.
///
/// Never fails: an empty reply or a failed call is turned into a placeholder
/// report so the session can still reach its terminal state.
pub async fn evaluate(
    model: &dyn LanguageModel,
    prompts: &PromptSet,
    state: &InterviewState,
) -> Report {
    let request = Completion::text(prompts.evaluator(state.role(), state.context())).with_message(
        MessageRole::User,
        format!(
            "Please analyze the following interview transcript:\n\n{}",
            transcript_document(state.transcript())
        ),
    );

    match model.complete(&request).await {
        Ok(text) if text.trim().is_empty() => {
            tracing::warn!(role = state.role(), "evaluator returned an empty report");
            Report::empty()
        }
        Ok(text) => {
            tracing::info!(role = state.role(), "evaluation report generated");
            Report::generated(text.trim())
        }
        Err(e) => {
            tracing::error!(error = %e, role = state.role(), "evaluation call failed");
            Report::failed(&e)
        }
    }
}
