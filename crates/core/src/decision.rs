use crate::error::GenerationError;
use crate::session_state::{COMPLETION_SENTINEL, QuestionIndex, strip_sentinel};
use serde::{Deserialize, Serialize};

/// How the interviewer reacts to the candidate's latest turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// The answer is accepted, whatever its quality; move to the next question.
    Continue,
    /// The candidate needs the current question explained again.
    Clarify,
    /// The final question was answered; close the interview.
    End,
}

/// Structured reply required from the model on every candidate turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub response_text: String,
    pub action: Action,
}

impl Decision {
    /// Parses a decision out of the model's raw reply.
    ///
    /// Providers are asked for schema-constrained JSON, but some still wrap the
    /// object in a code fence or a sentence. The outermost `{...}` span is taken;
    /// a reply without one, or with an empty `response_text`, is rejected.
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
            return Err(GenerationError::MalformedDecision(
                "reply contains no JSON object".to_string(),
            ));
        };
        if end < start {
            return Err(GenerationError::MalformedDecision(
                "reply contains no JSON object".to_string(),
            ));
        }

        let decision: Decision = serde_json::from_str(&raw[start..=end])
            .map_err(|e| GenerationError::MalformedDecision(e.to_string()))?;

        if decision.response_text.trim().is_empty() {
            return Err(GenerationError::MalformedDecision(
                "response_text is empty".to_string(),
            ));
        }
        Ok(decision)
    }
}

/// JSON schema of [`Decision`] in the form chat-completion providers accept.
pub fn decision_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "response_text": {
                "type": "string",
                "description": "The next message to say to the candidate."
            },
            "action": {
                "type": "string",
                "enum": ["CONTINUE", "CLARIFY", "END"],
                "description": "CONTINUE: the candidate answered (even wrongly, briefly, or with 'I don't know'); move to the next question. CLARIFY: the candidate did not understand, asked for a repeat, or asked a clarifying question; do not move on. END: the final question was answered."
            }
        },
        "required": ["response_text", "action"],
        "additionalProperties": false
    })
}

/// What the turn classifier did with the candidate's latest turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The model's decision was applied.
    Applied { action: Action, terminal: bool },
    /// The model call failed; the candidate was asked to repeat themselves.
    Recovered,
}

impl Resolution {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Resolution::Applied { terminal: true, .. })
    }
}

/// Result of running a decision through the progress policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub action: Action,
    pub progress: u32,
    pub text: String,
    pub terminal: bool,
}

/// Applies a decision to the question currently being answered.
///
/// `END` is honoured only on the final question; earlier it is treated as
/// `CONTINUE`. Once progress reaches the total the sentinel is appended even
/// if the model chose `CONTINUE`, and a sentinel the model produced on a
/// non-terminal turn is removed.
pub fn apply_policy(decision: Decision, question: QuestionIndex) -> PolicyOutcome {
    let before = question.get() - 1;

    let action = match decision.action {
        Action::End if !question.is_final() => {
            tracing::warn!(
                question = question.get(),
                total = question.total(),
                "model ended the interview before the final question; treating as CONTINUE"
            );
            Action::Continue
        }
        action => action,
    };

    let progress = match action {
        Action::Clarify => before,
        Action::Continue | Action::End => before + 1,
    };
    let terminal = progress >= question.total();

    if terminal && action != Action::End {
        tracing::warn!(
            question = question.get(),
            ?action,
            "final question answered without END; closing the interview"
        );
    }

    let mut text = strip_sentinel(&decision.response_text);
    if terminal {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(COMPLETION_SENTINEL);
    }

    PolicyOutcome {
        action,
        progress,
        text,
        terminal,
    }
}
