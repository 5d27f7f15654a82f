use crate::decision::{Decision, Resolution, apply_policy};
use crate::error::InterviewError;
use crate::model::{Completion, LanguageModel};
use crate::prompts::PromptSet;
use crate::session_state::InterviewState;

/// Interviewer turn used when the decision call fails.
pub const REPEAT_REQUEST: &str =
    "I apologize, I missed that. Could you please repeat your last statement?";

/// Asks the model to classify the candidate's latest turn and applies the result.
///
/// On success the interviewer's reply is appended and `progress` moves by the
/// policy. If the call fails or its reply cannot be parsed, only the canned
/// repeat request is appended and `progress` is left alone.
pub(crate) async fn classify_turn(
    model: &dyn LanguageModel,
    prompts: &PromptSet,
    state: &mut InterviewState,
) -> Result<Resolution, InterviewError> {
    let question = state.question_index()?;

    let request = Completion::decision(prompts.interviewer(
        state.role(),
        state.context(),
        question,
    ))
    .with_transcript(state.transcript());

    let decision = match model
        .complete(&request)
        .await
        .and_then(|raw| Decision::parse(&raw))
    {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(
                error = %e,
                question = question.get(),
                "decision call failed; asking the candidate to repeat"
            );
            state.push_interviewer(REPEAT_REQUEST);
            return Ok(Resolution::Recovered);
        }
    };

    tracing::debug!(question = question.get(), action = ?decision.action, "model decision received");

    let outcome = apply_policy(decision, question);
    state.set_progress(outcome.progress);
    state.push_interviewer(outcome.text);

    tracing::info!(
        question = question.get(),
        action = ?outcome.action,
        progress = outcome.progress,
        terminal = outcome.terminal,
        "candidate turn classified"
    );

    Ok(Resolution::Applied {
        action: outcome.action,
        terminal: outcome.terminal,
    })
}
