use crate::classifier;
use crate::decision::Resolution;
use crate::error::InterviewError;
use crate::evaluator::{self, Report};
use crate::model::LanguageModel;
use crate::prompts::{PromptSet, opening_line};
use crate::session_state::{DEFAULT_TOTAL_QUESTIONS, InterviewState, Speaker, Turn};
use std::sync::Arc;

/// Which stage the router ran for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The transcript was empty; the opening question was produced.
    Opened,
    /// The candidate's turn was classified and the interview goes on.
    Asked(Resolution),
    /// The final question was answered and the report was produced in the same call.
    Concluded(Resolution),
}

/// The state after one call, plus what the candidate should see.
#[derive(Debug, Clone)]
pub struct Advance {
    pub state: InterviewState,
    pub stage: Stage,
    /// Latest interviewer text with the completion sentinel removed.
    pub reply: String,
}

impl Advance {
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn report(&self) -> Option<&Report> {
        self.state.report()
    }
}

/// Routes a session to the initializer, the turn classifier, or the evaluator.
///
/// Holds no per-session data: every call takes the whole [`InterviewState`] and
/// returns the updated one, so a single `Interviewer` can serve any number of
/// sessions concurrently. Callers must not submit two turns of the same
/// session at once.
pub struct Interviewer {
    model: Arc<dyn LanguageModel>,
    prompts: PromptSet,
    total_questions: u32,
}

impl Interviewer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompts: PromptSet::default(),
            total_questions: DEFAULT_TOTAL_QUESTIONS,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_total_questions(mut self, total_questions: u32) -> Result<Self, InterviewError> {
        if total_questions == 0 {
            return Err(InterviewError::InconsistentState(
                "total_questions must be at least 1".to_string(),
            ));
        }
        self.total_questions = total_questions;
        Ok(self)
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Creates a session and asks the opening question. No model call is made.
    pub fn start(&self, role: &str, context: &str) -> InterviewState {
        let mut state = InterviewState::new(role, context, self.total_questions);
        open(&mut state);
        state
    }

    /// Appends the candidate's answer and advances the session.
    pub async fn respond(
        &self,
        mut state: InterviewState,
        candidate_text: &str,
    ) -> Result<Advance, InterviewError> {
        state.append_candidate(candidate_text)?;
        self.advance(state).await
    }

    /// Runs the next stage for `state`.
    ///
    /// A session whose questions are all answered is rejected without touching
    /// the model, even when its report was not sent back. An empty
    /// transcript gets the opening question. Otherwise the last turn must be
    /// the candidate's; it is classified, and when that ends the question phase
    /// the evaluator runs before returning.
    pub async fn advance(&self, mut state: InterviewState) -> Result<Advance, InterviewError> {
        if state.is_closed() {
            return Err(InterviewError::SessionFinished);
        }

        let Some(last) = state.last_turn() else {
            open(&mut state);
            let reply = latest_reply(&state);
            return Ok(Advance {
                state,
                stage: Stage::Opened,
                reply,
            });
        };
        if last.speaker != Speaker::Candidate {
            return Err(InterviewError::AwaitingCandidate);
        }

        let resolution =
            classifier::classify_turn(self.model.as_ref(), &self.prompts, &mut state).await?;
        let reply = latest_reply(&state);

        if !resolution.is_terminal() {
            return Ok(Advance {
                state,
                stage: Stage::Asked(resolution),
                reply,
            });
        }

        tracing::info!(
            role = state.role(),
            turns = state.transcript().len(),
            "question phase finished; evaluating"
        );
        let report = evaluator::evaluate(self.model.as_ref(), &self.prompts, &state).await;
        state.set_report(report)?;

        Ok(Advance {
            state,
            stage: Stage::Concluded(resolution),
            reply,
        })
    }
}

fn open(state: &mut InterviewState) {
    let line = opening_line(state.role(), state.context());
    state.push_interviewer(line);
    tracing::info!(role = state.role(), context = state.context(), "interview opened");
}

fn latest_reply(state: &InterviewState) -> String {
    state.last_turn().map(Turn::display_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::REPEAT_REQUEST;
    use crate::decision::Action;
    use crate::error::GenerationError;
    use crate::evaluator::{Recommendation, ReportStatus};
    use crate::model::{MockLanguageModel, ResponseFormat};
    use crate::session_state::{COMPLETION_SENTINEL, StateParts};

    const REPORT: &str = "1. **Overall Score:** 74\n\
        2. **Key Strengths:** ownership, clarity\n\
        3. **Areas for Improvement:** testing, depth\n\
        4. **Hiring Recommendation:** Weak Hire\n\
        5. **Brief Feedback:** Promising.";

    fn decision_json(action: &str, text: &str) -> String {
        serde_json::json!({ "response_text": text, "action": action }).to_string()
    }

    fn state_at(progress: u32) -> InterviewState {
        let mut transcript = vec![Turn::interviewer("Hello! Please introduce yourself.")];
        for q in 0..progress {
            transcript.push(Turn::candidate(format!("answer {q}")));
            transcript.push(Turn::interviewer(format!("Question {}?", q + 2)));
        }
        InterviewState::restore(StateParts {
            role: "Backend Engineer".to_string(),
            context: "FinTech".to_string(),
            transcript,
            progress,
            total_questions: 4,
            report: None,
        })
        .unwrap()
    }

    fn interviewer(model: MockLanguageModel) -> Interviewer {
        Interviewer::new(Arc::new(model))
    }

    #[test]
    fn test_start_opens_session() {
        let state = interviewer(MockLanguageModel::new()).start("Backend Engineer", "");

        assert_eq!(state.progress(), 0);
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.transcript()[0].speaker, Speaker::Interviewer);
        assert!(state.transcript()[0].content.contains("Backend Engineer position"));
        assert!(state.transcript()[0].content.contains("General Tech"));
        assert!(state.report().is_none());
    }

    #[tokio::test]
    async fn test_empty_transcript_routes_to_initializer() {
        let state = InterviewState::restore(StateParts {
            role: "Designer".to_string(),
            context: "Retail".to_string(),
            transcript: vec![],
            progress: 0,
            total_questions: 4,
            report: None,
        })
        .unwrap();

        // No expectations: any model call would panic.
        let advance = interviewer(MockLanguageModel::new())
            .advance(state)
            .await
            .unwrap();

        assert_eq!(advance.stage, Stage::Opened);
        assert_eq!(advance.state.transcript().len(), 1);
        assert!(advance.reply.contains("Designer position at our Retail company"));
    }

    #[tokio::test]
    async fn test_continue_advances_progress() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|request| {
                request.format == ResponseFormat::Decision
                    && request.system.contains("You have just asked Question 1 of 4.")
                    && request.messages.last().map(|m| m.content.as_str())
                        == Some("I have five years of Go and Rust.")
            })
            .times(1)
            .returning(|_| Ok(decision_json("CONTINUE", "Great. How would you design a rate limiter?")));

        let advance = interviewer(model)
            .respond(state_at(0), "I have five years of Go and Rust.")
            .await
            .unwrap();

        assert_eq!(advance.state.progress(), 1);
        assert_eq!(
            advance.stage,
            Stage::Asked(Resolution::Applied {
                action: Action::Continue,
                terminal: false
            })
        );
        assert!(!advance.reply.contains(COMPLETION_SENTINEL));
        assert_eq!(advance.state.transcript().len(), 3);
        assert!(!advance.is_finished());
    }

    #[tokio::test]
    async fn test_clarify_keeps_progress_on_final_question() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| {
                Ok(decision_json(
                    "CLARIFY",
                    "No problem. Question 4 asks how you'd handle a production outage during a release.",
                ))
            });

        let advance = interviewer(model)
            .respond(state_at(3), "I don't understand")
            .await
            .unwrap();

        assert_eq!(advance.state.progress(), 3);
        assert!(advance.reply.contains("Question 4"));
        assert!(!advance.is_finished());
        assert!(matches!(advance.stage, Stage::Asked(_)));
    }

    #[tokio::test]
    async fn test_end_on_final_question_runs_evaluator() {
        let mut model = MockLanguageModel::new();
        let mut seq = mockall::Sequence::new();
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Decision)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(decision_json("END", "Thank you for your time today. Goodbye!")));
        model
            .expect_complete()
            .withf(|request| {
                request.format == ResponseFormat::Text
                    && request.messages[0].content.contains("--- INTERVIEW TRANSCRIPT START ---")
                    && request.messages[0].content.contains("Candidate: I'd roll back first.")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(REPORT.to_string()));

        let advance = interviewer(model)
            .respond(state_at(3), "I'd roll back first.")
            .await
            .unwrap();

        assert_eq!(advance.state.progress(), 4);
        assert_eq!(
            advance.stage,
            Stage::Concluded(Resolution::Applied {
                action: Action::End,
                terminal: true
            })
        );
        let last = advance.state.last_turn().unwrap();
        assert!(last.content.ends_with(COMPLETION_SENTINEL));
        assert_eq!(advance.reply, "Thank you for your time today. Goodbye!");

        let report = advance.report().unwrap();
        assert_eq!(report.status(), ReportStatus::Generated);
        assert_eq!(report.score(), Some(74));
        assert_eq!(report.recommendation(), Some(Recommendation::WeakHire));
        for section in [
            "Overall Score",
            "Key Strengths",
            "Areas for Improvement",
            "Hiring Recommendation",
            "Brief Feedback",
        ] {
            assert!(report.content().contains(section), "missing {section}");
        }
    }

    #[tokio::test]
    async fn test_continue_on_final_question_still_concludes() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Decision)
            .returning(|_| Ok(decision_json("CONTINUE", "Thanks! Question 5: ...")));
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Text)
            .returning(|_| Err(GenerationError::Timeout));

        let advance = interviewer(model)
            .respond(state_at(3), "We used feature flags.")
            .await
            .unwrap();

        assert_eq!(advance.state.progress(), 4);
        assert!(advance.state.last_turn().unwrap().has_sentinel());
        let report = advance.report().unwrap();
        assert_eq!(report.status(), ReportStatus::Failed);
        assert!(advance.is_finished());
    }

    #[tokio::test]
    async fn test_decision_failure_keeps_progress() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_| Err(GenerationError::Timeout));

        let advance = interviewer(model)
            .respond(state_at(1), "I'd use a token bucket.")
            .await
            .unwrap();

        assert_eq!(advance.state.progress(), 1);
        assert_eq!(advance.reply, REPEAT_REQUEST);
        assert_eq!(advance.stage, Stage::Asked(Resolution::Recovered));
        assert!(!advance.is_finished());
    }

    #[tokio::test]
    async fn test_unparseable_decision_is_recovered() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("Sure! Next question: what is CAP?".to_string()));

        let advance = interviewer(model)
            .respond(state_at(2), "Eventual consistency.")
            .await
            .unwrap();

        assert_eq!(advance.state.progress(), 2);
        assert_eq!(advance.reply, REPEAT_REQUEST);
    }

    #[tokio::test]
    async fn test_finished_session_is_rejected_without_model_call() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Decision)
            .times(1)
            .returning(|_| Ok(decision_json("END", "Goodbye!")));
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Text)
            .times(1)
            .returning(|_| Ok(REPORT.to_string()));
        let interviewer = interviewer(model);

        let done = interviewer
            .respond(state_at(3), "Final answer.")
            .await
            .unwrap()
            .state;
        let report_before = done.report().cloned();

        let err = interviewer.advance(done.clone()).await.unwrap_err();
        assert_eq!(err, InterviewError::SessionFinished);
        let err = interviewer.respond(done.clone(), "Hello?").await.unwrap_err();
        assert_eq!(err, InterviewError::SessionFinished);
        assert_eq!(done.report().cloned(), report_before);
    }

    #[tokio::test]
    async fn test_answered_session_without_report_is_finished() {
        let state = state_at(4);
        assert!(!state.is_finished());
        assert!(state.is_closed());
        let interviewer = interviewer(MockLanguageModel::new());

        let err = interviewer.respond(state.clone(), "hello?").await.unwrap_err();
        assert_eq!(err, InterviewError::SessionFinished);
        let err = interviewer.advance(state).await.unwrap_err();
        assert_eq!(err, InterviewError::SessionFinished);
    }

    #[test]
    fn test_zero_questions_is_rejected() {
        let err = interviewer(MockLanguageModel::new())
            .with_total_questions(0)
            .err()
            .unwrap();
        assert!(matches!(err, InterviewError::InconsistentState(_)));

        let interviewer = interviewer(MockLanguageModel::new())
            .with_total_questions(2)
            .unwrap();
        assert_eq!(interviewer.total_questions(), 2);
        assert_eq!(interviewer.start("Chef", "").total_questions(), 2);
    }

    #[tokio::test]
    async fn test_interviewer_turn_last_is_rejected() {
        let err = interviewer(MockLanguageModel::new())
            .advance(state_at(2))
            .await
            .unwrap_err();
        assert_eq!(err, InterviewError::AwaitingCandidate);
    }

    #[tokio::test]
    async fn test_full_interview_reaches_done() {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Decision)
            .times(5)
            .returning(|request| {
                let last = request.messages.last().unwrap().content.clone();
                if last.contains("what do you mean") {
                    Ok(decision_json("CLARIFY", "I mean: describe a system you built."))
                } else if request.system.contains("Question 4 of 4") {
                    Ok(decision_json("END", "Thanks, that's all."))
                } else {
                    Ok(decision_json("CONTINUE", "Good. Next question?"))
                }
            });
        model
            .expect_complete()
            .withf(|request| request.format == ResponseFormat::Text)
            .times(1)
            .returning(|_| Ok(REPORT.to_string()));
        let interviewer = interviewer(model);

        let mut state = interviewer.start("Backend Engineer", "FinTech");
        let answers = [
            "I'm Sam, a backend engineer.",
            "what do you mean",
            "I built a payments ledger.",
            "Idempotency keys.",
            "I'd page the on-call and roll back.",
        ];
        let mut progress_trail = vec![];
        for answer in answers {
            let advance = interviewer.respond(state, answer).await.unwrap();
            state = advance.state;
            progress_trail.push(state.progress());
            assert_eq!(state.last_turn().unwrap().has_sentinel(), state.progress() >= 4);
        }

        assert_eq!(progress_trail, vec![1, 1, 2, 3, 4]);
        assert!(state.is_finished());
        assert_eq!(state.transcript().len(), 1 + answers.len() * 2);
        for (i, turn) in state.transcript().iter().enumerate() {
            let expected = if i % 2 == 0 { Speaker::Interviewer } else { Speaker::Candidate };
            assert_eq!(turn.speaker, expected);
        }
    }
}
