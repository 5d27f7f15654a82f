use crate::error::{GenerationError, InterviewError};
use crate::interviewer::{Advance, Interviewer};
use crate::session_state::InterviewState;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// Reply used when no usable speech was heard.
pub const UNHEARD_REPLY: &str = "I couldn't hear you clearly. Could you please say that again?";

/// Turns recorded audio into text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String, GenerationError>;
}

/// Turns interviewer text into playable audio.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GenerationError>;
}

/// Outcome of one spoken candidate turn.
#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub state: InterviewState,
    /// What the candidate was heard saying; `None` when nothing usable was heard.
    pub heard: Option<String>,
    /// Present when the interview moved on.
    pub advance: Option<Advance>,
    /// Text for the candidate, sentinel removed.
    pub reply: String,
    /// Synthesized `reply`, when the turn expects a spoken answer and synthesis worked.
    pub audio: Option<Vec<u8>>,
}

/// Runs interview turns from recorded audio.
pub struct VoiceInterviewer {
    interviewer: Arc<Interviewer>,
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl VoiceInterviewer {
    pub fn new(
        interviewer: Arc<Interviewer>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            interviewer,
            transcriber,
            synthesizer,
        }
    }

    pub fn interviewer(&self) -> &Interviewer {
        &self.interviewer
    }

    /// Transcribes `audio` and submits it as the candidate's turn.
    ///
    /// A failed or blank transcription leaves the state untouched and asks the
    /// candidate to speak again. Speech is synthesized for every reply except
    /// the closing one, which is delivered with the report as text.
    pub async fn respond(
        &self,
        state: InterviewState,
        audio: &[u8],
        file_name: &str,
    ) -> Result<VoiceReply, InterviewError> {
        if state.is_closed() {
            return Err(InterviewError::SessionFinished);
        }

        let heard = match self.transcriber.transcribe(audio, file_name).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                String::new()
            }
        };

        if heard.is_empty() {
            tracing::info!(progress = state.progress(), "no usable speech in candidate audio");
            let audio = self.speak(UNHEARD_REPLY).await;
            return Ok(VoiceReply {
                state,
                heard: None,
                advance: None,
                reply: UNHEARD_REPLY.to_string(),
                audio,
            });
        }

        tracing::info!("Candidate said: \"{}\"", heard);
        let advance = self.interviewer.respond(state, &heard).await?;
        let audio = if advance.is_finished() {
            None
        } else {
            self.speak(&advance.reply).await
        };

        Ok(VoiceReply {
            state: advance.state.clone(),
            heard: Some(heard),
            reply: advance.reply.clone(),
            advance: Some(advance),
            audio,
        })
    }

    async fn speak(&self, text: &str) -> Option<Vec<u8>> {
        match self.synthesizer.synthesize(text).await {
            Ok(audio) if !audio.is_empty() => Some(audio),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed; replying with text only");
                None
            }
        }
    }
}
