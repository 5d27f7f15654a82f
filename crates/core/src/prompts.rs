use crate::session_state::QuestionIndex;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const INTERVIEWER_PROMPT: &str = include_str!("../prompts/interviewer.md");
const EVALUATOR_PROMPT: &str = include_str!("../prompts/evaluator.md");

/// Opening line of every interview. Deterministic, no model call.
pub fn opening_line(role: &str, context: &str) -> String {
    format!(
        "Hello! Welcome to the interview for the {role} position at our {context} company. \
         Let's get started. Could you please briefly introduce yourself?"
    )
}

/// Replaces every `{key}` in `template` with its value.
pub fn render(template: &str, values: &[(&str, String)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

/// Reads every `*.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    Ok(prompts)
}

/// System prompts for the decision and evaluation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    interviewer: String,
    evaluator: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            interviewer: INTERVIEWER_PROMPT.to_string(),
            evaluator: EVALUATOR_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    /// Built-in prompts, overridden by `interviewer.md` / `evaluator.md` found in `dir_path`.
    pub fn from_dir(dir_path: &Path) -> Result<Self> {
        let mut loaded = load_prompts(dir_path)?;
        let defaults = Self::default();
        Ok(Self {
            interviewer: loaded
                .remove("interviewer")
                .unwrap_or(defaults.interviewer),
            evaluator: loaded.remove("evaluator").unwrap_or(defaults.evaluator),
        })
    }

    pub fn interviewer(&self, role: &str, context: &str, question: QuestionIndex) -> String {
        render(
            &self.interviewer,
            &[
                ("role", role.to_string()),
                ("context", context.to_string()),
                ("current_q_num", question.get().to_string()),
                ("next_q_num", (question.get() + 1).to_string()),
                ("total", question.total().to_string()),
            ],
        )
    }

    pub fn evaluator(&self, role: &str, context: &str) -> String {
        render(
            &self.evaluator,
            &[("role", role.to_string()), ("context", context.to_string())],
        )
    }
}
