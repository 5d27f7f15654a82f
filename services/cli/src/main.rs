mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use interview_core::prompts::PromptSet;
use interview_core::session_state::{DEFAULT_CONTEXT, DEFAULT_TOTAL_QUESTIONS};
use interview_core::{InterviewError, InterviewState, Interviewer, Report, Turn, provider};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

const QUIT_COMMANDS: [&str; 3] = ["q", "quit", "exit"];

#[derive(Parser)]
#[command(version, about = "Run an adaptive job interview in the terminal")]
struct Cli {
    /// The job role to interview for
    role: String,
    /// Industry or company context for the questions
    #[arg(short, long, default_value = DEFAULT_CONTEXT)]
    context: String,
    /// Number of questions before the interview concludes
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_TOTAL_QUESTIONS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    questions: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load Prompts ---
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptSet::from_dir(dir).context("Failed to load prompt overrides")?,
        None => PromptSet::default(),
    };

    // --- 5. Initialize API Clients ---
    let model = provider::connect(config.provider, config.api_key, config.model)
        .context("Failed to build language model client")?;
    let interviewer = Interviewer::new(model)
        .with_prompts(prompts)
        .with_total_questions(args.questions)
        .context("Invalid question count")?;

    let stdin = BufReader::new(tokio::io::stdin());
    run(
        &interviewer,
        &args.role,
        &args.context,
        stdin,
        &mut std::io::stdout(),
    )
    .await
}

/// Drives one interview over a line-based input until the report is printed,
/// the candidate quits, or the input ends.
async fn run<R, W>(
    interviewer: &Interviewer,
    role: &str,
    context: &str,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut state = interviewer.start(role, context);
    if let Some(opener) = state.last_turn().map(Turn::display_text) {
        writeln!(out, "\nAI: {opener}")?;
    }

    let mut lines = input.lines();
    loop {
        write!(out, "\nYou: ")?;
        out.flush().context("Failed to flush output")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();
        if is_quit(line) {
            break;
        }

        match interviewer.respond(state.clone(), line).await {
            Ok(advance) => {
                writeln!(out, "\nAI: {}", advance.reply)?;
                state = advance.state;
            }
            Err(InterviewError::EmptyCandidateTurn) => {
                writeln!(out, "(Please type an answer, or 'q' to quit.)")?;
                continue;
            }
            Err(e) => return Err(e).context("Interview turn failed"),
        }

        if let Some(report) = state.report() {
            write!(out, "{}", format_report(&state, report))?;
            break;
        }
    }

    Ok(())
}

fn is_quit(line: &str) -> bool {
    QUIT_COMMANDS.contains(&line.trim().to_lowercase().as_str())
}

fn format_report(state: &InterviewState, report: &Report) -> String {
    let mut text = String::from("\n==================== ASSESSMENT ====================\n");
    text.push_str(&format!("Role: {} ({})\n", state.role(), state.context()));
    text.push_str(report.content());
    text.push('\n');
    if let Some(score) = report.score() {
        text.push_str(&format!("\nScore: {score}/100\n"));
    }
    if let Some(recommendation) = report.recommendation() {
        text.push_str(&format!("Recommendation: {}\n", recommendation.label()));
    }
    text.push_str("====================================================\n");
    text
}
