//! Accuracy benchmark CLI.
//!
//! Asks a hosted chat model every question in a multiple-choice file,
//! scores the answers and keeps a resumable results file.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mcqbench_core::{AnsweringClient, ClientConfig, HttpChatClient, Provider};
use mcqbench_eval::{
    EvalConfig, EvalHarness, EvalMode, EvalProgress, Pass, QuestionSet, Record, RunOutcome,
    RunPaths, RunReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Measure a chat model's accuracy on a multiple-choice question set.
#[derive(Parser, Debug)]
#[command(name = "mcqbench")]
#[command(about = "Benchmark a chat model on multiple-choice questions, resumably")]
#[command(version)]
struct Args {
    /// Question file (JSON)
    #[arg(long, short = 'q', default_value = "gpqa_questions.json")]
    questions: PathBuf,

    /// Run a verifier pass on every answer and score the verified letter
    #[arg(long)]
    verify: bool,

    /// Inference provider: groq or gemini
    #[arg(long, short = 'p', default_value = "groq")]
    provider: Provider,

    /// Model name (default depends on the provider)
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Override the provider's API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// API key (default: GROQ_API_KEY or GEMINI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Results file (default depends on --verify)
    #[arg(long, short = 'o')]
    results_file: Option<PathBuf>,

    /// Also save full response text to this file
    #[arg(long)]
    responses_file: Option<PathBuf>,

    /// Attempts per request before a question is skipped
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Pause between attempts, in seconds
    #[arg(long, default_value_t = 2)]
    retry_delay_secs: u64,

    /// Pause after each recorded question, in seconds
    #[arg(long, default_value_t = 1)]
    question_delay_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Sampling temperature (0.0-2.0; provider default when unset)
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens per response
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Attempt at most this many unprocessed questions
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Validate CLI arguments.
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max-attempts must be greater than 0".to_string());
        }

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("temperature ({}) must be between 0.0 and 2.0", t));
            }
        }

        let results = self.results_path();
        if results == self.questions {
            return Err(format!(
                "results file {} would overwrite the question file",
                results.display()
            ));
        }
        if self.responses_file.as_ref() == Some(&results) {
            return Err("responses file must differ from the results file".to_string());
        }

        Ok(())
    }

    fn mode(&self) -> EvalMode {
        if self.verify {
            EvalMode::Verified
        } else {
            EvalMode::SinglePass
        }
    }

    fn results_path(&self) -> PathBuf {
        self.results_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.mode().default_results_file()))
    }

    fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// The API key from the flag, else from the provider's variable.
    fn api_key(&self) -> Result<String> {
        let key = match &self.api_key {
            Some(key) => key.clone(),
            None => std::env::var(self.provider.api_key_env()).unwrap_or_default(),
        };
        if key.trim().is_empty() {
            bail!(
                "No API key for {}: set {} or pass --api-key",
                self.provider,
                self.provider.api_key_env()
            );
        }
        Ok(key)
    }

    /// Build ClientConfig from CLI arguments.
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_provider(self.provider)
            .with_model(self.model())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_attempts(self.max_attempts)
            .with_retry_delay(Duration::from_secs(self.retry_delay_secs));
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        if let Some(n) = self.max_tokens {
            config = config.with_max_tokens(n);
        }
        config
    }

    /// Build EvalConfig from CLI arguments.
    fn eval_config(&self) -> EvalConfig {
        EvalConfig::new()
            .with_mode(self.mode())
            .with_question_delay(Duration::from_secs(self.question_delay_secs))
            .with_limit(self.limit)
    }

    fn run_paths(&self) -> RunPaths {
        let paths = RunPaths::new(self.results_path());
        match &self.responses_file {
            Some(path) => paths.with_transcripts(path.clone()),
            None => paths,
        }
    }
}

/// First Ctrl+C cancels `token`; the second exits immediately.
fn spawn_interrupt_handler(token: CancellationToken) {
    // 0 = no interrupt, 1 = graceful stop requested, 2+ = force exit
    let interrupt_count = Arc::new(AtomicU8::new(0));

    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }

            let count = interrupt_count.fetch_add(1, Ordering::SeqCst) + 1;
            if count == 1 {
                eprintln!(
                    "\n{}",
                    "Interrupt received - stopping after the current question...".yellow()
                );
                eprintln!("   (Press Ctrl+C again to exit immediately)\n");
                token.cancel();
            } else {
                eprintln!("\n{}", "Force exit requested".red());
                std::process::exit(130);
            }
        }
    });
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        Ok(style) => bar.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("Progress template rejected: {}", e),
    }
    bar
}

/// Render one progress event onto the bar.
fn show_progress(bar: &ProgressBar, progress: EvalProgress) {
    match progress {
        EvalProgress::Started {
            total,
            already_processed,
            pending,
        } => {
            bar.set_length(total as u64);
            bar.set_position(already_processed as u64);
            if already_processed > 0 {
                bar.println(format!(
                    "{}",
                    format!(
                        "Resuming: {} of {} already processed, {} to go",
                        already_processed, total, pending
                    )
                    .cyan()
                ));
            }
        }
        EvalProgress::QuestionStarted { id, .. } => {
            bar.set_message(format!("question {}", id));
        }
        EvalProgress::Retrying {
            id,
            pass,
            attempt,
            max_attempts,
            kind,
            message,
        } => {
            bar.println(format!(
                "{}",
                format!(
                    "  Question {}: {} attempt {}/{} failed ({}: {}), retrying...",
                    id, pass, attempt, max_attempts, kind, message
                )
                .yellow()
            ));
        }
        EvalProgress::Answered {
            id,
            pass: Pass::Verification,
            letter,
            ..
        } => {
            bar.set_message(format!("question {} verified as {}", id, letter));
        }
        EvalProgress::Recorded { record, metadata } => {
            bar.inc(1);
            bar.println(describe_record(&record));
            bar.set_message(format!(
                "{}/{} correct ({:.2}%)",
                metadata.correct_answers, metadata.questions_processed, metadata.accuracy
            ));
        }
        EvalProgress::Skipped {
            id,
            pass,
            kind,
            message,
        } => {
            bar.println(format!(
                "{}",
                format!(
                    "  Question {} skipped: {} pass failed ({}: {})",
                    id, pass, kind, message
                )
                .red()
            ));
        }
        _ => {}
    }
}

fn describe_record(record: &Record) -> String {
    let mark = if record.is_correct() {
        "correct".green()
    } else {
        "wrong".red()
    };

    match record {
        Record::SinglePass(r) => format!(
            "  Question {}: answered {}, expected {} - {}",
            r.id, r.model_answer, r.correct_answer, mark
        ),
        Record::Verified(r) => {
            let change = if r.was_changed {
                format!("changed {} -> {}", r.original_answer, r.verified_answer).yellow()
            } else {
                format!("confirmed {}", r.verified_answer).green()
            };
            format!(
                "  Question {}: {}, expected {} - {}",
                r.id, change, r.correct_answer, mark
            )
        }
    }
}

fn print_summary(report: &RunReport) {
    let meta = &report.metadata;

    println!();
    println!("{}", "=== Results ===".bold());
    println!("Model: {}", meta.model);
    println!(
        "Questions processed: {}/{}",
        meta.questions_processed, meta.total_questions
    );
    println!("Correct answers: {}", meta.correct_answers);
    println!(
        "Accuracy: {}",
        format!("{:.2}%", meta.accuracy).cyan().bold()
    );
    if let Some(changed) = meta.answers_changed_by_verifier {
        println!(
            "Answers changed by verifier: {}",
            changed.to_string().magenta()
        );
    }
    println!("Recorded this run: {}", report.processed_this_run);
    if !report.skipped.is_empty() {
        let ids: Vec<String> = report.skipped.iter().map(u64::to_string).collect();
        println!(
            "{}",
            format!("Skipped this run: {}", ids.join(", ")).red()
        );
    }
    if report.outcome == RunOutcome::Interrupted {
        println!(
            "{}",
            "Interrupted - run the same command again to resume".yellow()
        );
    }
    println!("Results saved to: {}", report.results_path.display());
}

async fn run(args: &Args) -> Result<RunReport> {
    let questions = QuestionSet::load(&args.questions)
        .await
        .context("Failed to load questions")?;
    if questions.is_empty() {
        bail!("{} contains no questions", args.questions.display());
    }

    let config = args.client_config();
    let http = HttpChatClient::new(args.api_key()?, config.clone())
        .context("Failed to create HTTP client")?;
    let client = AnsweringClient::new(http, &config);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let bar = progress_bar();
    let harness = EvalHarness::new(args.eval_config());
    let report = harness
        .run(&client, &questions, &args.run_paths(), &cancel, |progress| {
            show_progress(&bar, progress)
        })
        .await;

    match &report {
        Ok(r) if r.outcome == RunOutcome::Interrupted => bar.abandon_with_message("Interrupted"),
        Ok(_) => bar.finish_with_message("Complete"),
        Err(_) => bar.abandon(),
    }

    report.context("Evaluation failed")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        return ExitCode::FAILURE;
    }

    // Print configuration
    eprintln!("{}", "=== mcqbench ===".bold());
    eprintln!("Questions: {}", args.questions.display());
    eprintln!("Provider: {}", args.provider);
    eprintln!("Model: {}", args.model());
    eprintln!("Mode: {}", args.mode());
    eprintln!("Results: {}", args.results_path().display());
    eprintln!();

    match run(&args).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_args() -> Args {
        Args {
            questions: PathBuf::from("gpqa_questions.json"),
            verify: false,
            provider: Provider::Groq,
            model: None,
            base_url: None,
            api_key: Some("test-key".to_string()),
            results_file: None,
            responses_file: None,
            max_attempts: 3,
            retry_delay_secs: 2,
            question_delay_secs: 1,
            timeout_secs: 120,
            temperature: None,
            max_tokens: None,
            limit: None,
            verbose: false,
        }
    }

    #[test]
    fn test_validate_valid_args() {
        assert!(test_args().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut args = test_args();
        args.max_attempts = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_temperature() {
        let mut args = test_args();
        args.temperature = Some(2.5);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_results_overwrites_questions() {
        let mut args = test_args();
        args.results_file = Some(PathBuf::from("gpqa_questions.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_responses_equals_results() {
        let mut args = test_args();
        args.responses_file = Some(PathBuf::from("model_accuracy_results.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_results_path_follows_mode() {
        let mut args = test_args();
        assert_eq!(
            args.results_path(),
            PathBuf::from("model_accuracy_results.json")
        );
        args.verify = true;
        assert_eq!(
            args.results_path(),
            PathBuf::from("model_accuracy_results_verified.json")
        );
        args.results_file = Some(PathBuf::from("custom.json"));
        assert_eq!(args.results_path(), PathBuf::from("custom.json"));
    }

    #[test]
    fn test_client_config() {
        let mut args = test_args();
        args.provider = Provider::Gemini;
        args.temperature = Some(0.2);
        args.base_url = Some("http://localhost:8080/v1/".to_string());

        let config = args.client_config();
        assert_eq!(config.model, Provider::Gemini.default_model());
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn test_eval_config() {
        let mut args = test_args();
        args.verify = true;
        args.limit = Some(10);

        let config = args.eval_config();
        assert_eq!(config.mode, EvalMode::Verified);
        assert_eq!(config.question_delay, Duration::from_secs(1));
        assert_eq!(config.limit, Some(10));
    }

    #[test]
    fn test_api_key_from_flag() {
        assert_eq!(test_args().api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let mut args = test_args();
        args.api_key = Some("  ".to_string());
        assert!(args.api_key().is_err());
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["mcqbench"]).unwrap();
        assert_eq!(args.questions, PathBuf::from("gpqa_questions.json"));
        assert_eq!(args.provider, Provider::Groq);
        assert_eq!(args.max_attempts, 3);
        assert!(!args.verify);
    }

    #[test]
    fn test_parse_provider() {
        let args = Args::try_parse_from(["mcqbench", "--provider", "Gemini", "--verify"]).unwrap();
        assert_eq!(args.provider, Provider::Gemini);
        assert_eq!(args.mode(), EvalMode::Verified);

        assert!(Args::try_parse_from(["mcqbench", "--provider", "openai"]).is_err());
    }

    #[test]
    fn test_describe_record() {
        colored::control::set_override(false);
        let line = describe_record(&Record::verified(
            4,
            mcqbench_core::Letter::A,
            mcqbench_core::Letter::B,
            mcqbench_core::Letter::B,
        ));
        assert!(line.contains("changed A -> B"));
        assert!(line.contains("correct"));
    }
}
