//! Command-line interface for evaltrack.
//!
//! Provides commands for uploading papers and answer batches, grading single
//! answers, and reading the evaluation ledger back out.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{OpenAiOracle, Oracle};
use crate::core::Grader;
use crate::domain::EvaluationRequest;
use crate::export;
use crate::ingest::{Artifact, IngestReport, Ingestor, ItemOutcome, ReferenceStrategy};
use crate::ledger::{EvaluationFilter, Ledger};

pub mod answer;

/// evaltrack - Rubric grading of agent answers with an LLM oracle
#[derive(Parser, Debug)]
#[command(name = "evaltrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a test paper (CSV: question,standard_answer,difficulty,source,tags)
    UploadPaper {
        /// Paper file (.csv or .json)
        file: PathBuf,

        /// Paper name, also used as the experiment id (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Grade an answered batch under a new experiment
    UploadBatch {
        /// Batch file (.json or .csv)
        file: PathBuf,

        /// Experiment id; must not exist yet
        #[arg(short, long)]
        experiment: String,

        /// Where reference answers come from
        #[arg(short, long, value_enum, default_value = "source")]
        reference: ReferenceArg,
    },

    /// Grade a scored upload, replacing earlier rows with the same question id
    UploadScored {
        /// Upload file (.json or .csv)
        file: PathBuf,

        /// Project (experiment) id
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Grade a single answer against a stored standard answer
    Evaluate {
        #[arg(short, long)]
        experiment: String,

        /// Question text
        #[arg(short, long)]
        question: String,

        /// Answer to grade
        #[arg(short, long)]
        response: String,

        /// Standard-answer source label
        #[arg(short, long)]
        source: String,

        /// Question id (generated if not specified)
        #[arg(long)]
        question_id: Option<String>,
    },

    /// List evaluations
    List {
        #[arg(short, long)]
        experiment: Option<String>,

        #[arg(short, long)]
        question_id: Option<String>,

        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show the latest evaluation for a question id
    Show {
        question_id: String,
    },

    /// Export evaluations as CSV
    Export {
        #[arg(short, long)]
        experiment: Option<String>,

        #[arg(short, long)]
        source: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-experiment counts and average scores
    Summary,

    /// List test papers, or the questions of one paper
    Papers {
        /// Paper id to show
        #[arg(short, long)]
        paper: Option<i64>,

        /// Write the paper's questions as CSV
        #[arg(long, requires = "paper")]
        csv: bool,
    },

    /// Write an upload template
    Template {
        #[arg(value_enum)]
        kind: TemplateKind,

        /// Papers to include in a student template
        #[arg(short, long)]
        paper: Vec<i64>,

        #[arg(short, long, value_enum, default_value = "csv")]
        format: TemplateFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage standard answers
    Answer {
        #[command(subcommand)]
        command: answer::AnswerCommands,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Check that the grading oracle is reachable
    CheckOracle,
}

/// Reference strategy for CLI (maps to ReferenceStrategy)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReferenceArg {
    /// Uploaded test-paper question with the same id
    Paper,

    /// Standard answer by source label, then embedded content
    Source,

    /// Embedded content only
    Embedded,
}

impl From<ReferenceArg> for ReferenceStrategy {
    fn from(arg: ReferenceArg) -> Self {
        match arg {
            ReferenceArg::Paper => ReferenceStrategy::PaperQuestion,
            ReferenceArg::Source => ReferenceStrategy::SourceLabel,
            ReferenceArg::Embedded => ReferenceStrategy::Embedded,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TemplateKind {
    /// Blank test paper with sample rows
    Paper,

    /// Answer sheet for existing papers
    Student,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TemplateFormat {
    Csv,
    Json,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::UploadPaper { file, name } => upload_paper(&file, name).await,
            Commands::UploadBatch {
                file,
                experiment,
                reference,
            } => upload_batch(&file, &experiment, reference.into()).await,
            Commands::UploadScored { file, project } => upload_scored(&file, project).await,
            Commands::Evaluate {
                experiment,
                question,
                response,
                source,
                question_id,
            } => {
                let mut request = EvaluationRequest::new(experiment, question, response, source);
                request.question_id = question_id;
                evaluate(&request).await
            }
            Commands::List {
                experiment,
                question_id,
                source,
            } => {
                let filter = EvaluationFilter {
                    experiment_id: experiment,
                    question_id,
                    source,
                };
                list_evaluations(&filter).await
            }
            Commands::Show { question_id } => show_evaluation(&question_id).await,
            Commands::Export {
                experiment,
                source,
                output,
            } => {
                let filter = EvaluationFilter {
                    experiment_id: experiment,
                    question_id: None,
                    source,
                };
                export_evaluations(&filter, output).await
            }
            Commands::Summary => show_summary().await,
            Commands::Papers { paper, csv } => show_papers(paper, csv).await,
            Commands::Template {
                kind,
                paper,
                format,
                output,
            } => write_template(kind, &paper, format, output).await,
            Commands::Answer { command } => execute_answer(command).await,
            Commands::Config => show_config().await,
            Commands::CheckOracle => check_oracle().await,
        }
    }
}

/// Execute standard-answer subcommands
async fn execute_answer(command: answer::AnswerCommands) -> Result<()> {
    match command {
        answer::AnswerCommands::Add {
            source,
            content,
            file,
        } => answer::execute_add(&source, content, file).await,
        answer::AnswerCommands::List { full } => answer::execute_list(full).await,
    }
}

/// Open the configured ledger
pub(crate) fn open_ledger() -> Result<Ledger> {
    let path = crate::config::database_path()?;
    Ledger::open(&path).with_context(|| format!("Failed to open ledger: {}", path.display()))
}

/// Build the configured oracle client
fn build_oracle() -> Result<OpenAiOracle> {
    let cfg = crate::config::config()?;
    OpenAiOracle::from_settings(&cfg.oracle)
}

/// Build an ingestor over `ledger` with the configured grader
fn build_ingestor(ledger: &Ledger) -> Result<Ingestor<'_>> {
    let cfg = crate::config::config()?;
    let grader = Grader::new(Arc::new(build_oracle()?))
        .with_timeout(cfg.oracle.timeout())
        .with_range_policy(cfg.grading.range_policy);

    Ok(Ingestor::new(ledger, grader).with_id_retry_budget(cfg.ingest.id_retry_budget))
}

fn load_artifact(file: &Path) -> Result<Artifact> {
    Artifact::from_path(file).with_context(|| format!("Failed to load upload: {}", file.display()))
}

/// Upload a test paper
async fn upload_paper(file: &Path, name: Option<String>) -> Result<()> {
    let artifact = load_artifact(file)?;
    let name = match name {
        Some(name) => name,
        None => file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .context("Cannot derive a paper name from the file name; pass --name")?,
    };

    let ledger = open_ledger()?;
    let ingestor = build_ingestor(&ledger)?;
    let report = ingestor.ingest_test_paper(&name, &artifact).await?;

    if let Some(paper_id) = report.test_paper_id {
        println!("Test paper '{}' stored as #{}", name, paper_id);
    }
    print_report(&report);
    Ok(())
}

/// Grade an answered batch
async fn upload_batch(file: &Path, experiment: &str, strategy: ReferenceStrategy) -> Result<()> {
    let artifact = load_artifact(file)?;
    let ledger = open_ledger()?;
    let ingestor = build_ingestor(&ledger)?;

    let report = ingestor
        .ingest_response_batch(experiment, &artifact, strategy)
        .await?;

    println!("Experiment '{}'", experiment);
    print_report(&report);
    Ok(())
}

/// Grade a scored upload with upsert semantics
async fn upload_scored(file: &Path, project: Option<String>) -> Result<()> {
    let artifact = load_artifact(file)?;
    let ledger = open_ledger()?;
    let ingestor = build_ingestor(&ledger)?;

    let report = ingestor.upsert_scored(project.as_deref(), &artifact).await?;
    print_report(&report);
    Ok(())
}

/// Grade a single answer
async fn evaluate(request: &EvaluationRequest) -> Result<()> {
    let ledger = open_ledger()?;
    let ingestor = build_ingestor(&ledger)?;

    let evaluation = ingestor.evaluate(request).await?;
    print_evaluation(&evaluation);
    Ok(())
}

/// List evaluations
async fn list_evaluations(filter: &EvaluationFilter) -> Result<()> {
    let ledger = open_ledger()?;
    let evaluations = ledger.list_evaluations(filter)?;

    if evaluations.is_empty() {
        println!("No evaluations found");
        return Ok(());
    }

    println!(
        "{:<10} {:<20} {:<16} {:>5}  {}",
        "QUESTION", "EXPERIMENT", "SOURCE", "TOTAL", "QUESTION TEXT"
    );
    println!("{}", "-".repeat(90));

    for evaluation in evaluations {
        let data = &evaluation.data;
        println!(
            "{:<10} {:<20} {:<16} {:>5}  {}",
            data.question_id,
            truncate(&data.experiment_id, 20),
            truncate(&data.question_source, 16),
            data.total_score,
            truncate(&data.test_question, 40)
        );
    }

    Ok(())
}

/// Show the latest evaluation for a question
async fn show_evaluation(question_id: &str) -> Result<()> {
    let ledger = open_ledger()?;
    let evaluation = ledger.get_evaluation(question_id)?;
    print_evaluation(&evaluation);
    Ok(())
}

/// Export evaluations as CSV
async fn export_evaluations(filter: &EvaluationFilter, output: Option<PathBuf>) -> Result<()> {
    let ledger = open_ledger()?;
    let evaluations = ledger.list_evaluations(filter)?;

    export::write_evaluations_csv(open_output(output.as_deref())?, &evaluations)?;
    if let Some(path) = output {
        eprintln!("Exported {} evaluations to {}", evaluations.len(), path.display());
    }
    Ok(())
}

/// Show per-experiment summary
async fn show_summary() -> Result<()> {
    let ledger = open_ledger()?;
    let summaries = ledger.experiment_summaries()?;

    if summaries.is_empty() {
        println!("No evaluations found");
        return Ok(());
    }

    println!("{:<30} {:>8} {:>10}", "EXPERIMENT", "COUNT", "AVG SCORE");
    println!("{}", "-".repeat(50));
    for summary in summaries {
        println!(
            "{:<30} {:>8} {:>10.2}",
            truncate(&summary.experiment_id, 30),
            summary.count,
            summary.average_score
        );
    }

    Ok(())
}

/// List papers or one paper's questions
async fn show_papers(paper: Option<i64>, as_csv: bool) -> Result<()> {
    let ledger = open_ledger()?;

    let Some(paper_id) = paper else {
        let papers = ledger.list_test_papers()?;
        if papers.is_empty() {
            println!("No test papers uploaded");
            return Ok(());
        }

        println!("{:<6} {:<30} {}", "ID", "NAME", "UPLOADED");
        println!("{}", "-".repeat(60));
        for paper in papers {
            println!(
                "{:<6} {:<30} {}",
                paper.id,
                truncate(&paper.name, 30),
                paper.uploaded_at.format("%Y-%m-%d %H:%M")
            );
        }
        return Ok(());
    };

    let paper = ledger.test_paper(paper_id)?;
    let questions = ledger.paper_questions(paper.id)?;

    if as_csv {
        export::write_paper_csv(io::stdout(), &questions)?;
        return Ok(());
    }

    println!("Paper #{}: {}", paper.id, paper.name);
    println!();
    println!("{:<10} {:>4}  {:<40} {}", "QUESTION", "DIFF", "TEXT", "STANDARD ANSWER");
    println!("{}", "-".repeat(90));
    for question in questions {
        println!(
            "{:<10} {:>4}  {:<40} {}",
            question.question_id,
            question.difficulty,
            truncate(&question.question, 40),
            truncate(&question.standard_answer, 30)
        );
    }

    Ok(())
}

/// Write a paper or student template
async fn write_template(
    kind: TemplateKind,
    papers: &[i64],
    format: TemplateFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut writer = open_output(output.as_deref())?;

    match kind {
        TemplateKind::Paper => {
            if matches!(format, TemplateFormat::Json) {
                anyhow::bail!("Paper templates are CSV only");
            }
            export::write_paper_template_csv(writer)?;
        }
        TemplateKind::Student => {
            if papers.is_empty() {
                anyhow::bail!("Select at least one paper with --paper");
            }

            let ledger = open_ledger()?;
            let mut questions = Vec::new();
            for paper_id in papers {
                let paper = ledger.test_paper(*paper_id)?;
                questions.extend(ledger.paper_questions(paper.id)?);
            }

            match format {
                TemplateFormat::Csv => export::write_student_template_csv(writer, &questions)?,
                TemplateFormat::Json => {
                    serde_json::to_writer_pretty(&mut writer, &export::student_template_json(&questions))?;
                    writeln!(writer)?;
                }
            }
        }
    }

    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    // Read from disk so edits show up without the cached copy
    let cfg = crate::config::reload_config()?;

    println!("evaltrack configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("Oracle:");
    println!("  Model:    {}", cfg.oracle.model);
    println!("  Base URL: {}", cfg.oracle.base_url);
    let key_state = if std::env::var(&cfg.oracle.api_key_env).is_ok() {
        "set"
    } else {
        "missing"
    };
    println!("  API key:  ${} ({})", cfg.oracle.api_key_env, key_state);
    println!("  Timeout:  {}s", cfg.oracle.timeout_seconds);
    println!();
    println!("Grading:");
    println!("  Range policy: {:?}", cfg.grading.range_policy);
    println!();
    println!("Ingest:");
    println!("  Id retry budget: {}", cfg.ingest.id_retry_budget);

    Ok(())
}

/// Check oracle reachability
async fn check_oracle() -> Result<()> {
    let oracle = build_oracle()?;
    oracle
        .health_check()
        .await
        .with_context(|| format!("Oracle '{}' is not reachable", oracle.name()))?;

    println!("Oracle '{}' reachable (model {})", oracle.name(), oracle.model());
    Ok(())
}

fn print_report(report: &IngestReport) {
    for outcome in &report.outcomes {
        match outcome {
            ItemOutcome::Created {
                index,
                question_id,
                total_score,
                ..
            } => println!("  #{:<4} created  {:<10} total {}", index, question_id, total_score),
            ItemOutcome::Updated {
                index,
                question_id,
                total_score,
                ..
            } => println!("  #{:<4} updated  {:<10} total {}", index, question_id, total_score),
            ItemOutcome::Skipped { index, error } => {
                println!("  #{:<4} skipped  {}", index, error)
            }
        }
        if let Some(error) = outcome.degradation() {
            println!("         degraded {}", error);
        }
    }

    println!();
    println!(
        "Created: {}  Updated: {}  Skipped: {}  Degraded: {}",
        report.created(),
        report.updated(),
        report.skipped(),
        report.degraded()
    );
}

fn print_evaluation(evaluation: &crate::domain::Evaluation) {
    let data = &evaluation.data;
    println!("Question ID:  {}", data.question_id);
    println!("Experiment:   {}", data.experiment_id);
    if !data.test_paper_id.is_empty() {
        println!("Test paper:   {}", data.test_paper_id);
    }
    println!("Source:       {}", data.question_source);
    println!("Created:      {}", evaluation.created_at);
    println!();
    println!("Question:\n  {}", data.test_question);
    println!("Response:\n  {}", data.bot_response);
    println!("Standard answer:\n  {}", data.standard_answer);
    println!();
    println!("Accuracy:          {}", data.accuracy);
    println!("Relevance:         {}", data.relevance);
    println!("Logic:             {}", data.logic);
    println!("Conciseness:       {}", data.conciseness);
    println!("Language quality:  {}", data.language_quality);
    println!("Total:             {}/25", data.total_score);
    if !data.overall_comment.is_empty() {
        println!();
        println!("Comment: {}", data.overall_comment);
    }
}

/// Open an output file, or stdout when none is given
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

/// Shorten text for table output
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}
