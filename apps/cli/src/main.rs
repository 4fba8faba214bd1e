use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use riskscan_core::{
    Analyst, AssemblyAi, CompanyOutcome, Config, Credentials, DocumentAnalysis, DocumentMode,
    Ffmpeg, Julep, MediaAnalysis, MediaStages, Pipeline, RiskReport, SerpApi, Service, Stage,
    YtDlp, format_duration, logging,
};
use tracing::debug;

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    /// Extract the two contracting companies
    Company,
    /// Analyze risk indicators in a case document
    Risk,
}

impl From<CliMode> for DocumentMode {
    fn from(cli: CliMode) -> Self {
        match cli {
            CliMode::Company => DocumentMode::Company,
            CliMode::Risk => DocumentMode::Risk,
        }
    }
}

#[derive(Parser)]
#[command(name = "riskscan")]
#[command(about = "Transcribe social videos, scan company news, and generate AI risk reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Where transcripts and reports are written
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Scratch directory for downloaded media
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a TikTok, Instagram, or X/Twitter video and analyze it for risk
    Media {
        /// Video URL
        url: String,
    },
    /// Analyze a contract or case document
    Document {
        /// PDF or text file
        path: PathBuf,

        #[arg(short, long, value_enum, default_value = "company")]
        mode: CliMode,
    },
    /// Search recent news about companies and analyze it for risk
    Companies {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn require(service: Service) -> Credentials {
    match Credentials::from_env(service) {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn print_report(report: &RiskReport) {
    match report {
        RiskReport::Findings(text) => println!("{}", text),
        RiskReport::Empty => println!("{}", style("No risk analysis results.").dim()),
    }
}

fn separator() {
    println!("{}", style("─".repeat(60)).dim());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::from_env();
    if let Some(dir) = cli.results_dir {
        config.results_dir = dir;
    }
    if let Some(dir) = cli.work_dir {
        config.work_dir = dir;
    }
    debug!(
        results_dir = %config.results_dir.display(),
        work_dir = %config.work_dir.display(),
        "configuration loaded"
    );

    // Validate API keys early
    let julep = require(Service::Julep);
    let media_credentials = match &cli.command {
        Command::Media { .. } => Some(require(Service::AssemblyAi)),
        _ => None,
    };
    let news_credentials = match &cli.command {
        Command::Companies { .. } => Some(require(Service::SerpApi)),
        _ => None,
    };

    println!(
        "\n{}  {}\n",
        style("riskscan").cyan().bold(),
        style("Risk Analyzer").dim()
    );

    let spinner = create_spinner("Creating analysis agent...");
    let analyst = Analyst::provision(
        Arc::new(Julep::new(julep, config.timeouts.julep)?),
        &config.agent,
        config.analysis_poll.clone(),
    )
    .await?;
    spinner.finish_with_message(format!(
        "{} Agent ready {}",
        style("✓").green().bold(),
        style(format!("({})", config.agent.model)).dim()
    ));

    let mut pipeline = Pipeline::new(&config, analyst);
    if let Some(credentials) = media_credentials {
        pipeline = pipeline.with_media(MediaStages {
            downloader: Arc::new(YtDlp::default()),
            extractor: Arc::new(Ffmpeg::default()),
            speech: Arc::new(AssemblyAi::new(
                credentials,
                config.speaker_labels,
                &config.timeouts,
            )?),
        });
    }
    if let Some(credentials) = news_credentials {
        let search = SerpApi::new(credentials, config.timeouts.serpapi)?;
        pipeline = pipeline.with_news(Arc::new(search));
    }

    separator();
    let total_start = Instant::now();

    match cli.command {
        Command::Media { url } => run_media(pipeline, url).await?,
        Command::Document { path, mode } => run_document(&pipeline, path, mode.into()).await?,
        Command::Companies { names } => run_companies(&pipeline, &names).await?,
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}

async fn run_media(pipeline: Pipeline, url: String) -> Result<()> {
    let pipeline = Arc::new(pipeline);
    let run = pipeline.start_run();
    let run_id = run.run_id();

    let worker = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.process_url_as(&run, &url).await })
    };

    let spinner = create_spinner("Queued");
    while !worker.is_finished() {
        if let Some(record) = pipeline.progress_of(run_id) {
            spinner.set_message(format!(
                "{} {}",
                record.message,
                style(format!("{}%", record.percentage)).dim()
            ));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let analysis = settle_run(&spinner, worker.await?)?;

    let stage = pipeline
        .progress_of(run_id)
        .map(|r| r.stage)
        .unwrap_or(Stage::Completed);
    spinner.finish_with_message(format!("{} {}", style("✓").green().bold(), stage.message()));

    separator();
    println!("{}", analysis.transcript_text);
    separator();
    print_report(&analysis.report);

    println!(
        "\n{} {}",
        style("Saved:").dim(),
        style(analysis.report_path.display()).cyan()
    );
    Ok(())
}

/// Close the spinner on failure and hand the error back to `main`.
fn settle_run(
    spinner: &ProgressBar,
    outcome: riskscan_core::Result<MediaAnalysis>,
) -> Result<MediaAnalysis> {
    outcome.map_err(|e| {
        spinner.finish_with_message(format!("{} {}", style("✗").red().bold(), e));
        e.into()
    })
}

async fn run_document(pipeline: &Pipeline, path: PathBuf, mode: DocumentMode) -> Result<()> {
    let step_start = Instant::now();
    let spinner = create_spinner("Analyzing document...");
    let analysis = pipeline.analyze_document(&path, mode).await?;
    spinner.finish_with_message(format!(
        "{} Document analyzed {}",
        style("✓").green().bold(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    separator();
    match analysis {
        DocumentAnalysis::Companies(record) if record.names.is_empty() => {
            println!("{}", style("No companies found.").dim())
        }
        DocumentAnalysis::Companies(record) => {
            for name in &record.names {
                println!("{} {}", style("•").cyan(), name);
            }
        }
        DocumentAnalysis::Risk(report) => print_report(&report),
    }
    Ok(())
}

async fn run_companies(pipeline: &Pipeline, names: &[String]) -> Result<()> {
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Searching news for {} companies...", names.len()));
    let assessments = pipeline.assess_companies(names).await?;
    spinner.finish_with_message(format!(
        "{} News analyzed {}",
        style("✓").green().bold(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    for assessment in assessments {
        separator();
        println!("{}", style(&assessment.company_name).yellow().bold());
        match assessment.outcome {
            CompanyOutcome::Report { report, .. } => print_report(&report),
            CompanyOutcome::NoResults | CompanyOutcome::SearchUnavailable => {
                println!("{}", style(CompanyOutcome::NO_RESULTS_MESSAGE).dim())
            }
        }
    }

    println!(
        "\n{} {}",
        style("Saved:").dim(),
        style(pipeline.store().root().display()).cyan()
    );
    Ok(())
}
