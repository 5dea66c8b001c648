use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDate, Weekday};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use support_response_heatmap::report;
use support_response_heatmap::weeks::week_start;
use support_response_heatmap::{AgentFilter, Session, SourceFile, ViewMode, WeekRange};

#[derive(Parser)]
#[command(name = "support-heatmap")]
#[command(about = "Support response activity by weekday and hour", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the Sunday-aligned weeks covered by the files
    Weeks {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the agents found in the files
    Agents {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Render a markdown heatmap report
    Report {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        selection: Selection,
        #[arg(long, value_enum, default_value_t = ViewMode::Hourly, env = "SUPPORT_HEATMAP_VIEW")]
        view: ViewMode,
        #[arg(long, default_value = "monday", value_parser = parse_day)]
        day: Weekday,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the heatmap and summary as JSON
    Json {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        selection: Selection,
    },
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("range")
        .args(["week", "from"])
        .multiple(false)
))]
struct Selection {
    /// Any date inside the week to show (defaults to the latest week)
    #[arg(long)]
    week: Option<NaiveDate>,
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
    /// Agent email, or "all"
    #[arg(long, default_value = "all", env = "SUPPORT_HEATMAP_AGENT")]
    agent: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_response_heatmap=info,support_heatmap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Weeks { files } => {
            let session = load_session(&files).await?;
            if session.available_weeks().is_empty() {
                println!("No responses found.");
                return Ok(());
            }
            for week in session.available_weeks() {
                println!("{week}");
            }
        }
        Commands::Agents { files } => {
            let session = load_session(&files).await?;
            if session.agents().is_empty() {
                println!("No agents found.");
                return Ok(());
            }
            for agent in session.agents() {
                println!("{agent}");
            }
        }
        Commands::Report {
            files,
            selection,
            view,
            day,
            out,
        } => {
            let mut session = load_session(&files).await?;
            apply_selection(&mut session, &selection)?;
            session.select_view(view)?;
            let report = report::build_report(&session, session.view(), day);
            match out {
                Some(path) => {
                    tokio::fs::write(&path, report)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{report}"),
            }
        }
        Commands::Json { files, selection } => {
            let mut session = load_session(&files).await?;
            apply_selection(&mut session, &selection)?;
            let body = serde_json::json!({
                "range": session.selected_range(),
                "agent": session.agent_filter(),
                "weeks": session.available_weeks(),
                "agents": session.agents(),
                "summary": session.summary(),
                "heatmap": session.heatmap(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

/// Reads every path concurrently and submits whatever could be read.
/// Per-file failures are reported; only a run where nothing loads fails.
async fn load_session(paths: &[PathBuf]) -> anyhow::Result<Session> {
    let reads: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| {
            tokio::spawn(async move {
                let text = tokio::fs::read_to_string(&path).await;
                (path, text)
            })
        })
        .collect();

    let mut files = Vec::new();
    let mut failures = 0usize;
    for read in reads {
        let (path, text) = read.await.context("file read task failed")?;
        match text {
            Ok(text) => files.push(SourceFile::new(source_name(&path), text)),
            Err(err) => {
                error!(path = %path.display(), error = %err, "could not read file");
                eprintln!("{}: {err}", path.display());
                failures += 1;
            }
        }
    }

    let mut session = Session::new();
    let outcome = session.submit_files(files).await;
    for err in &outcome.errors {
        eprintln!("{err}");
    }
    for warning in &outcome.warnings {
        eprintln!(
            "warning: {}:{}: {}",
            warning.file, warning.line, warning.reason
        );
    }
    failures += outcome.errors.len();

    if outcome.file_results.is_empty() && failures > 0 {
        bail!("none of the {} input file(s) could be loaded", paths.len());
    }
    info!(
        files = outcome.file_results.len(),
        failures,
        events = session.store().event_count(),
        "session loaded"
    );
    Ok(session)
}

fn apply_selection(session: &mut Session, selection: &Selection) -> anyhow::Result<()> {
    let filter: AgentFilter = selection.agent.parse()?;
    if let Some(agent) = filter.agent() {
        if !session.agents().iter().any(|a| a == agent) {
            bail!("no responses from agent {agent}");
        }
    }
    session.select_agent(filter);

    if let Some(date) = selection.week {
        let start = week_start(date);
        let week = session
            .available_weeks()
            .iter()
            .find(|w| w.start == start)
            .copied()
            .with_context(|| format!("no data in the week containing {date}"))?;
        session.select_range(week)?;
    } else if let (Some(from), Some(to)) = (selection.from, selection.to) {
        session.select_range(WeekRange::new(from, to)?)?;
    }

    Ok(())
}

/// Files are keyed by the path as given, so `a/march.csv` and
/// `b/march.csv` load side by side instead of replacing each other.
fn source_name(path: &Path) -> String {
    path.display().to_string()
}

fn parse_day(value: &str) -> Result<Weekday, String> {
    value
        .parse::<Weekday>()
        .map_err(|_| format!("unknown day {value:?}"))
}
