mod cli;
mod config;
mod session;
mod ui;

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use outreach_core::{Effect, JobId, Msg};
use outreach_engine::{load_prospects, EngineEvent, EngineHandle, Survey};
use outreach_logging::{outreach_error, outreach_info};

use cli::{Cli, Command};
use config::AppConfig;
use session::{Session, SessionEnd};

/// Upper bound for a one-off export request.
const EXPORT_TIMEOUT: Duration = Duration::from_secs(120);

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            outreach_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = config::load(cli.config.as_deref())?;
    config.apply(cli.overrides());
    outreach_logging::initialize(&config.log_settings());

    match cli.command {
        Command::Run { survey, prospects } => run_job(&config, &survey, &prospects),
        Command::Watch { job, total } => {
            let job_id = JobId::new(job);
            if job_id.is_empty() {
                bail!("--job must not be empty");
            }
            let engine = start_engine(&config)?;
            let mut session = Session::new(&engine, config.session_settings());
            let end = session.run(Some(Msg::JobCreated {
                job_id,
                total_count: total,
            }));
            Ok(report(end))
        }
        Command::Export { job } => export_only(&config, JobId::new(job)),
    }
}

fn run_job(config: &AppConfig, survey_path: &Path, prospects_path: &Path) -> Result<ExitCode> {
    // Validate everything locally before anything is sent.
    let survey = load_survey(survey_path)?;
    let prospects = load_prospects(prospects_path, &config.required_fields())
        .with_context(|| format!("invalid prospect list {}", prospects_path.display()))?;
    outreach_info!(
        "Submitting {} prospects for '{}'",
        prospects.total_count(),
        survey.audience
    );

    let engine = start_engine(config)?;
    engine.start_job(survey, prospects);
    let mut session = Session::new(&engine, config.session_settings());
    Ok(report(session.run(None)))
}

fn export_only(config: &AppConfig, job_id: JobId) -> Result<ExitCode> {
    if job_id.is_empty() {
        bail!("--job must not be empty");
    }
    let engine = start_engine(config)?;
    engine.execute(Effect::ExportResults {
        job_id: job_id.clone(),
    });
    match engine.recv_timeout(EXPORT_TIMEOUT)? {
        Some(EngineEvent::ExportCompleted {
            result: Ok(summary),
            ..
        }) => {
            println!(
                "Saved {} records to {}",
                summary.record_count,
                summary.output_path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Some(EngineEvent::ExportCompleted {
            result: Err(message),
            ..
        }) => bail!("export of job {job_id} failed: {message}"),
        _ => bail!("export of job {job_id} did not finish in time"),
    }
}

fn start_engine(config: &AppConfig) -> Result<EngineHandle> {
    EngineHandle::new(config.engine_config()).context("failed to set up the backend client")
}

fn load_survey(path: &Path) -> Result<Survey> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read survey {}", path.display()))?;
    let survey: Survey =
        ron::from_str(&text).with_context(|| format!("invalid survey {}", path.display()))?;
    survey.validate()?;
    Ok(survey)
}

fn report(end: SessionEnd) -> ExitCode {
    match end {
        SessionEnd::Exported { path, record_count } => {
            println!("Done: {} records saved to {}", record_count, path.display());
            ExitCode::SUCCESS
        }
        SessionEnd::Completed => {
            println!("Done: all prospects processed");
            ExitCode::SUCCESS
        }
        SessionEnd::Failed(message) => {
            outreach_error!("{}", message);
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
