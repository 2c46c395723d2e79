use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Overrides, TransportSetting};

#[derive(Debug, Parser)]
#[command(name = "outreach")]
#[command(about = "Generate personalised outreach copy for a prospect list and track its progress")]
#[command(version)]
pub struct Cli {
    /// Configuration file (RON). Defaults to ./outreach.ron when present.
    #[arg(long, global = true, env = "OUTREACH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the hosted functions
    #[arg(long, global = true, env = "OUTREACH_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// API key sent with every request
    #[arg(long, global = true, env = "OUTREACH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// How progress updates are received
    #[arg(long, global = true, value_enum)]
    pub transport: Option<TransportSetting>,

    /// Directory for downloaded results
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Re-read the count after this many milliseconds without progress (0 disables)
    #[arg(long, global = true)]
    pub refresh_after_ms: Option<u64>,

    /// Do not download results when the job completes
    #[arg(long, global = true)]
    pub no_export: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a survey with its prospect list and follow the job to completion
    Run {
        /// Survey answers (RON)
        #[arg(long)]
        survey: PathBuf,
        /// Prospect list (CSV)
        #[arg(long)]
        prospects: PathBuf,
    },
    /// Follow an existing job
    Watch {
        /// Job (survey) id
        #[arg(long)]
        job: String,
        /// Number of prospects in the job
        #[arg(long)]
        total: u64,
    },
    /// Download the results of a job
    Export {
        /// Job (survey) id
        #[arg(long)]
        job: String,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backend_url: self.backend_url.clone(),
            api_key: self.api_key.clone(),
            transport: self.transport,
            output_dir: self.output_dir.clone(),
            poll_interval_ms: self.poll_interval_ms,
            refresh_after_ms: self.refresh_after_ms,
            no_export: self.no_export,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "outreach",
            "watch",
            "--job",
            "s-1",
            "--total",
            "50",
            "--transport",
            "poll",
            "--no-export",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.transport, Some(TransportSetting::Poll));
        assert!(overrides.no_export);
        match cli.command {
            Command::Watch { job, total } => {
                assert_eq!(job, "s-1");
                assert_eq!(total, 50);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
