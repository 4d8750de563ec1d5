//! CLI command definitions and argument parsing.

use augur_domain::{HypothesisStatus, Outcome};
use clap::{Parser, Subcommand};

/// Augur CLI - Evaluate hypotheses about entities from signals and evidence.
#[derive(Debug, Parser)]
#[command(name = "augur")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(long, global = true, env = "AUGUR_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a default configuration file
    Init(InitArgs),

    /// Run one evaluation cycle, or keep running with --watch
    Run(RunArgs),

    /// Ingest a signal about an entity
    Ingest(IngestArgs),

    /// Record the outcome of a hypothesis
    Outcome(OutcomeArgs),

    /// Record a historical episode about an entity
    Episode(EpisodeArgs),

    /// List hypotheses
    Hypotheses(HypothesesArgs),

    /// Print population analytics
    Report,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Keep running cycles on the worker interval until Ctrl+C
    #[arg(short, long)]
    pub watch: bool,

    /// Override the worker interval (seconds)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Entity the signal is about (e.g., org:acme)
    #[arg(short, long)]
    pub entity: String,

    /// Hypothesis category (e.g., procurement)
    #[arg(short, long)]
    pub category: String,

    /// Signal payload text
    #[arg(short, long)]
    pub payload: String,

    /// Evidence source type
    #[arg(short, long, default_value = "signal")]
    pub source_type: String,

    /// Where the signal came from
    #[arg(short, long)]
    pub url: Option<String>,

    /// When the signal was observed (seconds since epoch); defaults to now
    #[arg(long)]
    pub observed_at: Option<u64>,
}

/// Arguments for the outcome command.
#[derive(Debug, Parser)]
pub struct OutcomeArgs {
    /// Hypothesis ID
    #[arg(long)]
    pub hypothesis: String,

    /// Recorded decision
    #[arg(short, long, value_enum)]
    pub outcome: OutcomeArg,

    /// Effectiveness score (0.0-1.0); defaults to the outcome's weight
    #[arg(short, long)]
    pub score: Option<f64>,
}

/// Arguments for the episode command.
#[derive(Debug, Parser)]
pub struct EpisodeArgs {
    /// Entity the episode is about
    #[arg(short, long)]
    pub entity: String,

    /// Kind of episode
    #[arg(short = 't', long = "type")]
    pub episode_type: String,

    /// Episode payload text
    #[arg(short, long)]
    pub payload: String,

    /// Start of the validity window (seconds since epoch); defaults to now
    #[arg(long)]
    pub valid_at: Option<u64>,

    /// End of the validity window (seconds since epoch, exclusive)
    #[arg(long)]
    pub valid_before: Option<u64>,

    /// ID of the episode this one corrects
    #[arg(long)]
    pub invalidates: Option<String>,
}

/// Arguments for the hypotheses command.
#[derive(Debug, Parser)]
pub struct HypothesesArgs {
    /// Filter by status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Filter by entity
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Filter by category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Outcome argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutcomeArg {
    /// Acted on and confirmed
    Accept,
    /// Partially confirmed
    WeakAccept,
    /// Disproved or not worth acting on
    Reject,
}

/// Status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusArg {
    /// Still being evaluated
    Active,
    /// Accepted by an outcome
    Promoted,
    /// Rejected by an outcome or exhausted
    Rejected,
    /// Moved too fast; needs review
    Escalated,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<OutcomeArg> for Outcome {
    fn from(outcome: OutcomeArg) -> Self {
        match outcome {
            OutcomeArg::Accept => Outcome::Accept,
            OutcomeArg::WeakAccept => Outcome::WeakAccept,
            OutcomeArg::Reject => Outcome::Reject,
        }
    }
}

impl From<StatusArg> for HypothesisStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Active => HypothesisStatus::Active,
            StatusArg::Promoted => HypothesisStatus::Promoted,
            StatusArg::Rejected => HypothesisStatus::Rejected,
            StatusArg::Escalated => HypothesisStatus::Escalated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_command() {
        let cli = Cli::parse_from([
            "augur",
            "ingest",
            "--entity",
            "org:acme",
            "--category",
            "procurement",
            "--payload",
            "Issued an RFP for fleet telematics",
        ]);
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.entity, "org:acme");
                assert_eq!(args.source_type, "signal");
                assert!(args.url.is_none());
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_outcome_command() {
        let cli = Cli::parse_from([
            "augur",
            "--format",
            "json",
            "outcome",
            "--hypothesis",
            "0189c2f0-0000-7000-8000-000000000000",
            "--outcome",
            "weak-accept",
            "--score",
            "0.7",
        ]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        match cli.command {
            Command::Outcome(args) => {
                assert_eq!(args.outcome, OutcomeArg::WeakAccept);
                assert_eq!(args.score, Some(0.7));
            }
            _ => panic!("Expected Outcome command"),
        }
    }

    #[test]
    fn test_run_watch_flag() {
        let cli = Cli::parse_from(["augur", "run", "--watch"]);
        assert!(matches!(cli.command, Command::Run(RunArgs { watch: true, interval: None })));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Outcome::from(OutcomeArg::Reject), Outcome::Reject);
        assert_eq!(HypothesisStatus::from(StatusArg::Escalated), HypothesisStatus::Escalated);
    }

    #[test]
    fn test_outcome_is_required() {
        let result = Cli::try_parse_from(["augur", "outcome", "--hypothesis", "x"]);
        assert!(result.is_err());
    }
}
