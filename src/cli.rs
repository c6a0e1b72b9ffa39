use crate::payload::{AnalysisType, ResponseFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Terminal,
    /// Machine-readable JSON on stdout
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "insightlink")]
#[command(about = "Resolve the analysis endpoint and dispatch analysis requests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the nearest .insightlink.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the endpoint and report where it came from
    Status {
        /// Explicit endpoint override (highest priority)
        #[arg(long)]
        endpoint: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,
    },

    /// Send an analysis request to the resolved endpoint
    Analyze(AnalyzeArgs),

    /// Write a default .insightlink.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Explicit endpoint override (highest priority)
    #[arg(long)]
    pub endpoint: Option<String>,

    #[command(flatten)]
    pub input: PayloadInput,

    /// Analysis type sent with --csv or --rows
    #[arg(long = "analysis-type", value_enum)]
    pub analysis_type: Option<AnalysisType>,

    /// Summary format requested from the backend
    #[arg(long = "response-format", value_enum, default_value = "json")]
    pub response_format: ResponseFormat,

    /// Industry hint for the analysis
    #[arg(long, default_value = "general")]
    pub industry: String,

    /// Extra instruction appended to the prompt
    #[arg(long)]
    pub instruction: Option<String>,

    /// Override retry.max_retries
    #[arg(long = "max-retries")]
    pub max_retries: Option<u32>,

    /// Override client.request_timeout_seconds
    #[arg(long = "timeout")]
    pub timeout_seconds: Option<u64>,

    /// Print the response body verbatim
    #[arg(long)]
    pub raw: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadInput {
    /// Complete JSON request body ("-" reads stdin)
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// CSV file sent as the `csv` field
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// JSON array of row objects sent as `salesData`
    #[arg(long)]
    pub rows: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_requires_exactly_one_input() {
        assert!(Cli::try_parse_from(["insightlink", "analyze"]).is_err());
        assert!(Cli::try_parse_from([
            "insightlink",
            "analyze",
            "--csv",
            "a.csv",
            "--rows",
            "b.json"
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "insightlink",
            "analyze",
            "--csv",
            "a.csv",
            "--analysis-type",
            "inventory",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbosity, 2);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.input.csv, Some(PathBuf::from("a.csv")));
                assert_eq!(args.analysis_type, Some(AnalysisType::Inventory));
                assert_eq!(args.response_format, ResponseFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_status_flags() {
        let cli = Cli::try_parse_from([
            "insightlink",
            "status",
            "--endpoint",
            "https://x.example",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Status { endpoint, format } => {
                assert_eq!(endpoint.as_deref(), Some("https://x.example"));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
