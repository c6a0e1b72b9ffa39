use anyhow::{Context, Result};
use clap::Parser;
use insightlink::cli::{AnalyzeArgs, Cli, Commands};
use insightlink::client::AnalysisClient;
use insightlink::commands::{self, exit};
use insightlink::diagnostics::render_error;
use insightlink::endpoint::EndpointResolver;
use insightlink::env::ProcessEnv;
use insightlink::observability::init_tracing;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbosity, cli.log_json);
    if cli.plain {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let path = commands::init_config(&cwd, force)?;
            println!("Created {}", path.display());
            Ok(exit::SUCCESS)
        }
        Commands::Status { endpoint, format } => {
            let config = commands::resolve_config(cli.config.as_deref())?;
            let resolver = EndpointResolver::from_config(endpoint, &ProcessEnv, &config.endpoint);
            commands::handle_status(&resolver, format, &mut io::stdout().lock())
        }
        Commands::Analyze(args) => run_analyze(cli.config.as_deref(), args).await,
    }
}

async fn run_analyze(config_path: Option<&std::path::Path>, args: AnalyzeArgs) -> Result<u8> {
    let config = commands::apply_overrides(commands::resolve_config(config_path)?, &args)?;

    let resolver = Arc::new(EndpointResolver::from_config(
        args.endpoint.clone(),
        &ProcessEnv,
        &config.endpoint,
    ));
    let client = match AnalysisClient::from_config(resolver, &config) {
        Ok(client) => client,
        Err(err) => {
            eprint!("{}", render_error(&err));
            return Ok(commands::exit_code_for(&err));
        }
    };
    let request = commands::build_request(&args)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let mut out = io::stdout().lock();
    commands::handle_analyze(&client, &request, &args, &cancel, &mut out).await
}
