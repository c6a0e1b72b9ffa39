use super::{exit, exit_code_for};
use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::client::{AnalysisClient, AnalysisRequest, AnalysisResult, Transport};
use crate::config::{validate_config, InsightConfig};
use crate::diagnostics::render_error;
use crate::payload::AnalysisPayload;
use anyhow::{Context, Result};
use colored::*;
use serde_json::{json, Map, Value};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Fold `--max-retries` and `--timeout` into `config`, then validate the
/// result the same way a config file is validated.
pub fn apply_overrides(mut config: InsightConfig, args: &AnalyzeArgs) -> Result<InsightConfig> {
    if let Some(max_retries) = args.max_retries {
        config.retry.max_retries = max_retries;
    }
    if let Some(timeout) = args.timeout_seconds {
        config.client.request_timeout_seconds = timeout;
    }
    validate_config(&config).context("Invalid command-line override")?;
    Ok(config)
}

/// Turn the input flags into a request body.
///
/// `--payload` is sent as-is after checking it is JSON; `--csv` and `--rows`
/// go through [`AnalysisPayload`].
pub fn build_request(args: &AnalyzeArgs) -> Result<AnalysisRequest> {
    let input = &args.input;
    if let Some(path) = &input.payload {
        let bytes = read_input(path)?;
        serde_json::from_slice::<Value>(&bytes)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        return Ok(AnalysisRequest::from_bytes(bytes));
    }

    let payload = if let Some(path) = &input.csv {
        let bytes = read_input(path)?;
        AnalysisPayload::csv(String::from_utf8_lossy(&bytes).into_owned())
    } else if let Some(path) = &input.rows {
        let bytes = read_input(path)?;
        let rows: Vec<Map<String, Value>> = serde_json::from_slice(&bytes)
            .with_context(|| format!("{} must hold a JSON array of objects", path.display()))?;
        AnalysisPayload::rows(rows)
    } else {
        anyhow::bail!("one of --payload, --csv or --rows is required");
    };

    let mut payload = payload
        .response_format(args.response_format)
        .industry(args.industry.clone());
    if let Some(analysis_type) = args.analysis_type {
        payload = payload.analysis_type(analysis_type);
    }
    if let Some(instruction) = &args.instruction {
        payload = payload.instruction(instruction.clone());
    }

    AnalysisRequest::try_from(&payload).context("Invalid analysis payload")
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Run one analysis and print the outcome. Dispatch failures are rendered on
/// stderr and mapped to an exit code; only I/O on `out` is an `Err`.
pub async fn handle_analyze<T: Transport, W: Write>(
    client: &AnalysisClient<T>,
    request: &AnalysisRequest,
    args: &AnalyzeArgs,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<u8> {
    match client.analyze_with_cancel(request, cancel).await {
        Ok(result) => {
            write_result(&result, args, out)?;
            Ok(exit::SUCCESS)
        }
        Err(err) => {
            eprint!("{}", render_error(&err));
            Ok(exit_code_for(&err))
        }
    }
}

fn write_result<W: Write>(result: &AnalysisResult, args: &AnalyzeArgs, out: &mut W) -> Result<()> {
    if args.raw {
        out.write_all(&result.body)?;
        return Ok(());
    }

    match args.format {
        OutputFormat::Json => {
            let body = serde_json::from_slice::<Value>(&result.body)
                .unwrap_or_else(|_| Value::String(result.body_text()));
            let report = json!({ "result": result, "body": body });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        OutputFormat::Terminal => {
            writeln!(
                out,
                "{} {} ({}, epoch {}, {} attempt{}, {} ms)",
                "analysis from".dimmed(),
                result.endpoint.as_str().cyan(),
                result.provenance,
                result.epoch,
                result.attempts,
                if result.attempts == 1 { "" } else { "s" },
                result.elapsed.as_millis()
            )?;
            let envelope = result.envelope();
            match envelope.as_ref().and_then(|e| e.summary()) {
                Some(summary) => writeln!(out, "{}", summary)?,
                None => writeln!(out, "{}", result.body_text())?,
            }
        }
    }
    Ok(())
}
