use super::{exit, exit_code_for};
use crate::cli::OutputFormat;
use crate::diagnostics::{render_error, render_status, status_json};
use crate::endpoint::EndpointResolver;
use anyhow::Result;
use std::io::Write;

/// Resolve once and report the binding. A failed resolution still prints the
/// status (with every rejected source) before the error.
pub fn handle_status<W: Write>(
    resolver: &EndpointResolver,
    format: OutputFormat,
    out: &mut W,
) -> Result<u8> {
    let outcome = resolver.resolve();
    let status = resolver.status();

    match format {
        OutputFormat::Json => writeln!(out, "{}", status_json(&status)?)?,
        OutputFormat::Terminal => write!(out, "{}", render_status(&status))?,
    }

    match outcome {
        Ok(_) => Ok(exit::SUCCESS),
        Err(err) => {
            if format == OutputFormat::Terminal {
                eprint!("{}", render_error(&err));
            }
            Ok(exit_code_for(&err))
        }
    }
}
