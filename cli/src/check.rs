//! Recorded trace checking

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracewalk_core::{Event, FailurePolicy, OriginFilter, TransitionTree, ValidatorConfig};
use tracewalk_runtime::{CompletionError, IterSource, validate};

/// Flags that shape the validator config
#[derive(Debug, Default)]
pub struct CheckOptions {
    pub config: Option<PathBuf>,
    pub origin: Option<String>,
    pub delay_ms: Option<u64>,
}

impl CheckOptions {
    /// File, then environment, then command-line flags.
    pub fn resolve(self) -> Result<ValidatorConfig> {
        let config = match &self.config {
            Some(path) => ValidatorConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => ValidatorConfig::default(),
        };
        let mut config = config
            .apply_env()
            .context("Invalid TRACEWALK_* environment override")?;

        if let Some(origin) = self.origin {
            config.origin = OriginFilter::exact(origin);
        }
        if let Some(ms) = self.delay_ms {
            config.failure_policy = FailurePolicy::delayed(ms);
        }
        Ok(config)
    }
}

/// Parse a recorded trace: one bare event name or JSON event per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_trace(src: &str) -> Result<Vec<Event>> {
    src.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            if line.starts_with('{') {
                serde_json::from_str(line)
                    .with_context(|| format!("Invalid JSON event on line {n}"))
            } else {
                Ok(Event::new(line))
            }
        })
        .collect()
}

fn read_trace(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read trace from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file: {}", path.display()))
}

/// Run the check and report the verdict
pub async fn run_check_command(
    tree: &TransitionTree,
    trace_path: &Path,
    options: CheckOptions,
) -> Result<ExitCode> {
    let config = options.resolve()?;
    let events = parse_trace(&read_trace(trace_path)?)?;
    tracing::debug!(events = events.len(), "Loaded recorded trace");

    let mut source = IterSource::new(events);
    match validate(tree, config, &mut source).await {
        Ok(label) => {
            println!("matched: {label}");
            Ok(ExitCode::SUCCESS)
        }
        Err(CompletionError::Unmatched(unmatched)) => {
            println!("unmatched after {} events:", unmatched.trace.len());
            for (i, name) in unmatched.trace.iter().enumerate() {
                println!("  {:>3}. {name}", i + 1);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(CompletionError::Incomplete { trace }) => {
            println!("incomplete: {trace}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            tracing::error!(error = %err, "Validation aborted");
            Err(err.into())
        }
    }
}
