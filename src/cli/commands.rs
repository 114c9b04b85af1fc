//! Command implementations for the aplog CLI

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::events::{LifecycleEvent, parse_event};
use super::{CliError, CliResult, ExitCode};
use crate::config::ObserverArgs;
use crate::errors::ErrorInfo;
use crate::recorder::{Observer, TestLifecycle};

/// What a replay consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events dispatched to the observer
    pub events: usize,
    /// Lines that were not valid events
    pub rejected: usize,
}

/// `aplog observe`: replay an event stream, then write the report.
pub fn observe(events: &Path, args: ObserverArgs) -> CliResult<ExitCode> {
    let config = args
        .into_config()
        .map_err(|e| CliError::failure(format!("Error: {e}")))?;
    let mut observer = Observer::new(config);

    let summary = if events == Path::new("-") {
        replay(&mut observer, io::stdin().lock())
    } else {
        let file = File::open(events)
            .map_err(|e| CliError::failure(format!("Error opening {}: {e}", events.display())))?;
        replay(&mut observer, BufReader::new(file))
    }
    .map_err(|e| CliError::failure(format!("Error reading events: {e}")))?;

    tracing::info!(events = summary.events, rejected = summary.rejected, "replay finished");

    let written = observer.report(&mut io::stderr());
    observer.finalize();
    written.map_err(|e| CliError::failure(format!("Error: {e}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Feed every event line from `input` to `observer`.
///
/// Blank lines are ignored. Lines that do not parse are logged and skipped; only a read failure on
/// `input` itself is an error.
pub fn replay<R: BufRead>(observer: &mut Observer, input: R) -> io::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_event(&line) {
            Ok(event) => {
                dispatch(observer, event);
                summary.events += 1;
            }
            Err(e) => {
                tracing::warn!(line = index + 1, "skipping malformed event: {e}");
                summary.rejected += 1;
            }
        }
    }
    Ok(summary)
}

fn dispatch(observer: &mut Observer, event: LifecycleEvent) {
    match event {
        LifecycleEvent::StartContext { name } => observer.start_context(&name),
        LifecycleEvent::StopContext { name } => observer.stop_context(&name),
        LifecycleEvent::BeforeTest { test } => observer.before_test(&test),
        LifecycleEvent::AfterTest { test } => observer.after_test(&test),
        LifecycleEvent::Output { stream, text } => observer.write_output(stream.into(), text.as_bytes()),
        LifecycleEvent::AddSuccess { test } => observer.add_success(&test),
        LifecycleEvent::AddFailure { test, error } => observer.add_failure(&test, &ErrorInfo::from(&error)),
        LifecycleEvent::AddError { test, error } => observer.add_error(&test, &ErrorInfo::from(&error)),
    }
}
