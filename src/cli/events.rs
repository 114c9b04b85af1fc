//! Lifecycle event stream for the `observe` command
//!
//! One JSON object per line, tagged by `event`:
//!
//! ```text
//! {"event":"start_context","name":"pkg"}
//! {"event":"before_test","test":"pkg.T.test_ok"}
//! {"event":"output","stream":"stdout","text":"armed\n"}
//! {"event":"add_failure","test":"pkg.T.test_ok","error":{"type":"ValueError","message":"boom"}}
//! {"event":"after_test","test":"pkg.T.test_ok"}
//! {"event":"stop_context","name":"pkg"}
//! ```

use serde::Deserialize;

use crate::capture::Stream;
use crate::errors::{ErrorCategory, ErrorInfo, ErrorMessage};

/// One lifecycle event emitted by a host runner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    StartContext { name: String },
    StopContext { name: String },
    BeforeTest { test: String },
    AfterTest { test: String },
    Output { stream: OutputStream, text: String },
    AddSuccess { test: String },
    AddFailure { test: String, error: EventError },
    AddError { test: String, error: EventError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl From<OutputStream> for Stream {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => Stream::Stdout,
            OutputStream::Stderr => Stream::Stderr,
        }
    }
}

/// Error details as carried in the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventError {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub traceback: String,
    /// The runner classified this error as a skip.
    #[serde(default)]
    pub skip: bool,
}

impl From<&EventError> for ErrorInfo {
    fn from(err: &EventError) -> Self {
        let category = if err.skip {
            ErrorCategory::Skip
        } else {
            ErrorCategory::Error
        };
        ErrorInfo {
            category,
            type_name: err.type_name.clone(),
            module: err.module.clone(),
            message: ErrorMessage {
                rendered: err.message.as_ref().map(|m| m.clone().into_bytes()),
                args: err.args.clone(),
            },
            traceback: err.traceback.clone(),
        }
    }
}

/// Parse one line of the event stream.
pub fn parse_event(line: &str) -> Result<LifecycleEvent, serde_json::Error> {
    serde_json::from_str(line)
}
