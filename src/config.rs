//! Observer configuration
//!
//! [`ObserverConfig`] is what the observer runs with. [`ObserverArgs`] is the option group a host
//! runner's CLI can flatten into its own parser; it resolves into an `ObserverConfig`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use encoding_rs::Encoding;

use crate::errors::ObserverError;

/// Default readiness wait for one poll on a telemetry pipe.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// Default `TestRun@project_name`.
pub const DEFAULT_PROJECT_NAME: &str = "Ender's Game";

/// Default report file name, resolved against the working directory.
pub const DEFAULT_REPORT_FILE: &str = "report.xml";

/// A named pipe drained once per test event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryChannel {
    /// Path of the named pipe.
    pub path: PathBuf,
    /// Human label used in the "no output" placeholder.
    pub label: String,
    /// Element name the drained text is written under.
    pub element: String,
}

impl TelemetryChannel {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            element: element.into(),
        }
    }

    /// Flight dynamics simulator output (`jsb_pipe`).
    pub fn jsbsim() -> Self {
        Self::new("jsb_pipe", "JSBSim", "JSBSim-out")
    }

    /// Ground-station proxy output (`mavproxy_pipe`).
    pub fn mavproxy() -> Self {
        Self::new("mavproxy_pipe", "mavproxy", "MAVProxy-out")
    }

    /// Body written when the pipe produced nothing during a test.
    pub fn placeholder(&self) -> String {
        format!("No {} output", self.label)
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

/// Observer configuration
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Where the XML report is written
    pub report_path: PathBuf,
    /// First telemetry pipe
    pub telemetry_a: TelemetryChannel,
    /// Second telemetry pipe
    pub telemetry_b: TelemetryChannel,
    /// Encoding for decoding captured bytes and writing the report
    pub encoding: &'static Encoding,
    /// `TestRun@project_name`
    pub project_name: String,
    /// Above 1, the report step prints the report location
    pub verbosity: u8,
    /// Readiness wait per poll when draining a pipe
    pub poll_timeout: Duration,
    /// Module prefix stripped from error type names, for runtimes that prefix their builtins
    pub legacy_module_prefix: Option<String>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        let report_path = env::current_dir()
            .map(|dir| dir.join(DEFAULT_REPORT_FILE))
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_FILE));
        Self {
            report_path,
            telemetry_a: TelemetryChannel::jsbsim(),
            telemetry_b: TelemetryChannel::mavproxy(),
            encoding: encoding_rs::UTF_8,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            verbosity: 1,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            legacy_module_prefix: None,
        }
    }
}

impl ObserverConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    pub fn with_telemetry_paths(mut self, a: impl Into<PathBuf>, b: impl Into<PathBuf>) -> Self {
        self.telemetry_a = self.telemetry_a.with_path(a);
        self.telemetry_b = self.telemetry_b.with_path(b);
        self
    }

    /// Set the text encoding by label (`utf-8`, `latin1`, `windows-1252`, ...).
    pub fn with_encoding(mut self, label: &str) -> Result<Self, ObserverError> {
        self.encoding = resolve_encoding(label)?;
        Ok(self)
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_legacy_module_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.legacy_module_prefix = Some(prefix.into());
        self
    }
}

/// Look up an encoding by its WHATWG label.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, ObserverError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| ObserverError::UnknownEncoding(label.to_string()))
}

/// Observer options, for flattening into a host CLI.
#[derive(Args, Debug, Clone)]
pub struct ObserverArgs {
    /// Path of the XML report (default: report.xml in the working directory)
    #[arg(long = "report-path", value_name = "FILE", env = "APLOG_REPORT_FILE")]
    pub report_path: Option<PathBuf>,

    /// Named pipe carrying JSBSim output
    #[arg(long = "telemetry-pipe-a", value_name = "FILE", default_value = "jsb_pipe")]
    pub telemetry_pipe_a: PathBuf,

    /// Named pipe carrying MAVProxy output
    #[arg(long = "telemetry-pipe-b", value_name = "FILE", default_value = "mavproxy_pipe")]
    pub telemetry_pipe_b: PathBuf,

    /// Text encoding for captured output and the report file
    #[arg(long, value_name = "LABEL", default_value = "UTF-8")]
    pub encoding: String,

    /// Project name written to the report root
    #[arg(long = "project-name", value_name = "NAME", default_value = DEFAULT_PROJECT_NAME)]
    pub project_name: String,

    /// Readiness wait per pipe poll, in milliseconds
    #[arg(long = "poll-timeout-ms", value_name = "MS", default_value_t = 2000)]
    pub poll_timeout_ms: u64,

    /// Module prefix stripped from error type names
    #[arg(long = "legacy-module-prefix", value_name = "PREFIX")]
    pub legacy_module_prefix: Option<String>,

    /// Increase verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ObserverArgs {
    /// Resolve the options into a configuration.
    pub fn into_config(self) -> Result<ObserverConfig, ObserverError> {
        let mut config = ObserverConfig::new()
            .with_telemetry_paths(self.telemetry_pipe_a, self.telemetry_pipe_b)
            .with_encoding(&self.encoding)?
            .with_project_name(self.project_name)
            .with_verbosity(self.verbose.saturating_add(1))
            .with_poll_timeout(Duration::from_millis(self.poll_timeout_ms));
        if let Some(path) = self.report_path {
            config = config.with_report_path(path);
        }
        if let Some(prefix) = self.legacy_module_prefix {
            config = config.with_legacy_module_prefix(prefix);
        }
        Ok(config)
    }
}
