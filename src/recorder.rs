//! Test-event recorder
//!
//! ## TestLifecycle Trait
//!
//! A host test runner drives the observer through [`TestLifecycle`], one call per lifecycle event.
//! The trait is the whole integration surface: any runner that can call these hooks gets captured
//! output, drained telemetry and an XML report.
//!
//! ## Event handling
//!
//! - `before_test` starts a monotonic timer for the test and pushes a capture frame. Telemetry
//!   already waiting in the pipes was produced outside the test and is discarded.
//! - `add_success` / `add_failure` / `add_error` read the current frame's captures, drain both
//!   telemetry pipes once, build a [`TestRecord`] and append it.
//! - `after_test` pops the frame, which closes that test's pipe handles.
//! - `finalize` pops whatever frames abnormal termination left behind.
//!
//! Failures inside the observer (pipes, encodings) degrade to empty sections and zero timings.
//! They are logged, never turned into test outcomes.

use std::io::Write;
use std::time::{Duration, Instant};

use aplog_core::TestIdentity;

use crate::capture::{CaptureStack, Stream, TelemetryPipe};
use crate::config::{ObserverConfig, TelemetryChannel};
use crate::errors::{ErrorInfo, ObserverError};
use crate::pipe::PipeReader;
use crate::report::{FailureDetail, ReportAggregator, TelemetryCapture, TestRecord, TestStatus};

/// Lifecycle hooks a host test runner calls.
pub trait TestLifecycle {
    /// Apply configuration; resets collected results.
    fn configure(&mut self, config: ObserverConfig);

    /// A grouping context (package, module, class) was entered.
    fn start_context(&mut self, context: &str);

    /// The innermost grouping context was left.
    fn stop_context(&mut self, context: &str);

    /// A test is about to run.
    fn before_test(&mut self, test_id: &str);

    /// A test finished running, whatever its outcome.
    fn after_test(&mut self, test_id: &str);

    /// A test raised an error; skip-category errors are recorded as skipped.
    fn add_error(&mut self, test_id: &str, err: &ErrorInfo);

    /// A test failed an assertion.
    fn add_failure(&mut self, test_id: &str, err: &ErrorInfo);

    /// A test passed.
    fn add_success(&mut self, test_id: &str);

    /// Write the XML report; `stream` receives the status line when verbose.
    fn report(&mut self, stream: &mut dyn Write) -> Result<(), ObserverError>;

    /// The run is over; release any capture state still active.
    ///
    /// Runners that pass their result object to this hook keep it; the observer reads nothing
    /// from it.
    fn finalize(&mut self);
}

/// Records test events into a report.
pub struct Observer {
    config: ObserverConfig,
    capture: CaptureStack,
    reader: PipeReader,
    results: ReportAggregator,
    timer: Option<(String, Instant)>,
}

impl Observer {
    /// Observer capturing over the process console.
    pub fn new(config: ObserverConfig) -> Self {
        let capture = CaptureStack::console(&config);
        Self::with_capture(config, capture)
    }

    /// Observer over an explicit capture stack.
    pub fn with_capture(config: ObserverConfig, capture: CaptureStack) -> Self {
        Self {
            reader: PipeReader::new(config.poll_timeout),
            config,
            capture,
            results: ReportAggregator::new(),
            timer: None,
        }
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    pub fn capture(&self) -> &CaptureStack {
        &self.capture
    }

    /// Records and counters collected so far.
    pub fn results(&self) -> &ReportAggregator {
        &self.results
    }

    /// Write test output to the current capture destination.
    pub fn write_output(&self, stream: Stream, data: &[u8]) {
        if let Err(e) = self.capture.write(stream, data) {
            tracing::warn!(?stream, "failed to forward test output: {e}");
        }
    }

    /// Seconds since `before_test` for this test; zero when it never started.
    fn time_taken(&self, test_id: &str) -> Duration {
        match &self.timer {
            Some((id, start)) if id == test_id => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    fn drain_telemetry(&mut self, pipe: TelemetryPipe) -> Option<String> {
        let reader = self.reader;
        let encoding = self.config.encoding;
        let handle = self.capture.telemetry(pipe)?;
        match reader.drain(handle) {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => Some(encoding.decode_without_bom_handling(&bytes).0.into_owned()),
            Err(e) => {
                tracing::warn!("{e}; recording no telemetry for this test");
                None
            }
        }
    }

    /// Throw away whatever the pipes hold right now, without waiting.
    ///
    /// An enclosing context keeps its own reader open on each FIFO, so bytes written between two
    /// tests stay buffered and would otherwise be drained into the next test.
    fn discard_stale_telemetry(&mut self) {
        let flush = PipeReader::new(Duration::ZERO);
        for pipe in [TelemetryPipe::A, TelemetryPipe::B] {
            let Some(handle) = self.capture.telemetry(pipe) else {
                continue;
            };
            match flush.drain(handle) {
                Ok(bytes) if !bytes.is_empty() => {
                    tracing::debug!(?pipe, bytes = bytes.len(), "discarded telemetry written before the test");
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(?pipe, "could not flush stale telemetry: {e}"),
            }
        }
    }

    fn telemetry_capture(&mut self, pipe: TelemetryPipe) -> TelemetryCapture {
        let text = self.drain_telemetry(pipe);
        let channel: &TelemetryChannel = match pipe {
            TelemetryPipe::A => &self.config.telemetry_a,
            TelemetryPipe::B => &self.config.telemetry_b,
        };
        TelemetryCapture {
            element: channel.element.clone(),
            placeholder: channel.placeholder(),
            text,
        }
    }

    fn record(&mut self, test_id: &str, status: TestStatus, err: Option<&ErrorInfo>) {
        let elapsed = self.time_taken(test_id);
        let detail = err.map(|err| FailureDetail {
            type_name: err.qualified_type_name(self.config.legacy_module_prefix.as_deref()),
            message: err.message.to_text(self.config.encoding),
            traceback: err.traceback.clone(),
        });
        let record = TestRecord {
            identity: TestIdentity::parse(test_id),
            status,
            elapsed,
            timestamp: chrono::Local::now().naive_local(),
            stdout: self.capture.captured(Stream::Stdout),
            stderr: self.capture.captured(Stream::Stderr),
            telemetry: [
                self.telemetry_capture(TelemetryPipe::A),
                self.telemetry_capture(TelemetryPipe::B),
            ],
            detail,
        };
        tracing::debug!(test = test_id, status = status.as_str(), ?elapsed, "recorded test outcome");
        self.results.append(record);
    }
}

impl TestLifecycle for Observer {
    fn configure(&mut self, config: ObserverConfig) {
        self.capture.retarget(&config);
        self.reader = PipeReader::new(config.poll_timeout);
        self.config = config;
        self.results = ReportAggregator::new();
        self.timer = None;
    }

    fn start_context(&mut self, context: &str) {
        tracing::trace!(context, "context started");
        self.capture.enter_context(context);
    }

    fn stop_context(&mut self, context: &str) {
        tracing::trace!(context, "context stopped");
        self.capture.exit_context();
    }

    fn before_test(&mut self, test_id: &str) {
        self.timer = Some((test_id.to_string(), Instant::now()));
        self.capture.enter_test(test_id);
        self.discard_stale_telemetry();
    }

    fn after_test(&mut self, _test_id: &str) {
        self.capture.exit_test();
    }

    fn add_error(&mut self, test_id: &str, err: &ErrorInfo) {
        let status = if err.is_skip() {
            TestStatus::Skipped
        } else {
            TestStatus::Error
        };
        self.record(test_id, status, Some(err));
    }

    fn add_failure(&mut self, test_id: &str, err: &ErrorInfo) {
        self.record(test_id, TestStatus::Fail, Some(err));
    }

    fn add_success(&mut self, test_id: &str) {
        self.record(test_id, TestStatus::Pass, None);
    }

    fn report(&mut self, stream: &mut dyn Write) -> Result<(), ObserverError> {
        let path = &self.config.report_path;
        self.results
            .write_to(path, &self.config.project_name, self.config.encoding)?;
        tracing::info!(path = %path.display(), tests = self.results.stats().total(), "wrote test report");
        if self.config.verbosity > 1 {
            writeln!(stream, "{}", "-".repeat(70))?;
            writeln!(stream, "XML: {}", path.display())?;
        }
        Ok(())
    }

    fn finalize(&mut self) {
        self.capture.finalize();
    }
}
