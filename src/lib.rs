#![forbid(unsafe_code)]
//! aplog: test-run observer for autopilot integration tests
//!
//! A host test runner reports lifecycle events (contexts entered and left, tests started, passed,
//! failed, errored or skipped). For each test the observer captures stdout and stderr, drains two
//! named telemetry pipes, times the test and writes everything to an XML report at the end of the
//! run.
//!
//! ## Layout
//!
//! - [`recorder`]: the [`TestLifecycle`] hooks and the [`Observer`] implementing them
//! - [`capture`]: nested capture frames and tee sinks
//! - [`pipe`]: non-blocking named-pipe draining
//! - [`report`]: test records, counters and XML rendering
//! - [`config`]: observer settings and the flattenable CLI option group
//! - [`cli`]: the `aplog` binary
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`. Observer failures are logged and degrade to empty report sections.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod capture;
pub mod cli;
pub mod config;
pub mod errors;
pub mod pipe;
pub mod recorder;
pub mod report;

pub use config::{ObserverArgs, ObserverConfig, TelemetryChannel};
pub use errors::{ErrorCategory, ErrorInfo, ErrorMessage, ObserverError};
pub use recorder::{Observer, TestLifecycle};
pub use report::{ReportAggregator, RunStats, TestRecord, TestStatus};
