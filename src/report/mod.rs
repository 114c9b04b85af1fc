//! Report aggregation and output
//!
//! ## Modules
//!
//! - `record` - `TestRecord`, `TestStatus` and the `RunStats` counters
//! - `xml` - serialization of the report document
//!
//! The aggregator owns the ordered record sequence (completion order) and the counters. Rendering
//! and writing never mutate either, so a report can be written any number of times.

pub mod record;
pub mod xml;

use std::fs;
use std::path::Path;

use encoding_rs::Encoding;

pub use record::{FailureDetail, RunStats, TelemetryCapture, TestRecord, TestStatus};

use crate::errors::ObserverError;

/// Collects test records and run counters until the report is written.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    records: Vec<TestRecord>,
    stats: RunStats,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished test and count its outcome.
    pub fn append(&mut self, record: TestRecord) {
        self.stats.record(record.status);
        self.records.push(record);
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Render the report document as text.
    pub fn render(&self, project_name: &str, encoding: &'static Encoding) -> Result<String, ObserverError> {
        xml::render_report(project_name, encoding.output_encoding().name(), &self.stats, &self.records)
    }

    /// Render the report and write it to `path` in `encoding`.
    ///
    /// Characters the encoding cannot represent are written as numeric character references.
    pub fn write_to(&self, path: &Path, project_name: &str, encoding: &'static Encoding) -> Result<(), ObserverError> {
        let document = self.render(project_name, encoding)?;
        let (bytes, _, unmappable) = encoding.encode(&document);
        if unmappable {
            tracing::debug!(encoding = encoding.name(), "report contains characters outside the encoding");
        }
        fs::write(path, bytes).map_err(|source| ObserverError::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}
