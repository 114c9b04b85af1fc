//! Per-test report records and run counters.

use std::time::Duration;

use aplog_core::TestIdentity;
use chrono::NaiveDateTime;

/// Outcome of one test, as written to `TestCase@status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
    Skipped,
}

impl TestStatus {
    /// Value of the `status` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
            TestStatus::Skipped => "SKIP",
        }
    }

    /// Name of the child element carrying error details, if this status has one.
    pub fn detail_element(self) -> Option<&'static str> {
        match self {
            TestStatus::Pass => None,
            TestStatus::Fail => Some("failure"),
            TestStatus::Error => Some("error"),
            TestStatus::Skipped => Some("skipped"),
        }
    }
}

/// Error details attached to a failed, errored or skipped test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    /// Module-qualified type name.
    pub type_name: String,
    pub message: String,
    pub traceback: String,
}

/// Text drained from one telemetry pipe during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryCapture {
    /// Element the text is written under.
    pub element: String,
    /// Body written when nothing was drained.
    pub placeholder: String,
    pub text: Option<String>,
}

/// Everything the report needs to know about one finished test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub identity: TestIdentity,
    pub status: TestStatus,
    pub elapsed: Duration,
    pub timestamp: NaiveDateTime,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub telemetry: [TelemetryCapture; 2],
    pub detail: Option<FailureDetail>,
}

/// Run-level outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub errors: usize,
    pub failures: usize,
    pub passes: usize,
    pub skipped: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.errors + self.failures + self.passes + self.skipped
    }

    /// Count one outcome.
    pub fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Pass => self.passes += 1,
            TestStatus::Fail => self.failures += 1,
            TestStatus::Error => self.errors += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_attribute_values() {
        assert_eq!(TestStatus::Pass.as_str(), "PASS");
        assert_eq!(TestStatus::Fail.as_str(), "FAIL");
        assert_eq!(TestStatus::Error.as_str(), "ERROR");
        assert_eq!(TestStatus::Skipped.as_str(), "SKIP");
    }

    #[test]
    fn detail_elements() {
        assert_eq!(TestStatus::Pass.detail_element(), None);
        assert_eq!(TestStatus::Fail.detail_element(), Some("failure"));
        assert_eq!(TestStatus::Error.detail_element(), Some("error"));
        assert_eq!(TestStatus::Skipped.detail_element(), Some("skipped"));
    }

    #[test]
    fn stats_count_each_status() {
        let mut stats = RunStats::default();
        for status in [
            TestStatus::Pass,
            TestStatus::Pass,
            TestStatus::Fail,
            TestStatus::Error,
            TestStatus::Skipped,
        ] {
            stats.record(status);
        }
        assert_eq!(
            stats,
            RunStats {
                errors: 1,
                failures: 1,
                passes: 2,
                skipped: 1
            }
        );
        assert_eq!(stats.total(), 5);
    }
}
