//! XML serialization of the run report.
//!
//! The document is built with `quick-xml`'s event writer. Attribute values and CDATA bodies are
//! escaped by `aplog_core` and handed to the writer verbatim, so the escaping on disk is exactly
//! the one defined there.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <TestRun project_name=".." tests=".." errors=".." failures=".." passed=".." skip="..">
//!   <TestCase status="FAIL" classname=".." name=".." time="0.125" datestamp="2024-05-01 12:00:00">
//!     <failure type=".." message=".."><![CDATA[traceback]]></failure>
//!     <system-out><![CDATA[..]]></system-out>
//!     <system-err><![CDATA[..]]></system-err>
//!     <MAVProxy-out><![CDATA[..]]></MAVProxy-out>
//!     <JSBSim-out><![CDATA[..]]></JSBSim-out>
//!   </TestCase>
//! </TestRun>
//! ```
//!
//! Whitespace between elements is not emitted.

use std::borrow::Cow;
use std::io::Write;

use aplog_core::{escape_attribute, escape_cdata};
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;

use super::record::{RunStats, TestRecord};
use crate::errors::ObserverError;

/// `datestamp` format: local time truncated to whole seconds.
pub const DATESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serialize a full report document.
pub fn render_report(
    project_name: &str,
    encoding_name: &str,
    stats: &RunStats,
    records: &[TestRecord],
) -> Result<String, ObserverError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding_name), None)))?;

    let mut root = BytesStart::new("TestRun");
    push_attr(&mut root, "project_name", project_name);
    push_attr(&mut root, "tests", &stats.total().to_string());
    push_attr(&mut root, "errors", &stats.errors.to_string());
    push_attr(&mut root, "failures", &stats.failures.to_string());
    push_attr(&mut root, "passed", &stats.passes.to_string());
    push_attr(&mut root, "skip", &stats.skipped.to_string());
    writer.write_event(Event::Start(root))?;

    for record in records {
        write_test_case(&mut writer, record)?;
    }

    writer.write_event(Event::End(BytesEnd::new("TestRun")))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Serialize one `TestCase` element.
pub fn write_test_case<W: Write>(writer: &mut Writer<W>, record: &TestRecord) -> Result<(), ObserverError> {
    let mut case = BytesStart::new("TestCase");
    push_attr(&mut case, "status", record.status.as_str());
    push_attr(&mut case, "classname", &record.identity.class_name);
    push_attr(&mut case, "name", &record.identity.name);
    push_attr(&mut case, "time", &format!("{:.3}", record.elapsed.as_secs_f64()));
    push_attr(
        &mut case,
        "datestamp",
        &record.timestamp.format(DATESTAMP_FORMAT).to_string(),
    );
    writer.write_event(Event::Start(case))?;

    if let (Some(element), Some(detail)) = (record.status.detail_element(), &record.detail) {
        let mut start = BytesStart::new(element);
        push_attr(&mut start, "type", &detail.type_name);
        push_attr(&mut start, "message", &detail.message);
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::CData(BytesCData::new(escape_cdata(&detail.traceback))))?;
        writer.write_event(Event::End(BytesEnd::new(element)))?;
    }

    if let Some(text) = record.stdout.as_deref().filter(|t| !t.is_empty()) {
        write_cdata_element(writer, "system-out", text)?;
    }
    if let Some(text) = record.stderr.as_deref().filter(|t| !t.is_empty()) {
        write_cdata_element(writer, "system-err", text)?;
    }
    // Pipe B (MAVProxy) is written ahead of pipe A (JSBSim).
    for telemetry in record.telemetry.iter().rev() {
        let body = telemetry
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(telemetry.placeholder.as_str());
        write_cdata_element(writer, &telemetry.element, body)?;
    }

    writer.write_event(Event::End(BytesEnd::new("TestCase")))?;
    Ok(())
}

fn write_cdata_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), ObserverError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::CData(BytesCData::new(escape_cdata(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Push an attribute whose value is escaped here, not by the writer.
fn push_attr(start: &mut BytesStart<'_>, key: &str, value: &str) {
    start.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escape_attribute(value).into_bytes()),
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::record::{FailureDetail, TelemetryCapture, TestStatus};
    use aplog_core::TestIdentity;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn telemetry(text: Option<&str>) -> [TelemetryCapture; 2] {
        [
            TelemetryCapture {
                element: "JSBSim-out".into(),
                placeholder: "No JSBSim output".into(),
                text: text.map(str::to_string),
            },
            TelemetryCapture {
                element: "MAVProxy-out".into(),
                placeholder: "No mavproxy output".into(),
                text: None,
            },
        ]
    }

    fn record(id: &str, status: TestStatus) -> TestRecord {
        TestRecord {
            identity: TestIdentity::parse(id),
            status,
            elapsed: Duration::from_millis(125),
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_milli_opt(12, 30, 5, 987)
                .unwrap(),
            stdout: None,
            stderr: None,
            telemetry: telemetry(None),
            detail: None,
        }
    }

    fn render_one(record: &TestRecord) -> String {
        let mut writer = Writer::new(Vec::new());
        write_test_case(&mut writer, record).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn passing_test_case_shape() {
        let xml = render_one(&record("pkg.T.test_ok", TestStatus::Pass));
        insta::assert_snapshot!(xml, @r#"<TestCase status="PASS" classname="pkg.T" name="test_ok" time="0.125" datestamp="2024-05-01 12:30:05"><MAVProxy-out><![CDATA[No mavproxy output]]></MAVProxy-out><JSBSim-out><![CDATA[No JSBSim output]]></JSBSim-out></TestCase>"#);
    }

    #[test]
    fn failing_test_case_has_failure_child_first() {
        let mut rec = record("pkg.T.test_bad", TestStatus::Fail);
        rec.detail = Some(FailureDetail {
            type_name: "builtins.ValueError".into(),
            message: "boom".into(),
            traceback: "Traceback:\n  raise ValueError(\"boom\")".into(),
        });
        rec.stdout = Some("out\u{1}put".into());
        let xml = render_one(&rec);
        assert!(xml.starts_with(r#"<TestCase status="FAIL" classname="pkg.T" name="test_bad""#));
        assert!(xml.contains(
            "<failure type=\"builtins.ValueError\" message=\"boom\"><![CDATA[Traceback:\n  raise ValueError(\"boom\")]]></failure><system-out>"
        ));
        assert!(xml.contains("<system-out><![CDATA[out?put]]></system-out>"));
    }

    #[test]
    fn error_and_skip_use_their_own_elements() {
        let detail = FailureDetail {
            type_name: "SkipTest".into(),
            message: "no SITL".into(),
            traceback: String::new(),
        };
        let mut rec = record("pkg.T.test_skip", TestStatus::Skipped);
        rec.detail = Some(detail.clone());
        let xml = render_one(&rec);
        assert!(xml.contains(r#"status="SKIP""#));
        assert!(xml.contains(r#"<skipped type="SkipTest" message="no SITL"><![CDATA[]]></skipped>"#));

        let mut rec = record("pkg.T.test_err", TestStatus::Error);
        rec.detail = Some(detail);
        assert!(render_one(&rec).contains("<error type="));
    }

    #[test]
    fn empty_captures_are_omitted() {
        let mut rec = record("pkg.T.test_ok", TestStatus::Pass);
        rec.stdout = Some(String::new());
        rec.stderr = Some("err".into());
        let xml = render_one(&rec);
        assert!(!xml.contains("system-out"));
        assert!(xml.contains("<system-err><![CDATA[err]]></system-err>"));
    }

    #[test]
    fn telemetry_text_replaces_placeholder() {
        let mut rec = record("pkg.T.test_ok", TestStatus::Pass);
        rec.telemetry = telemetry(Some("alt=100]]>x"));
        let xml = render_one(&rec);
        assert!(xml.contains("<JSBSim-out><![CDATA[alt=100]]>]]&gt;<![CDATA[x]]></JSBSim-out>"));
        assert!(xml.contains("No mavproxy output"));
    }

    #[test]
    fn attributes_are_escaped_once() {
        let mut rec = record("pkg.T.test_q(\"a&b\")", TestStatus::Error);
        rec.detail = Some(FailureDetail {
            type_name: "E".into(),
            message: "<tag> & \"quote\"".into(),
            traceback: String::new(),
        });
        let xml = render_one(&rec);
        assert!(xml.contains(r#"name="test_q(&quot;a&amp;b&quot;)""#));
        assert!(xml.contains(r#"message="&lt;tag&gt; &amp; &quot;quote&quot;""#));
    }

    #[test]
    fn document_header_and_counters() {
        let stats = RunStats {
            errors: 1,
            failures: 2,
            passes: 3,
            skipped: 4,
        };
        let xml = render_report("Ender's Game", "UTF-8", &stats, &[]).unwrap();
        insta::assert_snapshot!(xml, @r#"<?xml version="1.0" encoding="UTF-8"?><TestRun project_name="Ender's Game" tests="10" errors="1" failures="2" passed="3" skip="4"></TestRun>"#);
    }
}
