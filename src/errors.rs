//! Error types for the observer, and the error capability the recorder consumes.
//!
//! Two different things live here:
//! - [`ObserverError`]: failures of the observer's own machinery (report file, encoding, status stream).
//!   Callers log these; they never turn into test outcomes.
//! - [`ErrorInfo`]: what a host runner hands over when a test fails or errors. It carries the
//!   category (skip or not), a type name, the message and a formatted traceback.

use std::any::Any;
use std::path::PathBuf;

use encoding_rs::Encoding;
use thiserror::Error;

/// Errors raised by the capture and report machinery.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("failed to write report to {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether an error means "the test was skipped" or a genuine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCategory {
    #[default]
    Error,
    Skip,
}

/// The message part of a test error, before it is turned into report text.
///
/// Runners do not always hand over clean text: a message may be bytes in some other encoding, or
/// missing entirely with only the positional arguments of the exception available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessage {
    /// The rendered message, as produced by the runner.
    pub rendered: Option<Vec<u8>>,
    /// Positional arguments the error was constructed with.
    pub args: Vec<String>,
}

impl ErrorMessage {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            rendered: Some(message.into().into_bytes()),
            args: Vec::new(),
        }
    }

    pub fn bytes(message: impl Into<Vec<u8>>) -> Self {
        Self {
            rendered: Some(message.into()),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Convert the message to report text without ever failing.
    ///
    /// Tries, in order: strict UTF-8, the configured encoding without replacement, the first
    /// positional argument, and finally a lossy UTF-8 decode. The result is sanitized.
    pub fn to_text(&self, encoding: &'static Encoding) -> String {
        let text = match &self.rendered {
            Some(raw) => match std::str::from_utf8(raw) {
                Ok(s) => s.to_string(),
                Err(_) => match encoding.decode_without_bom_handling_and_without_replacement(raw) {
                    Some(decoded) => decoded.into_owned(),
                    None => match self.args.first() {
                        Some(arg) => arg.clone(),
                        None => String::from_utf8_lossy(raw).into_owned(),
                    },
                },
            },
            None => self.args.first().cloned().unwrap_or_default(),
        };
        aplog_core::sanitize_text(&text).into_owned()
    }
}

/// Error details for one failing, erroring or skipped test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    /// Bare type name, e.g. `ValueError`.
    pub type_name: String,
    /// Defining module, if the runner knows it, e.g. `builtins`.
    pub module: Option<String>,
    pub message: ErrorMessage,
    /// Formatted traceback text.
    pub traceback: String,
}

impl ErrorInfo {
    pub fn new(category: ErrorCategory, type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            type_name: type_name.into(),
            module: None,
            message: ErrorMessage::text(message),
            traceback: String::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = traceback.into();
        self
    }

    pub fn with_message(mut self, message: ErrorMessage) -> Self {
        self.message = message;
        self
    }

    /// Build error details from a Rust error value.
    ///
    /// The type name is the Rust type path; the traceback is the `Display` of the error followed by
    /// its `source()` chain.
    pub fn from_error<E: std::error::Error + 'static>(category: ErrorCategory, err: &E) -> Self {
        let full = std::any::type_name::<E>();
        // Generic arguments carry paths of their own; only the outer type is named.
        let full = full.split_once('<').map_or(full, |(path, _)| path);
        let (module, type_name) = match full.rsplit_once("::") {
            Some((module, name)) => (Some(module.to_string()), name.to_string()),
            None => (None, full.to_string()),
        };

        let mut traceback = format!("{type_name}: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            traceback.push_str(&format!("\nCaused by: {cause}"));
            source = cause.source();
        }

        Self {
            category,
            type_name,
            module,
            message: ErrorMessage::text(err.to_string()),
            traceback,
        }
    }

    /// Build error details from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        Self::new(ErrorCategory::Error, "panic", message.clone()).with_traceback(format!("panicked: {message}"))
    }

    /// Type name qualified by its module, as written to the report's `type` attribute.
    ///
    /// With `legacy_prefix` set, a module starting with that prefix has it stripped first
    /// (`org.python.core.exceptions` becomes `exceptions`).
    pub fn qualified_type_name(&self, legacy_prefix: Option<&str>) -> String {
        match &self.module {
            Some(module) => {
                let module = legacy_prefix
                    .and_then(|prefix| module.strip_prefix(prefix))
                    .unwrap_or(module);
                format!("{module}.{}", self.type_name)
            }
            None => self.type_name.clone(),
        }
    }

    pub fn is_skip(&self) -> bool {
        self.category == ErrorCategory::Skip
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("socket closed")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("link lost")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn qualified_name_uses_module() {
        let info = ErrorInfo::new(ErrorCategory::Error, "ValueError", "boom").with_module("builtins");
        assert_eq!(info.qualified_type_name(None), "builtins.ValueError");
    }

    #[test]
    fn qualified_name_without_module() {
        let info = ErrorInfo::new(ErrorCategory::Error, "ValueError", "boom");
        assert_eq!(info.qualified_type_name(None), "ValueError");
    }

    #[test]
    fn legacy_prefix_is_stripped_only_when_configured() {
        let info =
            ErrorInfo::new(ErrorCategory::Error, "AssertionError", "x").with_module("org.python.core.exceptions");
        assert_eq!(info.qualified_type_name(None), "org.python.core.exceptions.AssertionError");
        assert_eq!(
            info.qualified_type_name(Some("org.python.core.")),
            "exceptions.AssertionError"
        );
        assert_eq!(info.qualified_type_name(Some("java.")), "org.python.core.exceptions.AssertionError");
    }

    #[test]
    fn message_prefers_utf8() {
        let msg = ErrorMessage::text("boom");
        assert_eq!(msg.to_text(encoding_rs::UTF_8), "boom");
    }

    #[test]
    fn message_falls_back_to_configured_encoding() {
        // "café" in windows-1252
        let msg = ErrorMessage::bytes(vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(msg.to_text(encoding_rs::WINDOWS_1252), "café");
    }

    #[test]
    fn message_falls_back_to_first_argument() {
        let msg = ErrorMessage::bytes(vec![0xFF, 0xFE, 0xFD]).with_args(vec!["first".into(), "second".into()]);
        assert_eq!(msg.to_text(encoding_rs::UTF_8), "first");
    }

    #[test]
    fn message_without_args_decodes_lossily() {
        let msg = ErrorMessage::bytes(vec![b'o', b'k', 0xFF]);
        assert_eq!(msg.to_text(encoding_rs::UTF_8), "ok\u{FFFD}");
    }

    #[test]
    fn message_missing_uses_args_or_empty() {
        let msg = ErrorMessage::default().with_args(vec!["only arg".into()]);
        assert_eq!(msg.to_text(encoding_rs::UTF_8), "only arg");
        assert_eq!(ErrorMessage::default().to_text(encoding_rs::UTF_8), "");
    }

    #[test]
    fn message_is_sanitized() {
        let msg = ErrorMessage::text("bad\u{0}byte");
        assert_eq!(msg.to_text(encoding_rs::UTF_8), "bad?byte");
    }

    #[test]
    fn from_error_collects_source_chain() {
        let info = ErrorInfo::from_error(ErrorCategory::Error, &Outer(Inner));
        assert_eq!(info.type_name, "Outer");
        assert!(info.module.as_deref().unwrap().ends_with("errors::tests"));
        assert_eq!(info.message.to_text(encoding_rs::UTF_8), "link lost");
        assert_eq!(info.traceback, "Outer: link lost\nCaused by: socket closed");
    }

    #[derive(Debug)]
    struct Wrapper<E>(E);

    impl<E: fmt::Display> fmt::Display for Wrapper<E> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "wrapped: {}", self.0)
        }
    }

    impl<E: fmt::Debug + fmt::Display> std::error::Error for Wrapper<E> {}

    #[test]
    fn from_error_names_generic_types_by_outer_path() {
        let err = Wrapper(std::io::Error::other("disk"));
        let info = ErrorInfo::from_error(ErrorCategory::Error, &err);
        assert_eq!(info.type_name, "Wrapper");
        let module = info.module.unwrap();
        assert!(module.ends_with("errors::tests"));
        assert!(!module.contains('<'));
        assert!(info.traceback.starts_with("Wrapper: wrapped: disk"));
    }

    #[test]
    fn io_failures_convert_to_io_variant() {
        let err: ObserverError = std::io::Error::other("broken pipe").into();
        assert!(matches!(err, ObserverError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: broken pipe");
    }

    #[test]
    fn from_panic_reads_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("index out of bounds");
        let info = ErrorInfo::from_panic(payload.as_ref());
        assert_eq!(info.message.to_text(encoding_rs::UTF_8), "index out of bounds");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let info = ErrorInfo::from_panic(payload.as_ref());
        assert_eq!(info.message.to_text(encoding_rs::UTF_8), "owned");
        assert!(!info.is_skip());
    }
}
