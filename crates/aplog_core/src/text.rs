//! Define XML-safe text handling for captured output.
//!
//! Captured test output is arbitrary: it may contain terminal escape sequences, NUL bytes from a
//! crashed simulator, or a literal `]]>`. The helpers here turn such text into something that can be
//! embedded in an XML document without breaking it.
//!
//! ## Notes
//! - **Disallowed characters**: `U+0000..=U+0008`, `U+000B`, `U+000C`, `U+000E..=U+001F` are replaced
//!   by `?`. Tab, newline and carriage return are kept.
//! - **CDATA**: a `]]>` inside captured text is split into two CDATA sections around an escaped `>`.
//! - **Attributes**: values are always double-quoted; `&`, `<`, `>`, `"` and the three kept whitespace
//!   controls are written as references so attribute-value normalization cannot alter them.

use std::borrow::Cow;

/// Replacement for characters that are not allowed in XML 1.0 documents.
pub const REPLACEMENT_CHAR: char = '?';

/// The sequence that terminates a CDATA section.
pub const CDATA_END: &str = "]]>";

/// What a literal [`CDATA_END`] is rewritten to inside a CDATA body.
///
/// The first `]]>` closes the current section, `]]&gt;` re-emits the text as character data and
/// `<![CDATA[` opens a new section for the remainder.
pub const CDATA_END_ESCAPED: &str = "]]>]]&gt;<![CDATA[";

/// Check whether a character falls in the disallowed control ranges.
///
/// ## Parameters
/// - `c`: character to classify.
///
/// ## Returns
/// - `bool`: `true` for `U+0000..=U+0008`, `U+000B`, `U+000C` and `U+000E..=U+001F`.
pub fn is_disallowed_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}')
}

/// Replace every disallowed control character with [`REPLACEMENT_CHAR`].
///
/// ## Parameters
/// - `text`: arbitrary captured text.
///
/// ## Returns
/// - `Cow<str>`: borrowed when nothing had to change, owned otherwise.
pub fn sanitize_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_disallowed_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_disallowed_control(c) { REPLACEMENT_CHAR } else { c })
            .collect(),
    )
}

/// Prepare text for embedding inside `<![CDATA[ ... ]]>`.
///
/// Applies [`sanitize_text`], then rewrites every [`CDATA_END`] to [`CDATA_END_ESCAPED`].
///
/// ## Parameters
/// - `text`: arbitrary captured text.
///
/// ## Returns
/// - `String`: the CDATA body (without the surrounding delimiters).
pub fn escape_cdata(text: &str) -> String {
    sanitize_text(text).replace(CDATA_END, CDATA_END_ESCAPED)
}

/// Escape an attribute value for use between double quotes.
///
/// Applies [`sanitize_text`], then writes `&`, `<`, `>`, `"`, `\n`, `\r` and `\t` as references.
///
/// ## Parameters
/// - `value`: raw attribute value.
///
/// ## Returns
/// - `String`: the escaped value, without the surrounding quotes.
pub fn escape_attribute(value: &str) -> String {
    let clean = sanitize_text(value);
    let mut out = String::with_capacity(clean.len());
    for c in clean.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape and double-quote an attribute value.
///
/// ## Parameters
/// - `value`: raw attribute value.
///
/// ## Returns
/// - `String`: `"` + [`escape_attribute`] + `"`.
pub fn quote_attribute(value: &str) -> String {
    format!("\"{}\"", escape_attribute(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_control_ranges() {
        assert_eq!(sanitize_text("a\u{0}b\u{8}c\u{B}d\u{C}e\u{E}f\u{1F}g"), "a?b?c?d?e?f?g");
    }

    #[test]
    fn sanitize_keeps_tab_newline_carriage_return() {
        let text = "col1\tcol2\r\nnext line\n";
        assert!(matches!(sanitize_text(text), Cow::Borrowed(_)));
        assert_eq!(sanitize_text(text), text);
    }

    #[test]
    fn sanitize_keeps_printable_and_unicode() {
        assert_eq!(sanitize_text("ÅrduPilot ✈ 100%"), "ÅrduPilot ✈ 100%");
        // DEL is not in the disallowed ranges
        assert_eq!(sanitize_text("\u{7F}"), "\u{7F}");
    }

    #[test]
    fn escape_cdata_splits_terminator() {
        assert_eq!(escape_cdata("a]]>b"), "a]]>]]&gt;<![CDATA[b");
        assert_eq!(escape_cdata("]]>]]>"), "]]>]]&gt;<![CDATA[]]>]]&gt;<![CDATA[");
    }

    #[test]
    fn escape_cdata_sanitizes_first() {
        assert_eq!(escape_cdata("\u{1B}[31mred\u{1B}[0m"), "?[31mred?[0m");
    }

    #[test]
    fn escape_cdata_leaves_lone_brackets() {
        assert_eq!(escape_cdata("a[0]] > b"), "a[0]] > b");
    }

    #[test]
    fn escape_attribute_special_characters() {
        assert_eq!(escape_attribute(r#"a & b < c > "d""#), "a &amp; b &lt; c &gt; &quot;d&quot;");
        assert_eq!(escape_attribute("it's"), "it's");
    }

    #[test]
    fn escape_attribute_whitespace_controls() {
        assert_eq!(escape_attribute("a\tb\nc\rd"), "a&#9;b&#10;c&#13;d");
    }

    #[test]
    fn quote_attribute_wraps_and_sanitizes() {
        assert_eq!(quote_attribute("boom\u{7}"), "\"boom?\"");
        assert_eq!(quote_attribute(""), "\"\"");
    }
}
