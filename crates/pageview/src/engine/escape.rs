//! Output formatting for escaping strategies minijinja does not ship.
//!
//! `html`, `html_attr` and `xml` map onto minijinja's own HTML escaping. The
//! `js`, `css` and `url` strategies are registered as custom auto-escape
//! modes and written by [`format_value`].

use std::fmt::Write;

use minijinja::value::Value;
use minijinja::{AutoEscape as EngineEscape, Error, ErrorKind, Output, State};

use crate::config::AutoEscape;

pub(crate) const JS: &str = "js";
pub(crate) const CSS: &str = "css";
pub(crate) const URL: &str = "url";

/// The minijinja auto-escape mode for a configured strategy.
pub(crate) fn engine_mode(strategy: Option<AutoEscape>) -> EngineEscape {
    match strategy {
        None => EngineEscape::None,
        Some(AutoEscape::Html | AutoEscape::HtmlAttr | AutoEscape::Xml) => EngineEscape::Html,
        Some(AutoEscape::Js) => EngineEscape::Custom(JS),
        Some(AutoEscape::Css) => EngineEscape::Custom(CSS),
        Some(AutoEscape::Url) => EngineEscape::Custom(URL),
    }
}

/// Formatter installed on every environment.
pub(crate) fn format_value(out: &mut Output, state: &State, value: &Value) -> Result<(), Error> {
    let escape: fn(&str) -> String = match state.auto_escape() {
        EngineEscape::Custom(JS) => escape_js,
        EngineEscape::Custom(CSS) => escape_css,
        EngineEscape::Custom(URL) => escape_url,
        _ => return minijinja::escape_formatter(out, state, value),
    };

    let text = value.to_string();
    let written = if value.is_safe() {
        out.write_str(&text)
    } else {
        out.write_str(&escape(&text))
    };
    written.map_err(|_| Error::new(ErrorKind::WriteFailure, "failed to write escaped value"))
}

fn escape_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '_') {
            out.push(c);
        } else if (c as u32) < 0x10000 {
            let _ = write!(out, "\\u{:04X}", c as u32);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{:04X}", unit);
            }
        }
    }
    out
}

fn escape_css(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            let _ = write!(out, "\\{:X} ", c as u32);
        }
    }
    out
}

fn escape_url(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js("a'b"), "a\\u0027b");
        assert_eq!(escape_js("x.y,z_1"), "x.y,z_1");
        assert_eq!(escape_js("<"), "\\u003C");
    }

    #[test]
    fn test_escape_css() {
        assert_eq!(escape_css("red;"), "red\\3B ");
        assert_eq!(escape_css("a b"), "a\\20 b");
    }

    #[test]
    fn test_escape_url() {
        assert_eq!(escape_url("a b&c"), "a%20b%26c");
        assert_eq!(escape_url("é"), "%C3%A9");
        assert_eq!(escape_url("safe-_.~"), "safe-_.~");
    }

    #[test]
    fn test_engine_mode_mapping() {
        assert_eq!(engine_mode(None), EngineEscape::None);
        assert_eq!(engine_mode(Some(AutoEscape::Xml)), EngineEscape::Html);
        assert_eq!(engine_mode(Some(AutoEscape::Url)), EngineEscape::Custom(URL));
    }
}
