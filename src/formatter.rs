use std::fmt::Write;

use crate::alias::FormatSpec;
use crate::diagnostics::DiagnosticSink;
use crate::pattern::{CalendarPattern, Zone};

/// Turns epoch milliseconds into text.
#[derive(Debug, Clone, PartialEq)]
pub enum Formatter {
    Pattern(CalendarPattern),
    UnixSeconds,
    UnixMillis,
}

impl Formatter {
    /// Builds the formatter for `spec`. A pattern that does not compile is
    /// reported to `sink` and replaced by the default pattern in the same
    /// zone, so construction always succeeds.
    pub fn from_spec(spec: &FormatSpec, sink: &dyn DiagnosticSink) -> Self {
        match spec {
            FormatSpec::UnixSeconds => Formatter::UnixSeconds,
            FormatSpec::UnixMillis => Formatter::UnixMillis,
            FormatSpec::Pattern { pattern, time_zone } => {
                let zone = Zone::resolve(time_zone.as_deref(), sink);
                let compiled = CalendarPattern::compile(pattern, zone).unwrap_or_else(|e| {
                    sink.warn(&format!(
                        "Could not use date pattern '{pattern}': {e}; using the default pattern"
                    ));
                    CalendarPattern::fallback(zone)
                });
                Formatter::Pattern(compiled)
            }
        }
    }

    pub fn format(&self, millis: i64) -> String {
        let mut out = String::new();
        self.format_into(millis, &mut out);
        out
    }

    pub fn format_into(&self, millis: i64, out: &mut String) {
        match self {
            Formatter::Pattern(pattern) => pattern.render_into(millis, out),
            Formatter::UnixSeconds => {
                let _ = write!(out, "{}", millis.div_euclid(1000));
            }
            Formatter::UnixMillis => {
                let _ = write!(out, "{millis}");
            }
        }
    }

    pub fn pattern_text(&self) -> Option<&str> {
        match self {
            Formatter::Pattern(pattern) => Some(pattern.source()),
            Formatter::UnixSeconds | Formatter::UnixMillis => None,
        }
    }
}
