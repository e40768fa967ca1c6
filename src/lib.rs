//! Cached date conversion for log layouts.
//!
//! A [`DatePatternConverter`] is built from up to two options (a format
//! selector and a time zone) and appends the formatted timestamp of each
//! event to an output buffer. The last formatted millisecond is memoized in a
//! lock-free single-slot cache shared by all writer threads.

pub mod alias;
pub mod cache;
pub mod config;
pub mod converter;
pub mod diagnostics;
pub mod formatter;
pub mod logging;
pub mod pattern;

pub use alias::{FormatSpec, NamedFormat, resolve, resolve_options};
pub use cache::{CacheEntry, SwapPolicy, TimestampCache};
pub use config::ConverterOptions;
pub use converter::{CONVERTER_KEYS, DateLike, DatePatternConverter, LogEvent};
pub use diagnostics::{DiagnosticSink, NullSink, TracingSink};
pub use formatter::Formatter;
pub use pattern::{CalendarPattern, PatternError, Zone};
