//! The date converter a layout engine calls for every event.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use std::any::Any;
use std::time::SystemTime;

use crate::alias;
use crate::cache::{SwapPolicy, TimestampCache};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::formatter::Formatter;

/// Layout keys this converter answers to.
pub const CONVERTER_KEYS: [&str; 2] = ["d", "date"];

/// Anything that carries an event timestamp.
pub trait LogEvent {
    fn time_millis(&self) -> i64;
}

/// A bare date value.
pub trait DateLike {
    fn epoch_millis(&self) -> i64;
}

impl DateLike for SystemTime {
    fn epoch_millis(&self) -> i64 {
        let millis = match self.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(after) => i128::try_from(after.as_millis()).unwrap_or(i128::MAX),
            Err(before) => {
                let before = before.duration();
                // round toward negative infinity so -1.5ms lands on -2
                let whole = i128::try_from(before.as_millis()).unwrap_or(i128::MAX);
                if before.subsec_nanos() % 1_000_000 != 0 {
                    -whole - 1
                } else {
                    -whole
                }
            }
        };
        millis.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl<Tz: TimeZone> DateLike for DateTime<Tz> {
    fn epoch_millis(&self) -> i64 {
        self.timestamp_millis()
    }
}

/// Epoch millis of `value` if it is one of the supported date types.
pub fn date_millis(value: &dyn Any) -> Option<i64> {
    if let Some(time) = value.downcast_ref::<SystemTime>() {
        return Some(time.epoch_millis());
    }
    if let Some(dt) = value.downcast_ref::<DateTime<Utc>>() {
        return Some(dt.epoch_millis());
    }
    if let Some(dt) = value.downcast_ref::<DateTime<Local>>() {
        return Some(dt.epoch_millis());
    }
    if let Some(dt) = value.downcast_ref::<DateTime<FixedOffset>>() {
        return Some(dt.epoch_millis());
    }
    value
        .downcast_ref::<DateTime<chrono_tz::Tz>>()
        .map(DateLike::epoch_millis)
}

/// Formats event dates through a shared single-slot cache.
///
/// One converter is built per date token in a layout and shared by every
/// thread logging through that layout.
#[derive(Debug)]
pub struct DatePatternConverter {
    cache: TimestampCache,
}

impl DatePatternConverter {
    /// Options are the selector (alias or literal pattern) followed by an
    /// optional time zone. Construction warnings go to `tracing`.
    pub fn new<S: AsRef<str>>(options: &[S]) -> Self {
        Self::with_sink(options, &TracingSink)
    }

    pub fn with_sink<S: AsRef<str>>(options: &[S], sink: &dyn DiagnosticSink) -> Self {
        Self::with_policy(options, sink, SwapPolicy::default())
    }

    pub fn with_policy<S: AsRef<str>>(
        options: &[S],
        sink: &dyn DiagnosticSink,
        policy: SwapPolicy,
    ) -> Self {
        let spec = alias::resolve_options(options);
        let formatter = Formatter::from_spec(&spec, sink);
        Self {
            cache: TimestampCache::new(formatter, policy),
        }
    }

    pub fn name(&self) -> &'static str {
        "Date"
    }

    pub fn style_class(&self) -> &'static str {
        "date"
    }

    pub fn format_millis(&self, timestamp_millis: i64, output: &mut String) {
        self.cache.append_to(timestamp_millis, output);
    }

    pub fn format_event<E: LogEvent + ?Sized>(&self, event: &E, output: &mut String) {
        self.format_millis(event.time_millis(), output);
    }

    pub fn format_date<D: DateLike + ?Sized>(&self, date: &D, output: &mut String) {
        self.format_millis(date.epoch_millis(), output);
    }

    /// Formats `value` if it is a date; anything else appends nothing.
    pub fn format_value(&self, value: &dyn Any, output: &mut String) {
        if let Some(millis) = date_millis(value) {
            self.format_millis(millis, output);
        }
    }

    /// Formats the first date among `values` and ignores the rest.
    pub fn format_first_date(&self, values: &[&dyn Any], output: &mut String) {
        if let Some(millis) = values.iter().find_map(|value| date_millis(*value)) {
            self.format_millis(millis, output);
        }
    }

    /// The calendar pattern in use, `None` for the epoch formats.
    pub fn pattern(&self) -> Option<&str> {
        self.cache.formatter().pattern_text()
    }

    pub fn formatter(&self) -> &Formatter {
        self.cache.formatter()
    }

    pub fn cache(&self) -> &TimestampCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{DEFAULT_PATTERN, ISO8601_PATTERN};
    use crate::diagnostics::NullSink;
    use crate::diagnostics::testing::RecordingSink;
    use std::time::Duration;

    const INSTANT: i64 = 1_700_000_000_000;

    struct Event(i64);

    impl LogEvent for Event {
        fn time_millis(&self) -> i64 {
            self.0
        }
    }

    fn utc(format: &str) -> DatePatternConverter {
        DatePatternConverter::with_sink(&[format, "UTC"], &NullSink)
    }

    #[test]
    fn formats_events_into_output() {
        let converter = utc("ISO8601");
        let mut output = String::from("ts=");
        converter.format_event(&Event(INSTANT), &mut output);
        assert_eq!(output, "ts=2023-11-14T22:13:20,000");
        assert_eq!(converter.pattern(), Some(ISO8601_PATTERN));
    }

    #[test]
    fn dates_take_the_same_path() {
        let converter = utc("UNIX_MILLIS");
        let mut output = String::new();

        let system = SystemTime::UNIX_EPOCH + Duration::from_millis(1_234);
        converter.format_date(&system, &mut output);
        output.push(' ');
        let chrono_date = DateTime::<Utc>::from_timestamp_millis(INSTANT).unwrap();
        converter.format_date(&chrono_date, &mut output);

        assert_eq!(output, "1234 1700000000000");
        assert_eq!(converter.cache().cached().timestamp_millis(), INSTANT);
    }

    #[test]
    fn non_dates_produce_nothing() {
        let converter = utc("UNIX");
        let mut output = String::new();
        converter.format_value(&"not a date", &mut output);
        converter.format_value(&42i64, &mut output);
        assert!(output.is_empty());

        converter.format_value(&(SystemTime::UNIX_EPOCH + Duration::from_secs(90)), &mut output);
        assert_eq!(output, "90");
    }

    #[test]
    fn variadic_form_uses_first_date_only() {
        let converter = utc("UNIX");
        let first = DateTime::<Utc>::from_timestamp_millis(5_000).unwrap();
        let second = SystemTime::UNIX_EPOCH + Duration::from_secs(9);
        let values: [&dyn Any; 4] = [&"text", &7u32, &first, &second];

        let mut output = String::new();
        converter.format_first_date(&values, &mut output);
        assert_eq!(output, "5");

        let no_dates: [&dyn Any; 2] = [&"a", &1u8];
        let mut untouched = String::new();
        converter.format_first_date(&no_dates, &mut untouched);
        assert!(untouched.is_empty());
    }

    #[test]
    fn recognizes_zoned_dates() {
        let tokyo = chrono_tz::Asia::Tokyo
            .timestamp_millis_opt(INSTANT)
            .single()
            .unwrap();
        let fixed = tokyo.fixed_offset();
        assert_eq!(date_millis(&tokyo), Some(INSTANT));
        assert_eq!(date_millis(&fixed), Some(INSTANT));
        assert_eq!(date_millis(&tokyo.with_timezone(&Local)), Some(INSTANT));
        assert_eq!(date_millis(&String::from("x")), None);
    }

    #[test]
    fn system_time_before_epoch_floors() {
        let before = SystemTime::UNIX_EPOCH - Duration::from_micros(1_500);
        assert_eq!(before.epoch_millis(), -2);
        let exact = SystemTime::UNIX_EPOCH - Duration::from_millis(3);
        assert_eq!(exact.epoch_millis(), -3);
    }

    #[test]
    fn epoch_converters_have_no_pattern() {
        assert_eq!(DatePatternConverter::with_sink(&["unix"], &NullSink).pattern(), None);
        assert_eq!(
            DatePatternConverter::with_sink(&["Unix_Millis"], &NullSink).pattern(),
            None
        );
        assert_eq!(
            DatePatternConverter::with_sink::<&str>(&[], &NullSink).pattern(),
            Some(DEFAULT_PATTERN)
        );
    }

    #[test]
    fn bad_pattern_warns_once_and_uses_default() {
        let sink = RecordingSink::default();
        let converter = DatePatternConverter::with_sink(&["HH:mm 'broken", "UTC"], &sink);
        assert_eq!(converter.pattern(), Some(DEFAULT_PATTERN));
        assert_eq!(sink.warnings.borrow().len(), 1);

        let mut output = String::new();
        converter.format_millis(INSTANT, &mut output);
        assert_eq!(output, "2023-11-14 22:13:20,000");
        assert_eq!(sink.warnings.borrow().len(), 1);
    }

    #[test]
    fn identifies_itself() {
        let converter = utc("DEFAULT");
        assert_eq!(converter.name(), "Date");
        assert_eq!(converter.style_class(), "date");
        assert!(CONVERTER_KEYS.contains(&"d"));
    }
}
