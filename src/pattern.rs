//! Calendar patterns in the `SimpleDateFormat` letter syntax, rendered with chrono.
//!
//! A pattern is compiled once into a token list; rendering walks the tokens
//! and writes each calendar field of the instant, already shifted into the
//! configured zone.

use chrono::{DateTime, Datelike, FixedOffset, Local, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::fmt::{self, Write};
use thiserror::Error;

use crate::alias::DEFAULT_PATTERN;
use crate::diagnostics::DiagnosticSink;

const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const LONG_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const SHORT_WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const LONG_WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("unterminated quote starting at position {0}")]
    UnterminatedQuote(usize),

    #[error("illegal pattern letter '{letter}' at position {position}")]
    UnknownLetter { letter: char, position: usize },

    #[error("ISO offset field 'X' accepts at most 3 letters, got {0}")]
    IsoOffsetWidth(usize),
}

/// Where rendered instants are shifted before their fields are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    Local,
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    /// Resolves a zone option. `None` means the process's local zone;
    /// unknown identifiers fall back to GMT with a warning.
    pub fn resolve(token: Option<&str>, sink: &dyn DiagnosticSink) -> Zone {
        let Some(id) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Zone::Local;
        };

        if let Ok(tz) = id.parse::<Tz>() {
            return Zone::Named(tz);
        }
        if let Some(offset) = parse_fixed_offset(id) {
            return Zone::Fixed(offset);
        }

        sink.warn(&format!("Unknown time zone '{id}', using GMT"));
        Zone::Named(Tz::GMT)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Named(tz) => f.write_str(tz.name()),
            Zone::Fixed(offset) => write!(f, "GMT{offset}"),
        }
    }
}

// Accepts "GMT+08:00", "UTC-5", "+0530" and friends.
fn parse_fixed_offset(id: &str) -> Option<FixedOffset> {
    let rest = match id.get(..3) {
        Some(prefix)
            if prefix.eq_ignore_ascii_case("GMT") || prefix.eq_ignore_ascii_case("UTC") =>
        {
            &id[3..]
        }
        _ => id,
    };

    let (sign, digits) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None if digits.len() <= 2 => (digits, "0"),
        None => digits.split_at(digits.len() - 2),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Era,
    Year,
    WeekYear,
    Month,
    WeekOfYear,
    WeekOfMonth,
    DayOfYear,
    Day,
    DayOfWeekInMonth,
    Weekday,
    WeekdayNumber,
    AmPm,
    Hour0To23,
    Hour1To24,
    Hour0To11,
    Hour1To12,
    Minute,
    Second,
    Millis,
    ZoneName,
    ZoneOffset,
    IsoOffset,
}

impl Field {
    fn from_letter(letter: char) -> Option<Field> {
        let field = match letter {
            'G' => Field::Era,
            'y' => Field::Year,
            'Y' => Field::WeekYear,
            'M' | 'L' => Field::Month,
            'w' => Field::WeekOfYear,
            'W' => Field::WeekOfMonth,
            'D' => Field::DayOfYear,
            'd' => Field::Day,
            'F' => Field::DayOfWeekInMonth,
            'E' => Field::Weekday,
            'u' => Field::WeekdayNumber,
            'a' => Field::AmPm,
            'H' => Field::Hour0To23,
            'k' => Field::Hour1To24,
            'K' => Field::Hour0To11,
            'h' => Field::Hour1To12,
            'm' => Field::Minute,
            's' => Field::Second,
            'S' => Field::Millis,
            'z' => Field::ZoneName,
            'Z' => Field::ZoneOffset,
            'X' => Field::IsoOffset,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Field { field: Field, width: usize },
}

/// A compiled calendar pattern bound to a zone.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarPattern {
    source: String,
    zone: Zone,
    tokens: Vec<Token>,
}

impl CalendarPattern {
    pub fn compile(pattern: &str, zone: Zone) -> Result<Self, PatternError> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c == '\'' {
                // '' outside quotes is an escaped quote
                if chars.get(i + 1) == Some(&'\'') {
                    literal.push('\'');
                    i += 2;
                    continue;
                }

                let start = i;
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            literal.push('\'');
                            i += 2;
                            continue;
                        }
                        closed = true;
                        i += 1;
                        break;
                    }
                    literal.push(chars[i]);
                    i += 1;
                }
                if !closed {
                    return Err(PatternError::UnterminatedQuote(start));
                }
            } else if c.is_ascii_alphabetic() {
                let field = Field::from_letter(c).ok_or(PatternError::UnknownLetter {
                    letter: c,
                    position: i,
                })?;

                let mut width = 1;
                while chars.get(i + width) == Some(&c) {
                    width += 1;
                }
                if field == Field::IsoOffset && width > 3 {
                    return Err(PatternError::IsoOffsetWidth(width));
                }

                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Field { field, width });
                i += width;
            } else {
                literal.push(c);
                i += 1;
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: pattern.to_string(),
            zone,
            tokens,
        })
    }

    /// The default pattern, built without going through the parser so it
    /// can stand in when a configured pattern is rejected.
    pub fn fallback(zone: Zone) -> Self {
        let field = |field, width| Token::Field { field, width };
        let literal = |text: &str| Token::Literal(text.to_string());

        Self {
            source: DEFAULT_PATTERN.to_string(),
            zone,
            tokens: vec![
                field(Field::Year, 4),
                literal("-"),
                field(Field::Month, 2),
                literal("-"),
                field(Field::Day, 2),
                literal(" "),
                field(Field::Hour0To23, 2),
                literal(":"),
                field(Field::Minute, 2),
                literal(":"),
                field(Field::Second, 2),
                literal(","),
                field(Field::Millis, 3),
            ],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn render(&self, millis: i64) -> String {
        let mut out = String::with_capacity(self.source.len() + 8);
        self.render_into(millis, &mut out);
        out
    }

    /// Appends `millis` rendered in this pattern's zone. Instants chrono
    /// cannot represent render as the Unix epoch.
    pub fn render_into(&self, millis: i64, out: &mut String) {
        let instant = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
        match self.zone {
            Zone::Local => self.write_fields(&instant.with_timezone(&Local), out),
            Zone::Named(tz) => self.write_fields(&instant.with_timezone(&tz), out),
            Zone::Fixed(offset) => self.write_fields(&instant.with_timezone(&offset), out),
        }
    }

    fn write_fields<T>(&self, dt: &DateTime<T>, out: &mut String)
    where
        T: TimeZone,
        T::Offset: fmt::Display,
    {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Field { field, width } => self.write_field(dt, *field, *width, out),
            }
        }
    }

    fn write_field<T>(&self, dt: &DateTime<T>, field: Field, width: usize, out: &mut String)
    where
        T: TimeZone,
        T::Offset: fmt::Display,
    {
        let weekday = dt.weekday().num_days_from_monday() as usize;
        let day = dt.day() as i64;

        match field {
            Field::Era => out.push_str(if dt.year() > 0 { "AD" } else { "BC" }),
            Field::Year | Field::WeekYear => {
                let year = if field == Field::Year {
                    dt.year()
                } else {
                    dt.iso_week().year()
                };
                if width == 2 {
                    pad(out, year.rem_euclid(100) as i64, 2);
                } else {
                    pad(out, year as i64, width.max(4));
                }
            }
            Field::Month => {
                let month0 = dt.month0() as usize;
                match width {
                    1 | 2 => pad(out, month0 as i64 + 1, width),
                    3 => out.push_str(SHORT_MONTHS[month0]),
                    _ => out.push_str(LONG_MONTHS[month0]),
                }
            }
            Field::WeekOfYear => pad(out, dt.iso_week().week() as i64, width),
            Field::WeekOfMonth => {
                let first_of_month = (weekday as i64 - (day - 1)).rem_euclid(7);
                pad(out, (day - 1 + first_of_month) / 7 + 1, width);
            }
            Field::DayOfYear => pad(out, dt.ordinal() as i64, width),
            Field::Day => pad(out, day, width),
            Field::DayOfWeekInMonth => pad(out, (day - 1) / 7 + 1, width),
            Field::Weekday => {
                if width >= 4 {
                    out.push_str(LONG_WEEKDAYS[weekday]);
                } else {
                    out.push_str(SHORT_WEEKDAYS[weekday]);
                }
            }
            Field::WeekdayNumber => pad(out, weekday as i64 + 1, width),
            Field::AmPm => out.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
            Field::Hour0To23 => pad(out, dt.hour() as i64, width),
            Field::Hour1To24 => {
                let hour = dt.hour();
                pad(out, if hour == 0 { 24 } else { hour as i64 }, width);
            }
            Field::Hour0To11 => pad(out, (dt.hour() % 12) as i64, width),
            Field::Hour1To12 => {
                let hour = dt.hour() % 12;
                pad(out, if hour == 0 { 12 } else { hour as i64 }, width);
            }
            Field::Minute => pad(out, dt.minute() as i64, width),
            Field::Second => pad(out, dt.second() as i64, width),
            Field::Millis => pad(out, (dt.timestamp_subsec_millis() % 1000) as i64, width),
            Field::ZoneName => match self.zone {
                Zone::Named(_) => {
                    let _ = write!(out, "{}", dt.offset());
                }
                Zone::Local | Zone::Fixed(_) => {
                    out.push_str("GMT");
                    write_offset(out, dt.offset().fix().local_minus_utc(), true, false);
                }
            },
            Field::ZoneOffset => {
                let seconds = dt.offset().fix().local_minus_utc();
                match width {
                    1 => write_offset(out, seconds, false, false),
                    2 => write_offset(out, seconds, true, false),
                    _ => match self.zone {
                        Zone::Local => write_offset(out, seconds, true, false),
                        zone => {
                            let _ = write!(out, "{zone}");
                        }
                    },
                }
            }
            Field::IsoOffset => {
                let seconds = dt.offset().fix().local_minus_utc();
                if seconds == 0 {
                    out.push('Z');
                } else {
                    write_offset(out, seconds, width == 3, width == 1);
                }
            }
        }
    }
}

fn pad(out: &mut String, value: i64, width: usize) {
    let _ = write!(out, "{value:0width$}");
}

fn write_offset(out: &mut String, seconds: i32, colon: bool, hours_only: bool) {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    let _ = write!(out, "{sign}{:02}", minutes / 60);
    if hours_only {
        return;
    }
    if colon {
        out.push(':');
    }
    let _ = write!(out, "{:02}", minutes % 60);
}
