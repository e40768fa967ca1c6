//! Maps converter options to a [`FormatSpec`].

pub const DEFAULT_PATTERN: &str = "yyyy-MM-dd HH:mm:ss,SSS";
pub const ISO8601_PATTERN: &str = "yyyy-MM-dd'T'HH:mm:ss,SSS";
pub const ISO8601_BASIC_PATTERN: &str = "yyyyMMdd'T'HHmmss,SSS";
pub const ABSOLUTE_TIME_PATTERN: &str = "HH:mm:ss,SSS";
pub const DATE_AND_TIME_PATTERN: &str = "dd MMM yyyy HH:mm:ss,SSS";
pub const COMPACT_PATTERN: &str = "yyyyMMddHHmmssSSS";

/// What a converter was configured to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSpec {
    Pattern {
        pattern: String,
        time_zone: Option<String>,
    },
    UnixSeconds,
    UnixMillis,
}

impl FormatSpec {
    pub fn pattern(&self) -> Option<&str> {
        match self {
            FormatSpec::Pattern { pattern, .. } => Some(pattern),
            FormatSpec::UnixSeconds | FormatSpec::UnixMillis => None,
        }
    }
}

/// The selector tokens that have a fixed meaning.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NamedFormat {
    Default,
    Iso8601,
    Iso8601Basic,
    Absolute,
    Date,
    Compact,
    Unix,
    UnixMillis,
}

impl NamedFormat {
    pub const ALL: [NamedFormat; 8] = [
        NamedFormat::Default,
        NamedFormat::Iso8601,
        NamedFormat::Iso8601Basic,
        NamedFormat::Absolute,
        NamedFormat::Date,
        NamedFormat::Compact,
        NamedFormat::Unix,
        NamedFormat::UnixMillis,
    ];

    pub fn token(self) -> &'static str {
        match self {
            NamedFormat::Default => "DEFAULT",
            NamedFormat::Iso8601 => "ISO8601",
            NamedFormat::Iso8601Basic => "ISO8601_BASIC",
            NamedFormat::Absolute => "ABSOLUTE",
            NamedFormat::Date => "DATE",
            NamedFormat::Compact => "COMPACT",
            NamedFormat::Unix => "UNIX",
            NamedFormat::UnixMillis => "UNIX_MILLIS",
        }
    }

    /// Calendar pattern behind the alias, `None` for the epoch formats.
    pub fn pattern(self) -> Option<&'static str> {
        match self {
            NamedFormat::Default => Some(DEFAULT_PATTERN),
            NamedFormat::Iso8601 => Some(ISO8601_PATTERN),
            NamedFormat::Iso8601Basic => Some(ISO8601_BASIC_PATTERN),
            NamedFormat::Absolute => Some(ABSOLUTE_TIME_PATTERN),
            NamedFormat::Date => Some(DATE_AND_TIME_PATTERN),
            NamedFormat::Compact => Some(COMPACT_PATTERN),
            NamedFormat::Unix | NamedFormat::UnixMillis => None,
        }
    }

    /// Case-insensitive lookup.
    pub fn from_token(token: &str) -> Option<NamedFormat> {
        Self::ALL
            .into_iter()
            .find(|named| named.token().eq_ignore_ascii_case(token))
    }
}

/// Resolves the format selector and optional zone into a [`FormatSpec`].
///
/// A missing or empty selector means `DEFAULT`. Anything that is not a
/// known alias is taken as a literal calendar pattern. The zone only
/// applies to calendar patterns.
pub fn resolve(token: Option<&str>, time_zone: Option<&str>) -> FormatSpec {
    let token = token.filter(|t| !t.is_empty());

    let pattern = match token.map(|t| (t, NamedFormat::from_token(t))) {
        None => DEFAULT_PATTERN,
        Some((_, Some(NamedFormat::Unix))) => return FormatSpec::UnixSeconds,
        Some((_, Some(NamedFormat::UnixMillis))) => return FormatSpec::UnixMillis,
        Some((_, Some(named))) => named.pattern().unwrap_or(DEFAULT_PATTERN),
        Some((literal, None)) => literal,
    };

    FormatSpec::Pattern {
        pattern: pattern.to_string(),
        time_zone: time_zone.map(str::to_string),
    }
}

/// Resolves an ordered option list: selector first, zone second.
pub fn resolve_options<S: AsRef<str>>(options: &[S]) -> FormatSpec {
    resolve(
        options.first().map(|o| o.as_ref()),
        options.get(1).map(|o| o.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_of(spec: &FormatSpec) -> &str {
        spec.pattern().unwrap()
    }

    #[test]
    fn missing_or_default_token_uses_default_pattern() {
        assert_eq!(pattern_of(&resolve(None, None)), DEFAULT_PATTERN);
        assert_eq!(pattern_of(&resolve(Some(""), None)), DEFAULT_PATTERN);
        assert_eq!(pattern_of(&resolve(Some("default"), None)), DEFAULT_PATTERN);
    }

    #[test]
    fn aliases_match_case_insensitively() {
        assert_eq!(
            resolve(Some("iso8601"), None),
            FormatSpec::Pattern {
                pattern: "yyyy-MM-dd'T'HH:mm:ss,SSS".to_string(),
                time_zone: None
            }
        );
        assert_eq!(pattern_of(&resolve(Some("Iso8601_Basic"), None)), ISO8601_BASIC_PATTERN);
        assert_eq!(pattern_of(&resolve(Some("absolute"), None)), ABSOLUTE_TIME_PATTERN);
        assert_eq!(pattern_of(&resolve(Some("DATE"), None)), DATE_AND_TIME_PATTERN);
        assert_eq!(pattern_of(&resolve(Some("compact"), None)), COMPACT_PATTERN);
    }

    #[test]
    fn epoch_tokens_select_numeric_specs() {
        assert_eq!(resolve(Some("unix"), None), FormatSpec::UnixSeconds);
        assert_eq!(resolve(Some("UNIX_MILLIS"), Some("UTC")), FormatSpec::UnixMillis);
        assert_eq!(resolve(Some("unix"), None).pattern(), None);
    }

    #[test]
    fn unknown_token_is_a_literal_pattern_with_zone() {
        assert_eq!(
            resolve(Some("HH:mm"), Some("Europe/Paris")),
            FormatSpec::Pattern {
                pattern: "HH:mm".to_string(),
                time_zone: Some("Europe/Paris".to_string())
            }
        );
    }

    #[test]
    fn option_list_is_positional() {
        let options = ["ABSOLUTE", "UTC", "ignored"];
        assert_eq!(
            resolve_options(&options),
            FormatSpec::Pattern {
                pattern: ABSOLUTE_TIME_PATTERN.to_string(),
                time_zone: Some("UTC".to_string())
            }
        );
        assert_eq!(pattern_of(&resolve_options::<&str>(&[])), DEFAULT_PATTERN);
    }

    #[test]
    fn every_named_format_round_trips_its_token() {
        for named in NamedFormat::ALL {
            assert_eq!(NamedFormat::from_token(&named.token().to_lowercase()), Some(named));
        }
    }
}
