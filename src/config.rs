use std::path::PathBuf;

use crate::alias::{self, FormatSpec, NamedFormat};

/// The two positional converter options: format selector, then time zone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConverterOptions {
    pub format: Option<String>,
    pub time_zone: Option<String>,
}

impl ConverterOptions {
    pub fn from_options<S: AsRef<str>>(options: &[S]) -> Self {
        let option = |i: usize| options.get(i).map(|o| o.as_ref().to_string());
        Self {
            format: option(0),
            time_zone: option(1),
        }
    }

    /// Back to the positional form. A zone without a selector keeps its
    /// slot by putting `DEFAULT` first.
    pub fn as_options(&self) -> Vec<&str> {
        match (&self.format, &self.time_zone) {
            (None, None) => vec![],
            (Some(format), None) => vec![format.as_str()],
            (format, Some(zone)) => vec![
                format.as_deref().unwrap_or(NamedFormat::Default.token()),
                zone.as_str(),
            ],
        }
    }

    pub fn spec(&self) -> FormatSpec {
        alias::resolve(self.format.as_deref(), self.time_zone.as_deref())
    }

    pub fn describe(&self) -> String {
        let zone = self.time_zone.as_deref().unwrap_or("local");
        match self.spec() {
            FormatSpec::UnixSeconds => "epoch seconds".to_string(),
            FormatSpec::UnixMillis => "epoch milliseconds".to_string(),
            FormatSpec::Pattern { pattern, .. } => format!("pattern \"{pattern}\" ({zone})"),
        }
    }
}

pub struct RunConfig {
    pub converter: ConverterOptions,
    pub threads: usize,
    pub output: Option<PathBuf>,
}
