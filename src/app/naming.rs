//! Archive identity and naming scheme
//!
//! Every archive published by the server is identified by a source name and
//! a calendar date. The canonical key is `<source>_<DD-MM-YYYY>` and the
//! archive filename is the key followed by `.zip`. Conversions in both
//! directions are pure and lossless.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::naming::{ARCHIVE_EXTENSION, DATE_FORMAT, SEPARATOR};
use crate::errors::{NamingError, NamingResult};

/// Structured identity of one dated archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchiveIdentity {
    /// Newspaper source (e.g., "haz")
    pub source: String,
    /// Publication date
    pub date: NaiveDate,
}

impl ArchiveIdentity {
    /// Create an identity, validating the source name
    ///
    /// # Errors
    ///
    /// Returns `NamingError::InvalidSource` if the source is empty or contains
    /// the key separator, since such a key could not be parsed back.
    pub fn new(source: impl Into<String>, date: NaiveDate) -> NamingResult<Self> {
        let source = source.into();
        validate_source(&source)?;
        Ok(Self { source, date })
    }

    /// Canonical key, e.g. `haz_01-06-2024`
    pub fn key(&self) -> String {
        format!("{}{}{}", self.source, SEPARATOR, self.date.format(DATE_FORMAT))
    }

    /// Archive filename, e.g. `haz_01-06-2024.zip`
    pub fn filename(&self) -> String {
        format!("{}{}", self.key(), ARCHIVE_EXTENSION)
    }

    /// Parse a key or archive filename
    ///
    /// The `.zip` suffix is optional. The remaining text must contain exactly
    /// one separator, a non-empty source, and a zero-padded `DD-MM-YYYY` date.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use paper_kiosk::app::ArchiveIdentity;
    ///
    /// let identity = ArchiveIdentity::parse("haz_01-06-2024.zip")?;
    /// assert_eq!(identity.source, "haz");
    /// assert_eq!(identity.key(), "haz_01-06-2024");
    /// # Ok::<(), paper_kiosk::errors::NamingError>(())
    /// ```
    pub fn parse(name: &str) -> NamingResult<Self> {
        let base = base_name(name);

        let mut parts = base.split(SEPARATOR);
        let (source, date_str) = match (parts.next(), parts.next(), parts.next()) {
            (Some(source), Some(date), None) => (source, date),
            _ => {
                return Err(NamingError::InvalidSeparator {
                    name: name.to_string(),
                })
            }
        };

        validate_source(source)?;
        let date = parse_date(name, date_str)?;

        Ok(Self {
            source: source.to_string(),
            date,
        })
    }
}

impl fmt::Display for ArchiveIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for ArchiveIdentity {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Strip the archive extension, if present
///
/// Only an exact `.zip` suffix is removed.
pub fn base_name(name: &str) -> &str {
    name.strip_suffix(ARCHIVE_EXTENSION).unwrap_or(name)
}

fn validate_source(source: &str) -> NamingResult<()> {
    if source.is_empty() || source.contains(SEPARATOR) || source.contains(['/', '\\']) {
        return Err(NamingError::InvalidSource {
            source_name: source.to_string(),
        });
    }
    Ok(())
}

fn parse_date(name: &str, date_str: &str) -> NamingResult<NaiveDate> {
    let invalid = || NamingError::InvalidDate {
        name: name.to_string(),
        date: date_str.to_string(),
    };

    // chrono accepts unpadded fields; the naming scheme does not
    let shape_ok = date_str.len() == 10
        && date_str.char_indices().all(|(i, c)| match i {
            2 | 5 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_key_and_filename() {
        let identity = ArchiveIdentity::new("haz", date(2024, 6, 1)).unwrap();
        assert_eq!(identity.key(), "haz_01-06-2024");
        assert_eq!(identity.filename(), "haz_01-06-2024.zip");
        assert_eq!(identity.to_string(), "haz_01-06-2024");
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            ("haz", date(2024, 6, 1)),
            ("np", date(1999, 12, 31)),
            ("weser-kurier", date(2024, 2, 29)),
        ];

        for (source, d) in cases {
            let identity = ArchiveIdentity::new(source, d).unwrap();
            assert_eq!(ArchiveIdentity::parse(&identity.filename()).unwrap(), identity);
            assert_eq!(ArchiveIdentity::parse(&identity.key()).unwrap(), identity);
            assert_eq!(identity.key().parse::<ArchiveIdentity>().unwrap(), identity);
        }
    }

    #[test]
    fn test_parse_rejects_wrong_separator_count() {
        for name in ["haz01-06-2024.zip", "haz_extra_01-06-2024.zip", "", "_"] {
            let result = ArchiveIdentity::parse(name);
            assert!(result.is_err(), "Should reject: {}", name);
        }

        assert!(matches!(
            ArchiveIdentity::parse("a_b_01-06-2024"),
            Err(NamingError::InvalidSeparator { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_dates() {
        let invalid = [
            "haz_1-6-2024.zip",
            "haz_2024-06-01.zip",
            "haz_31-02-2024.zip",
            "haz_01-13-2024.zip",
            "haz_01.06.2024.zip",
            "haz_01-06-24.zip",
        ];

        for name in invalid {
            assert!(
                matches!(
                    ArchiveIdentity::parse(name),
                    Err(NamingError::InvalidDate { .. })
                ),
                "Should reject: {}",
                name
            );
        }
    }

    #[test]
    fn test_parse_rejects_empty_source() {
        assert!(matches!(
            ArchiveIdentity::parse("_01-06-2024.zip"),
            Err(NamingError::InvalidSource { .. })
        ));
        assert!(ArchiveIdentity::new("", date(2024, 6, 1)).is_err());
        assert!(ArchiveIdentity::new("a_b", date(2024, 6, 1)).is_err());
    }

    #[test]
    fn test_extension_is_stripped_only_as_suffix() {
        // A character-set strip would eat the trailing 'z' and 'p' of the source
        assert_eq!(base_name("zip_01-06-2024.zip"), "zip_01-06-2024");
        assert_eq!(base_name("haz_01-06-2024"), "haz_01-06-2024");

        let identity = ArchiveIdentity::parse("zip_01-06-2024.zip").unwrap();
        assert_eq!(identity.source, "zip");
    }
}
