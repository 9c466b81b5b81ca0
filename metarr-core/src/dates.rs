//! Date normalisation, permissive parsing and date tags.
//!
//! All derived dates use the `YYYY-MM-DD` form. Sidecars in the wild carry
//! compact `YYYYMMDD` strings, RFC 3339 timestamps and English long-form
//! dates; everything funnels through [`ymd_from_meta`] or
//! [`parse_permissive`] before it is stored.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{DateFormat, DateTagLocation, MetaDateTag};

/// Keys consulted, in order, when rendering a date tag.
pub const DATE_TAG_SOURCES: &[&str] = &[
    "release_date",
    "originally_available_at",
    "date",
    "upload_date",
    "formatted_date",
    "creation_time",
];

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Hyphenates compact dates and trims timestamps down to their date part.
///
/// `20230105` becomes `2023-01-05`, `230105` becomes `2023-01-05` (years
/// above the current two-digit year land in the 1900s), and
/// `2023-01-05T10:00:00Z` becomes `2023-01-05`. Anything else is returned
/// trimmed and unchanged.
pub fn ymd_from_meta(value: &str) -> String {
    let value = value.trim();
    let bytes = value.as_bytes();

    if value.len() >= 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && value.is_char_boundary(10)
        && is_valid_ymd(&value[..10])
    {
        return value[..10].to_string();
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        match value.len() {
            8 => return format!("{}-{}-{}", &value[..4], &value[4..6], &value[6..8]),
            6 => {
                let yy: u32 = value[..2].parse().unwrap_or(0);
                let current_yy = chrono::Utc::now().format("%y").to_string();
                let current_yy: u32 = current_yy.parse().unwrap_or(99);
                let century = if yy > current_yy { "19" } else { "20" };
                return format!("{century}{}-{}-{}", &value[..2], &value[2..4], &value[4..6]);
            }
            _ => {}
        }
    }

    value.to_string()
}

/// True for a real calendar date in `YYYY-MM-DD` form.
pub fn is_valid_ymd(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// English long form, e.g. `January 1, 2023`.
pub fn string_date(formatted: &str) -> Option<String> {
    NaiveDate::parse_from_str(formatted, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%B %-d, %Y").to_string())
}

/// Month-name tolerant parser for scraped dates.
pub fn parse_permissive(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    let normalised = ymd_from_meta(trimmed);
    if is_valid_ymd(&normalised) {
        return NaiveDate::parse_from_str(&normalised, "%Y-%m-%d").ok();
    }

    let cleaned = ORDINAL_SUFFIX.replace_all(trimmed, "$1");
    let cleaned = cleaned.replace([',', '.'], " ");
    let cleaned = WHITESPACE.replace_all(cleaned.trim(), " ");

    const FORMATS: &[&str] = &[
        "%Y/%m/%d",
        "%Y.%m.%d",
        "%B %d %Y",
        "%b %d %Y",
        "%d %B %Y",
        "%d %b %Y",
        "%A %B %d %Y",
        "%a %b %d %Y",
        "%m/%d/%Y",
        "%d-%m-%Y",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(&cleaned, f).ok())
}

/// Collapses runs of whitespace into one space and trims the ends.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").into_owned()
}

// ============================================================================
// DATE TAGS
// ============================================================================

/// Renders `[date]` from the first valid date `lookup` yields.
///
/// Returns `None` for `DateFormat::Skip` or when no source holds a date.
pub fn make_date_tag<F>(lookup: F, format: DateFormat) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = format.chrono_format()?;
    let date = DATE_TAG_SOURCES.iter().find_map(|key| {
        let raw = lookup(key)?;
        let ymd = ymd_from_meta(&raw);
        NaiveDate::parse_from_str(&ymd, "%Y-%m-%d").ok()
    })?;
    Some(format!("[{}]", date.format(pattern)))
}

/// Inserts `tag` at `location` unless `value` already contains it.
pub fn insert_date_tag(value: &str, tag: &str, location: DateTagLocation) -> String {
    if value.contains(tag) {
        return value.to_string();
    }
    let joined = match location {
        DateTagLocation::Prefix => format!("{tag} {value}"),
        DateTagLocation::Suffix => format!("{value} {tag}"),
    };
    collapse_whitespace(&joined)
}

/// Builds the removal pattern for a date tag at the given location.
pub fn delete_date_tag_regex(tag: MetaDateTag) -> Option<Regex> {
    let pat = tag.format.regex_fragment()?;
    let source = match tag.location {
        DateTagLocation::Prefix => format!(r"^\s*(?:\[{pat}\]|{pat}(?:\s|$))\s*"),
        DateTagLocation::Suffix => format!(r"\s*(?:\[{pat}\]|(?:^|\s){pat})\s*$"),
    };
    Regex::new(&source).ok()
}

/// Strips a date of the chosen format anchored at the chosen location.
pub fn remove_date_tag(value: &str, tag: MetaDateTag) -> String {
    match delete_date_tag_regex(tag) {
        Some(re) => collapse_whitespace(&re.replace(value, " ")),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn compact_dates_are_hyphenated() {
        assert_eq!(ymd_from_meta("20230101"), "2023-01-01");
        assert_eq!(ymd_from_meta("2023-04-05T12:00:00Z"), "2023-04-05");
        assert_eq!(ymd_from_meta("230105"), "2023-01-05");
        assert_eq!(ymd_from_meta(" 2023 "), "2023");
    }

    #[test]
    fn validity_rejects_impossible_dates() {
        assert!(is_valid_ymd("2023-02-28"));
        assert!(!is_valid_ymd("2023-02-30"));
        assert!(!is_valid_ymd("2023"));
    }

    #[test]
    fn string_date_uses_long_english_form() {
        assert_eq!(string_date("2023-01-01").as_deref(), Some("January 1, 2023"));
        assert!(string_date("garbage").is_none());
    }

    #[test]
    fn permissive_parser_handles_month_names() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 4).unwrap();
        assert_eq!(parse_permissive("March 4th, 2023"), Some(expected));
        assert_eq!(parse_permissive("4 Mar 2023"), Some(expected));
        assert_eq!(parse_permissive("2023-03-04T08:00:00+02:00"), Some(expected));
        assert_eq!(parse_permissive("20230304"), Some(expected));
        assert_eq!(parse_permissive("not a date"), None);
    }

    #[test]
    fn date_tag_renders_from_first_valid_source() {
        let map: HashMap<&str, &str> =
            [("release_date", "bad"), ("upload_date", "20230101")].into();
        let lookup = |k: &str| map.get(k).map(|v| v.to_string());
        let tag = make_date_tag(lookup, DateFormat::YyyyMmDd);
        assert_eq!(tag.as_deref(), Some("[2023-01-01]"));
        let short = make_date_tag(lookup, DateFormat::MmDdYy);
        assert_eq!(short.as_deref(), Some("[01-01-23]"));
        assert!(make_date_tag(lookup, DateFormat::Skip).is_none());
    }

    #[test]
    fn add_then_delete_restores_value() {
        let tag = MetaDateTag::new(DateTagLocation::Prefix, DateFormat::YyyyMmDd);
        let tagged = insert_date_tag("Foo", "[2023-01-01]", tag.location);
        assert_eq!(tagged, "[2023-01-01] Foo");
        assert_eq!(insert_date_tag(&tagged, "[2023-01-01]", tag.location), tagged);
        assert_eq!(remove_date_tag(&tagged, tag), "Foo");
    }

    #[test]
    fn suffix_delete_accepts_bare_dates() {
        let tag = MetaDateTag::new(DateTagLocation::Suffix, DateFormat::YyyyMmDd);
        assert_eq!(remove_date_tag("Foo  2023-01-01 ", tag), "Foo");
        assert_eq!(remove_date_tag("Foo [2023-01-01]", tag), "Foo");
        assert_eq!(remove_date_tag("2023-01-01 Foo", tag), "2023-01-01 Foo");
    }
}
