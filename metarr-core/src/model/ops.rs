//! Edit-operation records.
//!
//! These are immutable value types built once from the command line and
//! shared by every `FileData` in the run.

use crate::error::{CoreError, CoreResult};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DATE TAGS
// ============================================================================

/// Where a date tag is inserted into (or removed from) a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTagLocation {
    Prefix,
    Suffix,
}

impl FromStr for DateTagLocation {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" | "pfx" => Ok(Self::Prefix),
            "suffix" | "sfx" => Ok(Self::Suffix),
            other => Err(CoreError::Config(format!(
                "unknown date tag location '{other}' (expected prefix or suffix)"
            ))),
        }
    }
}

/// Layout of the rendered date inside a date tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateFormat {
    YyyyMmDd,
    YyMmDd,
    YyyyDdMm,
    YyDdMm,
    DdMmYyyy,
    DdMmYy,
    MmDdYyyy,
    MmDdYy,
    Skip,
}

impl DateFormat {
    /// chrono format string, `None` for `Skip`.
    #[must_use]
    pub fn chrono_format(self) -> Option<&'static str> {
        match self {
            Self::YyyyMmDd => Some("%Y-%m-%d"),
            Self::YyMmDd => Some("%y-%m-%d"),
            Self::YyyyDdMm => Some("%Y-%d-%m"),
            Self::YyDdMm => Some("%y-%d-%m"),
            Self::DdMmYyyy => Some("%d-%m-%Y"),
            Self::DdMmYy => Some("%d-%m-%y"),
            Self::MmDdYyyy => Some("%m-%d-%Y"),
            Self::MmDdYy => Some("%m-%d-%y"),
            Self::Skip => None,
        }
    }

    /// Regex fragment matching a date rendered in this format.
    #[must_use]
    pub fn regex_fragment(self) -> Option<&'static str> {
        match self {
            Self::YyyyMmDd | Self::YyyyDdMm => Some(r"\d{4}-\d{2}-\d{2}"),
            Self::YyMmDd | Self::YyDdMm | Self::DdMmYy | Self::MmDdYy => {
                Some(r"\d{2}-\d{2}-\d{2}")
            }
            Self::DdMmYyyy | Self::MmDdYyyy => Some(r"\d{2}-\d{2}-\d{4}"),
            Self::Skip => None,
        }
    }
}

impl FromStr for DateFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let format = match s.trim() {
            "YYYY-MM-DD" | "Ymd" => Self::YyyyMmDd,
            "YY-MM-DD" | "ymd" => Self::YyMmDd,
            "YYYY-DD-MM" | "Ydm" => Self::YyyyDdMm,
            "YY-DD-MM" | "ydm" => Self::YyDdMm,
            "DD-MM-YYYY" | "dmY" => Self::DdMmYyyy,
            "DD-MM-YY" | "dmy" => Self::DdMmYy,
            "MM-DD-YYYY" | "mdY" => Self::MmDdYyyy,
            "MM-DD-YY" | "mdy" => Self::MmDdYy,
            "skip" | "Skip" | "" => Self::Skip,
            other => {
                return Err(CoreError::Config(format!("unknown date format '{other}'")));
            }
        };
        Ok(format)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::YyyyMmDd => "YYYY-MM-DD",
            Self::YyMmDd => "YY-MM-DD",
            Self::YyyyDdMm => "YYYY-DD-MM",
            Self::YyDdMm => "YY-DD-MM",
            Self::DdMmYyyy => "DD-MM-YYYY",
            Self::DdMmYy => "DD-MM-YY",
            Self::MmDdYyyy => "MM-DD-YYYY",
            Self::MmDdYy => "MM-DD-YY",
            Self::Skip => "skip",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaDateTag {
    pub location: DateTagLocation,
    pub format: DateFormat,
}

impl MetaDateTag {
    pub fn new(location: DateTagLocation, format: DateFormat) -> Self {
        Self { location, format }
    }
}

// ============================================================================
// METADATA EDIT OPERATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaSet {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaReplace {
    pub field: String,
    pub find: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaReplacePrefix {
    pub field: String,
    pub prefix: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaReplaceSuffix {
    pub field: String,
    pub suffix: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaAppend {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaPrefix {
    pub field: String,
    pub value: String,
}

/// Copies `field` into `dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyToField {
    pub field: String,
    pub dest: String,
}

/// Pastes `origin` into `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteFromField {
    pub field: String,
    pub origin: String,
}

/// Every metadata edit requested for the run.
///
/// Prefix and append are not idempotent: running them twice doubles the
/// inserted text. Set is idempotent, replace is idempotent as long as the
/// replacement does not contain the searched text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaOps {
    pub set: Vec<MetaSet>,
    pub copy_to: Vec<CopyToField>,
    pub paste_from: Vec<PasteFromField>,
    pub replace: Vec<MetaReplace>,
    pub replace_prefix: Vec<MetaReplacePrefix>,
    pub replace_suffix: Vec<MetaReplaceSuffix>,
    pub prefix: Vec<MetaPrefix>,
    pub append: Vec<MetaAppend>,
    pub date_tags: BTreeMap<String, MetaDateTag>,
    pub delete_date_tags: BTreeMap<String, MetaDateTag>,
}

impl MetaOps {
    /// True when none of the primary (non date-tag) edits are requested.
    #[must_use]
    pub fn primary_is_empty(&self) -> bool {
        self.set.is_empty()
            && self.copy_to.is_empty()
            && self.paste_from.is_empty()
            && self.replace.is_empty()
            && self.replace_prefix.is_empty()
            && self.replace_suffix.is_empty()
            && self.prefix.is_empty()
            && self.append.is_empty()
    }

    #[must_use]
    pub fn date_tags_are_empty(&self) -> bool {
        self.date_tags.is_empty() && self.delete_date_tags.is_empty()
    }
}

// ============================================================================
// FILENAME OPERATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameReplace {
    pub find: String,
    pub replacement: String,
}

/// Operations applied to the output file name (without extension).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameOps {
    pub date_tag: Option<MetaDateTag>,
    pub delete_date_tag: Option<MetaDateTag>,
    pub set: Option<String>,
    pub replace: Vec<FilenameReplace>,
    pub replace_prefix: Vec<FilenameReplace>,
    pub replace_suffix: Vec<FilenameReplace>,
    pub prefix: Vec<String>,
    pub append: Vec<String>,
}

impl FilenameOps {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date_tag.is_none()
            && self.delete_date_tag.is_none()
            && self.set.is_none()
            && self.replace.is_empty()
            && self.replace_prefix.is_empty()
            && self.replace_suffix.is_empty()
            && self.prefix.is_empty()
            && self.append.is_empty()
    }
}

// ============================================================================
// OVERRIDE MAPS
// ============================================================================

/// Metadata category an override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaCategory {
    Credits,
}

impl FromStr for MetaCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credits" | "all-credits" => Ok(Self::Credits),
            other => Err(CoreError::Config(format!(
                "unknown metadata category '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideReplace {
    pub find: String,
    pub replacement: String,
}

/// Unconditional per-category instructions; they win over inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMaps {
    pub set: HashMap<MetaCategory, String>,
    pub replace: HashMap<MetaCategory, OverrideReplace>,
    pub append: HashMap<MetaCategory, String>,
}

impl OverrideMaps {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.replace.is_empty() && self.append.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_date_formats() {
        assert_eq!("YYYY-MM-DD".parse::<DateFormat>().unwrap(), DateFormat::YyyyMmDd);
        assert_eq!("ymd".parse::<DateFormat>().unwrap(), DateFormat::YyMmDd);
        assert_eq!("mdY".parse::<DateFormat>().unwrap(), DateFormat::MmDdYyyy);
        assert_eq!("skip".parse::<DateFormat>().unwrap(), DateFormat::Skip);
        assert!("Q-Q-Q".parse::<DateFormat>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for format in [
            DateFormat::YyyyMmDd,
            DateFormat::YyDdMm,
            DateFormat::DdMmYy,
            DateFormat::MmDdYyyy,
        ] {
            assert_eq!(format.to_string().parse::<DateFormat>().unwrap(), format);
        }
    }

    #[test]
    fn meta_ops_emptiness() {
        let mut ops = MetaOps::default();
        assert!(ops.primary_is_empty());
        ops.date_tags.insert(
            "title".to_string(),
            MetaDateTag::new(DateTagLocation::Prefix, DateFormat::YyyyMmDd),
        );
        assert!(ops.primary_is_empty());
        assert!(!ops.date_tags_are_empty());
    }
}
