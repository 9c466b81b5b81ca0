// ============================================================================
// metarr-core/src/fill/dates.rs
// ============================================================================
//
// DATES PHASE: Normalise sidecar dates and derive the missing ones
//
// Inference chain:
// 1. The first valid YYYY-MM-DD among originally_available_at,
//    release_date, date and upload_date anchors creation_time (with
//    T00:00:00Z appended), formatted_date and any empty
//    originally_available_at / release_date.
// 2. date fills from release_date, upload_date or formatted_date.
// 3. year fills from the first four characters of date, upload_date or
//    formatted_date.
// 4. A creation_time whose year disagrees with `year` is rebuilt from a
//    date field that agrees.
// 5. With nothing to go on, the scraper is asked and its answer parsed
//    permissively, then the chain runs again.

use super::{FillContext, WriteBacks};
use crate::dates::{is_valid_ymd, parse_permissive, string_date, ymd_from_meta};
use crate::model::{Dates, FileData};
use crate::scraper::WebClass;
use crate::sidecar::SidecarValues;

const PRIORITY: &[&str] = &[
    "release_date",
    "originally_available_at",
    "date",
    "upload_date",
    "release_year",
    "year",
    "creation_time",
];

const ANCHORS: &[&str] = &["originally_available_at", "release_date", "date", "upload_date"];

const MIDNIGHT_SUFFIX: &str = "T00:00:00Z";

pub(super) fn fill(
    file: &mut FileData,
    values: &SidecarValues,
    ctx: &FillContext<'_>,
    out: &mut WriteBacks,
) {
    let dates = &mut file.dates;
    for key in PRIORITY {
        let Some(raw) = values.get(key) else {
            continue;
        };
        let value = if *key != "creation_time" && raw.len() >= 6 {
            ymd_from_meta(raw)
        } else {
            raw.to_string()
        };
        let slot = match *key {
            "release_year" => &mut dates.year,
            other => match dates.get_mut(other) {
                Some(slot) => slot,
                None => continue,
            },
        };
        if slot.is_empty() {
            *slot = value;
        }
    }

    if !infer(dates, out) && all_empty(dates) {
        if let Some(raw) = ctx.scrape(&file.web.try_urls, WebClass::Date) {
            if let Some(date) = parse_permissive(&raw) {
                let ymd = date.format("%Y-%m-%d").to_string();
                file.dates.release_date = ymd.clone();
                out.push("release_date", &ymd);
                infer(&mut file.dates, out);
            }
        }
    }

    file.dates.string_date = string_date(&file.dates.formatted_date).unwrap_or_default();
}

fn all_empty(dates: &Dates) -> bool {
    PRIORITY
        .iter()
        .filter_map(|k| dates.get(k))
        .all(|v| v.is_empty())
}

/// Runs the inference chain. Returns whether an anchor date was found.
fn infer(dates: &mut Dates, out: &mut WriteBacks) -> bool {
    let anchor = ANCHORS
        .iter()
        .filter_map(|k| dates.get(k))
        .find(|v| is_valid_ymd(v))
        .map(str::to_string);

    if let Some(anchor) = &anchor {
        if dates.creation_time.is_empty() {
            dates.creation_time = format!("{anchor}{MIDNIGHT_SUFFIX}");
            out.push("creation_time", &dates.creation_time);
        }
        dates.formatted_date = anchor.clone();
        out.push("formatted_date", anchor);
        if dates.originally_available_at.is_empty() {
            dates.originally_available_at = anchor.clone();
            out.push("originally_available_at", anchor);
        }
        if dates.release_date.is_empty() {
            dates.release_date = anchor.clone();
            out.push("release_date", anchor);
        }
    }

    if dates.date.is_empty() {
        let source = [&dates.release_date, &dates.upload_date, &dates.formatted_date]
            .into_iter()
            .find(|v| is_valid_ymd(v))
            .cloned();
        if let Some(source) = source {
            out.push("date", &source);
            dates.date = source;
        }
    }

    if dates.year.is_empty() {
        let source = [&dates.date, &dates.upload_date, &dates.formatted_date]
            .into_iter()
            .filter_map(|v| year_prefix(v))
            .next();
        if let Some(year) = source {
            out.push("year", &year);
            dates.year = year;
        }
    }

    fix_creation_time_year(dates, out);
    anchor.is_some()
}

fn year_prefix(value: &str) -> Option<String> {
    let prefix = value.get(..4)?;
    prefix
        .chars()
        .all(|c| c.is_ascii_digit())
        .then(|| prefix.to_string())
}

fn fix_creation_time_year(dates: &mut Dates, out: &mut WriteBacks) {
    if dates.year.len() != 4 || dates.creation_time.is_empty() {
        return;
    }
    if dates.creation_time.starts_with(&dates.year) {
        return;
    }
    let agreeing = [
        &dates.release_date,
        &dates.originally_available_at,
        &dates.date,
        &dates.upload_date,
        &dates.formatted_date,
    ]
    .into_iter()
    .find(|v| v.starts_with(&dates.year) && is_valid_ymd(v))
    .cloned();
    if let Some(date) = agreeing {
        dates.creation_time = format!("{date}{MIDNIGHT_SUFFIX}");
        out.force("creation_time", &dates.creation_time);
    }
}
