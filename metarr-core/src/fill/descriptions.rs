//! Descriptions phase.

use super::{FillContext, WriteBacks};
use crate::model::{Descriptions, FileData};
use crate::scraper::WebClass;
use crate::sidecar::SidecarValues;

const SEPARATOR: &str = "\n\n";

pub(super) fn fill(
    file: &mut FileData,
    values: &SidecarValues,
    ctx: &FillContext<'_>,
    out: &mut WriteBacks,
) {
    let descriptions = &mut file.descriptions;
    for key in Descriptions::KEYS {
        if let (Some(v), Some(slot)) = (values.get(key), descriptions.get_mut(key)) {
            *slot = v.to_string();
        }
    }

    let source = Descriptions::KEYS
        .iter()
        .filter_map(|k| descriptions.get(k))
        .find(|v| !v.is_empty())
        .map(str::to_string);

    match source {
        Some(source) => {
            for key in Descriptions::KEYS {
                if let Some(slot) = descriptions.get_mut(key) {
                    if slot.is_empty() {
                        *slot = source.clone();
                    }
                }
            }
        }
        None => {
            if let Some(scraped) = ctx.scrape(&file.web.try_urls, WebClass::Description) {
                for key in Descriptions::KEYS {
                    if let Some(slot) = file.descriptions.get_mut(key) {
                        *slot = scraped.clone();
                    }
                }
                out.push("description", &scraped);
            }
        }
    }

    let string_date = file.dates.string_date.clone();
    if string_date.is_empty() || !(ctx.desc_date_prefix || ctx.desc_date_suffix) {
        return;
    }
    for key in Descriptions::KEYS {
        let had_value = values.get(key).is_some();
        let Some(slot) = file.descriptions.get_mut(key) else {
            continue;
        };
        if slot.is_empty() {
            continue;
        }
        let mut changed = false;
        if ctx.desc_date_prefix && !slot.starts_with(&string_date) {
            *slot = format!("{string_date}{SEPARATOR}{slot}");
            changed = true;
        }
        if ctx.desc_date_suffix && !slot.ends_with(&string_date) {
            *slot = format!("{slot}{SEPARATOR}{string_date}");
            changed = true;
        }
        if changed && had_value {
            out.force(key, slot);
        }
    }
}
