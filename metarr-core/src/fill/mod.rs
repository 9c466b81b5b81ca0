// ============================================================================
// metarr-core/src/fill/mod.rs
// ============================================================================
//
// FIELD FILL: Populate FileData from a sidecar and infer missing fields
//
// The pipeline runs in a fixed phase order against one sidecar:
//
//   web -> titles -> credits -> dates -> descriptions -> show -> other
//
// Web runs first because it builds the `try_urls` list every later phase
// hands to the scraper. Each phase copies the sidecar's values into its
// FileData group, infers empty fields from filled ones in a documented
// priority order and, if the group is still empty, asks the scraper.
// Values a phase derives are queued as write-backs and stored into the
// sidecar when they are missing there (or unconditionally for overrides).
//
// KEY COMPONENTS:
// - FillContext: scraper, override maps and description date options
// - fill_metadata: runs all phases and applies write-backs
// - WriteBack: a derived value destined for the sidecar

mod credits;
mod dates;
mod descriptions;
mod titles;
mod web;

// ---- External crate imports ----
use log::{debug, warn};

// ---- Internal crate imports ----
use crate::error::CoreResult;
use crate::model::{FileData, OverrideMaps, Other, Show};
use crate::scraper::{Scraper, WebClass};
use crate::sidecar::{Sidecar, SidecarValues};

/// Collaborators and options shared by every fill.
pub struct FillContext<'a> {
    pub scraper: &'a dyn Scraper,
    pub overrides: &'a OverrideMaps,
    pub desc_date_prefix: bool,
    pub desc_date_suffix: bool,
    /// When false no scraper calls are made
    pub scrape: bool,
}

impl<'a> FillContext<'a> {
    pub fn new(scraper: &'a dyn Scraper, overrides: &'a OverrideMaps) -> Self {
        Self {
            scraper,
            overrides,
            desc_date_prefix: false,
            desc_date_suffix: false,
            scrape: true,
        }
    }

    /// Asks the scraper for `class`, logging and swallowing failures.
    pub(crate) fn scrape(&self, try_urls: &[String], class: WebClass) -> Option<String> {
        if !self.scrape || try_urls.is_empty() {
            return None;
        }
        match self.scraper.fetch(try_urls, class) {
            Ok(Some(value)) if !value.trim().is_empty() => {
                debug!("Scraped {:?}: {}", class, value.trim());
                Some(value.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Scraping {:?} failed: {}", class, e);
                None
            }
        }
    }
}

/// A derived value to store in the sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBack {
    pub key: String,
    pub value: String,
    /// Overwrite a non-empty sidecar value
    pub force: bool,
}

#[derive(Debug, Default)]
pub(crate) struct WriteBacks(Vec<WriteBack>);

impl WriteBacks {
    pub(crate) fn push(&mut self, key: &str, value: &str) {
        self.push_with(key, value, false);
    }

    pub(crate) fn force(&mut self, key: &str, value: &str) {
        self.push_with(key, value, true);
    }

    fn push_with(&mut self, key: &str, value: &str, force: bool) {
        if value.trim().is_empty() {
            return;
        }
        self.0.retain(|w| w.key != key);
        self.0.push(WriteBack {
            key: key.to_string(),
            value: value.to_string(),
            force,
        });
    }
}

/// Runs every fill phase, then stores derived values into the sidecar.
/// Returns the write-backs that changed the sidecar. The sidecar is not
/// written to disk here.
pub fn fill_metadata(
    file: &mut FileData,
    sidecar: &mut Sidecar,
    ctx: &FillContext<'_>,
) -> CoreResult<Vec<WriteBack>> {
    let values = sidecar.values();
    let mut pending = WriteBacks::default();

    web::fill(file, &values);
    titles::fill(file, &values, ctx, &mut pending);
    credits::fill(file, &values, ctx, &mut pending);
    dates::fill(file, &values, ctx, &mut pending);
    descriptions::fill(file, &values, ctx, &mut pending);
    fill_show(&mut file.show, &values);
    fill_other(&mut file.other, &values);

    let mut applied = Vec::new();
    for wb in pending.0 {
        if sidecar.write_back(&wb.key, &wb.value, wb.force)? {
            applied.push(wb);
        }
    }
    if !applied.is_empty() {
        debug!(
            "Fill added {} field(s) to {}",
            applied.len(),
            sidecar.path().display()
        );
    }
    Ok(applied)
}

fn fill_show(show: &mut Show, values: &SidecarValues) {
    for key in Show::KEYS {
        if let (Some(v), Some(slot)) = (values.get(key), show.get_mut(key)) {
            *slot = v.to_string();
        }
    }
}

fn fill_other(other: &mut Other, values: &SidecarValues) {
    for key in Other::KEYS {
        if let (Some(v), Some(slot)) = (values.get(key), other.get_mut(key)) {
            *slot = v.to_string();
        }
    }
}
