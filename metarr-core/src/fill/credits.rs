//! Credits phase.
//!
//! The first non-empty credit in [`CreditField::ALL`] order fills every
//! empty credit. Category overrides win over inference: `set` assigns every
//! credit unconditionally, `replace` and `append` rewrite whatever the
//! sidecar and inference produced.

use super::{FillContext, WriteBacks};
use crate::model::{CreditField, FileData, MetaCategory};
use crate::scraper::WebClass;
use crate::sidecar::SidecarValues;

pub(super) fn fill(
    file: &mut FileData,
    values: &SidecarValues,
    ctx: &FillContext<'_>,
    out: &mut WriteBacks,
) {
    let credits = &mut file.credits;

    for field in CreditField::ALL {
        if let Some(v) = values.get(field.key()) {
            credits.set(field, v);
        }
        if let Some(list) = values.lists.get(&field) {
            credits.set_list(field, list.clone());
        }
    }

    if let Some(value) = ctx.overrides.set.get(&MetaCategory::Credits) {
        for field in CreditField::ALL {
            credits.set(field, value.as_str());
            out.force(field.key(), value);
        }
        return;
    }

    if !credits.all_filled() {
        let source = CreditField::ALL
            .iter()
            .map(|f| credits.get(*f))
            .find(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(source) = source {
            for field in CreditField::ALL {
                if credits.get(field).is_empty() {
                    credits.set(field, source.as_str());
                    out.push(field.key(), &source);
                }
            }
        }
    }

    if let Some(rep) = ctx.overrides.replace.get(&MetaCategory::Credits) {
        if !rep.find.is_empty() {
            for field in CreditField::ALL {
                let current = credits.get(field);
                if current.contains(&rep.find) {
                    let replaced = current.replace(&rep.find, &rep.replacement);
                    credits.set(field, replaced.as_str());
                    out.force(field.key(), &replaced);
                }
            }
        }
    }

    if let Some(suffix) = ctx.overrides.append.get(&MetaCategory::Credits) {
        for field in CreditField::ALL {
            let current = credits.get(field);
            if !current.is_empty() && !current.ends_with(suffix.as_str()) {
                let appended = format!("{current}{suffix}");
                credits.set(field, appended.as_str());
                out.force(field.key(), &appended);
            }
        }
    }

    if file.credits.all_empty() {
        if let Some(name) = ctx.scrape(&file.web.try_urls, WebClass::Credits) {
            for field in CreditField::ALL {
                file.credits.set(field, name.as_str());
                out.push(field.key(), &name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::tests::file_for;
    use crate::model::{OverrideMaps, OverrideReplace};
    use crate::scraper::{MockScraper, NoopScraper};
    use std::path::Path;

    fn run(values: &SidecarValues, overrides: &OverrideMaps) -> (FileData, WriteBacks) {
        let mut file = file_for(Path::new("/j/a.json"));
        let scraper = NoopScraper::new();
        let mut out = WriteBacks::default();
        fill(&mut file, values, &FillContext::new(&scraper, overrides), &mut out);
        (file, out)
    }

    #[test]
    fn performer_outranks_actor() {
        let mut values = SidecarValues::default();
        values.put("performer", "Alice");
        values.put("actor", "Bob");
        let (file, out) = run(&values, &OverrideMaps::default());
        for field in CreditField::ALL {
            let expected = if field == CreditField::Actor { "Bob" } else { "Alice" };
            assert_eq!(file.credits.get(field), expected, "{}", field.key());
        }
        assert_eq!(out.0.len(), 11);
    }

    #[test]
    fn set_override_assigns_everything() {
        let mut values = SidecarValues::default();
        values.put("artist", "Orig");
        let mut overrides = OverrideMaps::default();
        overrides.set.insert(MetaCategory::Credits, "Forced".to_string());
        let (file, out) = run(&values, &overrides);
        assert!(CreditField::ALL.iter().all(|f| file.credits.get(*f) == "Forced"));
        assert!(out.0.iter().all(|w| w.force));
    }

    #[test]
    fn replace_and_append_overrides_apply_after_inference() {
        let mut values = SidecarValues::default();
        values.put("uploader", "Some Channel");
        let mut overrides = OverrideMaps::default();
        overrides.replace.insert(
            MetaCategory::Credits,
            OverrideReplace {
                find: "Channel".to_string(),
                replacement: "Studio".to_string(),
            },
        );
        overrides.append.insert(MetaCategory::Credits, " (official)".to_string());
        let (file, _) = run(&values, &overrides);
        assert_eq!(file.credits.get(CreditField::Director), "Some Studio (official)");
    }

    #[test]
    fn empty_credits_are_scraped() {
        let values = SidecarValues::default();
        let mut file = file_for(Path::new("/j/a.json"));
        file.web.try_urls.push("https://ex/a".to_string());
        let scraper = MockScraper::new().with_answer(WebClass::Credits, "Jane");
        let overrides = OverrideMaps::default();
        let mut out = WriteBacks::default();
        fill(&mut file, &values, &FillContext::new(&scraper, &overrides), &mut out);
        assert!(CreditField::ALL.iter().all(|f| file.credits.get(*f) == "Jane"));
        assert_eq!(out.0.len(), CreditField::ALL.len());
    }

    #[test]
    fn list_credits_join_into_singular() {
        let mut values = SidecarValues::default();
        values.put_list(CreditField::Actor, vec!["Ann".to_string(), "Bob".to_string()]);
        let (file, _) = run(&values, &OverrideMaps::default());
        assert_eq!(file.credits.get(CreditField::Actor), "Ann; Bob");
        assert_eq!(file.credits.get(CreditField::Creator), "Ann; Bob");
    }
}
