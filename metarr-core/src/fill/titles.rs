//! Title phase.

use super::{FillContext, WriteBacks};
use crate::model::{FileData, Titles};
use crate::scraper::WebClass;
use crate::sidecar::SidecarValues;

pub(super) fn fill(
    file: &mut FileData,
    values: &SidecarValues,
    ctx: &FillContext<'_>,
    out: &mut WriteBacks,
) {
    let titles = &mut file.titles;
    for key in Titles::KEYS {
        if let (Some(v), Some(slot)) = (values.get(key), titles.get_mut(key)) {
            *slot = v.to_string();
        }
    }

    if titles.title.is_empty() && !titles.fulltitle.is_empty() {
        titles.title = titles.fulltitle.clone();
    }
    if titles.fulltitle.is_empty() && !titles.title.is_empty() {
        titles.fulltitle = titles.title.clone();
    }

    if file.titles.title.is_empty() {
        if let Some(title) = ctx.scrape(&file.web.try_urls, WebClass::Title) {
            file.titles.title = title.clone();
            file.titles.fulltitle = title.clone();
            out.push("title", &title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::tests::file_for;
    use crate::model::OverrideMaps;
    use crate::scraper::{MockScraper, NoopScraper};
    use std::path::Path;

    #[test]
    fn title_and_fulltitle_cross_fill() {
        let mut values = SidecarValues::default();
        values.put("fulltitle", "Full");
        let mut file = file_for(Path::new("/j/a.json"));
        let scraper = NoopScraper::new();
        let overrides = OverrideMaps::default();
        let mut out = WriteBacks::default();
        fill(&mut file, &values, &FillContext::new(&scraper, &overrides), &mut out);
        assert_eq!(file.titles.title, "Full");
        assert_eq!(file.titles.fulltitle, "Full");
        assert!(out.0.is_empty());
    }

    #[test]
    fn empty_title_is_scraped() {
        let values = SidecarValues::default();
        let mut file = file_for(Path::new("/j/a.json"));
        file.web.try_urls.push("https://ex/a".to_string());
        let scraper = MockScraper::new().with_answer(WebClass::Title, "Scraped");
        let overrides = OverrideMaps::default();
        let mut out = WriteBacks::default();
        fill(&mut file, &values, &FillContext::new(&scraper, &overrides), &mut out);
        assert_eq!(file.titles.title, "Scraped");
        assert_eq!(out.0[0].key, "title");
    }
}
