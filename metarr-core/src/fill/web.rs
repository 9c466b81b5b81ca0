//! Web phase: URLs, domain and the scraper retry list.

use crate::model::FileData;
use crate::sidecar::SidecarValues;

enum Target {
    WebpageUrl,
    VideoUrl,
    Referer,
    Domain,
}

/// Sidecar keys in priority order.
const PRIORITY: &[(&str, Target)] = &[
    ("webpage_url", Target::WebpageUrl),
    ("url", Target::VideoUrl),
    ("referer", Target::Referer),
    ("webpage_url_domain", Target::Domain),
    ("domain", Target::Domain),
];

pub(super) fn fill(file: &mut FileData, values: &SidecarValues) {
    for (key, target) in PRIORITY {
        let Some(value) = values.get(key) else {
            continue;
        };
        let slot = match target {
            Target::WebpageUrl => &mut file.web.webpage_url,
            Target::VideoUrl => &mut file.web.video_url,
            Target::Referer => &mut file.web.referer,
            Target::Domain => {
                if file.web.domain.is_empty() {
                    file.web.domain = value.to_string();
                }
                continue;
            }
        };
        if slot.is_empty() {
            *slot = value.to_string();
        }
        // Duplicates are intentional: the scraper retries in this order.
        file.web.try_urls.push(value.to_string());
    }

    if file.web.domain.is_empty() {
        if let Some(host) = crate::scraper::host_of(&file.web.webpage_url) {
            file.web.domain = host.to_string();
        }
    }
}
