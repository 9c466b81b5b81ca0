//! The "metadata already present" pre-check.
//!
//! Before building an ffmpeg command the input is probed. When every
//! comparable container tag already holds the value this run would write,
//! the thumbnail state agrees with the request and the container is not
//! changing, ffmpeg is skipped entirely.

use std::time::Duration;

use log::{debug, warn};

use crate::config::CoreConfig;
use crate::external::{FfprobeExecutor, ProbeOutput};
use crate::model::FileData;
use crate::transcode::{Container, MetaTag};

/// Probes the input video and records whether it carries a thumbnail.
/// A failed probe is logged and yields `None`.
pub fn probe_input(
    prober: &dyn FfprobeExecutor,
    file: &mut FileData,
    timeout: Option<Duration>,
) -> Option<ProbeOutput> {
    let input = file.paths.original_video.clone()?;
    match prober.probe(&input, timeout) {
        Ok(probe) => {
            file.has_embedded_thumbnail = probe.has_embedded_thumbnail();
            Some(probe)
        }
        Err(e) => {
            warn!("Probe of {} failed, re-encoding metadata: {}", input.display(), e);
            None
        }
    }
}

/// True when the probed container already holds what would be written.
pub fn metadata_matches(file: &FileData, probe: &ProbeOutput, config: &CoreConfig) -> bool {
    if config.force_write_thumbnails {
        return false;
    }
    if config.strip_thumbnails && probe.has_embedded_thumbnail() {
        debug!("Thumbnail present but stripping was requested");
        return false;
    }

    let out_ext = config
        .output_ext_dotted()
        .unwrap_or_else(|| file.input_ext());
    let container = Container::from_ext(&out_ext);

    for tag in MetaTag::COMPARABLE {
        let Some(key) = container.key_for(tag) else {
            continue;
        };
        let intended = tag.value(file);
        if intended.is_empty() {
            continue;
        }
        let present = probe.tag(key).map(str::trim).unwrap_or("");
        let equal = if tag == MetaTag::CreationTime {
            date_part(present) == date_part(&intended)
        } else {
            present == intended
        };
        if !equal {
            debug!("Tag '{}' differs: '{}' vs '{}'", key, present, intended);
            return false;
        }
    }
    true
}

/// Decides whether ffmpeg can be skipped and records the result in
/// `meta_already_exists`. A missing probe never skips.
pub fn can_skip_ffmpeg(file: &mut FileData, probe: Option<&ProbeOutput>, config: &CoreConfig) -> bool {
    let same_container = config
        .output_ext_dotted()
        .map_or(true, |ext| ext == file.input_ext());
    let skip = same_container && probe.is_some_and(|p| metadata_matches(file, p, config));
    file.meta_already_exists = skip;
    skip
}

/// `2023-01-01T00:00:00.000000Z` -> `2023-01-01`.
fn date_part(value: &str) -> &str {
    value.split('T').next().unwrap_or(value).trim()
}
