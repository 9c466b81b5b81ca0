//! Date-tag sub-phase.
//!
//! Runs after the primary edits have been committed. The sidecar is re-read
//! under the lock the caller already holds, so the tags see the committed
//! values. Deletions run before additions, which lets a run swap one tag
//! format for another.

use log::debug;

use super::{commit, sidecar_key};
use crate::cancel::CancellationToken;
use crate::dates::{insert_date_tag, make_date_tag, remove_date_tag};
use crate::error::CoreResult;
use crate::model::{FileData, MetaOps};
use crate::sidecar::Sidecar;

/// Deletes and adds date tags, then commits. Returns whether the sidecar
/// was rewritten.
pub fn apply_date_tags(
    sidecar: &mut Sidecar,
    file: &FileData,
    ops: &MetaOps,
    cancel: &CancellationToken,
) -> CoreResult<bool> {
    if ops.date_tags_are_empty() {
        return Ok(false);
    }
    cancel.check()?;
    sidecar.refresh()?;

    for (field, tag) in &ops.delete_date_tags {
        let key = sidecar_key(sidecar, field);
        let Some(current) = sidecar.get_str(key) else {
            continue;
        };
        let stripped = remove_date_tag(&current, *tag);
        if stripped != current {
            debug!("Removed {} date tag from {}", tag.format, field);
            sidecar.set_str(key, &stripped)?;
        }
    }

    for (field, tag) in &ops.date_tags {
        let rendered = {
            let view: &Sidecar = sidecar;
            let lookup = |k: &str| {
                view.get_str(sidecar_key(view, k))
                    .filter(|v| !v.trim().is_empty())
                    .or_else(|| file.field(k).filter(|v| !v.is_empty()).map(str::to_string))
            };
            make_date_tag(lookup, tag.format)
        };
        let Some(rendered) = rendered else {
            debug!("No date available to tag {}", field);
            continue;
        };
        let key = sidecar_key(sidecar, field);
        let current = sidecar.get_str(key).unwrap_or_default();
        let tagged = insert_date_tag(&current, &rendered, tag.location);
        if tagged != current {
            sidecar.set_str(key, &tagged)?;
        }
    }

    commit(sidecar, cancel)
}
