// ============================================================================
// metarr-core/src/edit/mod.rs
// ============================================================================
//
// EDIT PIPELINE: Apply user-requested metadata edits to an open sidecar
//
// Primary edits run in a fixed order for both JSON and NFO sidecars:
//
//   set -> copy-to -> paste-from -> replace -> replace-prefix
//       -> replace-suffix -> prefix -> append
//
// String arguments are expanded with the template engine first; an edit
// whose template cannot be resolved is skipped with a warning and the rest
// of the run continues. Edits only touch the in-memory sidecar; `commit`
// writes it back while the sidecar's path lock is still held.
//
// Date tags are a separate entry point (see `date_tags`) that runs after the
// primary edits have been committed.
//
// KEY COMPONENTS:
// - EditContext: overwrite policy, prompter and cancellation token
// - apply_meta_edits: the ordered primary edit phase
// - commit: cancellation-aware write of a dirty sidecar

mod date_tags;
pub mod prompt;

pub use date_tags::apply_date_tags;
pub use prompt::{
    ConsolePrompter, OverwritePolicy, OverwritePrompter, PromptAnswer, ScriptedPrompter,
};

// ---- External crate imports ----
use log::{debug, warn};

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::error::CoreResult;
use crate::model::{FileData, MetaOps};
use crate::sidecar::{Sidecar, nfo};
use crate::template::{SidecarTemplateSource, expand, has_template};

/// Collaborators for the edit phase.
#[derive(Clone, Copy)]
pub struct EditContext<'a> {
    pub policy: &'a OverwritePolicy,
    pub prompter: &'a dyn OverwritePrompter,
    pub cancel: &'a CancellationToken,
}

/// Applies the primary edits in order. Returns whether the sidecar changed.
pub fn apply_meta_edits(
    sidecar: &mut Sidecar,
    file: &FileData,
    ops: &MetaOps,
    ctx: &EditContext<'_>,
) -> CoreResult<bool> {
    ctx.cancel.check()?;
    let mut changed = false;

    for op in &ops.set {
        let Some(value) = expand_arg(sidecar, file, &op.value, "set", &op.field) else {
            continue;
        };
        let key = sidecar_key(sidecar, &op.field);
        let current = sidecar
            .get_str(key)
            .or_else(|| sidecar.non_string_value(key));
        if let Some(current) = current {
            if current == value {
                continue;
            }
            if !current.trim().is_empty() {
                let question = format!(
                    "{}: overwrite {} '{}' with '{}'?",
                    file_label(sidecar),
                    op.field,
                    current,
                    value
                );
                if !ctx.policy.should_overwrite(ctx.prompter, &question, ctx.cancel)? {
                    debug!("Keeping existing {} in {}", op.field, file_label(sidecar));
                    continue;
                }
            }
        }
        changed |= sidecar.set_str(key, &value)?;
    }

    for op in &ops.copy_to {
        let (from, to) = (sidecar_key(sidecar, &op.field), sidecar_key(sidecar, &op.dest));
        match sidecar.get_str(from) {
            Some(value) => changed |= sidecar.set_str(to, &value)?,
            None => debug!("Copy skipped, {} has no string value", op.field),
        }
    }

    for op in &ops.paste_from {
        let (from, to) = (sidecar_key(sidecar, &op.origin), sidecar_key(sidecar, &op.field));
        match sidecar.get_str(from) {
            Some(value) => changed |= sidecar.set_str(to, &value)?,
            None => debug!("Paste skipped, {} has no string value", op.origin),
        }
    }

    for op in &ops.replace {
        if op.find.is_empty() {
            continue;
        }
        let Some(replacement) =
            expand_arg(sidecar, file, &op.replacement, "replace", &op.field)
        else {
            continue;
        };
        let key = sidecar_key(sidecar, &op.field);
        if let Some(current) = sidecar.get_str(key) {
            if current.contains(&op.find) {
                changed |= sidecar.set_str(key, &current.replace(&op.find, &replacement))?;
            }
        }
    }

    for op in &ops.replace_prefix {
        let Some(prefix) = expand_arg(sidecar, file, &op.prefix, "replace-prefix", &op.field)
        else {
            continue;
        };
        let Some(replacement) =
            expand_arg(sidecar, file, &op.replacement, "replace-prefix", &op.field)
        else {
            continue;
        };
        if prefix.is_empty() {
            continue;
        }
        let key = sidecar_key(sidecar, &op.field);
        if let Some(current) = sidecar.get_str(key) {
            if let Some(rest) = current.strip_prefix(&prefix) {
                changed |= sidecar.set_str(key, &format!("{replacement}{rest}"))?;
            }
        }
    }

    for op in &ops.replace_suffix {
        let Some(suffix) = expand_arg(sidecar, file, &op.suffix, "replace-suffix", &op.field)
        else {
            continue;
        };
        let Some(replacement) =
            expand_arg(sidecar, file, &op.replacement, "replace-suffix", &op.field)
        else {
            continue;
        };
        if suffix.is_empty() {
            continue;
        }
        let key = sidecar_key(sidecar, &op.field);
        if let Some(current) = sidecar.get_str(key) {
            if let Some(rest) = current.strip_suffix(&suffix) {
                changed |= sidecar.set_str(key, &format!("{rest}{replacement}"))?;
            }
        }
    }

    for op in &ops.prefix {
        let Some(value) = expand_arg(sidecar, file, &op.value, "prefix", &op.field) else {
            continue;
        };
        let key = sidecar_key(sidecar, &op.field);
        if sidecar.non_string_value(key).is_some() {
            warn!("Skipping prefix on non-string '{}' in {}", op.field, file_label(sidecar));
            continue;
        }
        let current = sidecar.get_str(key).unwrap_or_default();
        changed |= sidecar.set_str(key, &format!("{value}{current}"))?;
    }

    for op in &ops.append {
        let Some(value) = expand_arg(sidecar, file, &op.value, "append", &op.field) else {
            continue;
        };
        let key = sidecar_key(sidecar, &op.field);
        if sidecar.non_string_value(key).is_some() {
            warn!("Skipping append on non-string '{}' in {}", op.field, file_label(sidecar));
            continue;
        }
        let current = sidecar.get_str(key).unwrap_or_default();
        changed |= sidecar.set_str(key, &format!("{current}{value}"))?;
    }

    Ok(changed)
}

/// Writes the sidecar if it has unsaved changes. Nothing is written once
/// cancellation has been requested.
pub fn commit(sidecar: &mut Sidecar, cancel: &CancellationToken) -> CoreResult<bool> {
    if !sidecar.is_dirty() {
        return Ok(false);
    }
    cancel.check()?;
    sidecar.write_to_file()?;
    Ok(true)
}

/// NFO sidecars store some fields under a different element name.
pub(crate) fn sidecar_key<'k>(sidecar: &Sidecar, field: &'k str) -> &'k str {
    match sidecar {
        Sidecar::Json(_) => field,
        Sidecar::Nfo(_) => nfo::tag_for_field(field).unwrap_or(field),
    }
}

fn file_label(sidecar: &Sidecar) -> String {
    sidecar
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn expand_arg(
    sidecar: &Sidecar,
    file: &FileData,
    raw: &str,
    op: &str,
    field: &str,
) -> Option<String> {
    if !has_template(raw) && !raw.contains("}}") {
        return Some(raw.to_string());
    }
    let source = SidecarTemplateSource { sidecar, file };
    match expand(raw, &source) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping {} on '{}' in {}: {}", op, field, file_label(sidecar), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::fill::tests::file_for;
    use crate::model::{
        CopyToField, MetaAppend, MetaPrefix, MetaReplace, MetaReplacePrefix, MetaReplaceSuffix,
        MetaSet, PasteFromField, SidecarKind,
    };
    use std::path::{Path, PathBuf};

    fn sidecar_with(dir: &Path, body: &str) -> (PathBuf, Sidecar) {
        let path = dir.join("clip.info.json");
        std::fs::write(&path, body).unwrap();
        let sidecar = Sidecar::open(&path, SidecarKind::Json, false).unwrap();
        (path, sidecar)
    }

    fn set(field: &str, value: &str) -> MetaSet {
        MetaSet {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    fn run(
        sidecar: &mut Sidecar,
        ops: &MetaOps,
        policy: &OverwritePolicy,
        prompter: &dyn OverwritePrompter,
    ) -> CoreResult<bool> {
        let cancel = CancellationToken::new();
        let file = file_for(sidecar.path());
        let ctx = EditContext {
            policy,
            prompter,
            cancel: &cancel,
        };
        apply_meta_edits(sidecar, &file, ops, &ctx)
    }

    #[test]
    fn set_assigns_missing_fields_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"title":"T"}"#);
        let ops = MetaOps {
            set: vec![set("genre", "Doc"), set("title", "T")],
            ..MetaOps::default()
        };
        let prompter = ScriptedPrompter::new([]);
        let changed = run(&mut sidecar, &ops, &OverwritePolicy::default(), &prompter).unwrap();
        assert!(changed);
        assert_eq!(sidecar.get_str("genre").as_deref(), Some("Doc"));
        assert!(prompter.questions().is_empty());
    }

    #[test]
    fn no_to_all_keeps_value_and_preserves_for_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"title":"Old"}"#);
        let ops = MetaOps {
            set: vec![set("title", "New")],
            ..MetaOps::default()
        };
        let policy = OverwritePolicy::new(false, false);
        let prompter = ScriptedPrompter::new([PromptAnswer::NoToAll]);
        let changed = run(&mut sidecar, &ops, &policy, &prompter).unwrap();
        assert!(!changed);
        assert_eq!(sidecar.get_str("title").as_deref(), Some("Old"));
        assert!(policy.preserve());
        assert_eq!(prompter.questions().len(), 1);
    }

    #[test]
    fn overwrite_policy_replaces_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"title":"Old"}"#);
        let ops = MetaOps {
            set: vec![set("title", "New")],
            ..MetaOps::default()
        };
        let prompter = ScriptedPrompter::new([]);
        run(&mut sidecar, &ops, &OverwritePolicy::new(true, false), &prompter).unwrap();
        assert_eq!(sidecar.get_str("title").as_deref(), Some("New"));
        assert!(prompter.questions().is_empty());
    }

    #[test]
    fn set_over_a_number_goes_through_the_overwrite_policy() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"view_count":42}"#);
        let ops = MetaOps {
            set: vec![set("view_count", "x")],
            ..MetaOps::default()
        };
        let prompter = ScriptedPrompter::new([PromptAnswer::No]);
        let changed =
            run(&mut sidecar, &ops, &OverwritePolicy::new(false, false), &prompter).unwrap();
        assert!(!changed);
        assert_eq!(prompter.questions().len(), 1);
        assert!(prompter.questions()[0].contains("'42'"));
        assert_eq!(sidecar.non_string_value("view_count").as_deref(), Some("42"));

        let prompter = ScriptedPrompter::new([]);
        run(&mut sidecar, &ops, &OverwritePolicy::new(false, true), &prompter).unwrap();
        assert_eq!(sidecar.non_string_value("view_count").as_deref(), Some("42"));
        assert!(prompter.questions().is_empty());
    }

    #[test]
    fn prefix_and_append_leave_non_string_values_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"rating":4.5,"tags":["a"]}"#);
        let ops = MetaOps {
            prefix: vec![MetaPrefix {
                field: "rating".to_string(),
                value: "r".to_string(),
            }],
            append: vec![MetaAppend {
                field: "tags".to_string(),
                value: "b".to_string(),
            }],
            ..MetaOps::default()
        };
        let changed = run(
            &mut sidecar,
            &ops,
            &OverwritePolicy::default(),
            &ScriptedPrompter::new([]),
        )
        .unwrap();
        assert!(!changed);
        assert_eq!(sidecar.non_string_value("rating").as_deref(), Some("4.5"));
        assert_eq!(sidecar.non_string_value("tags").as_deref(), Some(r#"["a"]"#));
    }

    #[test]
    fn copy_and_paste_move_string_values() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(
            dir.path(),
            r#"{"title":"T","uploader":"U","view_count":5,"comment":"c"}"#,
        );
        let ops = MetaOps {
            copy_to: vec![
                CopyToField {
                    field: "title".to_string(),
                    dest: "comment".to_string(),
                },
                CopyToField {
                    field: "view_count".to_string(),
                    dest: "summary".to_string(),
                },
            ],
            paste_from: vec![PasteFromField {
                field: "artist".to_string(),
                origin: "uploader".to_string(),
            }],
            ..MetaOps::default()
        };
        run(&mut sidecar, &ops, &OverwritePolicy::default(), &ScriptedPrompter::new([])).unwrap();
        assert_eq!(sidecar.get_str("comment").as_deref(), Some("T"));
        assert_eq!(sidecar.get_str("artist").as_deref(), Some("U"));
        assert!(sidecar.get_str("summary").is_none());
    }

    #[test]
    fn replace_expands_templates_and_skips_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(
            dir.path(),
            r#"{"title":"Episode by X","description":"by X","uploader":"Jane"}"#,
        );
        let ops = MetaOps {
            replace: vec![
                MetaReplace {
                    field: "title".to_string(),
                    find: "X".to_string(),
                    replacement: "{{uploader}}".to_string(),
                },
                MetaReplace {
                    field: "description".to_string(),
                    find: "X".to_string(),
                    replacement: "{{missing_tag}}".to_string(),
                },
            ],
            ..MetaOps::default()
        };
        run(&mut sidecar, &ops, &OverwritePolicy::default(), &ScriptedPrompter::new([])).unwrap();
        assert_eq!(sidecar.get_str("title").as_deref(), Some("Episode by Jane"));
        assert_eq!(sidecar.get_str("description").as_deref(), Some("by X"));
    }

    #[test]
    fn prefix_and_suffix_replacement_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) =
            sidecar_with(dir.path(), r#"{"title":"[HD] Clip - Official","comment":"Clip"}"#);
        let ops = MetaOps {
            replace_prefix: vec![
                MetaReplacePrefix {
                    field: "title".to_string(),
                    prefix: "[HD] ".to_string(),
                    replacement: String::new(),
                },
                MetaReplacePrefix {
                    field: "comment".to_string(),
                    prefix: "[HD] ".to_string(),
                    replacement: "x".to_string(),
                },
            ],
            replace_suffix: vec![MetaReplaceSuffix {
                field: "title".to_string(),
                suffix: " - Official".to_string(),
                replacement: "!".to_string(),
            }],
            ..MetaOps::default()
        };
        run(&mut sidecar, &ops, &OverwritePolicy::default(), &ScriptedPrompter::new([])).unwrap();
        assert_eq!(sidecar.get_str("title").as_deref(), Some("Clip!"));
        assert_eq!(sidecar.get_str("comment").as_deref(), Some("Clip"));
    }

    #[test]
    fn prefix_and_append_are_not_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"title":"Clip"}"#);
        let ops = MetaOps {
            prefix: vec![MetaPrefix {
                field: "title".to_string(),
                value: "A ".to_string(),
            }],
            append: vec![MetaAppend {
                field: "title".to_string(),
                value: " Z".to_string(),
            }],
            ..MetaOps::default()
        };
        let policy = OverwritePolicy::default();
        let prompter = ScriptedPrompter::new([]);
        run(&mut sidecar, &ops, &policy, &prompter).unwrap();
        assert_eq!(sidecar.get_str("title").as_deref(), Some("A Clip Z"));
        run(&mut sidecar, &ops, &policy, &prompter).unwrap();
        assert_eq!(sidecar.get_str("title").as_deref(), Some("A A Clip Z Z"));
    }

    #[test]
    fn set_and_replace_twice_match_running_once() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut sidecar) =
            sidecar_with(dir.path(), r#"{"title":"Clip (old cut)","rating":4.5}"#);
        let ops = MetaOps {
            set: vec![set("genre", "Doc")],
            replace: vec![MetaReplace {
                field: "title".to_string(),
                find: "old".to_string(),
                replacement: "new".to_string(),
            }],
            ..MetaOps::default()
        };
        let policy = OverwritePolicy::default();
        let prompter = ScriptedPrompter::new([]);
        let cancel = CancellationToken::new();

        assert!(run(&mut sidecar, &ops, &policy, &prompter).unwrap());
        commit(&mut sidecar, &cancel).unwrap();
        let once = std::fs::read_to_string(&path).unwrap();

        assert!(!run(&mut sidecar, &ops, &policy, &prompter).unwrap());
        assert!(!commit(&mut sidecar, &cancel).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), once);
        assert!(prompter.questions().is_empty());
    }

    #[test]
    fn cancellation_before_commit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"title":"Clip"}"#;
        let (path, mut sidecar) = sidecar_with(dir.path(), body);
        let ops = MetaOps {
            set: vec![set("genre", "Doc")],
            ..MetaOps::default()
        };
        assert!(
            run(&mut sidecar, &ops, &OverwritePolicy::default(), &ScriptedPrompter::new([]))
                .unwrap()
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(commit(&mut sidecar, &cancel), Err(CoreError::Cancelled)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
    }

    #[test]
    fn prompt_cancellation_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut sidecar) = sidecar_with(dir.path(), r#"{"title":"Old"}"#);
        let ops = MetaOps {
            set: vec![set("title", "New")],
            ..MetaOps::default()
        };
        let prompter = ScriptedPrompter::cancelling();
        let result = run(&mut sidecar, &ops, &OverwritePolicy::default(), &prompter);
        assert!(matches!(result, Err(CoreError::Cancelled)));
        assert_eq!(sidecar.get_str("title").as_deref(), Some("Old"));
    }

    #[test]
    fn nfo_edits_use_element_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.nfo");
        std::fs::write(&path, "<movie><title>T</title><plot>P</plot><custom>k</custom></movie>")
            .unwrap();
        let mut sidecar = Sidecar::open(&path, SidecarKind::Nfo, false).unwrap();
        let ops = MetaOps {
            append: vec![MetaAppend {
                field: "synopsis".to_string(),
                value: " & more".to_string(),
            }],
            ..MetaOps::default()
        };
        run(&mut sidecar, &ops, &OverwritePolicy::default(), &ScriptedPrompter::new([])).unwrap();
        commit(&mut sidecar, &CancellationToken::new()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<plot>P &amp; more</plot>"));
        assert!(text.contains("<custom>k</custom>"));
    }
}
