// ============================================================================
// metarr-core/src/filename.rs
// ============================================================================
//
// FILENAME OPERATIONS: Compute renamed output paths for a FileData
//
// Operations run against the video base name (no extension) in this order:
//
//   delete-date-tag -> set -> replace -> replace-prefix -> replace-suffix
//       -> prefix -> append -> date-tag
//
// String arguments may hold `{{tag}}` templates, which resolve against the
// filled FileData. The result is sanitised so it can never escape the
// target directory.
//
// KEY COMPONENTS:
// - rename_base: applies FilenameOps to a base name
// - plan_output_paths: fills temp/final/renamed paths on a FileData
// - sidecar_suffix: the part of a sidecar name that follows the video base

// ---- Standard library imports ----
use std::path::{Path, PathBuf};

// ---- External crate imports ----
use log::{debug, warn};

// ---- Internal crate imports ----
use crate::dates::{insert_date_tag, make_date_tag, remove_date_tag};
use crate::model::{FileData, FilenameOps};
use crate::template::{expand, has_template};

/// Temp output prefix inside the video directory.
pub const TEMP_PREFIX: &str = "tmp_";

/// Applies `ops` to `base`. Falls back to the original base if the result
/// would be empty.
pub fn rename_base(base: &str, ops: &FilenameOps, file: &FileData) -> String {
    let mut name = base.to_string();

    if let Some(tag) = ops.delete_date_tag {
        name = remove_date_tag(&name, tag);
    }
    if let Some(set) = &ops.set {
        if let Some(value) = expand_for(file, set) {
            name = value;
        }
    }
    for rep in &ops.replace {
        if rep.find.is_empty() {
            continue;
        }
        if let Some(replacement) = expand_for(file, &rep.replacement) {
            name = name.replace(&rep.find, &replacement);
        }
    }
    for rep in &ops.replace_prefix {
        if rep.find.is_empty() {
            continue;
        }
        if let (Some(rest), Some(replacement)) =
            (name.strip_prefix(&rep.find), expand_for(file, &rep.replacement))
        {
            name = format!("{replacement}{rest}");
        }
    }
    for rep in &ops.replace_suffix {
        if rep.find.is_empty() {
            continue;
        }
        if let (Some(rest), Some(replacement)) =
            (name.strip_suffix(&rep.find), expand_for(file, &rep.replacement))
        {
            name = format!("{rest}{replacement}");
        }
    }
    for prefix in &ops.prefix {
        if let Some(value) = expand_for(file, prefix) {
            name = format!("{value}{name}");
        }
    }
    for append in &ops.append {
        if let Some(value) = expand_for(file, append) {
            name = format!("{name}{value}");
        }
    }
    if let Some(tag) = ops.date_tag {
        let lookup = |k: &str| {
            file.field(k)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match make_date_tag(lookup, tag.format) {
            Some(rendered) => name = insert_date_tag(&name, &rendered, tag.location),
            None => debug!("No date available for the filename date tag of {}", base),
        }
    }

    let name = sanitise(&name);
    if name.is_empty() {
        warn!("Filename operations emptied '{}', keeping the original name", base);
        return base.to_string();
    }
    name
}

fn expand_for(file: &FileData, raw: &str) -> Option<String> {
    if !has_template(raw) {
        return Some(raw.to_string());
    }
    let source = |tag: &str| {
        file.field(tag)
            .filter(|v| !v.is_empty())
            .or_else(|| file.template_tag(tag))
            .map(str::to_string)
    };
    match expand(raw, &source) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping filename operation '{}': {}", raw, e);
            None
        }
    }
}

/// Replaces path separators and characters FFmpeg mis-parses.
fn sanitise(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '-',
            c => c,
        })
        .collect();
    cleaned.trim().trim_matches('.').trim().to_string()
}

/// The part of the sidecar file name that follows the video base, e.g.
/// `.info.json` for `clip.info.json` next to `clip.mp4`.
pub fn sidecar_suffix(sidecar: &Path, video_base: &str) -> String {
    let name = sidecar
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !video_base.is_empty() {
        if let Some(rest) = name.strip_prefix(video_base) {
            if rest.starts_with('.') {
                return rest.to_string();
            }
        }
    }
    sidecar
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Computes temp, final and renamed paths. `output_ext` carries its dot and
/// is empty to keep the input extension.
pub fn plan_output_paths(file: &mut FileData, output_dir: Option<&Path>, output_ext: &str) {
    let in_ext = file.input_ext();
    let out_ext = if output_ext.is_empty() {
        in_ext.clone()
    } else {
        output_ext.to_string()
    };

    let base = if file.is_metadata_only() {
        sidecar_base(&file.paths.sidecar_path)
    } else {
        file.video_base()
    };
    let ops = file.filename_ops.clone();
    let renamed = if ops.is_empty() {
        base.clone()
    } else {
        rename_base(&base, &ops, file)
    };

    if renamed != base {
        let suffix = sidecar_suffix(&file.paths.sidecar_path, &base);
        let sidecar_dir = file
            .paths
            .sidecar_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        file.paths.renamed_sidecar = Some(sidecar_dir.join(format!("{renamed}{suffix}")));
    }

    if file.is_metadata_only() {
        return;
    }

    let video_dir = file.paths.video_dir.clone();
    file.paths.temp_output = Some(video_dir.join(format!("{TEMP_PREFIX}{base}{in_ext}{out_ext}")));

    let target_dir: PathBuf = output_dir.map(Path::to_path_buf).unwrap_or(video_dir);
    let final_output = target_dir.join(format!("{renamed}{out_ext}"));
    if renamed != base || output_dir.is_some() {
        file.paths.renamed_video = Some(final_output.clone());
    }
    file.paths.final_output = Some(final_output);
}

fn sidecar_base(sidecar: &Path) -> String {
    let name = sidecar
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find('.') {
        Some(0) | None => name,
        Some(i) => name[..i].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DateFormat, DateTagLocation, FilenameReplace, MetaDateTag, MetaOps,
    };
    use std::sync::Arc;

    fn file_with(ops: FilenameOps) -> FileData {
        FileData::new(
            1,
            Some(PathBuf::from("/v/clip.webm")),
            PathBuf::from("/j/clip.info.json"),
            Arc::new(MetaOps::default()),
            Arc::new(ops),
        )
        .unwrap()
    }

    #[test]
    fn temp_and_final_paths_follow_extensions() {
        let mut file = file_with(FilenameOps::default());
        plan_output_paths(&mut file, None, ".mp4");
        assert_eq!(
            file.paths.temp_output.as_deref(),
            Some(Path::new("/v/tmp_clip.webm.mp4"))
        );
        assert_eq!(file.paths.final_output.as_deref(), Some(Path::new("/v/clip.mp4")));
        assert!(file.paths.renamed_video.is_none());
        assert!(file.paths.renamed_sidecar.is_none());
    }

    #[test]
    fn unset_output_ext_keeps_input_ext() {
        let mut file = file_with(FilenameOps::default());
        plan_output_paths(&mut file, Some(Path::new("/out")), "");
        assert_eq!(
            file.paths.temp_output.as_deref(),
            Some(Path::new("/v/tmp_clip.webm.webm"))
        );
        assert_eq!(file.paths.final_output.as_deref(), Some(Path::new("/out/clip.webm")));
    }

    #[test]
    fn ops_run_in_order_and_rename_sidecar() {
        let ops = FilenameOps {
            replace: vec![FilenameReplace {
                find: "clip".to_string(),
                replacement: "movie".to_string(),
            }],
            prefix: vec!["{{year}} ".to_string()],
            append: vec!["_final".to_string()],
            ..FilenameOps::default()
        };
        let mut file = file_with(ops);
        file.dates.year = "2023".to_string();
        plan_output_paths(&mut file, None, ".mp4");
        assert_eq!(
            file.paths.final_output.as_deref(),
            Some(Path::new("/v/2023 movie_final.mp4"))
        );
        assert_eq!(
            file.paths.renamed_sidecar.as_deref(),
            Some(Path::new("/j/2023 movie_final.info.json"))
        );
    }

    #[test]
    fn date_tag_swaps_formats() {
        let ops = FilenameOps {
            delete_date_tag: Some(MetaDateTag::new(DateTagLocation::Prefix, DateFormat::YyMmDd)),
            date_tag: Some(MetaDateTag::new(DateTagLocation::Suffix, DateFormat::YyyyMmDd)),
            ..FilenameOps::default()
        };
        let mut file = file_with(ops.clone());
        file.dates.formatted_date = "2023-01-02".to_string();
        assert_eq!(rename_base("[23-01-02] clip", &ops, &file), "clip [2023-01-02]");
    }

    #[test]
    fn separators_are_sanitised_and_empty_results_rejected() {
        let ops = FilenameOps {
            set: Some("a/b:c".to_string()),
            ..FilenameOps::default()
        };
        let file = file_with(ops.clone());
        assert_eq!(rename_base("clip", &ops, &file), "a-b-c");

        let empty = FilenameOps {
            set: Some("  ".to_string()),
            ..FilenameOps::default()
        };
        assert_eq!(rename_base("clip", &empty, &file), "clip");
    }

    #[test]
    fn sidecar_suffix_keeps_compound_segments() {
        assert_eq!(sidecar_suffix(Path::new("/j/clip.info.json"), "clip"), ".info.json");
        assert_eq!(sidecar_suffix(Path::new("/j/other.nfo"), "clip"), ".nfo");
    }
}
