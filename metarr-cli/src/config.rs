// ============================================================================
// metarr-cli/src/config.rs
// ============================================================================
//
// CONFIGURATION: Turn parsed flags into a metarr-core CoreConfig
//
// Every malformed flag value becomes a `CoreError::Config`, which the
// binary reports with exit code 2 before any file is touched.
//
// KEY COMPONENTS:
// - split_escaped: `:` splitting with `\:` escapes
// - build_core_config: flags -> CoreConfig (validated)

// ---- Internal crate imports ----
use crate::cli::Cli;

// ---- External crate imports ----
use metarr_core::config::{CoreConfig, CoreConfigBuilder, PurgeMode};
use metarr_core::model::{
    CopyToField, DateFormat, DateTagLocation, FilenameOps, FilenameReplace, MetaAppend,
    MetaCategory, MetaDateTag, MetaOps, MetaPrefix, MetaReplace, MetaReplacePrefix,
    MetaReplaceSuffix, MetaSet, OverrideMaps, OverrideReplace, PasteFromField,
};
use metarr_core::{CoreError, CoreResult, HwAccel};

// ---- Standard library imports ----
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Splits `input` on unescaped `:` into at most `max_parts` parts. The last
/// part keeps any remaining colons. `\:` yields a literal colon.
pub fn split_escaped(input: &str, max_parts: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&':') => {
                current.push(':');
                chars.next();
            }
            ':' if parts.len() + 1 < max_parts => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Splits into `n` parts, padding optional trailing parts (beyond `min`) with "".
fn parts(flag: &str, input: &str, min: usize, n: usize) -> CoreResult<Vec<String>> {
    let mut parts = split_escaped(input, n);
    if parts.len() < min || parts.first().map_or(true, |s| s.trim().is_empty()) {
        return Err(CoreError::Config(format!(
            "--{flag} expects {n} colon-separated parts, got '{input}'"
        )));
    }
    parts.resize(n, String::new());
    Ok(parts)
}

fn date_tag(flag: &str, location: &str, format: &str) -> CoreResult<MetaDateTag> {
    let location: DateTagLocation = location
        .parse()
        .map_err(|e| CoreError::Config(format!("--{flag}: {e}")))?;
    let format: DateFormat = format
        .parse()
        .map_err(|e| CoreError::Config(format!("--{flag}: {e}")))?;
    Ok(MetaDateTag::new(location, format))
}

fn filename_date_tag(flag: &str, value: &str) -> CoreResult<MetaDateTag> {
    let p = parts(flag, value, 2, 2)?;
    date_tag(flag, &p[0], &p[1])
}

fn filename_replacements(flag: &str, values: &[String]) -> CoreResult<Vec<FilenameReplace>> {
    values
        .iter()
        .map(|v| {
            let p = parts(flag, v, 2, 2)?;
            Ok(FilenameReplace {
                find: p[0].clone(),
                replacement: p[1].clone(),
            })
        })
        .collect()
}

fn parse_filename_ops(cli: &Cli) -> CoreResult<FilenameOps> {
    Ok(FilenameOps {
        date_tag: cli
            .filename_date_tag
            .as_deref()
            .map(|v| filename_date_tag("filename-date-tag", v))
            .transpose()?,
        delete_date_tag: cli
            .filename_delete_date_tag
            .as_deref()
            .map(|v| filename_date_tag("filename-delete-date-tag", v))
            .transpose()?,
        set: cli.filename_set.clone(),
        replace: filename_replacements("filename-replace", &cli.filename_replace)?,
        replace_prefix: filename_replacements("filename-replace-prefix", &cli.filename_replace_prefix)?,
        replace_suffix: filename_replacements("filename-replace-suffix", &cli.filename_replace_suffix)?,
        prefix: cli.filename_prefix.clone(),
        append: cli.filename_append.clone(),
    })
}

fn parse_meta_ops(cli: &Cli) -> CoreResult<MetaOps> {
    let mut ops = MetaOps::default();

    for v in &cli.meta_add_field {
        let p = parts("meta-add-field", v, 2, 2)?;
        ops.set.push(MetaSet {
            field: p[0].clone(),
            value: p[1].clone(),
        });
    }
    for v in &cli.meta_copy_to {
        let p = parts("meta-copy-to", v, 2, 2)?;
        ops.copy_to.push(CopyToField {
            field: p[0].clone(),
            dest: p[1].clone(),
        });
    }
    for v in &cli.meta_paste_from {
        let p = parts("meta-paste-from", v, 2, 2)?;
        ops.paste_from.push(PasteFromField {
            field: p[0].clone(),
            origin: p[1].clone(),
        });
    }
    for v in &cli.meta_replace {
        let p = parts("meta-replace", v, 2, 3)?;
        ops.replace.push(MetaReplace {
            field: p[0].clone(),
            find: p[1].clone(),
            replacement: p[2].clone(),
        });
    }
    for v in &cli.meta_trim_prefix {
        let p = parts("meta-trim-prefix", v, 2, 3)?;
        ops.replace_prefix.push(MetaReplacePrefix {
            field: p[0].clone(),
            prefix: p[1].clone(),
            replacement: p[2].clone(),
        });
    }
    for v in &cli.meta_trim_suffix {
        let p = parts("meta-trim-suffix", v, 2, 3)?;
        ops.replace_suffix.push(MetaReplaceSuffix {
            field: p[0].clone(),
            suffix: p[1].clone(),
            replacement: p[2].clone(),
        });
    }
    for v in &cli.meta_prefix {
        let p = parts("meta-prefix", v, 2, 2)?;
        ops.prefix.push(MetaPrefix {
            field: p[0].clone(),
            value: p[1].clone(),
        });
    }
    for v in &cli.meta_append {
        let p = parts("meta-append", v, 2, 2)?;
        ops.append.push(MetaAppend {
            field: p[0].clone(),
            value: p[1].clone(),
        });
    }
    for v in &cli.meta_date_tag {
        let p = parts("meta-date-tag", v, 3, 3)?;
        let tag = date_tag("meta-date-tag", &p[1], &p[2])?;
        ops.date_tags.insert(p[0].clone(), tag);
    }
    for v in &cli.meta_delete_date_tag {
        let p = parts("meta-delete-date-tag", v, 3, 3)?;
        let tag = date_tag("meta-delete-date-tag", &p[1], &p[2])?;
        ops.delete_date_tags.insert(p[0].clone(), tag);
    }
    Ok(ops)
}

fn category(flag: &str, value: &str) -> CoreResult<MetaCategory> {
    value
        .parse()
        .map_err(|e| CoreError::Config(format!("--{flag}: {e}")))
}

fn parse_overrides(cli: &Cli) -> CoreResult<OverrideMaps> {
    let mut maps = OverrideMaps::default();
    for v in &cli.meta_override_set {
        let p = parts("meta-override-set", v, 2, 2)?;
        maps.set.insert(category("meta-override-set", &p[0])?, p[1].clone());
    }
    for v in &cli.meta_override_replace {
        let p = parts("meta-override-replace", v, 3, 3)?;
        maps.replace.insert(
            category("meta-override-replace", &p[0])?,
            OverrideReplace {
                find: p[1].clone(),
                replacement: p[2].clone(),
            },
        );
    }
    for v in &cli.meta_override_append {
        let p = parts("meta-override-append", v, 2, 2)?;
        maps.append.insert(category("meta-override-append", &p[0])?, p[1].clone());
    }
    Ok(maps)
}

/// Builds and validates the core configuration from parsed flags.
pub fn build_core_config(cli: &Cli) -> CoreResult<CoreConfig> {
    if !cli.has_inputs() {
        return Err(CoreError::Config(
            "no input given: use --video-dir, --json-dir, --video-file or --meta-file".to_string(),
        ));
    }

    let mut builder = CoreConfigBuilder::new()
        .meta_ops(parse_meta_ops(cli)?)
        .filename_ops(parse_filename_ops(cli)?)
        .overrides(parse_overrides(cli)?)
        .meta_overwrite(cli.meta_overwrite)
        .meta_preserve(cli.meta_preserve)
        .desc_date_prefix(cli.desc_date_prefix)
        .desc_date_suffix(cli.desc_date_suffix)
        .no_file_overwrite(cli.no_file_overwrite)
        .skip_videos(cli.skip_videos)
        .strip_thumbnails(cli.strip_thumbnails)
        .force_write_thumbnails(cli.force_write_thumbnails)
        .prefixes(cli.prefixes.clone())
        .contains(cli.contains.clone())
        .omit(cli.omit.clone());

    for dir in &cli.video_dirs {
        builder = builder.video_dir(dir.clone());
    }
    for dir in &cli.json_dirs {
        builder = builder.sidecar_dir(dir.clone());
    }
    for file in &cli.video_files {
        builder = builder.video_file(file.clone());
    }
    for file in &cli.meta_files {
        builder = builder.sidecar_file(file.clone());
    }

    if !cli.input_exts.is_empty() {
        builder = builder.input_exts(cli.input_exts.iter().map(|e| e.trim().to_string()));
    }
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(cpu) = cli.max_cpu {
        if !(0.0..=100.0).contains(&cpu) {
            return Err(CoreError::Config(format!(
                "--max-cpu must be between 0 and 100, got {cpu}"
            )));
        }
        builder = builder.max_cpu(cpu);
    }
    if let Some(mb) = cli.min_mem_mb {
        builder = builder.min_free_mem(mb.saturating_mul(MIB));
    }
    if let Some(secs) = cli.ffprobe_timeout {
        builder = builder.ffprobe_timeout(Duration::from_secs(secs));
    }
    if let Some(gpu) = &cli.gpu {
        builder = builder.gpu(gpu.parse::<HwAccel>()?);
    }
    if let Some(device) = &cli.transcode_device_dir {
        builder = builder.gpu_device(device.clone());
    }
    if let Some(codec) = &cli.transcode_video_codec {
        builder = builder.video_codec(codec.as_str());
    }
    if let Some(codec) = &cli.transcode_audio_codec {
        builder = builder.audio_codec(codec.as_str());
    }
    if let Some(q) = cli.transcode_quality {
        builder = builder.quality(q);
    }
    if let Some(filter) = &cli.transcode_video_filter {
        builder = builder.video_filter(filter.as_str());
    }
    if let Some(args) = &cli.extra_ffmpeg_args {
        builder = builder.extra_ffmpeg_args(args);
    }
    if let Some(ext) = &cli.output_filetype {
        builder = builder.output_ext(ext.as_str());
    }
    if let Some(dir) = &cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(purge) = &cli.meta_purge {
        builder = builder.meta_purge(purge.parse::<PurgeMode>()?);
    }
    if let Some(path) = &cli.cookie_path {
        builder = builder.cookie_path(path.clone());
    }

    builder.build()
}
