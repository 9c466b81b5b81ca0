// ============================================================================
// metarr-cli/src/cli.rs
// ============================================================================
//
// Defines the command-line argument structure using clap.
//
// Multi-part values (edit operations, date tags, overrides) use `:` as the
// separator; write `\:` for a literal colon inside a part.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Metarr: tag videos with metadata from their sidecar files",
    long_about = "Reads JSON and NFO sidecars next to downloaded videos, applies metadata and \
                  filename edits, and writes the result into the video container with ffmpeg."
)]
pub struct Cli {
    // --- Inputs ---
    /// Directory of videos (repeat to pair with --json-dir by position)
    #[arg(long = "video-dir", value_name = "DIR")]
    pub video_dirs: Vec<PathBuf>,

    /// Directory of JSON or NFO sidecars (repeatable)
    #[arg(long = "json-dir", value_name = "DIR")]
    pub json_dirs: Vec<PathBuf>,

    /// Single video file (repeatable)
    #[arg(long = "video-file", value_name = "FILE")]
    pub video_files: Vec<PathBuf>,

    /// Single sidecar file (repeatable)
    #[arg(long = "meta-file", value_name = "FILE")]
    pub meta_files: Vec<PathBuf>,

    // --- Filters ---
    /// Video extensions to pick up from directories, comma separated
    #[arg(long, value_delimiter = ',', value_name = "EXTS")]
    pub input_exts: Vec<String>,

    /// Only process files whose name starts with this prefix
    #[arg(long = "prefix", value_name = "PREFIX")]
    pub prefixes: Vec<String>,

    /// Only process files whose name contains this text
    #[arg(long, value_name = "TEXT")]
    pub contains: Vec<String>,

    /// Skip files whose name contains this text
    #[arg(long, value_name = "TEXT")]
    pub omit: Vec<String>,

    // --- Resources ---
    /// Number of files processed at once
    #[arg(long, value_name = "N", env = "METARR_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Wait while system CPU usage is above this percentage (0-100)
    #[arg(long, value_name = "PERCENT")]
    pub max_cpu: Option<f64>,

    /// Wait while less than this much memory is free
    #[arg(long, value_name = "MB")]
    pub min_mem_mb: Option<u64>,

    /// Seconds before an ffprobe call is abandoned
    #[arg(long, value_name = "SECONDS")]
    pub ffprobe_timeout: Option<u64>,

    // --- Transcoding ---
    /// Hardware acceleration: auto, nvidia, qsv, vaapi or amf
    #[arg(long, value_name = "ACCEL")]
    pub gpu: Option<String>,

    /// Target video codec (e.g. h264, hevc, av1, copy)
    #[arg(long, value_name = "CODEC")]
    pub transcode_video_codec: Option<String>,

    /// Target audio codec (e.g. aac, opus, copy)
    #[arg(long, value_name = "CODEC")]
    pub transcode_audio_codec: Option<String>,

    /// Encoder quality (CRF style, 0-63)
    #[arg(long, value_name = "Q")]
    pub transcode_quality: Option<u8>,

    /// Hardware device path (e.g. /dev/dri/renderD128)
    #[arg(long, value_name = "PATH")]
    pub transcode_device_dir: Option<PathBuf>,

    /// Extra ffmpeg video filter, placed before any hardware filter
    #[arg(long, value_name = "FILTER")]
    pub transcode_video_filter: Option<String>,

    /// Extra ffmpeg arguments, whitespace separated
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub extra_ffmpeg_args: Option<String>,

    /// Output container extension (e.g. mp4, mkv)
    #[arg(long = "output-filetype", value_name = "EXT")]
    pub output_filetype: Option<String>,

    /// Directory for finished videos (defaults to next to the input)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    // --- Filename operations ---
    /// Prefix added to output file names (repeatable)
    #[arg(long = "metadata-filename-prefix", value_name = "TEXT")]
    pub filename_prefix: Vec<String>,

    /// Text appended to output file names (repeatable)
    #[arg(long, value_name = "TEXT")]
    pub filename_append: Vec<String>,

    /// Replace the whole file name (templates allowed)
    #[arg(long, value_name = "NAME")]
    pub filename_set: Option<String>,

    /// find:replacement on file names (repeatable)
    #[arg(long, value_name = "FIND:REPL")]
    pub filename_replace: Vec<String>,

    /// prefix:replacement on file names (repeatable)
    #[arg(long, value_name = "PREFIX:REPL")]
    pub filename_replace_prefix: Vec<String>,

    /// suffix:replacement on file names (repeatable)
    #[arg(long, value_name = "SUFFIX:REPL")]
    pub filename_replace_suffix: Vec<String>,

    /// location:format date tag added to file names (e.g. prefix:ymd)
    #[arg(long, value_name = "LOC:FORMAT")]
    pub filename_date_tag: Option<String>,

    /// location:format date tag removed from file names
    #[arg(long, value_name = "LOC:FORMAT")]
    pub filename_delete_date_tag: Option<String>,

    // --- Metadata operations ---
    /// field:value, sets a sidecar field (repeatable, templates allowed)
    #[arg(long, value_name = "FIELD:VALUE")]
    pub meta_add_field: Vec<String>,

    /// field:prefix[:replacement], replaces a leading prefix (repeatable)
    #[arg(long, value_name = "FIELD:PREFIX[:REPL]")]
    pub meta_trim_prefix: Vec<String>,

    /// field:suffix[:replacement], replaces a trailing suffix (repeatable)
    #[arg(long, value_name = "FIELD:SUFFIX[:REPL]")]
    pub meta_trim_suffix: Vec<String>,

    /// field:value, appended to a field (repeatable)
    #[arg(long, value_name = "FIELD:VALUE")]
    pub meta_append: Vec<String>,

    /// field:value, prepended to a field (repeatable)
    #[arg(long, value_name = "FIELD:VALUE")]
    pub meta_prefix: Vec<String>,

    /// field:find:replacement (repeatable)
    #[arg(long, value_name = "FIELD:FIND:REPL")]
    pub meta_replace: Vec<String>,

    /// field:destination, copies a field into another (repeatable)
    #[arg(long, value_name = "FIELD:DEST")]
    pub meta_copy_to: Vec<String>,

    /// field:origin, pastes another field into this one (repeatable)
    #[arg(long, value_name = "FIELD:ORIGIN")]
    pub meta_paste_from: Vec<String>,

    /// field:location:format date tag added to a field (repeatable)
    #[arg(long, value_name = "FIELD:LOC:FORMAT")]
    pub meta_date_tag: Vec<String>,

    /// field:location:format date tag removed from a field (repeatable)
    #[arg(long, value_name = "FIELD:LOC:FORMAT")]
    pub meta_delete_date_tag: Vec<String>,

    /// category:value, unconditionally sets a metadata category
    #[arg(long, value_name = "CATEGORY:VALUE")]
    pub meta_override_set: Vec<String>,

    /// category:find:replacement applied to a metadata category
    #[arg(long, value_name = "CATEGORY:FIND:REPL")]
    pub meta_override_replace: Vec<String>,

    /// category:value appended to a metadata category
    #[arg(long, value_name = "CATEGORY:VALUE")]
    pub meta_override_append: Vec<String>,

    /// Overwrite existing values without asking
    #[arg(long)]
    pub meta_overwrite: bool,

    /// Never overwrite existing values
    #[arg(long)]
    pub meta_preserve: bool,

    /// Prefix description fields with the upload date
    #[arg(long)]
    pub desc_date_prefix: bool,

    /// Suffix description fields with the upload date
    #[arg(long)]
    pub desc_date_suffix: bool,

    /// Delete processed sidecars: all, json, nfo or none
    #[arg(long, value_name = "KIND")]
    pub meta_purge: Option<String>,

    // --- Behaviour ---
    /// Keep existing files by renaming them to backups
    #[arg(long)]
    pub no_file_overwrite: bool,

    /// Only edit sidecars, never touch videos
    #[arg(long)]
    pub skip_videos: bool,

    /// Drop embedded thumbnails / attached pictures
    #[arg(long)]
    pub strip_thumbnails: bool,

    /// Always run ffmpeg even when tags already match
    #[arg(long)]
    pub force_write_thumbnails: bool,

    /// Netscape cookie file used for scraping
    #[arg(long, value_name = "FILE")]
    pub cookie_path: Option<PathBuf>,

    /// Log verbosity, 0 (errors) to 5 (trace)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub debug_level: u8,
}

impl Cli {
    /// True when at least one input path was given.
    pub fn has_inputs(&self) -> bool {
        !(self.video_dirs.is_empty()
            && self.json_dirs.is_empty()
            && self.video_files.is_empty()
            && self.meta_files.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inputs_and_repeated_ops() {
        let cli = Cli::parse_from([
            "metarr",
            "--video-dir",
            "/v1",
            "--video-dir",
            "/v2",
            "--json-dir",
            "/j1",
            "--meta-add-field",
            "title:Hello",
            "--meta-add-field",
            "genre:Docs",
            "--input-exts",
            "mp4,mkv",
        ]);
        assert_eq!(cli.video_dirs, vec![PathBuf::from("/v1"), PathBuf::from("/v2")]);
        assert_eq!(cli.json_dirs, vec![PathBuf::from("/j1")]);
        assert_eq!(cli.meta_add_field.len(), 2);
        assert_eq!(cli.input_exts, vec!["mp4", "mkv"]);
        assert_eq!(cli.debug_level, 2);
        assert!(cli.has_inputs());
    }

    #[test]
    fn rejects_out_of_range_debug_level() {
        assert!(Cli::try_parse_from(["metarr", "--debug-level", "9"]).is_err());
    }

    #[test]
    fn extra_ffmpeg_args_may_start_with_a_dash() {
        let cli = Cli::parse_from(["metarr", "--extra-ffmpeg-args", "-movflags +faststart"]);
        assert_eq!(cli.extra_ffmpeg_args.as_deref(), Some("-movflags +faststart"));
        assert!(!cli.has_inputs());
    }
}
