//! Named codec bundles, selected by output then input extension.

/// An immutable named set of video and audio arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub video: &'static [&'static str],
    pub audio: &'static [&'static str],
}

const VIDEO_COPY: &[&str] = &["-c:v", "copy"];
const AUDIO_COPY: &[&str] = &["-c:a", "copy"];
const AUDIO_AAC: &[&str] = &["-c:a", "aac", "-b:a", "256k"];
const VIDEO_H264: &[&str] = &["-c:v", "libx264", "-crf", "23", "-profile:v", "main"];

pub const COPY: Preset = Preset {
    name: "copy",
    video: VIDEO_COPY,
    audio: AUDIO_COPY,
};

pub const H264: Preset = Preset {
    name: "h264",
    video: VIDEO_H264,
    audio: AUDIO_AAC,
};

/// H.264 with a tighter keyframe interval, used when leaving WebM.
pub const WEBM: Preset = Preset {
    name: "webm",
    video: &[
        "-c:v", "libx264", "-crf", "23", "-profile:v", "main", "-g", "50", "-keyint_min", "30",
    ],
    audio: AUDIO_AAC,
};

pub const VIDEO_COPY_AAC: Preset = Preset {
    name: "video_copy_aac",
    video: VIDEO_COPY,
    audio: AUDIO_AAC,
};

pub const TO_WEBM: Preset = Preset {
    name: "to_webm",
    video: &["-c:v", "libvpx-vp9", "-crf", "31", "-b:v", "0"],
    audio: &["-c:a", "libopus", "-b:a", "128k"],
};

/// Wildcard key in the preset table.
const ANY: &str = "*";

/// Output extension -> (input extension -> preset). Extensions are dotted.
const TABLE: &[(&str, &[(&str, Preset)])] = &[
    (
        ".mp4",
        &[(".webm", WEBM), (".mkv", VIDEO_COPY_AAC), (".mov", VIDEO_COPY_AAC), (ANY, H264)],
    ),
    (
        ".m4v",
        &[(".webm", WEBM), (".mp4", COPY), (".mkv", VIDEO_COPY_AAC), (ANY, H264)],
    ),
    (
        ".mov",
        &[(".webm", WEBM), (".mp4", COPY), (".mkv", VIDEO_COPY_AAC), (ANY, H264)],
    ),
    (".mkv", &[(ANY, COPY)]),
    (".webm", &[(".mkv", COPY), (ANY, TO_WEBM)]),
    (ANY, &[(".webm", WEBM), (ANY, H264)]),
];

/// Picks the preset for converting `in_ext` to `out_ext`. Identical
/// extensions, or no output extension, always copy.
pub fn select(out_ext: &str, in_ext: &str) -> Preset {
    if out_ext.is_empty() || out_ext == in_ext {
        return COPY;
    }
    let by_input = TABLE
        .iter()
        .find(|(out, _)| *out == out_ext)
        .or_else(|| TABLE.iter().find(|(out, _)| *out == ANY))
        .map(|(_, by_input)| *by_input)
        .unwrap_or(&[]);
    by_input
        .iter()
        .find(|(input, _)| *input == in_ext)
        .or_else(|| by_input.iter().find(|(input, _)| *input == ANY))
        .map(|(_, preset)| *preset)
        .unwrap_or(COPY)
}

pub fn is_copy_args(args: &[&str]) -> bool {
    args.len() == 2 && args[1] == "copy"
}
