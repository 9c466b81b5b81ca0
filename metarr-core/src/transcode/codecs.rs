//! Codec name normalisation, encoder mapping and container compatibility.

use crate::external::EncoderCatalog;

/// Lowercases and strips spaces, dots, dashes and underscores, so `H.264`,
/// `h 264` and `H-264` all become `h264`.
pub fn normalise_codec(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical family for a normalised codec name, matching ffprobe's
/// `codec_name` where one exists.
pub fn video_family(normalised: &str) -> &str {
    match normalised {
        "h264" | "avc" | "x264" | "libx264" => "h264",
        "hevc" | "h265" | "x265" | "libx265" => "hevc",
        "av1" | "libsvtav1" | "svtav1" | "libaom" | "libaomav1" | "aomav1" => "av1",
        "vp9" | "libvpxvp9" => "vp9",
        "vp8" | "libvpx" => "vp8",
        "mpeg2" | "mpeg2video" => "mpeg2video",
        "mpeg4" | "xvid" => "mpeg4",
        other => other,
    }
}

pub fn audio_family(normalised: &str) -> &str {
    match normalised {
        "aac" | "libfdkaac" => "aac",
        "mp3" | "libmp3lame" | "lame" => "mp3",
        "opus" | "libopus" => "opus",
        "vorbis" | "libvorbis" | "ogg" => "vorbis",
        "ac3" | "dolby" => "ac3",
        "eac3" | "ddp" => "eac3",
        "pcm" | "wav" | "pcms16le" => "pcm_s16le",
        other => other,
    }
}

/// Software encoder for a video family.
pub fn video_encoder(family: &str) -> String {
    match family {
        "h264" => "libx264",
        "hevc" => "libx265",
        "av1" => "libsvtav1",
        "vp9" => "libvpx-vp9",
        "vp8" => "libvpx",
        "mpeg2video" => "mpeg2video",
        "mpeg4" => "mpeg4",
        other => other,
    }
    .to_string()
}

pub fn audio_encoder(family: &str) -> String {
    match family {
        "mp3" => "libmp3lame",
        "opus" => "libopus",
        "vorbis" => "libvorbis",
        other => other,
    }
    .to_string()
}

/// Outcome of codec negotiation for one stream type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecChoice {
    /// No codec requested, the preset decides
    Preset,
    Copy,
    Encode { family: String, encoder: String },
}

/// Negotiates the video codec. `current` is the input's codec from ffprobe.
pub fn negotiate_video(
    requested: &str,
    current: Option<&str>,
    catalog: &dyn EncoderCatalog,
) -> CodecChoice {
    negotiate(requested, current, catalog, video_family, video_encoder, "video")
}

pub fn negotiate_audio(
    requested: &str,
    current: Option<&str>,
    catalog: &dyn EncoderCatalog,
) -> CodecChoice {
    negotiate(requested, current, catalog, audio_family, audio_encoder, "audio")
}

fn negotiate(
    requested: &str,
    current: Option<&str>,
    catalog: &dyn EncoderCatalog,
    family_of: fn(&str) -> &str,
    encoder_of: fn(&str) -> String,
    kind: &str,
) -> CodecChoice {
    let normalised = normalise_codec(requested);
    if normalised.is_empty() {
        return CodecChoice::Preset;
    }
    if normalised == "copy" {
        return CodecChoice::Copy;
    }
    let family = family_of(&normalised).to_string();
    if let Some(current) = current {
        if family_of(&normalise_codec(current)) == family {
            log::debug!("Input {} codec is already {}, copying", kind, family);
            return CodecChoice::Copy;
        }
    }
    let encoder = encoder_of(&family);
    if !catalog.has_encoder(&encoder) {
        log::warn!(
            "Encoder '{}' is not available in this ffmpeg build, copying the {} stream",
            encoder,
            kind
        );
        return CodecChoice::Copy;
    }
    CodecChoice::Encode { family, encoder }
}

/// Whether a container (dotted, lowercase extension) can hold a video family.
pub fn container_accepts(ext: &str, family: &str) -> bool {
    match ext {
        ".webm" => !matches!(family, "h264" | "hevc" | "mpeg2video"),
        ".mp4" | ".m4v" => !matches!(family, "vp8" | "vp9" | "mpeg2video"),
        ".avi" => !matches!(family, "hevc" | "av1" | "vp9" | "vp8"),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::StaticEncoderCatalog;

    #[test]
    fn normalisation_strips_punctuation() {
        assert_eq!(normalise_codec(" H.264 "), "h264");
        assert_eq!(normalise_codec("HEVC"), "hevc");
        assert_eq!(video_family(&normalise_codec("x-265")), "hevc");
        assert_eq!(video_encoder("av1"), "libsvtav1");
        assert_eq!(audio_encoder(audio_family("mp3")), "libmp3lame");
    }

    #[test]
    fn negotiation_copies_matching_or_unavailable_codecs() {
        let catalog = StaticEncoderCatalog::new(["libx264", "aac"]);
        assert_eq!(negotiate_video("", Some("h264"), &catalog), CodecChoice::Preset);
        assert_eq!(negotiate_video("h264", Some("h264"), &catalog), CodecChoice::Copy);
        assert_eq!(negotiate_video("hevc", Some("h264"), &catalog), CodecChoice::Copy);
        assert_eq!(
            negotiate_video("AVC", Some("vp9"), &catalog),
            CodecChoice::Encode {
                family: "h264".to_string(),
                encoder: "libx264".to_string()
            }
        );
        assert_eq!(negotiate_audio("copy", None, &catalog), CodecChoice::Copy);
    }

    #[test]
    fn container_table() {
        assert!(!container_accepts(".webm", "h264"));
        assert!(!container_accepts(".mp4", "vp9"));
        assert!(!container_accepts(".avi", "hevc"));
        assert!(container_accepts(".mkv", "vp9"));
        assert!(container_accepts(".mp4", "av1"));
    }
}
