//! FFmpeg argument assembly.
//!
//! The builder resolves each section independently (hardware, filters,
//! codecs, quality, metadata) and concatenates them in ffmpeg's expected
//! order:
//!
//! `[hwaccel device] -y -i IN [maps] [-vf] [video] [audio] [subs] [quality]
//! [-metadata K=V]... [extra] OUT`

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{EncoderCatalog, ProbeOutput};
use crate::model::FileData;

use super::codecs::{self, CodecChoice};
use super::hwaccel::HwAccel;
use super::metadata::{Container, metadata_pairs};
use super::presets::{self, Preset};

/// Builder for constructing video filter chains
#[derive(Debug, Default)]
pub struct VideoFilterChain {
    filters: Vec<String>,
}

impl VideoFilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter to the chain; empty strings are ignored
    #[must_use]
    pub fn add_filter(mut self, filter: &str) -> Self {
        let filter = filter.trim();
        if !filter.is_empty() {
            self.filters.push(filter.to_string());
        }
        self
    }

    /// Builds the filter chain into a single filter string
    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(","))
        }
    }
}

/// Resolved video section.
#[derive(Debug, Default)]
struct VideoPlan {
    hwaccel: Vec<String>,
    device: Vec<String>,
    codec: Vec<String>,
    /// Accelerator whose encoder is in use, for the quality dialect
    encoder_accel: HwAccel,
    hw_filter: Option<&'static str>,
    encodes: bool,
}

/// Assembles the ffmpeg argv for one file.
pub struct CommandBuilder<'a> {
    config: &'a CoreConfig,
    catalog: &'a dyn EncoderCatalog,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(config: &'a CoreConfig, catalog: &'a dyn EncoderCatalog) -> Self {
        Self { config, catalog }
    }

    /// Builds the argument vector (without the `ffmpeg` program name).
    /// `probe` supplies the current codecs; without it negotiation assumes
    /// they are unknown.
    pub fn build(&self, file: &FileData, probe: Option<&ProbeOutput>) -> CoreResult<Vec<String>> {
        let input = file.paths.original_video.as_deref().ok_or_else(|| {
            CoreError::Path(format!(
                "no video paired with {}",
                file.paths.sidecar_path.display()
            ))
        })?;
        let output = file.paths.temp_output.as_deref().ok_or_else(|| {
            CoreError::Path(format!("no output path planned for {}", input.display()))
        })?;

        let in_ext = file.input_ext();
        let out_ext = self.config.output_ext_dotted().unwrap_or_else(|| in_ext.clone());
        let preset = presets::select(&out_ext, &in_ext);
        log::debug!(
            "{}: preset '{}' for {} -> {}",
            input.display(),
            preset.name,
            in_ext,
            out_ext
        );

        let current_video = probe.and_then(ProbeOutput::video_codec);
        let current_audio = probe.and_then(ProbeOutput::audio_codec);

        let video = self.plan_video(&preset, &out_ext, current_video);
        let audio = self.audio_args(&preset, current_audio);

        let mut args: Vec<String> = Vec::new();
        args.extend(video.hwaccel.iter().cloned());
        args.extend(video.device.iter().cloned());
        args.push("-y".to_string());
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());

        if self.config.strip_thumbnails && file.has_embedded_thumbnail {
            args.extend(["-map", "0", "-map", "-0:disp:attached_pic"].map(String::from));
        }

        if let Some(filter) = self.filter_chain(&video) {
            args.push("-vf".to_string());
            args.push(filter);
        }

        let full_copy = !video.encodes && is_copy(&video.codec) && is_copy(&audio);
        if full_copy {
            args.extend(["-codec", "copy"].map(String::from));
        } else {
            args.extend(video.codec.iter().cloned());
            args.extend(audio);
            if out_ext == ".mkv" {
                args.extend(["-c:s", "copy", "-c:t", "copy"].map(String::from));
            }
        }

        if video.encodes {
            if let Some(quality) = self.config.quality {
                args.extend(video.encoder_accel.quality_args(quality));
            }
        }

        for (key, value) in metadata_pairs(file, Container::from_ext(&out_ext)) {
            args.push("-metadata".to_string());
            args.push(format!("{key}={value}"));
        }

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.push(output.to_string_lossy().into_owned());
        Ok(args)
    }

    fn plan_video(&self, preset: &Preset, out_ext: &str, current: Option<&str>) -> VideoPlan {
        let mut choice = codecs::negotiate_video(&self.config.video_codec, current, self.catalog);
        if let CodecChoice::Encode { family, .. } = &choice {
            if !codecs::container_accepts(out_ext, family) {
                log::warn!(
                    "Container {} cannot hold {} video, using the '{}' preset instead",
                    out_ext,
                    family,
                    preset.name
                );
                choice = CodecChoice::Preset;
            }
        }

        match choice {
            CodecChoice::Copy => VideoPlan {
                codec: vec!["-c:v".to_string(), "copy".to_string()],
                ..VideoPlan::default()
            },
            CodecChoice::Preset => self.preset_video(preset, out_ext, current),
            CodecChoice::Encode { family, encoder } => self.hardware_or_software(&family, &encoder),
        }
    }

    fn preset_video(&self, preset: &Preset, out_ext: &str, current: Option<&str>) -> VideoPlan {
        let mut codec: &[&str] = preset.video;
        if presets::is_copy_args(codec) {
            let family = current.map(|c| codecs::video_family(&codecs::normalise_codec(c)).to_string());
            if let Some(family) = family {
                if !codecs::container_accepts(out_ext, &family) {
                    log::warn!(
                        "Container {} cannot hold {} video, re-encoding with libx264",
                        out_ext,
                        family
                    );
                    codec = presets::H264.video;
                }
            }
        }
        let encodes = !presets::is_copy_args(codec);
        let mut codec: Vec<String> = codec.iter().map(|a| (*a).to_string()).collect();
        let mut plan = VideoPlan::default();
        if encodes {
            if self.config.quality.is_some() {
                strip_flag(&mut codec, "-crf");
            }
            if self.config.gpu == HwAccel::Auto {
                plan.hwaccel = HwAccel::Auto.hwaccel_args();
            }
        }
        plan.codec = codec;
        plan.encodes = encodes;
        plan
    }

    fn hardware_or_software(&self, family: &str, encoder: &str) -> VideoPlan {
        let accel = self.config.gpu;
        let software = |hwaccel: Vec<String>| VideoPlan {
            hwaccel,
            codec: vec!["-c:v".to_string(), encoder.to_string()],
            encodes: true,
            ..VideoPlan::default()
        };

        match accel {
            HwAccel::None => return software(Vec::new()),
            HwAccel::Auto => return software(HwAccel::Auto.hwaccel_args()),
            _ => {}
        }
        if accel.is_unsafe_for(family) {
            log::warn!(
                "{} hardware acceleration is unreliable for {}, encoding in software",
                accel,
                family
            );
            return software(Vec::new());
        }
        let Some(hw_encoder) = accel.encoder_for(family) else {
            return software(Vec::new());
        };
        if !self.catalog.has_encoder(&hw_encoder) {
            log::warn!(
                "Encoder '{}' is not available in this ffmpeg build, encoding in software",
                hw_encoder
            );
            return software(Vec::new());
        }

        VideoPlan {
            hwaccel: accel.hwaccel_args(),
            device: accel.device_args(self.config.gpu_device.as_deref()),
            codec: vec!["-c:v".to_string(), hw_encoder],
            encoder_accel: accel,
            hw_filter: accel.filter(),
            encodes: true,
        }
    }

    fn audio_args(&self, preset: &Preset, current: Option<&str>) -> Vec<String> {
        match codecs::negotiate_audio(&self.config.audio_codec, current, self.catalog) {
            CodecChoice::Preset => preset.audio.iter().map(|a| (*a).to_string()).collect(),
            CodecChoice::Copy => vec!["-c:a".to_string(), "copy".to_string()],
            CodecChoice::Encode { encoder, .. } => vec!["-c:a".to_string(), encoder],
        }
    }

    fn filter_chain(&self, video: &VideoPlan) -> Option<String> {
        let user = self.config.video_filter.as_deref().unwrap_or("");
        if !video.encodes {
            if !user.trim().is_empty() {
                log::warn!("Video stream is copied, ignoring video filter '{}'", user);
            }
            return None;
        }
        VideoFilterChain::new()
            .add_filter(user)
            .add_filter(video.hw_filter.unwrap_or(""))
            .build()
    }
}

fn is_copy(args: &[String]) -> bool {
    args.len() == 2 && args[1] == "copy"
}

/// Removes `flag` and its value from an argument list.
fn strip_flag(args: &mut Vec<String>, flag: &str) {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        let end = (pos + 2).min(args.len());
        args.drain(pos..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::StaticEncoderCatalog;
    use crate::fill::tests::file_for;
    use std::path::{Path, PathBuf};

    fn clip(video: &str, temp: &str) -> FileData {
        let mut file = file_for(Path::new("/j/clip.info.json"));
        file.paths.original_video = Some(PathBuf::from(video));
        file.paths.temp_output = Some(PathBuf::from(temp));
        file
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| (*a).to_string()).collect()
    }

    #[test]
    fn stream_copy_with_mp4_metadata() {
        let mut file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mp4");
        file.titles.title = "Hello".to_string();
        file.dates.date = "2023-01-01".to_string();
        file.dates.creation_time = "2023-01-01T00:00:00Z".to_string();
        file.dates.year = "2023".to_string();
        file.dates.formatted_date = "2023-01-01".to_string();

        let config = CoreConfig::default();
        let catalog = StaticEncoderCatalog::new(["libx264", "aac"]);
        let args = CommandBuilder::new(&config, &catalog).build(&file, None).unwrap();

        assert_eq!(
            args,
            argv(&[
                "-y",
                "-i",
                "/v/clip.mp4",
                "-codec",
                "copy",
                "-metadata",
                "title=Hello",
                "-metadata",
                "date=2023-01-01",
                "-metadata",
                "creation_time=2023-01-01T00:00:00Z",
                "-metadata",
                "year=2023",
                "/v/tmp_clip.mp4.mp4",
            ])
        );
    }

    #[test]
    fn webm_to_mp4_uses_webm_preset() {
        let file = clip("/v/clip.webm", "/v/tmp_clip.webm.mp4");
        let config = CoreConfig {
            output_ext: Some("mp4".to_string()),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["libx264", "aac"]);
        let args = CommandBuilder::new(&config, &catalog).build(&file, None).unwrap();
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i /v/clip.webm -c:v libx264 -crf 23"));
        assert!(joined.contains("-g 50 -keyint_min 30 -c:a aac -b:a 256k"));
        assert!(joined.ends_with("/v/tmp_clip.webm.mp4"));
    }

    #[test]
    fn vaapi_av1_falls_back_to_software() {
        let file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mp4");
        let config = CoreConfig {
            gpu: HwAccel::Vaapi,
            gpu_device: Some(PathBuf::from("/dev/dri/renderD128")),
            video_codec: "av1".to_string(),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["libsvtav1", "av1_vaapi"]);
        let args = CommandBuilder::new(&config, &catalog).build(&file, None).unwrap();

        assert!(!args.iter().any(|a| a.starts_with("-hwaccel") || a == "-vaapi_device"));
        let pos = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[pos + 1], "libsvtav1");
    }

    #[test]
    fn vaapi_av1_without_software_encoder_copies() {
        let file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mp4");
        let config = CoreConfig {
            gpu: HwAccel::Vaapi,
            video_codec: "av1".to_string(),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["av1_vaapi"]);
        let args = CommandBuilder::new(&config, &catalog).build(&file, None).unwrap();
        assert!(args.windows(2).any(|w| w == ["-codec", "copy"]));
        assert!(!args.iter().any(|a| a.starts_with("-hwaccel")));
    }

    #[test]
    fn nvidia_hevc_uses_hardware_section() {
        let file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mp4");
        let config = CoreConfig {
            gpu: HwAccel::Nvidia,
            gpu_device: Some(PathBuf::from("/dev/nvidia0")),
            video_codec: "hevc".to_string(),
            quality: Some(28),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["libx265", "hevc_nvenc", "aac"]);
        let args = CommandBuilder::new(&config, &catalog)
            .build(&file, None)
            .unwrap()
            .join(" ");
        assert!(args.starts_with(
            "-hwaccel nvidia -hwaccel_output_format nvidia -hwaccel_device 0 -y -i /v/clip.mp4"
        ));
        assert!(args.contains(
            "-vf hwdownload,format=nv12,hwupload_cuda -c:v hevc_nvenc -c:a copy -rc vbr -cq 28"
        ));
    }

    #[test]
    fn vaapi_hevc_uses_hardware_section() {
        let file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mp4");
        let config = CoreConfig {
            gpu: HwAccel::Vaapi,
            gpu_device: Some(PathBuf::from("/dev/dri/renderD128")),
            video_codec: "hevc".to_string(),
            video_filter: Some("scale=1280:-2".to_string()),
            quality: Some(24),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["libx265", "hevc_vaapi", "aac"]);
        let args = CommandBuilder::new(&config, &catalog)
            .build(&file, None)
            .unwrap()
            .join(" ");
        assert!(args.starts_with(
            "-hwaccel vaapi -hwaccel_output_format vaapi -vaapi_device /dev/dri/renderD128 -y -i /v/clip.mp4"
        ));
        assert!(args.contains("-vf scale=1280:-2,format=nv12,hwupload -c:v hevc_vaapi -c:a copy -qp 24"));
    }

    #[test]
    fn mkv_output_rewrites_keys_and_copies_subtitles() {
        let mut file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mkv");
        file.titles.title = "Foo".to_string();
        let config = CoreConfig {
            output_ext: Some("mkv".to_string()),
            audio_codec: "opus".to_string(),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["libopus"]);
        let args = CommandBuilder::new(&config, &catalog).build(&file, None).unwrap();
        assert!(args.contains(&"TITLE=Foo".to_string()));
        assert!(!args.contains(&"title=Foo".to_string()));
        assert!(args.join(" ").contains("-c:v copy -c:a libopus -c:s copy -c:t copy"));
    }

    #[test]
    fn thumbnail_strip_maps_and_extra_args() {
        let mut file = clip("/v/clip.mp4", "/v/tmp_clip.mp4.mp4");
        file.has_embedded_thumbnail = true;
        let config = CoreConfig {
            strip_thumbnails: true,
            extra_ffmpeg_args: vec!["-movflags".to_string(), "+faststart".to_string()],
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(Vec::<&str>::new());
        let args = CommandBuilder::new(&config, &catalog)
            .build(&file, None)
            .unwrap()
            .join(" ");
        assert_eq!(
            args,
            "-y -i /v/clip.mp4 -map 0 -map -0:disp:attached_pic -codec copy -movflags +faststart /v/tmp_clip.mp4.mp4"
        );
    }

    #[test]
    fn quality_replaces_preset_crf() {
        let file = clip("/v/clip.avi", "/v/tmp_clip.avi.mp4");
        let config = CoreConfig {
            output_ext: Some("mp4".to_string()),
            quality: Some(28),
            ..CoreConfig::default()
        };
        let catalog = StaticEncoderCatalog::new(["libx264", "aac"]);
        let args = CommandBuilder::new(&config, &catalog).build(&file, None).unwrap();
        assert_eq!(args.iter().filter(|a| *a == "-crf").count(), 1);
        assert!(args.join(" ").contains("-b:a 256k -crf 28"));
    }

    #[test]
    fn filter_chain_joins_with_commas() {
        let chain = VideoFilterChain::new()
            .add_filter("crop=1920:800:0:140")
            .add_filter("")
            .add_filter("format=nv12,hwupload");
        assert_eq!(
            chain.build().as_deref(),
            Some("crop=1920:800:0:140,format=nv12,hwupload")
        );
        assert_eq!(VideoFilterChain::new().build(), None);
    }
}
