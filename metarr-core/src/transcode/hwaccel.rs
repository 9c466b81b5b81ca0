//! Hardware acceleration selection.
//!
//! Each accelerator has a list of codec families it cannot be trusted with;
//! those fall back to software encoding with a warning. `auto` only enables
//! hardware decoding and keeps the software encoder.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum HwAccel {
    #[default]
    None,
    Auto,
    Nvidia,
    Qsv,
    Vaapi,
    Amf,
}

impl FromStr for HwAccel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "auto" | "automatic" | "automated" => Ok(Self::Auto),
            "nvidia" | "cuda" | "nvenc" => Ok(Self::Nvidia),
            "qsv" | "intel" => Ok(Self::Qsv),
            "vaapi" => Ok(Self::Vaapi),
            "amf" | "amd" => Ok(Self::Amf),
            other => Err(CoreError::Config(format!(
                "unknown GPU type '{other}' (expected auto, nvidia, qsv, vaapi or amf)"
            ))),
        }
    }
}

impl fmt::Display for HwAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Auto => "auto",
            Self::Nvidia => "nvidia",
            Self::Qsv => "qsv",
            Self::Vaapi => "vaapi",
            Self::Amf => "amf",
        })
    }
}

impl HwAccel {
    /// Codec families this accelerator falls back to software for.
    pub fn unsafe_codecs(self) -> &'static [&'static str] {
        match self {
            Self::Vaapi | Self::Qsv => &["vp8", "vp9", "av1"],
            Self::Nvidia => &["vp8", "vp9", "mpeg4"],
            Self::Amf => &["vp8", "vp9", "mpeg2video", "mpeg4"],
            Self::None | Self::Auto => &[],
        }
    }

    pub fn is_unsafe_for(self, family: &str) -> bool {
        self.unsafe_codecs().contains(&family)
    }

    fn encoder_suffix(self) -> Option<&'static str> {
        match self {
            Self::Nvidia => Some("_nvenc"),
            Self::Qsv => Some("_qsv"),
            Self::Vaapi => Some("_vaapi"),
            Self::Amf => Some("_amf"),
            Self::None | Self::Auto => None,
        }
    }

    /// Hardware encoder for a codec family, e.g. `hevc_vaapi`.
    pub fn encoder_for(self, family: &str) -> Option<String> {
        let base = match family {
            "mpeg2video" => "mpeg2",
            other => other,
        };
        self.encoder_suffix().map(|suffix| format!("{base}{suffix}"))
    }

    /// `-hwaccel` arguments placed before the input.
    pub fn hwaccel_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Auto => &["-hwaccel", "auto"],
            Self::Nvidia => &["-hwaccel", "nvidia", "-hwaccel_output_format", "nvidia"],
            Self::Qsv => &["-hwaccel", "qsv", "-hwaccel_output_format", "qsv"],
            Self::Vaapi => &["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"],
            Self::Amf | Self::None => &[],
        };
        args.iter().map(|a| (*a).to_string()).collect()
    }

    /// Device selection arguments, also placed before the input.
    pub fn device_args(self, device: Option<&Path>) -> Vec<String> {
        let Some(device) = device else {
            return Vec::new();
        };
        let path = device.to_string_lossy().into_owned();
        match self {
            Self::Nvidia => nvidia_index(&path)
                .map(|n| vec!["-hwaccel_device".to_string(), n])
                .unwrap_or_default(),
            Self::Qsv => vec!["-qsv_device".to_string(), path],
            Self::Vaapi => vec!["-vaapi_device".to_string(), path],
            Self::Amf | Self::Auto | Self::None => Vec::new(),
        }
    }

    /// Filter needed to move frames between system and device memory.
    pub fn filter(self) -> Option<&'static str> {
        match self {
            Self::Nvidia => Some("hwdownload,format=nv12,hwupload_cuda"),
            Self::Vaapi => Some("format=nv12,hwupload"),
            _ => None,
        }
    }

    /// Quality arguments in this accelerator's dialect.
    pub fn quality_args(self, quality: u8) -> Vec<String> {
        let q = quality.to_string();
        match self {
            Self::Amf => vec!["-qp_p".to_string(), q],
            Self::Nvidia => vec!["-rc".to_string(), "vbr".to_string(), "-cq".to_string(), q],
            Self::Qsv => vec!["-global_quality".to_string(), q],
            Self::Vaapi => vec!["-qp".to_string(), q],
            Self::Auto | Self::None => vec!["-crf".to_string(), q],
        }
    }
}

/// `/dev/nvidia1` -> `1`.
fn nvidia_index(path: &str) -> Option<String> {
    let digits: String = path
        .rsplit('/')
        .next()?
        .trim_start_matches("nvidia")
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gpu_names() {
        assert_eq!("".parse::<HwAccel>().unwrap(), HwAccel::None);
        assert_eq!("VAAPI".parse::<HwAccel>().unwrap(), HwAccel::Vaapi);
        assert!("radeon".parse::<HwAccel>().is_err());
    }

    #[test]
    fn vaapi_rejects_av1() {
        assert!(HwAccel::Vaapi.is_unsafe_for("av1"));
        assert!(!HwAccel::Vaapi.is_unsafe_for("hevc"));
        assert_eq!(HwAccel::Vaapi.encoder_for("hevc").as_deref(), Some("hevc_vaapi"));
        assert_eq!(HwAccel::Auto.encoder_for("hevc"), None);
    }

    #[test]
    fn nvidia_device_index_from_path() {
        let args = HwAccel::Nvidia.device_args(Some(Path::new("/dev/nvidia1")));
        assert_eq!(args, vec!["-hwaccel_device", "1"]);
        assert!(HwAccel::Nvidia.device_args(Some(Path::new("/dev/dri"))).is_empty());
    }

    #[test]
    fn hwaccel_arguments_per_accelerator() {
        assert_eq!(
            HwAccel::Nvidia.hwaccel_args(),
            vec!["-hwaccel", "nvidia", "-hwaccel_output_format", "nvidia"]
        );
        assert_eq!(HwAccel::Auto.hwaccel_args(), vec!["-hwaccel", "auto"]);
        assert!(HwAccel::Amf.hwaccel_args().is_empty());
    }

    #[test]
    fn quality_dialects() {
        assert_eq!(HwAccel::None.quality_args(23), vec!["-crf", "23"]);
        assert_eq!(HwAccel::Nvidia.quality_args(30), vec!["-rc", "vbr", "-cq", "30"]);
        assert_eq!(HwAccel::Qsv.quality_args(25), vec!["-global_quality", "25"]);
    }
}
