//! Encoder availability, read once from `ffmpeg -encoders`.

use once_cell::sync::OnceCell;
use std::process::{Command, Stdio};

/// Answers whether ffmpeg was built with a given encoder.
pub trait EncoderCatalog: Send + Sync {
    fn has_encoder(&self, name: &str) -> bool;
}

/// Runs `ffmpeg -hide_banner -encoders` on first use and caches the listing
/// for the rest of the run.
#[derive(Debug, Default)]
pub struct SystemEncoderCatalog {
    listing: OnceCell<String>,
}

impl SystemEncoderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn listing(&self) -> &str {
        self.listing.get_or_init(|| {
            let output = Command::new("ffmpeg")
                .args(["-hide_banner", "-encoders"])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output();
            match output {
                Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
                Ok(out) => {
                    log::warn!("ffmpeg -encoders exited with {}", out.status);
                    String::new()
                }
                Err(e) => {
                    log::warn!("Could not list ffmpeg encoders: {}", e);
                    String::new()
                }
            }
        })
    }
}

impl EncoderCatalog for SystemEncoderCatalog {
    fn has_encoder(&self, name: &str) -> bool {
        listing_has_encoder(self.listing(), name)
    }
}

/// Looks for `name` as the encoder column of an `ffmpeg -encoders` listing.
pub fn listing_has_encoder(listing: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|encoder| encoder == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D libsvtav1            SVT-AV1(Scalable Video Technology for AV1) encoder
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn matches_whole_encoder_names() {
        assert!(listing_has_encoder(LISTING, "libx264"));
        assert!(listing_has_encoder(LISTING, "aac"));
        assert!(!listing_has_encoder(LISTING, "libx26"));
        assert!(!listing_has_encoder(LISTING, "hevc_vaapi"));
        assert!(!listing_has_encoder(LISTING, ""));
    }
}
