// ============================================================================
// metarr-core/src/transcode/mod.rs
// ============================================================================
//
// TRANSCODE: FFmpeg command construction
//
// Turns a filled FileData plus the run configuration into the argument
// vector handed to ffmpeg. Nothing here spawns a process except the encoder
// listing, which is reached through the EncoderCatalog trait.
//
// KEY COMPONENTS:
// - CommandBuilder: argv assembly in ffmpeg's expected order
// - codecs: name normalisation, encoder mapping, container compatibility
// - HwAccel: hardware acceleration table with unsafe-codec fallbacks
// - presets: codec bundles keyed by output and input extension
// - metadata: per-container tag vocabularies

pub mod builder;
pub mod codecs;
pub mod hwaccel;
pub mod metadata;
pub mod presets;

pub use builder::{CommandBuilder, VideoFilterChain};
pub use codecs::CodecChoice;
pub use hwaccel::HwAccel;
pub use metadata::{Container, MetaTag, metadata_pairs};
pub use presets::Preset;
