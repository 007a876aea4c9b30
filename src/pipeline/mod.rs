use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;
use crate::media::{ChannelLayout, CodecId, PixelFormat, SampleFormat};
use crate::variant::{AudioVariant, VideoVariant};

pub mod runner;

/// Fixed target-format specification for one pipeline, shared by every
/// filter and encoder created for it. Immutable after construction.
///
/// `Default` is the reference profile; hosts that load their own profile
/// can deserialize one in its place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscodeContext {
    pub video: VideoVariant,
    pub audio: AudioVariant,
}

impl Default for TranscodeContext {
    fn default() -> Self {
        Self {
            video: VideoVariant {
                codec: CodecId::Vp8,
                width: 480,
                height: 320,
                fps: 30.0,
                bitrate: 5_000_000,
                keyframe_interval: 30,
                pixel_format: PixelFormat::Yuv420p,
                time_base: Fraction::MICROS,
            },
            audio: AudioVariant {
                codec: CodecId::Opus,
                bitrate: 64_000,
                sample_rate: 48_000,
                sample_format: SampleFormat::S16,
                channel_layout: ChannelLayout::Stereo,
                time_base: Fraction::MICROS,
            },
        }
    }
}

/// Running totals kept by the stage workers.
#[derive(Default)]
pub struct PipelineStats {
    pub frames_decoded: AtomicU64,
    pub packets_dropped: AtomicU64,
    pub packets_encoded: AtomicU64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            packets_encoded: self.packets_encoded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_decoded: u64,
    pub packets_dropped: u64,
    pub packets_encoded: u64,
}
