use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use bytes::Bytes;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
}

/// Codecs the pipeline can route. Payload names follow their RTP
/// registrations and are matched case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecId {
    Vp8,
    H264,
    Opus,
}

impl CodecId {
    pub fn from_payload_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "vp8" => Some(CodecId::Vp8),
            "h264" => Some(CodecId::H264),
            "opus" => Some(CodecId::Opus),
            _ => None,
        }
    }

    /// Payload id used when the SDP did not assign one.
    pub fn default_payload_id(&self) -> u8 {
        match self {
            CodecId::Vp8 => 97,
            CodecId::H264 => 100,
            CodecId::Opus => 111,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            CodecId::Vp8 | CodecId::H264 => MediaKind::Video,
            CodecId::Opus => MediaKind::Audio,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CodecId::Vp8 => "VP8",
            CodecId::H264 => "H264",
            CodecId::Opus => "OPUS",
        }
    }
}

impl Display for CodecId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Yuv420p,
    Nv12,
    Rgb24,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Signed 16-bit interleaved
    S16,
    /// 32-bit float interleaved
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::S16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channels(&self) -> u8 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// One compressed unit, tagged with the track it belongs to.
///
/// Payload bytes are an owned handle; moving a packet between stages never
/// copies media data.
#[derive(Clone, Debug)]
pub struct MediaPacket {
    pub track_id: u32,
    /// Presentation timestamp in the track's timebase
    pub pts: i64,
    pub duration: i64,
    pub codec: CodecId,
    pub key_frame: bool,
    pub discontinuity: bool,
    pub data: Bytes,
}

/// One uncompressed unit produced by a decoder or filter.
#[derive(Clone, Debug)]
pub struct MediaFrame {
    pub track_id: u32,
    pub pts: i64,
    /// Plane buffers; video planes are Y/U/V etc., interleaved audio uses one.
    pub planes: Vec<Bytes>,
    pub info: FrameInfo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameInfo {
    Video {
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
    },
    Audio {
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
        samples: u32,
    },
}

impl MediaFrame {
    pub fn kind(&self) -> MediaKind {
        match self.info {
            FrameInfo::Video { .. } => MediaKind::Video,
            FrameInfo::Audio { .. } => MediaKind::Audio,
        }
    }
}

/// Metadata for one elementary track.
///
/// Kept flat; fields that do not apply to the track's kind stay at their
/// construction defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaTrack {
    pub id: u32,
    pub kind: MediaKind,
    pub codec: CodecId,
    pub time_base: Fraction,
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub pixel_format: PixelFormat,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub channel_layout: ChannelLayout,
}

impl MediaTrack {
    pub fn video(
        id: u32,
        codec: CodecId,
        time_base: Fraction,
        width: u32,
        height: u32,
        fps: f32,
        pixel_format: PixelFormat,
    ) -> Self {
        Self {
            id,
            kind: MediaKind::Video,
            codec,
            time_base,
            width,
            height,
            fps,
            pixel_format,
            sample_rate: 0,
            sample_format: SampleFormat::S16,
            channel_layout: ChannelLayout::Stereo,
        }
    }

    pub fn audio(
        id: u32,
        codec: CodecId,
        time_base: Fraction,
        sample_rate: u32,
        sample_format: SampleFormat,
        channel_layout: ChannelLayout,
    ) -> Self {
        Self {
            id,
            kind: MediaKind::Audio,
            codec,
            time_base,
            width: 0,
            height: 0,
            fps: 0.0,
            pixel_format: PixelFormat::Yuv420p,
            sample_rate,
            sample_format,
            channel_layout,
        }
    }
}

impl Display for MediaTrack {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            MediaKind::Video => write!(
                f,
                "Video #{}: {}, {}x{}, {}fps, tb={}",
                self.id, self.codec, self.width, self.height, self.fps, self.time_base
            ),
            MediaKind::Audio => write!(
                f,
                "Audio #{}: {}, {}Hz {}ch, tb={}",
                self.id,
                self.codec,
                self.sample_rate,
                self.channel_layout.channels(),
                self.time_base
            ),
            MediaKind::Subtitle => write!(f, "Subtitle #{}", self.id),
        }
    }
}

/// Stream name plus its track set, keyed by track id.
///
/// Track ids are shared between the input and output descriptors of a
/// pipeline; the output descriptor of a stream named `x` is named `x_o`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
    pub tracks: BTreeMap<u32, MediaTrack>,
}

impl StreamDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: BTreeMap::new(),
        }
    }

    pub fn add_track(&mut self, track: MediaTrack) {
        self.tracks.insert(track.id, track);
    }

    pub fn track(&self, id: u32) -> Option<&MediaTrack> {
        self.tracks.get(&id)
    }
}

impl Display for StreamDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: [{}]",
            self.name,
            self.tracks.values().map(|t| t.to_string()).join(", ")
        )
    }
}
