use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;
use crate::media::{CodecId, PixelFormat};

/// Target parameters for the video side of a transcode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoVariant {
    /// Codec to encode with
    pub codec: CodecId,

    /// Width of the output video stream
    pub width: u32,

    /// Height of the output video stream
    pub height: u32,

    /// FPS of the output video stream
    pub fps: f32,

    /// Bitrate of the output video stream
    pub bitrate: u64,

    /// Keyframe interval in frames
    pub keyframe_interval: u32,

    /// Pixel format of the output video stream
    pub pixel_format: PixelFormat,

    /// Timebase encoded packets are stamped in
    pub time_base: Fraction,
}

impl Display for VideoVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Video: {}, {}x{}, {}fps, {}kbps",
            self.codec,
            self.width,
            self.height,
            self.fps,
            self.bitrate / 1000
        )
    }
}
