use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;
use crate::media::{ChannelLayout, CodecId, SampleFormat};

/// Target parameters for the audio side of a transcode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioVariant {
    /// Codec to encode with
    pub codec: CodecId,

    /// Bitrate of the output audio stream
    pub bitrate: u64,

    /// Sample rate of the output audio stream
    pub sample_rate: u32,

    /// Sample format of the output audio stream
    pub sample_format: SampleFormat,

    /// Channel layout of the output audio stream
    pub channel_layout: ChannelLayout,

    /// Timebase encoded packets are stamped in
    pub time_base: Fraction,
}

impl Display for AudioVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Audio: {}, {}Hz {}ch, {}kbps",
            self.codec,
            self.sample_rate,
            self.channel_layout.channels(),
            self.bitrate / 1000
        )
    }
}
