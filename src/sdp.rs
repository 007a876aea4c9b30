use std::fmt::{Display, Formatter};

use crate::media::CodecId;

/// One payload entry of a negotiated media description.
///
/// Holds the payload id, the codec bound by `a=rtpmap`, the clock rate and
/// any codec parameters (`a=fmtp`) verbatim. The rest of SDP handling is
/// host-side; the pipeline only needs the codec binding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PayloadAttr {
    id: Option<u8>,
    codec: Option<CodecId>,
    rate: u32,
    parameters: String,
}

impl PayloadAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<u8> {
        self.id
    }

    pub fn set_id(&mut self, id: u8) {
        self.id = Some(id);
    }

    pub fn codec(&self) -> Option<CodecId> {
        self.codec
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    /// Bind this payload to a codec from an rtpmap line. Codec names are
    /// matched case-insensitively; an unknown name is rejected and the
    /// attribute is left untouched. When no payload id was assigned yet the
    /// codec's reference id (VP8 97, H264 100, OPUS 111) is filled in.
    pub fn set_rtpmap(&mut self, codec_name: &str, rate: u32, parameters: &str) -> bool {
        let Some(codec) = CodecId::from_payload_name(codec_name) else {
            return false;
        };
        self.codec = Some(codec);
        if self.id.is_none() {
            self.id = Some(codec.default_payload_id());
        }
        self.rate = rate;
        self.parameters = parameters.to_owned();
        true
    }
}

impl Display for PayloadAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.id, self.codec) {
            (Some(id), Some(codec)) => write!(f, "{} {}/{}", id, codec, self.rate),
            _ => write!(f, "(unbound)"),
        }
    }
}
