use anyhow::Result;
use thiserror::Error;

use crate::media::{MediaFrame, MediaPacket, MediaTrack};
use crate::pipeline::TranscodeContext;

/// Recoverable per-call codec failure. Stages log these and keep going;
/// nothing here tears a pipeline down.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("codec failure: {0}")]
    Failed(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// One decoder `receive` outcome.
#[derive(Debug)]
pub enum DecoderEvent {
    /// A decoded frame is ready; the caller takes ownership.
    Frame(MediaFrame),
    /// The decoder discovered or updated its true output parameters. The
    /// carried frame is valid and must still be forwarded after the
    /// downstream reconfiguration.
    FormatChanged(MediaFrame),
    /// Nothing more without further input.
    Pending,
}

/// Stateful decoder for one track. `send` moves one compressed packet in;
/// `receive` is polled until it returns [`DecoderEvent::Pending`].
pub trait Decoder: Send {
    fn send(&mut self, packet: MediaPacket) -> Result<(), CodecError>;
    fn receive(&mut self) -> Result<DecoderEvent, CodecError>;
}

/// Video rescaler or audio resampler for one track. May buffer internally;
/// an input frame need not produce exactly one output frame. `receive`
/// returns `None` when nothing more is available without further input.
pub trait Filter: Send {
    fn send(&mut self, frame: MediaFrame) -> Result<(), CodecError>;
    fn receive(&mut self) -> Result<Option<MediaFrame>, CodecError>;
}

/// Encoder for one track. May delay output (B-frames, lookahead); callers
/// keep submitting frames even when no packet is immediately available.
pub trait Encoder: Send {
    fn send(&mut self, frame: MediaFrame) -> Result<(), CodecError>;
    fn receive(&mut self) -> Result<Option<MediaPacket>, CodecError>;
}

/// Factory for per-track codec instances, keyed on the track's codec id
/// and kind. Concrete backends (ffmpeg and friends) live outside this
/// crate; the pipeline only ever talks to these three capabilities.
pub trait TranscodeBackend: Send + Sync {
    /// Decoder for an input track.
    fn create_decoder(&self, track: &MediaTrack) -> Result<Box<dyn Decoder>>;

    /// Filter conforming `input` (with observed parameters and normalized
    /// timebase) to the context target. Called on every format change.
    fn create_filter(&self, input: &MediaTrack, context: &TranscodeContext)
        -> Result<Box<dyn Filter>>;

    /// Encoder for an output track, built against the context target.
    fn create_encoder(&self, track: &MediaTrack, context: &TranscodeContext)
        -> Result<Box<dyn Encoder>>;
}
