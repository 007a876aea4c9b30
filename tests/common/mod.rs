//! Scripted codec backend and recording router used by the pipeline
//! integration tests. The backend produces one frame per packet and
//! announces a format change whenever the planned frame geometry differs
//! from what it last announced, which is how real decoders behave on
//! stream start and mid-stream parameter switches.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use bytes::Bytes;

use transcode_core::codec::{
    CodecError, Decoder, DecoderEvent, Encoder, Filter, TranscodeBackend,
};
use transcode_core::fraction::Fraction;
use transcode_core::media::{
    ChannelLayout, CodecId, FrameInfo, MediaFrame, MediaKind, MediaPacket, MediaTrack,
    PixelFormat, SampleFormat, StreamDescriptor,
};
use transcode_core::pipeline::TranscodeContext;
use transcode_core::router::MediaRouter;

pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

#[derive(Clone, Debug)]
pub enum RouterEvent {
    Created(StreamDescriptor),
    Deleted(StreamDescriptor),
    Packet(MediaPacket),
}

/// MediaRouter that records every call for later assertions.
#[derive(Default)]
pub struct RecordingRouter {
    events: Mutex<Vec<RouterEvent>>,
}

impl RecordingRouter {
    pub fn events(&self) -> Vec<RouterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn packets(&self) -> Vec<MediaPacket> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RouterEvent::Packet(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<StreamDescriptor> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RouterEvent::Created(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<StreamDescriptor> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RouterEvent::Deleted(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

impl MediaRouter for RecordingRouter {
    fn create_stream(&self, stream: &StreamDescriptor) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RouterEvent::Created(stream.clone()));
        Ok(())
    }

    fn delete_stream(&self, stream: &StreamDescriptor) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RouterEvent::Deleted(stream.clone()));
        Ok(())
    }

    fn send_frame(&self, _stream: &StreamDescriptor, packet: MediaPacket) -> Result<()> {
        self.events.lock().unwrap().push(RouterEvent::Packet(packet));
        Ok(())
    }
}

/// Test backend with per-track decode plans and instance accounting.
///
/// A plan is a list of `(first frame index, frame info)` entries; the
/// decoder emits each frame with the info of the latest entry at or below
/// its index. Stage delays simulate slow codecs for the load tests.
pub struct ScriptedBackend {
    pub plans: Mutex<HashMap<u32, Vec<(u64, FrameInfo)>>>,
    /// When false the decoder pre-announces its initial format, so no
    /// FormatChanged fires until the plan actually switches.
    pub announce_first: bool,
    pub filters_created: AtomicUsize,
    pub filters_alive: Arc<AtomicUsize>,
    pub decode_delay: Duration,
    pub filter_delay: Duration,
    pub encode_delay: Duration,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            announce_first: true,
            filters_created: AtomicUsize::new(0),
            filters_alive: Arc::new(AtomicUsize::new(0)),
            decode_delay: Duration::ZERO,
            filter_delay: Duration::ZERO,
            encode_delay: Duration::ZERO,
        }
    }
}

impl ScriptedBackend {
    pub fn set_plan(&self, track_id: u32, plan: Vec<(u64, FrameInfo)>) {
        self.plans.lock().unwrap().insert(track_id, plan);
    }
}

fn initial_frame_info(track: &MediaTrack) -> Result<FrameInfo> {
    match track.kind {
        MediaKind::Video => Ok(FrameInfo::Video {
            width: track.width,
            height: track.height,
            pixel_format: track.pixel_format,
        }),
        MediaKind::Audio => Ok(FrameInfo::Audio {
            sample_rate: track.sample_rate,
            sample_format: track.sample_format,
            channel_layout: track.channel_layout,
            samples: 960,
        }),
        MediaKind::Subtitle => bail!("unsupported media kind"),
    }
}

impl TranscodeBackend for ScriptedBackend {
    fn create_decoder(&self, track: &MediaTrack) -> Result<Box<dyn Decoder>> {
        let initial = initial_frame_info(track)?;
        let plan = self
            .plans
            .lock()
            .unwrap()
            .get(&track.id)
            .cloned()
            .unwrap_or_else(|| vec![(0, initial)]);
        let announced = if self.announce_first {
            None
        } else {
            plan.first().map(|(_, info)| info.clone())
        };
        Ok(Box::new(StubDecoder {
            plan,
            announced,
            pending: VecDeque::new(),
            count: 0,
            delay: self.decode_delay,
        }))
    }

    fn create_filter(
        &self,
        input: &MediaTrack,
        context: &TranscodeContext,
    ) -> Result<Box<dyn Filter>> {
        self.filters_created.fetch_add(1, Ordering::SeqCst);
        self.filters_alive.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubFilter {
            input: input.clone(),
            context: context.clone(),
            pending: VecDeque::new(),
            delay: self.filter_delay,
            alive: self.filters_alive.clone(),
        }))
    }

    fn create_encoder(
        &self,
        track: &MediaTrack,
        context: &TranscodeContext,
    ) -> Result<Box<dyn Encoder>> {
        Ok(Box::new(StubEncoder {
            target: track.clone(),
            context: context.clone(),
            pending: VecDeque::new(),
            first: true,
            delay: self.encode_delay,
        }))
    }
}

pub struct StubDecoder {
    plan: Vec<(u64, FrameInfo)>,
    announced: Option<FrameInfo>,
    pending: VecDeque<MediaFrame>,
    count: u64,
    delay: Duration,
}

impl Decoder for StubDecoder {
    fn send(&mut self, packet: MediaPacket) -> Result<(), CodecError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let info = self
            .plan
            .iter()
            .rev()
            .find(|(start, _)| *start <= self.count)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| CodecError::InvalidInput("no plan entry".into()))?;
        self.pending.push_back(MediaFrame {
            track_id: packet.track_id,
            pts: packet.pts,
            planes: vec![Bytes::from(vec![0u8; 64])],
            info,
        });
        self.count += 1;
        Ok(())
    }

    fn receive(&mut self) -> Result<DecoderEvent, CodecError> {
        let Some(frame) = self.pending.pop_front() else {
            return Ok(DecoderEvent::Pending);
        };
        if self.announced.as_ref() != Some(&frame.info) {
            self.announced = Some(frame.info.clone());
            Ok(DecoderEvent::FormatChanged(frame))
        } else {
            Ok(DecoderEvent::Frame(frame))
        }
    }
}

pub struct StubFilter {
    input: MediaTrack,
    context: TranscodeContext,
    pending: VecDeque<MediaFrame>,
    delay: Duration,
    alive: Arc<AtomicUsize>,
}

impl Drop for StubFilter {
    fn drop(&mut self) {
        self.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Filter for StubFilter {
    fn send(&mut self, frame: MediaFrame) -> Result<(), CodecError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let out = match frame.info {
            FrameInfo::Video { .. } => {
                let v = &self.context.video;
                MediaFrame {
                    track_id: frame.track_id,
                    pts: self.input.time_base.rescale(frame.pts, v.time_base),
                    planes: frame.planes,
                    info: FrameInfo::Video {
                        width: v.width,
                        height: v.height,
                        pixel_format: v.pixel_format,
                    },
                }
            }
            FrameInfo::Audio { samples, .. } => {
                let a = &self.context.audio;
                MediaFrame {
                    track_id: frame.track_id,
                    pts: self.input.time_base.rescale(frame.pts, a.time_base),
                    planes: frame.planes,
                    info: FrameInfo::Audio {
                        sample_rate: a.sample_rate,
                        sample_format: a.sample_format,
                        channel_layout: a.channel_layout,
                        samples,
                    },
                }
            }
        };
        self.pending.push_back(out);
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<MediaFrame>, CodecError> {
        Ok(self.pending.pop_front())
    }
}

pub struct StubEncoder {
    target: MediaTrack,
    context: TranscodeContext,
    pending: VecDeque<MediaPacket>,
    first: bool,
    delay: Duration,
}

impl Encoder for StubEncoder {
    fn send(&mut self, frame: MediaFrame) -> Result<(), CodecError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        // A frame that was not conformed to the target profile is a bug in
        // the stages upstream; refuse it so tests can count clean output.
        let conformed = match (&frame.info, self.target.kind) {
            (FrameInfo::Video { width, height, .. }, MediaKind::Video) => {
                *width == self.context.video.width && *height == self.context.video.height
            }
            (
                FrameInfo::Audio {
                    sample_rate,
                    channel_layout,
                    ..
                },
                MediaKind::Audio,
            ) => {
                *sample_rate == self.context.audio.sample_rate
                    && *channel_layout == self.context.audio.channel_layout
            }
            _ => false,
        };
        if !conformed {
            return Err(CodecError::InvalidInput(
                "frame does not match encoder target".into(),
            ));
        }
        let key_frame = self.first;
        self.first = false;
        self.pending.push_back(MediaPacket {
            track_id: frame.track_id,
            pts: frame.pts,
            duration: 0,
            codec: self.target.codec,
            key_frame,
            discontinuity: false,
            data: Bytes::from(vec![0u8; 16]),
        });
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<MediaPacket>, CodecError> {
        Ok(self.pending.pop_front())
    }
}

pub fn video_input(name: &str, track_id: u32, width: u32, height: u32) -> StreamDescriptor {
    let mut desc = StreamDescriptor::new(name);
    desc.add_track(MediaTrack::video(
        track_id,
        CodecId::Vp8,
        Fraction::new(1, 30_000),
        width,
        height,
        30.0,
        PixelFormat::Yuv420p,
    ));
    desc
}

pub fn mono_audio_input(name: &str, track_id: u32) -> StreamDescriptor {
    let mut desc = StreamDescriptor::new(name);
    desc.add_track(MediaTrack::audio(
        track_id,
        CodecId::Opus,
        Fraction::new(1, 48_000),
        48_000,
        SampleFormat::S16,
        ChannelLayout::Mono,
    ));
    desc
}

pub fn packet(track_id: u32, codec: CodecId, pts: i64) -> MediaPacket {
    MediaPacket {
        track_id,
        pts,
        duration: 0,
        codec,
        key_frame: pts == 0,
        discontinuity: false,
        data: Bytes::from(vec![0u8; 128]),
    }
}

pub fn video_info(width: u32, height: u32) -> FrameInfo {
    FrameInfo::Video {
        width,
        height,
        pixel_format: PixelFormat::Yuv420p,
    }
}

/// Poll `predicate` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    predicate()
}
