use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use log::{error, info, trace, warn};
use uuid::Uuid;

use crate::codec::{Decoder, DecoderEvent, Filter, TranscodeBackend};
use crate::fraction::Fraction;
use crate::media::{FrameInfo, MediaFrame, MediaPacket, StreamDescriptor};
use crate::pipeline::{PipelineStats, TranscodeContext};
use crate::queue::MediaQueue;
use crate::router::MediaRouter;

/// Interval, in decoded frames, between queue-depth diagnostics.
const DEPTH_REPORT_INTERVAL: u64 = 300;

/// First stage worker: drains the ingress queue, routes packets to the
/// per-track decoders and emits raw frames. Owns the format-change
/// protocol: on [`DecoderEvent::FormatChanged`] the output descriptor
/// track is updated with the observed parameters and the track's filter
/// is (re)created before the carried frame moves on.
pub struct DecodeStage {
    pub(crate) id: Uuid,
    pub(crate) ingress: Arc<MediaQueue<MediaPacket>>,
    pub(crate) decoded: Arc<MediaQueue<MediaFrame>>,
    pub(crate) filtered: Arc<MediaQueue<MediaFrame>>,
    pub(crate) decoders: HashMap<u32, Box<dyn Decoder>>,
    pub(crate) filters: Arc<Mutex<HashMap<u32, Box<dyn Filter>>>>,
    pub(crate) output: Arc<Mutex<StreamDescriptor>>,
    pub(crate) backend: Arc<dyn TranscodeBackend>,
    pub(crate) context: TranscodeContext,
    pub(crate) router: Arc<dyn MediaRouter>,
    pub(crate) stats: Arc<PipelineStats>,
    pub(crate) frames_decoded: u64,
}

impl DecodeStage {
    pub(crate) fn run(mut self) {
        {
            let out = self.output.lock().unwrap();
            if let Err(e) = self.router.create_stream(&out) {
                warn!("Pipeline {}: create_stream failed: {}", self.id, e);
            }
        }

        while let Some(packet) = self.ingress.pop() {
            self.process_packet(packet);
        }

        {
            let out = self.output.lock().unwrap();
            if let Err(e) = self.router.delete_stream(&out) {
                warn!("Pipeline {}: delete_stream failed: {}", self.id, e);
            }
        }
        info!(
            "Pipeline {}: decode stage finished ({} frames)",
            self.id, self.frames_decoded
        );
    }

    fn process_packet(&mut self, packet: MediaPacket) {
        let track_id = packet.track_id;
        match self.decoders.get_mut(&track_id) {
            Some(decoder) => {
                if let Err(e) = decoder.send(packet) {
                    warn!("Pipeline {}: decode error on track {}: {}", self.id, track_id, e);
                    return;
                }
            }
            None => {
                trace!(
                    "Pipeline {}: no decoder for track {}, dropping packet",
                    self.id,
                    track_id
                );
                self.stats.packets_dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        loop {
            // Re-borrow per iteration so forwarding can use &mut self
            let event = match self.decoders.get_mut(&track_id) {
                Some(decoder) => decoder.receive(),
                None => break,
            };
            match event {
                Ok(DecoderEvent::Frame(frame)) => self.emit_frame(frame),
                Ok(DecoderEvent::FormatChanged(frame)) => {
                    self.reconfigure(&frame);
                    self.emit_frame(frame);
                }
                Ok(DecoderEvent::Pending) => break,
                Err(e) => {
                    warn!("Pipeline {}: decode error on track {}: {}", self.id, track_id, e);
                    break;
                }
            }
        }
    }

    fn emit_frame(&mut self, frame: MediaFrame) {
        self.frames_decoded += 1;
        self.stats.frames_decoded.fetch_add(1, Ordering::Relaxed);
        if self.frames_decoded % DEPTH_REPORT_INTERVAL == 0 {
            info!(
                "Pipeline {}: queues ingress={} decoded={} filtered={}",
                self.id,
                self.ingress.len(),
                self.decoded.len(),
                self.filtered.len()
            );
        }
        self.decoded.push(frame);
    }

    /// Apply a format change: record the observed parameters on the output
    /// descriptor track, normalize its timebase to milliseconds and build a
    /// fresh filter targeting the context. Replaces any prior filter for
    /// the track; decoder and encoder are left alone.
    fn reconfigure(&mut self, frame: &MediaFrame) {
        let track_id = frame.track_id;
        let updated = {
            let mut out = self.output.lock().unwrap();
            let Some(track) = out.tracks.get_mut(&track_id) else {
                warn!(
                    "Pipeline {}: format change on unknown track {}, ignoring",
                    self.id, track_id
                );
                return;
            };
            match &frame.info {
                FrameInfo::Video {
                    width,
                    height,
                    pixel_format,
                } => {
                    track.width = *width;
                    track.height = *height;
                    track.pixel_format = *pixel_format;
                }
                FrameInfo::Audio {
                    sample_rate,
                    sample_format,
                    channel_layout,
                    ..
                } => {
                    track.sample_rate = *sample_rate;
                    track.sample_format = *sample_format;
                    track.channel_layout = *channel_layout;
                }
            }
            track.time_base = Fraction::MILLIS;
            track.clone()
        };

        info!("Pipeline {}: format change: {}", self.id, updated);
        match self.backend.create_filter(&updated, &self.context) {
            Ok(filter) => {
                self.filters.lock().unwrap().insert(track_id, filter);
            }
            Err(e) => {
                error!(
                    "Pipeline {}: failed to create filter for track {}: {}",
                    self.id, track_id, e
                );
            }
        }
    }
}
