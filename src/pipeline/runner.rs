use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use log::{error, info, warn};
use uuid::Uuid;

use crate::codec::TranscodeBackend;
use crate::decode::DecodeStage;
use crate::encode::EncodeStage;
use crate::filter::FilterStage;
use crate::media::{MediaFrame, MediaKind, MediaPacket, MediaTrack, StreamDescriptor};
use crate::pipeline::{PipelineStats, StatsSnapshot, TranscodeContext};
use crate::queue::MediaQueue;
use crate::router::MediaRouter;

struct Workers {
    decode: JoinHandle<()>,
    filter: JoinHandle<()>,
    encode: JoinHandle<()>,
}

/// One live transcoding pipeline: three stage workers connected by
/// blocking hand-off queues.
///
/// ```text
/// push -> ingress -> [decode] -> decoded -> [filter] -> filtered -> [encode] -> router
/// ```
///
/// The pipeline owns its queues, codec instances and workers; the caller
/// keeps pushing packets until `stop`. Dropping the pipeline stops it.
pub struct TranscodeStream {
    id: Uuid,
    input: StreamDescriptor,
    ingress: Arc<MediaQueue<MediaPacket>>,
    decoded: Arc<MediaQueue<MediaFrame>>,
    filtered: Arc<MediaQueue<MediaFrame>>,
    stats: Arc<PipelineStats>,
    workers: Mutex<Option<Workers>>,
    killed: AtomicBool,
}

impl TranscodeStream {
    /// Build codec instances for every track, announce nothing yet, and
    /// spawn the three workers. Fails only if a worker cannot be spawned;
    /// per-track codec construction failures are logged and the track is
    /// skipped (it degrades to the silent-drop path).
    pub fn new(
        input: StreamDescriptor,
        router: Arc<dyn MediaRouter>,
        backend: Arc<dyn TranscodeBackend>,
        context: TranscodeContext,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        info!("Pipeline {}: starting for stream {}", id, input.name);

        let mut decoders = HashMap::new();
        for track in input.tracks.values() {
            match backend.create_decoder(track) {
                Ok(decoder) => {
                    decoders.insert(track.id, decoder);
                }
                Err(e) => warn!("Pipeline {}: no decoder for {}: {}", id, track, e),
            }
        }

        let output_descriptor = make_output_descriptor(&input, &context);
        info!("Pipeline {}: output {}", id, output_descriptor);

        let mut encoders = HashMap::new();
        for track in output_descriptor.tracks.values() {
            match backend.create_encoder(track, &context) {
                Ok(encoder) => {
                    encoders.insert(track.id, encoder);
                }
                Err(e) => warn!("Pipeline {}: no encoder for {}: {}", id, track, e),
            }
        }

        let ingress = Arc::new(MediaQueue::new());
        let decoded = Arc::new(MediaQueue::new());
        let filtered = Arc::new(MediaQueue::new());
        let filters = Arc::new(Mutex::new(HashMap::new()));
        let output = Arc::new(Mutex::new(output_descriptor));
        let stats = Arc::new(PipelineStats::default());

        let decode_stage = DecodeStage {
            id,
            ingress: ingress.clone(),
            decoded: decoded.clone(),
            filtered: filtered.clone(),
            decoders,
            filters: filters.clone(),
            output: output.clone(),
            backend,
            context,
            router: router.clone(),
            stats: stats.clone(),
            frames_decoded: 0,
        };
        let filter_stage = FilterStage {
            id,
            decoded: decoded.clone(),
            filtered: filtered.clone(),
            filters,
        };
        let encode_stage = EncodeStage {
            id,
            filtered: filtered.clone(),
            encoders,
            output,
            router,
            stats: stats.clone(),
        };

        // Spawn in pipeline order; if a later spawn fails, unwind the
        // earlier workers through the regular abort/join sequence so the
        // pipeline never runs partially.
        let decode = thread::Builder::new()
            .name(format!("transcode-decode-{}", id))
            .spawn(move || decode_stage.run())
            .context("failed to spawn decode worker")?;

        let filter = match thread::Builder::new()
            .name(format!("transcode-filter-{}", id))
            .spawn(move || filter_stage.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                ingress.abort();
                let _ = decode.join();
                decoded.abort();
                filtered.abort();
                return Err(e).context("failed to spawn filter worker");
            }
        };

        let encode = match thread::Builder::new()
            .name(format!("transcode-encode-{}", id))
            .spawn(move || encode_stage.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                ingress.abort();
                let _ = decode.join();
                decoded.abort();
                let _ = filter.join();
                filtered.abort();
                return Err(e).context("failed to spawn encode worker");
            }
        };

        Ok(Self {
            id,
            input,
            ingress,
            decoded,
            filtered,
            stats,
            workers: Mutex::new(Some(Workers {
                decode,
                filter,
                encode,
            })),
            killed: AtomicBool::new(false),
        })
    }

    /// Hand one compressed packet to the pipeline. Returns true while the
    /// pipeline is live; packets pushed after `stop` are discarded.
    pub fn push(&self, packet: MediaPacket) -> bool {
        if self.killed.load(Ordering::SeqCst) {
            return false;
        }
        self.ingress.push(packet);
        true
    }

    /// Read-only view of the input stream.
    pub fn get_stream_info(&self) -> &StreamDescriptor {
        &self.input
    }

    /// Number of packets waiting in the ingress queue. Diagnostic only.
    pub fn get_buffer_count(&self) -> usize {
        self.ingress.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Idempotent shutdown. Aborts the queues in flow order, joining each
    /// consumer before aborting the next queue, so every worker wakes while
    /// its output queue still accepts in-flight frames.
    pub fn stop(&self) {
        if self.killed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Pipeline {}: stopping", self.id);

        let Some(workers) = self.workers.lock().unwrap().take() else {
            self.ingress.abort();
            self.decoded.abort();
            self.filtered.abort();
            return;
        };

        self.ingress.abort();
        if workers.decode.join().is_err() {
            error!("Pipeline {}: decode worker panicked", self.id);
        }
        self.decoded.abort();
        if workers.filter.join().is_err() {
            error!("Pipeline {}: filter worker panicked", self.id);
        }
        self.filtered.abort();
        if workers.encode.join().is_err() {
            error!("Pipeline {}: encode worker panicked", self.id);
        }
        info!("Pipeline {}: stopped", self.id);
    }
}

impl Drop for TranscodeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mirror the supported input tracks into an output descriptor carrying
/// the target codec parameters. Track ids are preserved; the stream name
/// gets the `_o` suffix.
fn make_output_descriptor(input: &StreamDescriptor, context: &TranscodeContext) -> StreamDescriptor {
    let tracks: BTreeMap<u32, MediaTrack> = input
        .tracks
        .values()
        .filter_map(|track| match track.kind {
            MediaKind::Video => {
                let v = &context.video;
                Some(MediaTrack::video(
                    track.id,
                    v.codec,
                    v.time_base,
                    v.width,
                    v.height,
                    v.fps,
                    v.pixel_format,
                ))
            }
            MediaKind::Audio => {
                let a = &context.audio;
                Some(MediaTrack::audio(
                    track.id,
                    a.codec,
                    a.time_base,
                    a.sample_rate,
                    a.sample_format,
                    a.channel_layout,
                ))
            }
            _ => None,
        })
        .map(|track| (track.id, track))
        .collect();

    StreamDescriptor {
        name: format!("{}_o", input.name),
        tracks,
    }
}
