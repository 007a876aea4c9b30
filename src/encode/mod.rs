use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use log::{info, trace, warn};
use uuid::Uuid;

use crate::codec::Encoder;
use crate::media::{MediaFrame, MediaPacket, StreamDescriptor};
use crate::pipeline::PipelineStats;
use crate::queue::MediaQueue;
use crate::router::MediaRouter;

/// Last stage worker: re-encodes conformed frames and publishes the
/// resulting packets to the media router. Encoders may buffer (B-frames,
/// lookahead), so frames keep flowing in even while no packet comes out.
pub struct EncodeStage {
    pub(crate) id: Uuid,
    pub(crate) filtered: Arc<MediaQueue<MediaFrame>>,
    pub(crate) encoders: HashMap<u32, Box<dyn Encoder>>,
    pub(crate) output: Arc<Mutex<StreamDescriptor>>,
    pub(crate) router: Arc<dyn MediaRouter>,
    pub(crate) stats: Arc<PipelineStats>,
}

impl EncodeStage {
    pub(crate) fn run(mut self) {
        while let Some(frame) = self.filtered.pop() {
            self.process_frame(frame);
        }
        info!("Pipeline {}: encode stage finished", self.id);
    }

    fn process_frame(&mut self, frame: MediaFrame) {
        let track_id = frame.track_id;
        match self.encoders.get_mut(&track_id) {
            Some(encoder) => {
                if let Err(e) = encoder.send(frame) {
                    warn!("Pipeline {}: encode error on track {}: {}", self.id, track_id, e);
                    return;
                }
            }
            None => {
                trace!(
                    "Pipeline {}: no encoder for track {}, dropping frame",
                    self.id,
                    track_id
                );
                return;
            }
        }

        loop {
            let result = match self.encoders.get_mut(&track_id) {
                Some(encoder) => encoder.receive(),
                None => break,
            };
            match result {
                Ok(Some(mut packet)) => {
                    packet.track_id = track_id;
                    self.publish(packet);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Pipeline {}: encode error on track {}: {}", self.id, track_id, e);
                    break;
                }
            }
        }
    }

    fn publish(&self, packet: MediaPacket) {
        self.stats.packets_encoded.fetch_add(1, Ordering::Relaxed);
        let out = self.output.lock().unwrap();
        if let Err(e) = self.router.send_frame(&out, packet) {
            warn!("Pipeline {}: send_frame failed: {}", self.id, e);
        }
    }
}
