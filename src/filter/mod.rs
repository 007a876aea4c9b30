use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, trace, warn};
use uuid::Uuid;

use crate::codec::Filter;
use crate::media::MediaFrame;
use crate::queue::MediaQueue;

/// Middle stage worker: conforms raw frames to the target format through
/// the per-track filter (video rescaler or audio resampler).
///
/// The filter map is shared with the decode stage, which installs and
/// replaces entries on format change. A frame arriving before the first
/// format change of its track has no filter yet and is dropped; that is
/// the only legitimate drop in the pipeline.
pub struct FilterStage {
    pub(crate) id: Uuid,
    pub(crate) decoded: Arc<MediaQueue<MediaFrame>>,
    pub(crate) filtered: Arc<MediaQueue<MediaFrame>>,
    pub(crate) filters: Arc<Mutex<HashMap<u32, Box<dyn Filter>>>>,
}

impl FilterStage {
    pub(crate) fn run(self) {
        while let Some(frame) = self.decoded.pop() {
            self.process_frame(frame);
        }
        info!("Pipeline {}: filter stage finished", self.id);
    }

    fn process_frame(&self, frame: MediaFrame) {
        let track_id = frame.track_id;
        let mut filters = self.filters.lock().unwrap();
        let Some(filter) = filters.get_mut(&track_id) else {
            trace!(
                "Pipeline {}: no filter yet for track {}, dropping frame",
                self.id,
                track_id
            );
            return;
        };

        if let Err(e) = filter.send(frame) {
            warn!("Pipeline {}: filter error on track {}: {}", self.id, track_id, e);
            return;
        }
        loop {
            match filter.receive() {
                Ok(Some(mut out)) => {
                    out.track_id = track_id;
                    self.filtered.push(out);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Pipeline {}: filter error on track {}: {}", self.id, track_id, e);
                    break;
                }
            }
        }
    }
}
