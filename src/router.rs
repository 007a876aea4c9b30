use anyhow::Result;

use crate::media::{MediaPacket, StreamDescriptor};

/// Downstream collaborator that takes transcoded output and routes it to
/// publishers. Implementations must be callable from the pipeline workers.
pub trait MediaRouter: Send + Sync {
    /// Announce a new output stream. Called once, when the decode worker
    /// enters its loop.
    fn create_stream(&self, stream: &StreamDescriptor) -> Result<()>;

    /// Withdraw a previously announced stream. Called once, when the
    /// decode worker exits.
    fn delete_stream(&self, stream: &StreamDescriptor) -> Result<()>;

    /// Deliver one encoded packet for the given output stream.
    fn send_frame(&self, stream: &StreamDescriptor, packet: MediaPacket) -> Result<()>;
}
