//! Peer channel implementations.

pub mod agent;
pub mod loopback;

pub use agent::AgentLink;
pub use loopback::LoopbackPeer;

use pipeline_shared::{PeerChannel, PeerError, PeerMessage};

/// Peer selected at startup.
pub enum Peer {
    Agent(AgentLink),
    Loopback(LoopbackPeer),
}

impl PeerChannel for Peer {
    fn send(&mut self, message: PeerMessage) -> Result<(), PeerError> {
        match self {
            Peer::Agent(link) => link.send(message),
            Peer::Loopback(loopback) => loopback.send(message),
        }
    }
}

impl Peer {
    /// Flushes queued outbound messages and stops the link's tasks.
    pub async fn close(self) {
        if let Peer::Agent(link) = self {
            link.close().await;
        }
    }
}
