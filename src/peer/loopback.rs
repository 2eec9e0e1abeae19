use pipeline_shared::config::AgentConfig;
use pipeline_shared::{PeerChannel, PeerError, PeerMessage};

use crate::event_loop::{DeviceEvent, EventSender};

/// Stands in for a far end that writes every byte straight back: outbound
/// messages return to this device under the inbound label.
pub struct LoopbackPeer {
    events: EventSender,
    outbound_label: String,
    inbound_label: String,
}

impl LoopbackPeer {
    pub fn new(config: &AgentConfig, events: EventSender) -> Self {
        Self {
            events,
            outbound_label: config.outbound_label.clone(),
            inbound_label: config.inbound_label.clone(),
        }
    }
}

impl PeerChannel for LoopbackPeer {
    fn send(&mut self, message: PeerMessage) -> Result<(), PeerError> {
        if message.label != self.outbound_label {
            tracing::debug!(label = %message.label, "loopback dropped message");
            return Ok(());
        }
        let echoed = PeerMessage {
            label: self.inbound_label.clone(),
            data: message.data,
        };
        self.events
            .send(DeviceEvent::Peer(echoed))
            .map_err(|_| PeerError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::event_channel;

    #[test]
    fn test_echoes_under_inbound_label() {
        let (events, mut rx) = event_channel();
        let mut peer = LoopbackPeer::new(&AgentConfig::default(), events);
        peer.send(PeerMessage::byte("impSerialIn", 65)).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            DeviceEvent::Peer(PeerMessage::byte("dataToSerial", 65))
        );
    }

    #[test]
    fn test_other_labels_are_dropped() {
        let (events, mut rx) = event_channel();
        let mut peer = LoopbackPeer::new(&AgentConfig::default(), events);
        peer.send(PeerMessage::byte("status", 1)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_queue_reports_error() {
        let (events, rx) = event_channel();
        let mut peer = LoopbackPeer::new(&AgentConfig::default(), events);
        drop(rx);
        assert!(matches!(peer.send(PeerMessage::byte("impSerialIn", 1)), Err(PeerError::Closed)));
    }
}
