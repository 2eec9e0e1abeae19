//! Single-consumer event loop. Every callback runs to completion before the
//! next event is taken off the queue.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use pipeline_shared::{OutputPin, PeerChannel, PeerMessage, TimerInterface, Uart};

use crate::bridge::SerialBridge;
use crate::indicator::Wakeup;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The UART has buffered input.
    SerialReadable,
    /// A message arrived from the peer.
    Peer(PeerMessage),
    /// An indicator pulse timer expired.
    Wakeup(Wakeup),
    Shutdown,
}

pub type EventSender = UnboundedSender<DeviceEvent>;
pub type EventReceiver = UnboundedReceiver<DeviceEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Timer backend that posts expired wakeups back onto the event queue.
#[derive(Clone)]
pub struct TokioTimers {
    events: EventSender,
}

impl TokioTimers {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl TimerInterface for TokioTimers {
    type Token = Wakeup;

    fn wakeup(&mut self, after: Duration, token: Wakeup) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // queue gone means the loop has shut down
            let _ = events.send(DeviceEvent::Wakeup(token));
        });
    }
}

pub struct EventLoop<U, C, P> {
    bridge: SerialBridge<U, C, P>,
    events: EventReceiver,
    timers: TokioTimers,
}

impl<U, C, P> EventLoop<U, C, P>
where
    U: Uart,
    C: PeerChannel,
    P: OutputPin,
{
    /// `sender` must feed `events`; the loop uses it to deliver timer wakeups.
    pub fn new(bridge: SerialBridge<U, C, P>, sender: EventSender, events: EventReceiver) -> Self {
        Self {
            bridge,
            events,
            timers: TokioTimers::new(sender),
        }
    }

    pub fn bridge(&self) -> &SerialBridge<U, C, P> {
        &self.bridge
    }

    /// Dispatches events until `Shutdown` or until every producer is gone,
    /// then hands the bridge back.
    pub async fn run(mut self) -> SerialBridge<U, C, P> {
        while let Some(event) = self.events.recv().await {
            if !self.dispatch(event) {
                break;
            }
        }
        tracing::info!("Event loop stopped");
        self.bridge
    }

    fn dispatch(&mut self, event: DeviceEvent) -> bool {
        match event {
            DeviceEvent::SerialReadable => {
                let n = self.bridge.on_serial_data(&mut self.timers);
                tracing::trace!(bytes = n, "serial drain");
            }
            DeviceEvent::Peer(message) => {
                tracing::debug!(label = %message.label, data = %message.data, "peer message");
                self.bridge.on_peer_message(message, &mut self.timers);
            }
            DeviceEvent::Wakeup(wakeup) => self.bridge.on_wakeup(wakeup, &mut self.timers),
            DeviceEvent::Shutdown => return false,
        }
        true
    }
}
