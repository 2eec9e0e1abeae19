//! Startup wiring for the device.

use thiserror::Error;

use pipeline_shared::config::{Config, IndicatorConfig};
use pipeline_shared::{PeerError, UartError};

use crate::bridge::SerialBridge;
use crate::event_loop::{event_channel, DeviceEvent, EventLoop, EventReceiver, EventSender};
use crate::hardware::{open_serial, SerialUart, VirtualPin};
use crate::indicator::{ActivityIndicator, IndicatorId};
use crate::peer::{AgentLink, LoopbackPeer, Peer};

pub const STARTUP_MESSAGE: &str = "Serial Pipeline Open!";

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("UART error: {0}")]
    Uart(#[from] UartError),
    #[error("peer error: {0}")]
    Peer(#[from] PeerError),
}

pub type DeviceBridge = SerialBridge<SerialUart, Peer, VirtualPin>;

type Indicators = (ActivityIndicator<VirtualPin>, ActivityIndicator<VirtualPin>);

pub struct Device {
    events: EventSender,
    event_loop: EventLoop<SerialUart, Peer, VirtualPin>,
}

impl Device {
    /// Brings the device up: announce, LEDs off, peer link, then the UART.
    /// Serial input is dispatched as soon as this returns and `run` is polled.
    pub async fn start(config: &Config, loopback: bool) -> Result<Self, DeviceError> {
        let (rx_led, tx_led) = announce(&config.indicators);

        let (events, queue) = event_channel();
        let peer = if loopback {
            tracing::info!("Using loopback peer");
            Peer::Loopback(LoopbackPeer::new(&config.agent, events.clone()))
        } else {
            Peer::Agent(AgentLink::connect(&config.agent, events.clone()).await?)
        };
        let uart = open_serial(&config.uart, events.clone())?;

        let bridge = SerialBridge::new(uart, peer, rx_led, tx_led, &config.agent);
        Ok(Self::assemble(bridge, events, queue))
    }

    /// Same bring-up around a UART and peer that already exist. Both must
    /// post to `events`; anything they queue waits for `run`.
    pub fn with_parts(
        config: &Config,
        uart: SerialUart,
        peer: Peer,
        events: EventSender,
        queue: EventReceiver,
    ) -> Self {
        let (rx_led, tx_led) = announce(&config.indicators);
        let bridge = SerialBridge::new(uart, peer, rx_led, tx_led, &config.agent);
        Self::assemble(bridge, events, queue)
    }

    fn assemble(bridge: DeviceBridge, events: EventSender, queue: EventReceiver) -> Self {
        Self {
            event_loop: EventLoop::new(bridge, events.clone(), queue),
            events,
        }
    }

    /// Sender that can stop the device with `DeviceEvent::Shutdown`.
    pub fn shutdown_handle(&self) -> EventSender {
        self.events.clone()
    }

    pub fn bridge(&self) -> &DeviceBridge {
        self.event_loop.bridge()
    }

    pub async fn run(self) -> DeviceBridge {
        let Device { events, event_loop } = self;
        drop(events);
        event_loop.run().await
    }
}

fn announce(leds: &IndicatorConfig) -> Indicators {
    tracing::info!("{}", STARTUP_MESSAGE);
    let rx_led = ActivityIndicator::from_config(IndicatorId::Rx, VirtualPin::new(leds.rx_pin), leds);
    let tx_led = ActivityIndicator::from_config(IndicatorId::Tx, VirtualPin::new(leds.tx_pin), leds);
    tracing::debug!(rx_pin = leds.rx_pin, tx_pin = leds.tx_pin, "indicators off");
    (rx_led, tx_led)
}

/// Posts `Shutdown` when Ctrl-C is received.
pub fn shutdown_on_ctrl_c(events: EventSender) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupt received, shutting down"),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = events.send(DeviceEvent::Shutdown);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::uart_channel;
    use crate::indicator::IndicatorState;
    use pipeline_shared::{Level, OutputPin};

    fn loopback_device(config: &Config) -> (Device, crate::hardware::SerialFeed) {
        let (events, queue) = event_channel();
        let (uart, feed, _written) = uart_channel(events.clone());
        let peer = Peer::Loopback(LoopbackPeer::new(&config.agent, events.clone()));
        (Device::with_parts(config, uart, peer, events, queue), feed)
    }

    #[tokio::test]
    async fn test_startup_leaves_both_leds_off() {
        let config = Config::default();
        let (device, _feed) = loopback_device(&config);

        let bridge = device.bridge();
        for led in [bridge.rx_indicator(), bridge.tx_indicator()] {
            assert_eq!(led.state(), IndicatorState::Off);
            assert_eq!(led.pin().level(), Level::High);
            assert_eq!(led.pin().transitions(), 1);
        }
        assert_eq!(bridge.rx_indicator().pin().number(), 8);
        assert_eq!(bridge.tx_indicator().pin().number(), 9);
    }

    #[tokio::test]
    async fn test_serial_input_waits_for_run() {
        let config = Config::default();
        let (device, feed) = loopback_device(&config);

        assert!(feed.push(&[0x41]));
        assert_eq!(device.bridge().stats().bytes_forwarded, 0);
        assert_eq!(device.bridge().rx_indicator().trigger_count(), 0);
        assert_eq!(device.bridge().rx_indicator().pin().level(), Level::High);

        device.shutdown_handle().send(DeviceEvent::Shutdown).unwrap();
        let bridge = device.run().await;

        assert_eq!(bridge.stats().bytes_forwarded, 1);
        assert_eq!(bridge.rx_indicator().trigger_count(), 1);
    }
}
