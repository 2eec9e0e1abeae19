//! Serial bridge: UART bytes out to the peer, peer bytes out to the UART.

use serde_json::Value;
use thiserror::Error;

use pipeline_shared::config::{AgentConfig, IndicatorConfig};
use pipeline_shared::{OutputPin, PeerChannel, PeerMessage, TimerInterface, Uart};

use crate::indicator::{ActivityIndicator, IndicatorId, Wakeup};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("payload is not a byte value: {0}")]
    MalformedPayload(Value),
}

/// Relay counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub bytes_forwarded: u64,
    pub bytes_written: u64,
    pub ignored_messages: u64,
    pub malformed_payloads: u64,
    pub send_failures: u64,
    pub write_failures: u64,
}

pub struct SerialBridge<U, C, P> {
    uart: U,
    peer: C,
    rx_led: ActivityIndicator<P>,
    tx_led: ActivityIndicator<P>,
    outbound_label: String,
    inbound_label: String,
    stats: BridgeStats,
}

impl<U, C, P> SerialBridge<U, C, P>
where
    U: Uart,
    C: PeerChannel,
    P: OutputPin,
{
    pub fn new(
        uart: U,
        peer: C,
        rx_led: ActivityIndicator<P>,
        tx_led: ActivityIndicator<P>,
        agent: &AgentConfig,
    ) -> Self {
        Self {
            uart,
            peer,
            rx_led,
            tx_led,
            outbound_label: agent.outbound_label.clone(),
            inbound_label: agent.inbound_label.clone(),
            stats: BridgeStats::default(),
        }
    }

    /// Builds both indicators from their pins and config, driving them off.
    pub fn with_pins(
        uart: U,
        peer: C,
        rx_pin: P,
        tx_pin: P,
        indicators: &IndicatorConfig,
        agent: &AgentConfig,
    ) -> Self {
        let rx_led = ActivityIndicator::from_config(IndicatorId::Rx, rx_pin, indicators);
        let tx_led = ActivityIndicator::from_config(IndicatorId::Tx, tx_pin, indicators);
        Self::new(uart, peer, rx_led, tx_led, agent)
    }

    /// Drains the UART, forwarding one peer message per byte. Returns the
    /// number of bytes drained, including any whose send failed; see
    /// `BridgeStats::bytes_forwarded` for the delivered count.
    pub fn on_serial_data<T>(&mut self, timers: &mut T) -> usize
    where
        T: TimerInterface<Token = Wakeup>,
    {
        let mut count = 0;
        while let Some(byte) = self.uart.read() {
            count += 1;
            tracing::trace!(byte, "uart -> peer");
            match self.peer.send(PeerMessage::byte(self.outbound_label.as_str(), byte)) {
                Ok(()) => self.stats.bytes_forwarded += 1,
                Err(e) => {
                    self.stats.send_failures += 1;
                    tracing::warn!("Dropped byte {:#04x} for peer: {}", byte, e);
                }
            }
            self.rx_led.trigger(timers);
        }
        count
    }

    /// Writes one peer-supplied value to the UART.
    pub fn on_peer_data<T>(&mut self, payload: &Value, timers: &mut T) -> Result<u8, BridgeError>
    where
        T: TimerInterface<Token = Wakeup>,
    {
        let byte = match coerce_byte(payload) {
            Ok(byte) => byte,
            Err(e) => {
                self.stats.malformed_payloads += 1;
                return Err(e);
            }
        };
        tracing::trace!(byte, "peer -> uart");
        match self.uart.write(byte) {
            Ok(()) => self.stats.bytes_written += 1,
            Err(e) => {
                self.stats.write_failures += 1;
                tracing::warn!("UART write of {:#04x} failed: {}", byte, e);
            }
        }
        self.tx_led.trigger(timers);
        Ok(byte)
    }

    pub fn on_peer_message<T>(&mut self, message: PeerMessage, timers: &mut T)
    where
        T: TimerInterface<Token = Wakeup>,
    {
        if message.label != self.inbound_label {
            self.stats.ignored_messages += 1;
            tracing::debug!(label = %message.label, "ignoring peer message with unknown label");
            return;
        }
        if let Err(e) = self.on_peer_data(&message.data, timers) {
            tracing::warn!("Rejected peer message: {}", e);
        }
    }

    pub fn on_wakeup<T>(&mut self, wakeup: Wakeup, timers: &mut T)
    where
        T: TimerInterface<Token = Wakeup>,
    {
        match wakeup.indicator {
            IndicatorId::Rx => self.rx_led.on_wakeup(wakeup.generation, timers),
            IndicatorId::Tx => self.tx_led.on_wakeup(wakeup.generation, timers),
        }
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn rx_indicator(&self) -> &ActivityIndicator<P> {
        &self.rx_led
    }

    pub fn tx_indicator(&self) -> &ActivityIndicator<P> {
        &self.tx_led
    }

    pub fn uart(&self) -> &U {
        &self.uart
    }

    pub fn peer(&self) -> &C {
        &self.peer
    }

    pub fn into_parts(self) -> (U, C, BridgeStats) {
        (self.uart, self.peer, self.stats)
    }
}

/// Coerces a peer payload to the byte written to the UART.
///
/// Integers pass through, floats truncate toward zero, numeric strings are
/// parsed and booleans become 1 or 0. Only the low eight bits are kept.
pub fn coerce_byte(payload: &Value) -> Result<u8, BridgeError> {
    let value = match payload {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u as i64))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    value
        .map(|v| (v & 0xff) as u8)
        .ok_or_else(|| BridgeError::MalformedPayload(payload.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_integers() {
        assert_eq!(coerce_byte(&json!(72)).unwrap(), 72);
        assert_eq!(coerce_byte(&json!(0)).unwrap(), 0);
        assert_eq!(coerce_byte(&json!(255)).unwrap(), 255);
        assert_eq!(coerce_byte(&json!(256)).unwrap(), 0);
        assert_eq!(coerce_byte(&json!(-1)).unwrap(), 0xff);
    }

    #[test]
    fn test_coerce_floats_truncate() {
        assert_eq!(coerce_byte(&json!(65.9)).unwrap(), 65);
        assert_eq!(coerce_byte(&json!(-0.5)).unwrap(), 0);
    }

    #[test]
    fn test_coerce_strings_and_bools() {
        assert_eq!(coerce_byte(&json!("72")).unwrap(), 72);
        assert_eq!(coerce_byte(&json!(" 10 ")).unwrap(), 10);
        assert_eq!(coerce_byte(&json!("3.7")).unwrap(), 3);
        assert_eq!(coerce_byte(&json!(true)).unwrap(), 1);
        assert_eq!(coerce_byte(&json!(false)).unwrap(), 0);
    }

    #[test]
    fn test_coerce_rejects_non_numeric() {
        for payload in [json!(null), json!("abc"), json!([1]), json!({"b": 1}), json!("")] {
            assert!(matches!(coerce_byte(&payload), Err(BridgeError::MalformedPayload(_))));
        }
    }
}
