//! Device configuration shared by the runtime, the CLI and tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::peer_interface::{INBOUND_LABEL, OUTBOUND_LABEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub uart: UartConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    RtsCts,
    XonXoff,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UartConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: Parity,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_flow_control")]
    pub flow_control: FlowControl,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            flow_control: default_flow_control(),
        }
    }
}

/// How an indicator reacts to a trigger that arrives while it is lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseMode {
    /// Every trigger flips the LED; the pending wakeup flips it again.
    #[default]
    Toggle,
    /// A trigger while lit re-arms the pulse.
    Retrigger,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_rx_pin")]
    pub rx_pin: u8,
    #[serde(default = "default_tx_pin")]
    pub tx_pin: u8,
    #[serde(default = "default_active_low")]
    pub active_low: bool,
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,
    #[serde(default)]
    pub pulse_mode: PulseMode,
}

impl IndicatorConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rx_pin: default_rx_pin(),
            tx_pin: default_tx_pin(),
            active_low: default_active_low(),
            pulse_ms: default_pulse_ms(),
            pulse_mode: PulseMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_address")]
    pub address: String,
    #[serde(default = "default_outbound_label")]
    pub outbound_label: String,
    #[serde(default = "default_inbound_label")]
    pub inbound_label: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: default_agent_address(),
            outbound_label: default_outbound_label(),
            inbound_label: default_inbound_label(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let uart = &self.uart;
        if uart.port.is_empty() {
            return Err(ConfigError::Invalid("uart.port must not be empty".to_string()));
        }
        if uart.baud == 0 {
            return Err(ConfigError::Invalid("uart.baud must be > 0".to_string()));
        }
        if !(5..=8).contains(&uart.data_bits) {
            return Err(ConfigError::Invalid(format!(
                "uart.data_bits must be between 5 and 8, got {}",
                uart.data_bits
            )));
        }
        if uart.stop_bits != 1 && uart.stop_bits != 2 {
            return Err(ConfigError::Invalid(format!(
                "uart.stop_bits must be 1 or 2, got {}",
                uart.stop_bits
            )));
        }

        let leds = &self.indicators;
        if leds.pulse_ms == 0 {
            return Err(ConfigError::Invalid("indicators.pulse_ms must be > 0".to_string()));
        }
        if leds.rx_pin == leds.tx_pin {
            return Err(ConfigError::Invalid(format!(
                "indicators.rx_pin and tx_pin are both {}",
                leds.rx_pin
            )));
        }

        let agent = &self.agent;
        if agent.outbound_label.is_empty() || agent.inbound_label.is_empty() {
            return Err(ConfigError::Invalid("agent labels must not be empty".to_string()));
        }
        if agent.outbound_label == agent.inbound_label {
            return Err(ConfigError::Invalid(format!(
                "agent.outbound_label and inbound_label are both '{}'",
                agent.outbound_label
            )));
        }
        Ok(())
    }
}

fn default_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud() -> u32 { 19200 }
fn default_data_bits() -> u8 { 8 }
fn default_parity() -> Parity { Parity::None }
fn default_stop_bits() -> u8 { 1 }
fn default_flow_control() -> FlowControl { FlowControl::None }
fn default_rx_pin() -> u8 { 8 }
fn default_tx_pin() -> u8 { 9 }
fn default_active_low() -> bool { true }
fn default_pulse_ms() -> u64 { 50 }
fn default_agent_address() -> String { "127.0.0.1:7070".to_string() }
fn default_outbound_label() -> String { OUTBOUND_LABEL.to_string() }
fn default_inbound_label() -> String { INBOUND_LABEL.to_string() }

pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents).inspect_err(|e| {
            tracing::error!("Rejected config '{}': {}", path, e);
        }),
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.uart.baud, 19200);
        assert_eq!(config.uart.data_bits, 8);
        assert_eq!(config.uart.parity, Parity::None);
        assert_eq!(config.uart.stop_bits, 1);
        assert_eq!(config.uart.flow_control, FlowControl::None);
        assert_eq!(config.indicators.rx_pin, 8);
        assert_eq!(config.indicators.tx_pin, 9);
        assert!(config.indicators.active_low);
        assert_eq!(config.indicators.pulse(), Duration::from_millis(50));
        assert_eq!(config.indicators.pulse_mode, PulseMode::Toggle);
        assert_eq!(config.agent.outbound_label, "impSerialIn");
        assert_eq!(config.agent.inbound_label, "dataToSerial");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("pipeline.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "[uart]\nport = '/dev/ttyACM0'\nparity = 'even'\n\n[indicators]\npulse_mode = 'retrigger'"
        )
        .unwrap();
        file.flush().unwrap();
        let config = load_config(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.uart.port, "/dev/ttyACM0");
        assert_eq!(config.uart.parity, Parity::Even);
        assert_eq!(config.indicators.pulse_mode, PulseMode::Retrigger);
        // Defaults for missing fields
        assert_eq!(config.uart.baud, 19200);
        assert_eq!(config.agent.address, "127.0.0.1:7070");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_pipeline.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_parse_config_bad_toml() {
        let result = parse_config("[uart\nbaud = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            "[uart]\nbaud = 0",
            "[uart]\ndata_bits = 9",
            "[uart]\nstop_bits = 3",
            "[indicators]\npulse_ms = 0",
            "[indicators]\nrx_pin = 4\ntx_pin = 4",
            "[agent]\ninbound_label = ''",
            "[agent]\noutbound_label = 'x'\ninbound_label = 'x'",
        ];
        for case in cases {
            let result = parse_config(case);
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "accepted: {case}");
        }
    }

    #[test]
    fn test_flow_control_names() {
        let config = parse_config("[uart]\nflow_control = 'rts_cts'").unwrap();
        assert_eq!(config.uart.flow_control, FlowControl::RtsCts);
    }
}
