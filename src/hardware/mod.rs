// src/hardware/mod.rs - Host-side hardware adapters
pub mod gpio;
pub mod serial;

pub use gpio::VirtualPin;
pub use serial::{open_serial, uart_channel, SerialFeed, SerialUart};
