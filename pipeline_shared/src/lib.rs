// pipeline_shared: seam traits and types shared by the device runtime and its tests

pub mod config;
pub mod hardware_traits;
pub mod peer_interface;
pub mod serial_interface;
pub mod timer_interface;

pub use hardware_traits::{Level, OutputPin};
pub use peer_interface::{PeerChannel, PeerError, PeerMessage, INBOUND_LABEL, OUTBOUND_LABEL};
pub use serial_interface::{Uart, UartError};
pub use timer_interface::TimerInterface;
