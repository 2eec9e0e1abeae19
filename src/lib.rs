// serial_pipeline: device half of a serial-over-network relay

pub mod bridge;
pub mod device;
pub mod event_loop;
pub mod hardware;
pub mod indicator;
pub mod peer;

pub use bridge::{coerce_byte, BridgeError, BridgeStats, SerialBridge};
pub use device::{Device, DeviceError};
pub use event_loop::{event_channel, DeviceEvent, EventLoop, EventReceiver, EventSender, TokioTimers};
pub use indicator::{ActivityIndicator, IndicatorId, IndicatorState, Wakeup};
