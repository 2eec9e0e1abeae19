use thiserror::Error;

#[derive(Debug, Error)]
pub enum UartError {
    #[error("UART output closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-oriented duplex UART as seen by the bridge.
///
/// `read` never blocks: `None` means nothing is buffered right now, and a
/// failed or closed input reports the same thing.
pub trait Uart {
    fn read(&mut self) -> Option<u8>;
    fn write(&mut self, byte: u8) -> Result<(), UartError>;
}
