// src/hardware/serial.rs - UART backed by a host serial port
use std::sync::Arc;

use serial2_tokio::{CharSize, SerialPort, Settings, StopBits};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use pipeline_shared::config::{FlowControl, Parity, UartConfig};
use pipeline_shared::{Uart, UartError};

use crate::event_loop::{DeviceEvent, EventSender};

const READ_BUFFER_SIZE: usize = 256;

/// Bridge-facing UART. Input is buffered by the reader side; output is
/// queued for the writer side.
pub struct SerialUart {
    input: UnboundedReceiver<u8>,
    output: UnboundedSender<u8>,
}

impl Uart for SerialUart {
    fn read(&mut self) -> Option<u8> {
        self.input.try_recv().ok()
    }

    fn write(&mut self, byte: u8) -> Result<(), UartError> {
        self.output.send(byte).map_err(|_| UartError::Closed)
    }
}

/// Producer side of the UART input buffer.
#[derive(Clone)]
pub struct SerialFeed {
    bytes: UnboundedSender<u8>,
    events: EventSender,
}

impl SerialFeed {
    /// Buffers `data` and raises one readable event. Returns false once the
    /// UART or the event loop is gone.
    pub fn push(&self, data: &[u8]) -> bool {
        for &byte in data {
            if self.bytes.send(byte).is_err() {
                return false;
            }
        }
        self.events.send(DeviceEvent::SerialReadable).is_ok()
    }
}

/// Creates an unattached UART: the feed supplies its input, the receiver
/// yields everything written to it.
pub fn uart_channel(events: EventSender) -> (SerialUart, SerialFeed, UnboundedReceiver<u8>) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let uart = SerialUart {
        input: in_rx,
        output: out_tx,
    };
    let feed = SerialFeed {
        bytes: in_tx,
        events,
    };
    (uart, feed, out_rx)
}

fn port_settings(config: &UartConfig, mut settings: Settings) -> std::io::Result<Settings> {
    settings.set_raw();
    settings.set_baud_rate(config.baud)?;
    settings.set_char_size(match config.data_bits {
        5 => CharSize::Bits5,
        6 => CharSize::Bits6,
        7 => CharSize::Bits7,
        _ => CharSize::Bits8,
    });
    settings.set_stop_bits(if config.stop_bits == 2 { StopBits::Two } else { StopBits::One });
    settings.set_parity(match config.parity {
        Parity::None => serial2_tokio::Parity::None,
        Parity::Odd => serial2_tokio::Parity::Odd,
        Parity::Even => serial2_tokio::Parity::Even,
    });
    settings.set_flow_control(match config.flow_control {
        FlowControl::None => serial2_tokio::FlowControl::None,
        FlowControl::RtsCts => serial2_tokio::FlowControl::RtsCts,
        FlowControl::XonXoff => serial2_tokio::FlowControl::XonXoff,
    });
    Ok(settings)
}

/// Opens and configures the serial port, then spawns its reader and writer
/// tasks. Readable events are posted to `events`.
pub fn open_serial(config: &UartConfig, events: EventSender) -> Result<SerialUart, UartError> {
    let port = SerialPort::open(&config.port, |settings: Settings| port_settings(config, settings))?;
    tracing::info!(
        "Opened {} at {} baud ({} data bits, {:?} parity, {} stop bits)",
        config.port,
        config.baud,
        config.data_bits,
        config.parity,
        config.stop_bits
    );
    let port = Arc::new(port);
    let (uart, feed, output) = uart_channel(events);

    tokio::spawn(read_task(port.clone(), feed));
    tokio::spawn(write_task(port, output));

    Ok(uart)
}

async fn read_task(port: Arc<SerialPort>, feed: SerialFeed) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match port.read(&mut buf).await {
            Ok(0) => {
                tracing::info!("Serial port closed by remote");
                break;
            }
            Ok(n) => {
                tracing::trace!("Read {} bytes from serial", n);
                if !feed.push(&buf[..n]) {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Serial read error: {}", e);
                break;
            }
        }
    }
    tracing::info!("Serial reader task terminated");
}

async fn write_task(port: Arc<SerialPort>, mut output: UnboundedReceiver<u8>) {
    let mut pending = Vec::with_capacity(READ_BUFFER_SIZE);
    while let Some(byte) = output.recv().await {
        pending.push(byte);
        while let Ok(byte) = output.try_recv() {
            pending.push(byte);
        }
        if let Err(e) = write_all(&port, &pending).await {
            tracing::error!("Serial write error: {}", e);
            break;
        }
        pending.clear();
    }
    tracing::info!("Serial writer task terminated");
}

async fn write_all(port: &SerialPort, mut data: &[u8]) -> std::io::Result<()> {
    while !data.is_empty() {
        let n = port.write(data).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::WriteZero.into());
        }
        data = &data[n..];
    }
    Ok(())
}
