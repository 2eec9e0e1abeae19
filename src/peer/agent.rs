//! Link to the cloud agent: one JSON message per line in each direction.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use pipeline_shared::config::AgentConfig;
use pipeline_shared::{PeerChannel, PeerError, PeerMessage};

use crate::event_loop::{DeviceEvent, EventSender};

pub struct AgentLink {
    outgoing: UnboundedSender<PeerMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl AgentLink {
    pub async fn connect(config: &AgentConfig, events: EventSender) -> Result<Self, PeerError> {
        let stream = TcpStream::connect(&config.address).await?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to agent at {}", config.address);
        let (reader, writer) = stream.into_split();
        Ok(Self::from_io(reader, writer, events))
    }

    /// Runs the link over an already-established byte stream.
    pub fn from_io<R, W>(reader: R, writer: W, events: EventSender) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, queued) = mpsc::unbounded_channel();
        Self {
            outgoing,
            reader: tokio::spawn(read_task(reader, events)),
            writer: tokio::spawn(write_task(writer, queued)),
        }
    }

    /// Stops accepting messages, waits for queued ones to be written, then
    /// stops the reader.
    pub async fn close(self) {
        drop(self.outgoing);
        if let Err(e) = self.writer.await {
            tracing::error!("Agent writer task failed: {}", e);
        }
        self.reader.abort();
    }
}

impl PeerChannel for AgentLink {
    fn send(&mut self, message: PeerMessage) -> Result<(), PeerError> {
        self.outgoing.send(message).map_err(|_| PeerError::Closed)
    }
}

async fn read_task<R>(reader: R, events: EventSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                tracing::info!("Agent closed the connection");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim_ascii();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_slice::<PeerMessage>(trimmed) {
                    Ok(message) => {
                        if events.send(DeviceEvent::Peer(message)).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(
                        "Skipping malformed agent message {:?}: {}",
                        String::from_utf8_lossy(trimmed),
                        e
                    ),
                }
            }
            Err(e) => {
                tracing::error!("Agent read error: {}", e);
                break;
            }
        }
    }
    tracing::info!("Agent reader task terminated");
}

async fn write_task<W>(mut writer: W, mut queued: UnboundedReceiver<PeerMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = queued.recv().await {
        if let Err(e) = write_message(&mut writer, &message).await {
            tracing::error!("Agent write error: {}", e);
            break;
        }
    }
    tracing::info!("Agent writer task terminated");
}

async fn write_message<W>(writer: &mut W, message: &PeerMessage) -> Result<(), PeerError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
