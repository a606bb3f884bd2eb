//! Newline-delimited JSON framing
//!
//! Every `ProtocolMessage` is written as one JSON object followed by `\n`.

use super::message::ProtocolMessage;
use crate::error::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::mpsc;

/// Serialize a message into one line
pub fn encode(message: &ProtocolMessage) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Parse one line into a message
pub fn decode(line: &str) -> Result<ProtocolMessage> {
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Reads framed messages from an async byte stream
pub struct MessageReader<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Next well-formed message, or `None` at end of stream
    ///
    /// Malformed lines are logged and skipped.
    pub async fn next(&mut self) -> Result<Option<ProtocolMessage>> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match decode(&line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => log::warn!("Dropping malformed message: {}", e),
            }
        }
        Ok(None)
    }
}

/// Spawn a task that writes every queued message to `writer`
///
/// The task shuts the writer down once all senders are dropped, which the
/// peer sees as end of stream. Must be called from within a Tokio runtime.
pub fn spawn_writer<W>(mut writer: W) -> mpsc::UnboundedSender<ProtocolMessage>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ProtocolMessage>();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let line = match encode(&message) {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Cannot encode message for {}: {}", message.channel, e);
                    continue;
                }
            };

            let written = async {
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await
            }
            .await;

            if let Err(e) = written {
                log::warn!("Transport write failed: {}", e);
                // Dropping rx makes further sends fail fast
                return;
            }
        }

        if let Err(e) = writer.shutdown().await {
            log::debug!("Transport shutdown: {}", e);
        }
    });

    tx
}
