//! Line-oriented transport abstraction and its serial implementation

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::trace;

/// Default baud rate for BrewPi-style controllers.
pub const DEFAULT_BAUD: u32 = 57600;

/// How long a single [`Transport::read_line`] poll waits before reporting
/// that nothing is available.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A line-oriented link to the controller.
///
/// `read_line` must return promptly: either the next complete received line
/// or `None` when nothing is currently available, so callers can drain the
/// link without blocking on a quiet controller.
#[async_trait]
pub trait Transport {
    /// Send one line, fire and forget.
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Fetch the next complete received line, or `None` if none is ready.
    async fn read_line(&mut self) -> Result<Option<String>, TransportError>;
}

/// Serial transport over a tokio-serial port (8N1, no flow control).
pub struct SerialTransport {
    port: SerialStream,
    /// Bytes received but not yet terminated by a newline.
    pending: Vec<u8>,
    poll_timeout: Duration,
}

impl SerialTransport {
    /// Open `path` at `baud`.
    pub fn open(path: &str, baud: u32) -> Result<Self, TransportError> {
        let port = tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .open_native_async()?;
        Ok(Self {
            port,
            pending: Vec::new(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        })
    }

    /// Override how long `read_line` waits before reporting no data.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}

/// Pop the first complete line out of `pending`, if any. Line endings are
/// stripped; a trailing partial line stays buffered.
fn take_pending_line(pending: &mut Vec<u8>) -> Option<String> {
    let pos = pending.iter().position(|&b| b == b'\n')?;
    let raw: Vec<u8> = pending.drain(..=pos).collect();
    let text = String::from_utf8_lossy(&raw);
    Some(text.trim_end_matches(['\r', '\n']).to_string())
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        trace!(line = %line, "Sending line");
        self.port.write_all(line.as_bytes()).await?;
        self.port.write_all(b"\n").await?;
        self.port.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let deadline = tokio::time::Instant::now() + self.poll_timeout;
        let mut buf = [0u8; 256];

        loop {
            if let Some(line) = take_pending_line(&mut self.pending) {
                trace!(line = %line, "Received line");
                return Ok(Some(line));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            match timeout(deadline - now, self.port.read(&mut buf)).await {
                Ok(Ok(0)) => return Ok(None), // EOF
                Ok(Ok(n)) => self.pending.extend_from_slice(&buf[..n]),
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Ok(None), // nothing arrived within the poll window
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_pending_line_splits_on_newline() {
        let mut pending = b"N:0.2.4\r\nT:20.5\npartial".to_vec();

        assert_eq!(take_pending_line(&mut pending).as_deref(), Some("N:0.2.4"));
        assert_eq!(take_pending_line(&mut pending).as_deref(), Some("T:20.5"));
        // The trailing partial line stays buffered until its newline arrives
        assert_eq!(take_pending_line(&mut pending), None);
        assert_eq!(pending, b"partial");
    }

    #[test]
    fn test_take_pending_line_empty_lines() {
        let mut pending = b"\n\nN1.0.0\n".to_vec();
        assert_eq!(take_pending_line(&mut pending).as_deref(), Some(""));
        assert_eq!(take_pending_line(&mut pending).as_deref(), Some(""));
        assert_eq!(take_pending_line(&mut pending).as_deref(), Some("N1.0.0"));
        assert_eq!(take_pending_line(&mut pending), None);
    }
}
