//! Bounded-retry version handshake against a controller
//!
//! The controller answers the version request on its own schedule, mixed in
//! with whatever else it is printing (temperature lines, debug output). The
//! handshake sends the request, drains available lines looking for a version
//! reply, and retries with a fixed backoff until either the wall-clock
//! ceiling or the retry cap is hit.

use brewlink_core::{ControllerInfo, ParseOutcome};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::transport::{Transport, TransportError};

/// Request line that asks the controller for its version info.
pub const VERSION_REQUEST: &str = "n";

/// Marker character identifying a version reply line.
pub const VERSION_MARKER: char = 'N';

/// Delimiter separating the marker from the payload. Optional on the wire:
/// some firmware replies `N:{...}`, some a bare `N0.2.4`.
const MARKER_DELIMITER: char = ':';

/// Default cap on protocol-level retries.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default wall-clock ceiling on the whole handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause before each re-sent request.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("controller did not answer after {retries} retries in {elapsed:?}")]
    NoResponse { retries: u32, elapsed: Duration },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Limits for the handshake retry loop.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Maximum number of re-sent version requests.
    pub max_retries: u32,
    /// Wall-clock ceiling on the whole exchange.
    pub overall_timeout: Duration,
    /// Pause before each re-sent request.
    pub retry_backoff: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            overall_timeout: DEFAULT_TIMEOUT,
            retry_backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Successful handshake: the parsed descriptor plus exchange bookkeeping.
#[derive(Debug, Clone)]
pub struct HandshakeReport {
    pub info: ControllerInfo,
    /// Number of times the request was re-sent before a valid reply arrived.
    pub retries: u32,
    pub elapsed: Duration,
}

/// Ask the controller for its version until a valid reply arrives, with the
/// default limits.
pub async fn request_version<T: Transport>(
    transport: &mut T,
) -> Result<HandshakeReport, HandshakeError> {
    request_version_with(transport, &HandshakeConfig::default()).await
}

/// As [`request_version`], with explicit limits.
///
/// Returns the first descriptor whose version is not the `0.0.0` sentinel.
/// The retry ceiling and the wall-clock ceiling are independent exit
/// conditions; whichever is hit first ends the attempt with
/// [`HandshakeError::NoResponse`].
pub async fn request_version_with<T: Transport>(
    transport: &mut T,
    config: &HandshakeConfig,
) -> Result<HandshakeReport, HandshakeError> {
    let started = Instant::now();
    let mut retries = 0;

    transport.write_line(VERSION_REQUEST).await?;
    loop {
        // Drain everything the controller has sent so far.
        while let Some(line) = transport.read_line().await? {
            let Some(payload) = strip_marker(&line) else {
                trace!(line = %line, "Skipping non-version line");
                continue;
            };
            let ParseOutcome { info, diagnostics } = ControllerInfo::parse(Some(payload));
            for diagnostic in &diagnostics {
                warn!(%diagnostic, payload = %payload, "Version reply diagnostic");
            }
            if !info.is_unknown() {
                let elapsed = started.elapsed();
                info!(version = %info.version, retries, "Controller identified");
                return Ok(HandshakeReport {
                    info,
                    retries,
                    elapsed,
                });
            }
            debug!(payload = %payload, "Version reply not yet valid");
        }

        let elapsed = started.elapsed();
        if elapsed >= config.overall_timeout || retries >= config.max_retries {
            debug!(retries, ?elapsed, "Giving up on version handshake");
            return Err(HandshakeError::NoResponse { retries, elapsed });
        }

        transport.write_line(VERSION_REQUEST).await?;
        retries += 1;
        tokio::time::sleep(config.retry_backoff).await;
    }
}

/// Strip the version marker and its optional delimiter from a reply line.
/// `None` when the line is not a version reply.
fn strip_marker(line: &str) -> Option<&str> {
    let payload = line.strip_prefix(VERSION_MARKER)?;
    Some(payload.strip_prefix(MARKER_DELIMITER).unwrap_or(payload))
}
