use std::future::Future;

use tokio::time::Instant;

use crate::decode::PhysDecodeLevel;

/// Failure of the underlying byte channel
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The operation did not complete before its deadline
    #[error("transport operation timed out")]
    Timeout,
    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            kind => TransportError::Io(kind),
        }
    }
}

/// Half-duplex byte channel between the master and the bus
///
/// Implementations move bytes and nothing else. Framing, retries and
/// validation are the job of the caller.
pub trait Transport: Send {
    /// Write all of `bytes` to the line
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read whatever arrives before `deadline`, up to `max_bytes`
    ///
    /// An empty result means nothing arrived. A partial frame is returned as-is.
    fn read_up_to(
        &mut self,
        max_bytes: usize,
        deadline: Instant,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Discard any stale input buffered ahead of a request
    fn flush_input(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Change how raw traffic is logged
    fn set_decode_level(&mut self, _level: PhysDecodeLevel) {}
}
