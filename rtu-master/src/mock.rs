use std::collections::VecDeque;

use tokio::time::Instant;

use crate::decode::PhysDecodeLevel;
use crate::transport::{Transport, TransportError};

/// What the scripted line does when the master reads
pub(crate) enum Reply {
    /// these bytes arrive, truncated to the read limit
    Bytes(Vec<u8>),
    /// nothing arrives before the deadline
    Silence,
    /// the read fails
    Error(TransportError),
}

/// In-memory transport that plays back one reply per read
///
/// Once the script is exhausted the line stays silent.
pub(crate) struct ScriptedTransport {
    replies: VecDeque<Reply>,
    writes: Vec<Vec<u8>>,
    write_attempts: usize,
    flushes: usize,
    write_error: Option<TransportError>,
    level: PhysDecodeLevel,
}

impl ScriptedTransport {
    pub(crate) fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        Self {
            replies: replies.into_iter().collect(),
            writes: Vec::new(),
            write_attempts: 0,
            flushes: 0,
            write_error: None,
            level: PhysDecodeLevel::Nothing,
        }
    }

    pub(crate) fn fail_writes(&mut self, err: TransportError) {
        self.write_error = Some(err);
    }

    pub(crate) fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub(crate) fn write_attempts(&self) -> usize {
        self.write_attempts
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes
    }

    pub(crate) fn decode_level(&self) -> PhysDecodeLevel {
        self.level
    }
}

impl Transport for ScriptedTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.write_attempts += 1;
        if let Some(err) = self.write_error {
            return Err(err);
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    async fn read_up_to(
        &mut self,
        max_bytes: usize,
        deadline: Instant,
    ) -> Result<Vec<u8>, TransportError> {
        match self.replies.pop_front() {
            Some(Reply::Bytes(mut bytes)) => {
                bytes.truncate(max_bytes);
                Ok(bytes)
            }
            Some(Reply::Error(err)) => Err(err),
            Some(Reply::Silence) | None => {
                tokio::time::sleep_until(deadline).await;
                Ok(Vec::new())
            }
        }
    }

    async fn flush_input(&mut self) -> Result<(), TransportError> {
        self.flushes += 1;
        Ok(())
    }

    fn set_decode_level(&mut self, level: PhysDecodeLevel) {
        self.level = level;
    }
}
