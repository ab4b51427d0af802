use std::io::ErrorKind;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{Duration, Instant};

use crate::common::phys::PhysDisplay;
use crate::decode::PhysDecodeLevel;
use crate::transport::{Transport, TransportError};

/// Serial line implementing [`Transport`]
///
/// A reply is considered complete once the line has been silent for the
/// RTU inter-frame interval (t3.5) after at least one byte was received.
pub struct PhysLayer {
    layer: PhysLayerImpl,
    frame_gap: Duration,
    last_activity: Option<Instant>,
    level: PhysDecodeLevel,
}

enum PhysLayerImpl {
    Serial(tokio_serial::SerialStream),
    #[cfg(test)]
    Mock(tokio_test::io::Mock),
}

impl std::fmt::Debug for PhysLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.layer {
            PhysLayerImpl::Serial(_) => f.write_str("Serial"),
            #[cfg(test)]
            PhysLayerImpl::Mock(_) => f.write_str("Mock"),
        }
    }
}

impl PhysLayer {
    pub(crate) fn new_serial(stream: tokio_serial::SerialStream, baud_rate: u32) -> Self {
        Self::new(PhysLayerImpl::Serial(stream), baud_rate)
    }

    #[cfg(test)]
    pub(crate) fn new_mock(mock: tokio_test::io::Mock, baud_rate: u32) -> Self {
        Self::new(PhysLayerImpl::Mock(mock), baud_rate)
    }

    fn new(layer: PhysLayerImpl, baud_rate: u32) -> Self {
        Self {
            layer,
            frame_gap: calculate_frame_gap(baud_rate),
            last_activity: None,
            level: PhysDecodeLevel::Nothing,
        }
    }

    /// Silent interval that separates two frames on this line
    pub fn frame_gap(&self) -> Duration {
        self.frame_gap
    }

    async fn read_some(&mut self, buffer: &mut [u8]) -> Result<usize, std::io::Error> {
        match &mut self.layer {
            PhysLayerImpl::Serial(x) => x.read(buffer).await,
            #[cfg(test)]
            PhysLayerImpl::Mock(x) => x.read(buffer).await,
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        match &mut self.layer {
            PhysLayerImpl::Serial(x) => x.write_all(data).await,
            #[cfg(test)]
            PhysLayerImpl::Mock(x) => x.write_all(data).await,
        }
    }

    fn clear_input(&mut self) -> Result<(), std::io::Error> {
        match &mut self.layer {
            PhysLayerImpl::Serial(x) => {
                use tokio_serial::SerialPort;
                x.clear(tokio_serial::ClearBuffer::Input)?;
                Ok(())
            }
            #[cfg(test)]
            PhysLayerImpl::Mock(_) => Ok(()),
        }
    }
}

impl Transport for PhysLayer {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        // keep consecutive frames apart by at least t3.5
        if let Some(last_activity) = self.last_activity {
            tokio::time::sleep_until(last_activity + self.frame_gap).await;
        }

        if self.level.enabled() {
            tracing::info!("PHYS TX - {}", PhysDisplay::new(self.level, bytes));
        }

        self.write_all(bytes).await?;
        self.last_activity = Some(Instant::now());
        Ok(())
    }

    async fn read_up_to(
        &mut self,
        max_bytes: usize,
        deadline: Instant,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buffer = vec![0u8; max_bytes];
        let mut length = 0;

        while length < max_bytes {
            // the first byte may take until the deadline, later ones must follow within t3.5
            let limit = if length == 0 {
                deadline
            } else {
                std::cmp::min(deadline, Instant::now() + self.frame_gap)
            };

            let count = match buffer.get_mut(length..) {
                Some(remaining) => {
                    match tokio::time::timeout_at(limit, self.read_some(remaining)).await {
                        Ok(result) => result?,
                        Err(_) => break,
                    }
                }
                None => break,
            };

            if count == 0 {
                if length == 0 {
                    return Err(TransportError::Io(ErrorKind::UnexpectedEof));
                }
                break;
            }

            length += count;
            self.last_activity = Some(Instant::now());
        }

        buffer.truncate(length);

        if self.level.enabled() && !buffer.is_empty() {
            tracing::info!("PHYS RX - {}", PhysDisplay::new(self.level, &buffer));
        }

        Ok(buffer)
    }

    async fn flush_input(&mut self) -> Result<(), TransportError> {
        self.clear_input()?;
        Ok(())
    }

    fn set_decode_level(&mut self, level: PhysDecodeLevel) {
        self.level = level;
    }
}

/// RTU inter-frame interval for the given baud rate
///
/// 3.5 character times of 11 bits each, fixed at 1.75 ms above 19200 baud.
pub(crate) fn calculate_frame_gap(baud_rate: u32) -> Duration {
    // 1 start, 8 data, 1 parity or stop, 1 stop
    const NUM_BITS_IN_CHAR: u64 = 11;
    const MAX_BAUD_RATE: u32 = 19200;
    const MIN_DELAY: Duration = Duration::from_micros(1750);

    if baud_rate == 0 || baud_rate > MAX_BAUD_RATE {
        return MIN_DELAY;
    }

    let character_time = Duration::from_secs(NUM_BITS_IN_CHAR) / baud_rate;
    35 * character_time / 10
}
