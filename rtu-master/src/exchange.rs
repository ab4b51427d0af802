use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use crate::decode::DecodeLevel;
use crate::error::ExchangeError;
use crate::frame::{decode_response, encode_request, Frame, RtuDisplay};
use crate::pdu::{Request, RequestDisplay, Response, ResponseDisplay};
use crate::transport::{Transport, TransportError};
use crate::types::SlaveAddress;

/// Number of retries callers typically allow after the first attempt
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Largest possible RTU frame
pub const MAX_RESPONSE_LENGTH: usize = crate::frame::constants::MAX_FRAME_LENGTH;

// roughly 30 years, the same ceiling tokio applies to its own timers
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Parameters governing a single request/response exchange
///
/// Nothing here has an implicit default; every value is chosen by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExchangePolicy {
    /// How long to wait for a reply on each attempt
    pub timeout: Duration,
    /// How many times the request is re-sent after the first attempt fails
    pub max_retries: usize,
    /// Upper bound on the number of bytes read for one reply
    pub max_response_bytes: usize,
    /// Protocol decoding to log
    pub decode: DecodeLevel,
}

impl ExchangePolicy {
    /// Create a policy that logs nothing
    pub fn new(timeout: Duration, max_retries: usize, max_response_bytes: usize) -> Self {
        Self {
            timeout,
            max_retries,
            max_response_bytes,
            decode: DecodeLevel::nothing(),
        }
    }

    /// Set the decode level used to log the exchange
    pub fn with_decode_level(mut self, decode: DecodeLevel) -> Self {
        self.decode = decode;
        self
    }
}

/// Outcome of one attempt that did not produce a response
enum AttemptError {
    /// worth re-sending the request
    Retry(ExchangeError),
    /// the exchange is over
    Terminal(ExchangeError),
}

fn response_deadline(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Perform one request/response cycle on `transport`
///
/// The request is validated and encoded before any I/O. Timeouts and
/// corrupted or misaddressed replies are retried up to `policy.max_retries`
/// times, each retry flushing stale input and re-sending the same frame.
/// Device exceptions, write failures and other transport errors end the
/// exchange immediately. On exhaustion the last failure is returned.
///
/// A failed write is reported as [`ExchangeError::Transport`] carrying the
/// underlying [`TransportError`], never as [`ExchangeError::Timeout`], even
/// when the write itself timed out.
pub async fn execute<T>(
    slave: SlaveAddress,
    request: &Request,
    transport: &mut T,
    policy: &ExchangePolicy,
) -> Result<Response, ExchangeError>
where
    T: Transport,
{
    let frame = encode_request(slave, request)?;

    run_exchange(slave, request, &frame, transport, policy)
        .instrument(tracing::info_span!("Exchange", slave = %slave))
        .await
}

async fn run_exchange<T>(
    slave: SlaveAddress,
    request: &Request,
    frame: &Frame,
    transport: &mut T,
    policy: &ExchangePolicy,
) -> Result<Response, ExchangeError>
where
    T: Transport,
{
    transport.set_decode_level(policy.decode.physical);

    if policy.decode.app.enabled() {
        tracing::info!("PDU TX - {}", RequestDisplay::new(policy.decode.app, request));
    }

    let attempts = policy.max_retries.saturating_add(1);
    let mut attempt: usize = 0;

    loop {
        attempt += 1;

        let err = match run_attempt(slave, request, frame, transport, policy).await {
            Ok(response) => {
                if policy.decode.app.enabled() {
                    tracing::info!(
                        "PDU RX - {}",
                        ResponseDisplay::new(policy.decode.app, &response)
                    );
                }
                return Ok(response);
            }
            Err(AttemptError::Terminal(err)) => {
                tracing::warn!("exchange failed: {}", err);
                return Err(err);
            }
            Err(AttemptError::Retry(err)) => err,
        };

        if attempt >= attempts {
            tracing::warn!("giving up after {} attempt(s): {}", attempt, err);
            return Err(err);
        }

        tracing::warn!(
            "attempt {} of {} failed: {} - retrying",
            attempt,
            attempts,
            err
        );
    }
}

async fn run_attempt<T>(
    slave: SlaveAddress,
    request: &Request,
    frame: &Frame,
    transport: &mut T,
    policy: &ExchangePolicy,
) -> Result<Response, AttemptError>
where
    T: Transport,
{
    transport
        .flush_input()
        .await
        .map_err(|err| AttemptError::Terminal(ExchangeError::Transport(err)))?;

    if policy.decode.frame.enabled() {
        tracing::info!(
            "RTU TX - {}",
            RtuDisplay::new(policy.decode.frame, frame.as_bytes())
        );
    }

    // a failed write means the link is broken, not that a packet was lost
    transport
        .write(frame.as_bytes())
        .await
        .map_err(|err| AttemptError::Terminal(ExchangeError::Transport(err)))?;

    let deadline = response_deadline(policy.timeout);
    let bytes = match transport
        .read_up_to(policy.max_response_bytes, deadline)
        .await
    {
        Ok(bytes) if bytes.is_empty() => return Err(AttemptError::Retry(ExchangeError::Timeout)),
        Ok(bytes) => bytes,
        Err(TransportError::Timeout) => return Err(AttemptError::Retry(ExchangeError::Timeout)),
        Err(err) => return Err(AttemptError::Terminal(ExchangeError::Transport(err))),
    };

    if policy.decode.frame.enabled() {
        tracing::info!("RTU RX - {}", RtuDisplay::new(policy.decode.frame, &bytes));
    }

    match decode_response(slave, request, &bytes) {
        Ok(response) => Ok(response),
        Err(err) if err.is_retryable() => Err(AttemptError::Retry(err.into())),
        Err(err) => Err(AttemptError::Terminal(err.into())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use crate::error::{FrameParseError, InvalidRequest};
    use crate::mock::{Reply, ScriptedTransport};
    use crate::types::{AddressRange, Indexed, WriteMultiple};

    use super::*;

    const WRITE_MULTIPLE_REGISTERS_REQUEST: &[u8] = &[
        0x10, 0x10, 0x00, 0x04, 0x00, 0x03, 0x06, 0x00, 0x02, 0x00, 0x0B, 0x03, 0xE8, 0x93, 0xF8,
    ];
    const WRITE_MULTIPLE_REGISTERS_RESPONSE: &[u8] =
        &[0x10, 0x10, 0x00, 0x04, 0x00, 0x03, 0xC2, 0x88];
    const WRITE_MULTIPLE_REGISTERS_EXCEPTION: &[u8] = &[0x10, 0x90, 0x02, 0x9D, 0xC4];
    const RESPONSE_FROM_OTHER_SLAVE: &[u8] = &[0x11, 0x10, 0x00, 0x04, 0x00, 0x03, 0xC3, 0x59];

    fn slave() -> SlaveAddress {
        SlaveAddress::new(0x10).unwrap()
    }

    fn request() -> Request {
        Request::WriteMultipleRegisters(WriteMultiple::from(4, vec![2, 11, 1000]).unwrap())
    }

    fn policy(max_retries: usize) -> ExchangePolicy {
        ExchangePolicy::new(Duration::from_secs(1), max_retries, MAX_RESPONSE_LENGTH)
    }

    fn corrupted_response() -> Vec<u8> {
        let mut bytes = WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec();
        bytes[3] ^= 0x01;
        bytes
    }

    fn echo() -> Result<Response, ExchangeError> {
        Ok(Response::WriteMultipleRegisters(AddressRange {
            start: 4,
            count: 3,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt() {
        let mut transport =
            ScriptedTransport::new([Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec())]);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(result, echo());
        assert_eq!(transport.writes(), &[WRITE_MULTIPLE_REGISTERS_REQUEST.to_vec()]);
        assert_eq!(transport.flushes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_is_accepted() {
        let mut transport =
            ScriptedTransport::new([Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec())]);
        let policy = ExchangePolicy::new(Duration::MAX, 0, MAX_RESPONSE_LENGTH);

        let result = execute(slave(), &request(), &mut transport, &policy).await;

        assert_eq!(result, echo());
    }

    #[test]
    fn deadline_saturates_instead_of_overflowing() {
        let before = Instant::now();
        let deadline = response_deadline(Duration::MAX);
        assert!(deadline >= before + FAR_FUTURE);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_line_is_retried_until_exhausted() {
        let mut transport = ScriptedTransport::new([]);
        let start = Instant::now();

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(result, Err(ExchangeError::Timeout));
        assert_eq!(transport.writes().len(), 4);
        assert_eq!(transport.flushes(), 4);
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
        for write in transport.writes() {
            assert_eq!(write.as_slice(), WRITE_MULTIPLE_REGISTERS_REQUEST);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_a_single_attempt() {
        let mut transport = ScriptedTransport::new([Reply::Silence]);

        let result = execute(slave(), &request(), &mut transport, &policy(0)).await;

        assert_eq!(result, Err(ExchangeError::Timeout));
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_timeout_is_retried() {
        let mut transport = ScriptedTransport::new([
            Reply::Error(TransportError::Timeout),
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec()),
        ]);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(result, echo());
        assert_eq!(transport.writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn crc_mismatch_is_retried() {
        let mut transport = ScriptedTransport::new([
            Reply::Bytes(corrupted_response()),
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec()),
        ]);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(result, echo());
        assert_eq!(transport.writes().len(), 2);
        assert_eq!(transport.flushes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_failure_kind() {
        let mut transport = ScriptedTransport::new([
            Reply::Silence,
            Reply::Bytes(corrupted_response()),
        ]);

        let result = execute(slave(), &request(), &mut transport, &policy(1)).await;

        assert!(matches!(result, Err(ExchangeError::CrcMismatch { .. })));
        assert_eq!(transport.writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn address_mismatch_and_malformed_frames_are_retried() {
        let mut transport = ScriptedTransport::new([
            Reply::Bytes(RESPONSE_FROM_OTHER_SLAVE.to_vec()),
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE[..3].to_vec()),
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec()),
        ]);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(result, echo());
        assert_eq!(transport.writes().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_is_reported_on_exhaustion() {
        let mut transport = ScriptedTransport::new([Reply::Bytes(
            WRITE_MULTIPLE_REGISTERS_RESPONSE[..3].to_vec(),
        )]);

        let result = execute(slave(), &request(), &mut transport, &policy(0)).await;

        assert_eq!(
            result,
            Err(ExchangeError::MalformedFrame(FrameParseError::TooShort(3, 4)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn device_exception_is_terminal() {
        let mut transport = ScriptedTransport::new([
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_EXCEPTION.to_vec()),
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec()),
        ]);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(
            result,
            Err(ExchangeError::DeviceException {
                function: 0x10,
                code: 0x02
            })
        );
        assert_eq!(result.unwrap_err().exception_code(), Some(0x02));
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_is_terminal() {
        let mut transport = ScriptedTransport::new([]);
        transport.fail_writes(TransportError::Io(ErrorKind::BrokenPipe));

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(
            result,
            Err(ExchangeError::Transport(TransportError::Io(
                ErrorKind::BrokenPipe
            )))
        );
        assert_eq!(transport.write_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn write_timeout_is_not_reported_as_response_timeout() {
        let mut transport = ScriptedTransport::new([]);
        transport.fail_writes(TransportError::Timeout);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(
            result,
            Err(ExchangeError::Transport(TransportError::Timeout))
        );
        assert_eq!(transport.write_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_other_than_timeout_is_terminal() {
        let mut transport = ScriptedTransport::new([
            Reply::Error(TransportError::Io(ErrorKind::BrokenPipe)),
            Reply::Bytes(WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec()),
        ]);

        let result = execute(slave(), &request(), &mut transport, &policy(3)).await;

        assert_eq!(
            result,
            Err(ExchangeError::Transport(TransportError::Io(
                ErrorKind::BrokenPipe
            )))
        );
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_request_performs_no_io() {
        let mut transport = ScriptedTransport::new([]);
        let request = Request::ReadHoldingRegisters(AddressRange { start: 0, count: 0 });

        let result = execute(slave(), &request, &mut transport, &policy(3)).await;

        assert_eq!(
            result,
            Err(ExchangeError::InvalidRequest(InvalidRequest::CountOfZero))
        );
        assert_eq!(transport.write_attempts(), 0);
        assert_eq!(transport.flushes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn response_is_truncated_to_maximum_length() {
        let mut transport = ScriptedTransport::new([Reply::Bytes(
            WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec(),
        )]);
        let policy = ExchangePolicy::new(Duration::from_secs(1), 0, 6);

        let result = execute(slave(), &request(), &mut transport, &policy).await;

        assert!(matches!(result, Err(ExchangeError::CrcMismatch { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn leading_noise_byte_is_tolerated() {
        let mut reply = vec![0xFF];
        reply.extend_from_slice(WRITE_MULTIPLE_REGISTERS_RESPONSE);
        let mut transport = ScriptedTransport::new([Reply::Bytes(reply)]);

        let result = execute(slave(), &request(), &mut transport, &policy(0)).await;

        assert_eq!(result, echo());
    }

    #[tokio::test(start_paused = true)]
    async fn logging_does_not_change_the_outcome() {
        let mut transport = ScriptedTransport::new([Reply::Bytes(
            WRITE_MULTIPLE_REGISTERS_RESPONSE.to_vec(),
        )]);
        let policy = policy(0).with_decode_level(DecodeLevel::new(
            crate::AppDecodeLevel::DataValues,
            crate::FrameDecodeLevel::Payload,
            crate::PhysDecodeLevel::Data,
        ));
        let request = Request::WriteSingleRegister(Indexed::new(4, 2));

        let result = execute(slave(), &request, &mut transport, &policy).await;

        // the reply is for a different function
        assert!(matches!(
            result,
            Err(ExchangeError::MalformedFrame(
                FrameParseError::UnexpectedFunction { .. }
            ))
        ));
        assert_eq!(transport.decode_level(), crate::PhysDecodeLevel::Data);
    }
}
