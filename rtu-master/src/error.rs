use crate::transport::TransportError;

/// Errors that result from a request with bad parameters
///
/// These are always detected before any byte is produced or sent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    /// Slave address is broadcast (0) or reserved (248 to 255)
    #[error("slave address {0} is not a unicast RTU address (1 to 247)")]
    BadSlaveAddress(u8),
    /// Request contains a count of zero
    #[error("request contains a count of zero")]
    CountOfZero,
    /// Start and count would overflow the u16 address space
    #[error("start == {0} and count == {1} would overflow the representation of u16")]
    AddressOverflow(u16, u16),
    /// Count exceeds the maximum allowed for the function code
    #[error("the request count of {0} exceeds maximum allowed count of {1} for this type")]
    CountTooLargeForType(u16, u16),
    /// Number of supplied values does not match the count
    #[error("request count of {0} doesn't match the number of values supplied ({1})")]
    ValueCountMismatch(u16, usize),
    /// The number of values exceeds the maximum value of u16
    #[error("the number of values ({0}) exceeds the maximum value of u16")]
    CountTooBigForU16(usize),
    /// Serialized frame would not fit in the maximum RTU frame size
    #[error("encoded frame exceeds the maximum RTU frame length")]
    FrameOverflow,
}

/// Reasons a response with a valid checksum is still rejected
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameParseError {
    /// Fewer bytes than the smallest possible frame
    #[error("frame length of {0} is shorter than the minimum of {1} bytes")]
    TooShort(usize, usize),
    /// Function code is neither the request's nor its exception form
    #[error("received function code {actual:#04X} while expecting {expected:#04X} or {error:#04X}")]
    UnexpectedFunction {
        /// function code in the response
        actual: u8,
        /// function code of the request
        expected: u8,
        /// exception form of the request's function code
        error: u8,
    },
    /// Exception response ended before the exception code
    #[error("exception response does not contain an exception code")]
    MissingExceptionCode,
    /// Response ended before all fields were read
    #[error("response is too short to be valid")]
    InsufficientBytes,
    /// Byte count doesn't match what is expected based on the request
    #[error("byte count ({1}) doesn't match what is expected based on request ({0})")]
    RequestByteCountMismatch(usize, usize),
    /// Byte count doesn't match the actual number of bytes present
    #[error("byte count ({0}) doesn't match the actual number of bytes remaining ({1})")]
    InsufficientBytesForByteCount(usize, usize),
    /// Response contains extra trailing bytes
    #[error("response contains {0} extra trailing bytes")]
    TrailingBytes(usize),
    /// A parameter expected to be echoed in the reply did not match
    #[error("a parameter expected to be echoed in the reply did not match")]
    ReplyEchoMismatch,
}

/// Classification of a received response that did not decode to a success
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Checksum over the frame doesn't match the checksum it carries
    #[error("CRC mismatch: received {received:#06X}, calculated {expected:#06X}")]
    CrcMismatch {
        /// checksum carried by the frame
        received: u16,
        /// checksum calculated over the frame
        expected: u16,
    },
    /// Response claims to come from a different slave
    #[error("response from slave {received:#04X} while expecting {expected:#04X}")]
    AddressMismatch {
        /// address the request was sent to
        expected: u8,
        /// address carried by the response
        received: u8,
    },
    /// Checksum is valid but the contents are not a well-formed reply
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameParseError),
    /// Device validly reported that it cannot honor the request
    #[error("device rejected function {function:#04X} with exception code {code:#04X}")]
    DeviceException {
        /// function code of the rejected request
        function: u8,
        /// raw exception code
        code: u8,
    },
}

impl ResponseError {
    /// Corrupted, truncated, or collided replies are worth sending the request again
    pub fn is_retryable(&self) -> bool {
        match self {
            ResponseError::CrcMismatch { .. } => true,
            ResponseError::AddressMismatch { .. } => true,
            ResponseError::MalformedFrame(_) => true,
            ResponseError::DeviceException { .. } => false,
        }
    }
}

/// Definitive failure of one request/response exchange
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// Request parameters are out of bounds, nothing was sent
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),
    /// The underlying channel failed
    #[error("transport failure: {0}")]
    Transport(TransportError),
    /// No response was received before the timeout
    #[error("timeout occurred before receiving a response from the slave")]
    Timeout,
    /// Checksum of the response did not match
    #[error("CRC mismatch: received {received:#06X}, calculated {expected:#06X}")]
    CrcMismatch {
        /// checksum carried by the frame
        received: u16,
        /// checksum calculated over the frame
        expected: u16,
    },
    /// Response came from a different slave
    #[error("response from slave {received:#04X} while expecting {expected:#04X}")]
    AddressMismatch {
        /// address the request was sent to
        expected: u8,
        /// address carried by the response
        received: u8,
    },
    /// Response was too short or not shaped like a reply to the request
    #[error("malformed frame: {0}")]
    MalformedFrame(FrameParseError),
    /// Device reported an exception
    #[error("device rejected function {function:#04X} with exception code {code:#04X}")]
    DeviceException {
        /// function code of the rejected request
        function: u8,
        /// raw exception code
        code: u8,
    },
    /// The client task processing requests has shut down
    #[error("the task processing requests has shut down")]
    Shutdown,
}

impl ExchangeError {
    /// Raw exception code, if the device rejected the request
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            ExchangeError::DeviceException { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ResponseError> for ExchangeError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::CrcMismatch { received, expected } => {
                ExchangeError::CrcMismatch { received, expected }
            }
            ResponseError::AddressMismatch { expected, received } => {
                ExchangeError::AddressMismatch { expected, received }
            }
            ResponseError::MalformedFrame(err) => ExchangeError::MalformedFrame(err),
            ResponseError::DeviceException { function, code } => {
                ExchangeError::DeviceException { function, code }
            }
        }
    }
}

impl From<scursor::ReadError> for FrameParseError {
    fn from(_: scursor::ReadError) -> Self {
        FrameParseError::InsufficientBytes
    }
}

impl From<scursor::WriteError> for InvalidRequest {
    fn from(_: scursor::WriteError) -> Self {
        InvalidRequest::FrameOverflow
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ExchangeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ExchangeError::Shutdown
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ExchangeError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        ExchangeError::Shutdown
    }
}
