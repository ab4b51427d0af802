//! Encoding and decoding of complete RTU frames
//!
//! A frame is `[slave][function][PDU...][crc lo][crc hi]`. Register fields are
//! big-endian while the checksum is little-endian. The codec is pure and never
//! touches a transport.

use crate::checksum::{self, CRC_LENGTH};
use crate::common::function::FunctionCode;
use crate::common::parse::{expect_empty, parse_echo, parse_registers};
use crate::common::serialize::Serialize;
use crate::decode::FrameDecodeLevel;
use crate::error::{FrameParseError, InvalidRequest, ResponseError};
use crate::pdu::{Request, Response};
use crate::types::SlaveAddress;

use scursor::{ReadCursor, WriteCursor};

pub(crate) mod constants {
    pub(crate) const HEADER_LENGTH: usize = 1;
    pub(crate) const FUNCTION_CODE_LENGTH: usize = 1;
    pub(crate) const MAX_PDU_LENGTH: usize = 253;
    /// address, function code, and CRC
    pub(crate) const MIN_FRAME_LENGTH: usize =
        HEADER_LENGTH + FUNCTION_CODE_LENGTH + crate::checksum::CRC_LENGTH;
    pub(crate) const MAX_FRAME_LENGTH: usize =
        HEADER_LENGTH + MAX_PDU_LENGTH + crate::checksum::CRC_LENGTH;
    /// line noise some devices and adapters emit ahead of a reply
    pub(crate) const NOISE_PREFIX: u8 = 0xFF;
}

/// A complete RTU frame including its trailing checksum
///
/// Frames are immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Raw bytes to place on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Slave address carried in the first byte
    pub fn slave(&self) -> u8 {
        self.bytes.first().copied().unwrap_or_default()
    }

    /// Checksum carried in the last two bytes
    pub fn crc(&self) -> u16 {
        checksum::split(&self.bytes)
            .map(|(_, crc)| crc)
            .unwrap_or_default()
    }

    /// Consume the frame returning the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Frame [")?;
        let mut first = true;
        for byte in &self.bytes {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{byte:02X}")?;
        }
        f.write_str("]")
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode a request addressed to `slave`
///
/// The request bounds are checked before any byte is produced.
pub fn encode_request(slave: SlaveAddress, request: &Request) -> Result<Frame, InvalidRequest> {
    request.validate()?;
    format_frame(slave.value(), request.function().get_value(), request)
}

/// Encode the reply a slave would send for a successful request
pub fn encode_response(slave: SlaveAddress, response: &Response) -> Result<Frame, InvalidRequest> {
    format_frame(slave.value(), response.function().get_value(), response)
}

/// Encode the exception reply a slave would send when rejecting `function`
pub fn encode_exception(slave: SlaveAddress, function: FunctionCode, code: u8) -> Frame {
    let mut bytes = Vec::with_capacity(constants::MIN_FRAME_LENGTH + 1);
    bytes.push(slave.value());
    bytes.push(function.as_error());
    bytes.push(code);
    let crc = checksum::compute(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Frame { bytes }
}

fn format_frame(slave: u8, function: u8, body: &dyn Serialize) -> Result<Frame, InvalidRequest> {
    let mut buffer = [0u8; constants::MAX_FRAME_LENGTH];
    let mut cursor = WriteCursor::new(&mut buffer);
    cursor.write_u8(slave)?;
    cursor.write_u8(function)?;
    body.serialize(&mut cursor)?;
    let end_pdu = cursor.position();
    let crc = match cursor.get(0..end_pdu) {
        Some(data) => checksum::compute(data),
        None => return Err(InvalidRequest::FrameOverflow),
    };
    cursor.write_u16_le(crc)?;
    let length = cursor.position();
    Ok(Frame {
        bytes: buffer[..length].to_vec(),
    })
}

/// Decode the raw reply to `request` sent to `slave`
///
/// Checks are applied in a fixed order: minimum length, a single leading
/// `0xFF` is dropped, checksum, slave address, exception, function code and
/// finally the function-specific payload. A checksum mismatch is reported
/// before anything in the frame is interpreted.
pub fn decode_response(
    slave: SlaveAddress,
    request: &Request,
    raw: &[u8],
) -> Result<Response, ResponseError> {
    if raw.len() < constants::MIN_FRAME_LENGTH {
        return Err(FrameParseError::TooShort(raw.len(), constants::MIN_FRAME_LENGTH).into());
    }

    let frame = strip_noise(raw);

    if frame.len() < constants::MIN_FRAME_LENGTH {
        return Err(FrameParseError::TooShort(frame.len(), constants::MIN_FRAME_LENGTH).into());
    }

    let (data, received) = match checksum::split(frame) {
        Some(x) => x,
        None => return Err(FrameParseError::TooShort(frame.len(), CRC_LENGTH).into()),
    };
    let expected = checksum::compute(data);
    if received != expected {
        return Err(ResponseError::CrcMismatch { received, expected });
    }

    let mut cursor = ReadCursor::new(data);
    let address = cursor.read_u8().map_err(FrameParseError::from)?;
    if address != slave.value() {
        return Err(ResponseError::AddressMismatch {
            expected: slave.value(),
            received: address,
        });
    }

    let function = request.function();
    let actual = cursor.read_u8().map_err(FrameParseError::from)?;

    if actual == function.as_error() {
        let code = match cursor.read_u8() {
            Ok(code) => code,
            Err(_) => return Err(FrameParseError::MissingExceptionCode.into()),
        };
        expect_empty(&cursor)?;
        return Err(ResponseError::DeviceException {
            function: function.get_value(),
            code,
        });
    }

    if actual != function.get_value() {
        return Err(FrameParseError::UnexpectedFunction {
            actual,
            expected: function.get_value(),
            error: function.as_error(),
        }
        .into());
    }

    let response = match request {
        Request::ReadHoldingRegisters(range) => {
            Response::ReadHoldingRegisters(parse_registers(*range, &mut cursor)?)
        }
        Request::ReadInputRegisters(range) => {
            Response::ReadInputRegisters(parse_registers(*range, &mut cursor)?)
        }
        Request::WriteSingleRegister(value) => {
            Response::WriteSingleRegister(parse_echo(*value, &mut cursor)?)
        }
        Request::WriteMultipleRegisters(request) => {
            Response::WriteMultipleRegisters(parse_echo(request.range, &mut cursor)?)
        }
    };

    Ok(response)
}

/// Drop exactly one leading noise byte
fn strip_noise(raw: &[u8]) -> &[u8] {
    match raw.split_first() {
        Some((&constants::NOISE_PREFIX, rest)) => rest,
        _ => raw,
    }
}

pub(crate) struct RtuDisplay<'a> {
    level: FrameDecodeLevel,
    frame: &'a [u8],
}

impl<'a> RtuDisplay<'a> {
    pub(crate) fn new(level: FrameDecodeLevel, frame: &'a [u8]) -> Self {
        RtuDisplay { level, frame }
    }
}

impl std::fmt::Display for RtuDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (slave, payload, crc) = match (self.frame.split_first(), checksum::split(self.frame)) {
            (Some((slave, _)), Some((data, crc))) if self.frame.len() >= constants::MIN_FRAME_LENGTH => {
                (*slave, data.get(constants::HEADER_LENGTH..).unwrap_or_default(), crc)
            }
            _ => return write!(f, "incomplete frame ({} bytes)", self.frame.len()),
        };

        write!(
            f,
            "slave: {:#04X} crc: {:#06X} (payload len = {})",
            slave,
            crc,
            payload.len(),
        )?;
        if self.level.payload_enabled() {
            crate::common::phys::format_bytes(f, payload)?;
        }
        Ok(())
    }
}
