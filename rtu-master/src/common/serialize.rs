use crate::constants::limits;
use crate::error::InvalidRequest;
use crate::pdu::{Request, Response};
use crate::types::{AddressRange, Indexed, WriteMultiple};

use scursor::WriteCursor;

pub(crate) trait Serialize {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InvalidRequest>;
}

impl Serialize for AddressRange {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InvalidRequest> {
        cursor.write_u16_be(self.start)?;
        cursor.write_u16_be(self.count)?;
        Ok(())
    }
}

impl Serialize for Indexed<u16> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InvalidRequest> {
        cursor.write_u16_be(self.index)?;
        cursor.write_u16_be(self.value)?;
        Ok(())
    }
}

impl Serialize for WriteMultiple<u16> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InvalidRequest> {
        let range = self.validate(limits::MAX_WRITE_REGISTERS_COUNT)?;
        range.serialize(cursor)?;
        write_register_values(cursor, &self.values)
    }
}

impl Serialize for Request {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InvalidRequest> {
        match self {
            Request::ReadHoldingRegisters(range) | Request::ReadInputRegisters(range) => range
                .validate(limits::MAX_READ_REGISTERS_COUNT)?
                .serialize(cursor),
            Request::WriteSingleRegister(value) => value.serialize(cursor),
            Request::WriteMultipleRegisters(request) => request.serialize(cursor),
        }
    }
}

impl Serialize for Response {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InvalidRequest> {
        match self {
            Response::ReadHoldingRegisters(values) | Response::ReadInputRegisters(values) => {
                let count = match u16::try_from(values.len()) {
                    Ok(x) => x,
                    Err(_) => return Err(InvalidRequest::CountTooBigForU16(values.len())),
                };
                if count == 0 {
                    return Err(InvalidRequest::CountOfZero);
                }
                if count > limits::MAX_READ_REGISTERS_COUNT {
                    return Err(InvalidRequest::CountTooLargeForType(
                        count,
                        limits::MAX_READ_REGISTERS_COUNT,
                    ));
                }
                let values: Vec<u16> = values.iter().map(|x| x.value).collect();
                write_register_values(cursor, &values)
            }
            Response::WriteSingleRegister(value) => value.serialize(cursor),
            Response::WriteMultipleRegisters(range) => range
                .validate(limits::MAX_WRITE_REGISTERS_COUNT)?
                .serialize(cursor),
        }
    }
}

/// byte count followed by the big-endian values
///
/// callers bound the count so that the byte count fits in a u8
fn write_register_values(cursor: &mut WriteCursor, values: &[u16]) -> Result<(), InvalidRequest> {
    let byte_count = match u8::try_from(2 * values.len()) {
        Ok(x) => x,
        Err(_) => return Err(InvalidRequest::FrameOverflow),
    };
    cursor.write_u8(byte_count)?;
    for value in values {
        cursor.write_u16_be(*value)?;
    }
    Ok(())
}
