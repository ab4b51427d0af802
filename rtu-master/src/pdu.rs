use crate::common::function::FunctionCode;
use crate::constants::limits;
use crate::decode::AppDecodeLevel;
use crate::error::InvalidRequest;
use crate::types::{AddressRange, Indexed, WriteMultiple};

/// A request the master can send, keyed by function code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Read 1 to 125 contiguous holding registers
    ReadHoldingRegisters(AddressRange),
    /// Read 1 to 125 contiguous input registers
    ReadInputRegisters(AddressRange),
    /// Write a single holding register
    WriteSingleRegister(Indexed<u16>),
    /// Write 1 to 123 contiguous holding registers
    WriteMultipleRegisters(WriteMultiple<u16>),
}

/// A successful reply, mirroring the shape of the [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Register values, each paired with its address
    ReadHoldingRegisters(Vec<Indexed<u16>>),
    /// Register values, each paired with its address
    ReadInputRegisters(Vec<Indexed<u16>>),
    /// Echo of the written register
    WriteSingleRegister(Indexed<u16>),
    /// Echo of the written range
    WriteMultipleRegisters(AddressRange),
}

impl Request {
    /// function code used to send this request
    pub fn function(&self) -> FunctionCode {
        match self {
            Request::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Request::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Request::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Request::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }

    /// Check the bounds of the request without encoding it
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        match self {
            Request::ReadHoldingRegisters(range) | Request::ReadInputRegisters(range) => {
                range.validate(limits::MAX_READ_REGISTERS_COUNT)?;
            }
            Request::WriteSingleRegister(_) => {}
            Request::WriteMultipleRegisters(request) => {
                request.validate(limits::MAX_WRITE_REGISTERS_COUNT)?;
            }
        }
        Ok(())
    }
}

impl Response {
    /// function code this response answers
    pub fn function(&self) -> FunctionCode {
        match self {
            Response::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Response::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Response::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Response::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }
}

pub(crate) struct RequestDisplay<'a> {
    level: AppDecodeLevel,
    request: &'a Request,
}

impl<'a> RequestDisplay<'a> {
    pub(crate) fn new(level: AppDecodeLevel, request: &'a Request) -> Self {
        Self { level, request }
    }
}

impl std::fmt::Display for RequestDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.request.function())?;

        if !self.level.data_headers() {
            return Ok(());
        }

        match self.request {
            Request::ReadHoldingRegisters(range) | Request::ReadInputRegisters(range) => {
                write!(f, " {range}")?;
            }
            Request::WriteSingleRegister(value) => {
                write!(f, " idx: {:#06X}", value.index)?;
                if self.level.data_values() {
                    write!(f, "\n{value}")?;
                }
            }
            Request::WriteMultipleRegisters(request) => {
                write!(f, " {}", request.range)?;
                if self.level.data_values() {
                    for x in request.indexed() {
                        write!(f, "\n{}", Indexed::new(x.index, *x.value))?;
                    }
                }
            }
        }

        Ok(())
    }
}

pub(crate) struct ResponseDisplay<'a> {
    level: AppDecodeLevel,
    response: &'a Response,
}

impl<'a> ResponseDisplay<'a> {
    pub(crate) fn new(level: AppDecodeLevel, response: &'a Response) -> Self {
        Self { level, response }
    }
}

impl std::fmt::Display for ResponseDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.response.function())?;

        if !self.level.data_headers() {
            return Ok(());
        }

        match self.response {
            Response::ReadHoldingRegisters(values) | Response::ReadInputRegisters(values) => {
                match values.first() {
                    Some(first) => write!(
                        f,
                        " start: {:#06X} qty: {}",
                        first.index,
                        values.len()
                    )?,
                    None => f.write_str(" qty: 0")?,
                }
                if self.level.data_values() {
                    for x in values {
                        write!(f, "\n{x}")?;
                    }
                }
            }
            Response::WriteSingleRegister(value) => {
                write!(f, " idx: {:#06X}", value.index)?;
                if self.level.data_values() {
                    write!(f, "\n{value}")?;
                }
            }
            Response::WriteMultipleRegisters(range) => {
                write!(f, " {range}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(start: u16, count: u16) -> Request {
        Request::ReadHoldingRegisters(AddressRange { start, count })
    }

    #[test]
    fn read_count_limits() {
        assert_eq!(read(0, 125).validate(), Ok(()));
        assert_eq!(
            read(0, 126).validate(),
            Err(InvalidRequest::CountTooLargeForType(126, 125))
        );
        assert_eq!(read(7, 0).validate(), Err(InvalidRequest::CountOfZero));
        assert_eq!(
            read(0xFFF0, 0x20).validate(),
            Err(InvalidRequest::AddressOverflow(0xFFF0, 0x20))
        );
    }

    #[test]
    fn write_multiple_count_limits() {
        let ok = WriteMultiple::from(0, vec![0u16; 123]).unwrap();
        assert_eq!(Request::WriteMultipleRegisters(ok).validate(), Ok(()));

        let too_many = WriteMultiple::from(0, vec![0u16; 124]).unwrap();
        assert_eq!(
            Request::WriteMultipleRegisters(too_many).validate(),
            Err(InvalidRequest::CountTooLargeForType(124, 123))
        );
    }

    #[test]
    fn single_write_is_always_valid() {
        let request = Request::WriteSingleRegister(Indexed::new(0xFFFF, 0xFFFF));
        assert_eq!(request.validate(), Ok(()));
        assert_eq!(request.function(), FunctionCode::WriteSingleRegister);
    }

    #[test]
    fn display_respects_level() {
        let request = Request::WriteMultipleRegisters(WriteMultiple::from(4, vec![2, 11]).unwrap());

        let header = RequestDisplay::new(AppDecodeLevel::FunctionCode, &request).to_string();
        assert_eq!(header, "WRITE MULTIPLE REGISTERS (0x10)");

        let values = RequestDisplay::new(AppDecodeLevel::DataValues, &request).to_string();
        assert_eq!(
            values,
            "WRITE MULTIPLE REGISTERS (0x10) start: 0x0004 qty: 2\n\
             idx: 0x0004 value: 0x0002\n\
             idx: 0x0005 value: 0x000B"
        );
    }
}
