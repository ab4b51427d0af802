use std::fmt::{Display, Formatter};

mod constants {
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 0x03;
    pub(crate) const READ_INPUT_REGISTERS: u8 = 0x04;
    pub(crate) const WRITE_SINGLE_REGISTER: u8 = 0x06;
    pub(crate) const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
}

/// Function codes supported by the master
///
/// The function code determines the shape of the PDU in both the request and the response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = constants::READ_HOLDING_REGISTERS,
    /// Read Input Registers (0x04)
    ReadInputRegisters = constants::READ_INPUT_REGISTERS,
    /// Write Single Register (0x06)
    WriteSingleRegister = constants::WRITE_SINGLE_REGISTER,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = constants::WRITE_MULTIPLE_REGISTERS,
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            FunctionCode::ReadHoldingRegisters => {
                write!(f, "READ HOLDING REGISTERS ({:#04X})", self.get_value())
            }
            FunctionCode::ReadInputRegisters => {
                write!(f, "READ INPUT REGISTERS ({:#04X})", self.get_value())
            }
            FunctionCode::WriteSingleRegister => {
                write!(f, "WRITE SINGLE REGISTER ({:#04X})", self.get_value())
            }
            FunctionCode::WriteMultipleRegisters => {
                write!(f, "WRITE MULTIPLE REGISTERS ({:#04X})", self.get_value())
            }
        }
    }
}

impl FunctionCode {
    /// Raw value placed on the wire
    pub const fn get_value(self) -> u8 {
        self as u8
    }

    /// Value a device answers with when it rejects the request with an exception
    pub const fn as_error(self) -> u8 {
        self.get_value() | 0x80
    }

    /// Look up a supported function code from its raw value
    pub fn get(value: u8) -> Option<Self> {
        match value {
            constants::READ_HOLDING_REGISTERS => Some(FunctionCode::ReadHoldingRegisters),
            constants::READ_INPUT_REGISTERS => Some(FunctionCode::ReadInputRegisters),
            constants::WRITE_SINGLE_REGISTER => Some(FunctionCode::WriteSingleRegister),
            constants::WRITE_MULTIPLE_REGISTERS => Some(FunctionCode::WriteMultipleRegisters),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_form_sets_high_bit() {
        assert_eq!(FunctionCode::ReadHoldingRegisters.as_error(), 0x83);
        assert_eq!(FunctionCode::WriteMultipleRegisters.as_error(), 0x90);
    }

    #[test]
    fn lookup_only_accepts_supported_codes() {
        for code in [
            FunctionCode::ReadHoldingRegisters,
            FunctionCode::ReadInputRegisters,
            FunctionCode::WriteSingleRegister,
            FunctionCode::WriteMultipleRegisters,
        ] {
            assert_eq!(FunctionCode::get(code.get_value()), Some(code));
        }
        assert_eq!(FunctionCode::get(0x01), None);
        assert_eq!(FunctionCode::get(0x83), None);
    }
}
