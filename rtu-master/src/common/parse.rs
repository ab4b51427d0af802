use crate::error::FrameParseError;
use crate::types::{AddressRange, Indexed};

use scursor::ReadCursor;

pub(crate) trait Parse: Sized {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, FrameParseError>;
}

impl Parse for AddressRange {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, FrameParseError> {
        Ok(AddressRange {
            start: cursor.read_u16_be()?,
            count: cursor.read_u16_be()?,
        })
    }
}

impl Parse for Indexed<u16> {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, FrameParseError> {
        Ok(Indexed::new(cursor.read_u16_be()?, cursor.read_u16_be()?))
    }
}

/// Parse the byte count and register values of a read reply
pub(crate) fn parse_registers(
    range: AddressRange,
    cursor: &mut ReadCursor,
) -> Result<Vec<Indexed<u16>>, FrameParseError> {
    let byte_count = cursor.read_u8()? as usize;
    let expected = 2 * usize::from(range.count);

    if byte_count != expected {
        return Err(FrameParseError::RequestByteCountMismatch(
            expected, byte_count,
        ));
    }

    if cursor.remaining() < byte_count {
        return Err(FrameParseError::InsufficientBytesForByteCount(
            byte_count,
            cursor.remaining(),
        ));
    }

    let mut values = Vec::with_capacity(usize::from(range.count));
    for index in range.iter() {
        values.push(Indexed::new(index, cursor.read_u16_be()?));
    }

    expect_empty(cursor)?;
    Ok(values)
}

/// Parse a value the device must echo back unchanged
pub(crate) fn parse_echo<T>(expected: T, cursor: &mut ReadCursor) -> Result<T, FrameParseError>
where
    T: Parse + PartialEq,
{
    let echo = T::parse(cursor)?;
    expect_empty(cursor)?;
    if echo != expected {
        return Err(FrameParseError::ReplyEchoMismatch);
    }
    Ok(echo)
}

pub(crate) fn expect_empty(cursor: &ReadCursor) -> Result<(), FrameParseError> {
    if cursor.is_empty() {
        Ok(())
    } else {
        Err(FrameParseError::TrailingBytes(cursor.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u16, count: u16) -> AddressRange {
        AddressRange { start, count }
    }

    #[test]
    fn parses_registers_with_indices() {
        let mut cursor = ReadCursor::new(&[0x04, 0x12, 0x34, 0xAB, 0xCD]);
        let values = parse_registers(range(3, 2), &mut cursor).unwrap();
        assert_eq!(
            values,
            vec![Indexed::new(3, 0x1234), Indexed::new(4, 0xABCD)]
        );
    }

    #[test]
    fn byte_count_must_match_request() {
        let mut cursor = ReadCursor::new(&[0x02, 0x12, 0x34]);
        assert_eq!(
            parse_registers(range(3, 2), &mut cursor),
            Err(FrameParseError::RequestByteCountMismatch(4, 2))
        );
    }

    #[test]
    fn byte_count_must_match_remaining_bytes() {
        let mut cursor = ReadCursor::new(&[0x04, 0x12, 0x34, 0xAB]);
        assert_eq!(
            parse_registers(range(3, 2), &mut cursor),
            Err(FrameParseError::InsufficientBytesForByteCount(4, 3))
        );

        let mut cursor = ReadCursor::new(&[0x04, 0x12, 0x34, 0xAB, 0xCD, 0xEF]);
        assert_eq!(
            parse_registers(range(3, 2), &mut cursor),
            Err(FrameParseError::TrailingBytes(1))
        );
    }

    #[test]
    fn echo_must_match() {
        let mut cursor = ReadCursor::new(&[0x00, 0x04, 0x00, 0x03]);
        assert_eq!(parse_echo(range(4, 3), &mut cursor), Ok(range(4, 3)));

        let mut cursor = ReadCursor::new(&[0x00, 0x04, 0x00, 0x02]);
        assert_eq!(
            parse_echo(range(4, 3), &mut cursor),
            Err(FrameParseError::ReplyEchoMismatch)
        );

        let mut cursor = ReadCursor::new(&[0x00, 0x04, 0x00]);
        assert_eq!(
            parse_echo(range(4, 3), &mut cursor),
            Err(FrameParseError::InsufficientBytes)
        );
    }
}
