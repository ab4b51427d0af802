use crate::decode::PhysDecodeLevel;
use std::fmt::Write;

pub(crate) struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    pub(crate) fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        PhysDisplay { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        let mut first = true;
        for byte in chunk {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            write!(f, "{byte:02X}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_only_hides_data() {
        let display = PhysDisplay::new(PhysDecodeLevel::Length, &[0x01, 0x02]);
        assert_eq!(display.to_string(), "2 bytes");
    }

    #[test]
    fn data_is_wrapped_into_lines() {
        let data: Vec<u8> = (0..20).collect();
        let display = PhysDisplay::new(PhysDecodeLevel::Data, &data);
        assert_eq!(
            display.to_string(),
            "20 bytes\n00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F 10 11\n12 13"
        );
    }
}
