pub use phys::PhysLayer;

mod phys;

/// Serial port settings
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SerialSettings {
    /// Baud rate of the port
    pub baud_rate: u32,
    /// Number of data bits
    pub data_bits: DataBits,
    /// Types of flow control
    pub flow_control: FlowControl,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Parity setting
    pub parity: Parity,
}

impl Default for SerialSettings {
    /// 19200 baud, 8 data bits, even parity, 1 stop bit and no flow control
    fn default() -> Self {
        Self {
            baud_rate: 19200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            stop_bits: StopBits::One,
            parity: Parity::Even,
        }
    }
}

/// Number of bits per character
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataBits {
    /// 5 bits per character
    Five,
    /// 6 bits per character
    Six,
    /// 7 bits per character
    Seven,
    /// 8 bits per character
    Eight,
}

/// Flow control modes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlowControl {
    /// No flow control
    None,
    /// Flow control using XON/XOFF bytes
    Software,
    /// Flow control using RTS/CTS signals
    Hardware,
}

/// Number of stop bits
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopBits {
    /// One stop bit
    One,
    /// Two stop bits
    Two,
}

/// Parity checking modes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit
    None,
    /// Parity bit sets odd number of 1 bits
    Odd,
    /// Parity bit sets even number of 1 bits
    Even,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(from: DataBits) -> Self {
        match from {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(from: FlowControl) -> Self {
        match from {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(from: StopBits) -> Self {
        match from {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(from: Parity) -> Self {
        match from {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Open a serial port for use as a [`Transport`](crate::Transport)
pub fn open(path: &str, settings: SerialSettings) -> Result<PhysLayer, std::io::Error> {
    let builder = tokio_serial::new(path, settings.baud_rate)
        .data_bits(settings.data_bits.into())
        .flow_control(settings.flow_control.into())
        .stop_bits(settings.stop_bits.into())
        .parity(settings.parity.into());
    let stream = tokio_serial::SerialStream::open(&builder)?;
    tracing::info!("opened serial port {} at {} baud", path, settings.baud_rate);
    Ok(PhysLayer::new_serial(stream, settings.baud_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_8e1_at_19200() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.flow_control, FlowControl::None);
    }
}
