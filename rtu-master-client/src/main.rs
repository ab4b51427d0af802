//! Command-line Modbus RTU master

use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use rtu_master::client::{spawn_rtu_client_task, Channel};
use rtu_master::serial::SerialSettings;
use rtu_master::*;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("bad register value: {0}")]
    BadInt(#[from] ParseIntError),
    #[error("{0}")]
    Request(#[from] InvalidRequest),
    #[error("{}", describe(.0))]
    Exchange(#[from] ExchangeError),
    #[error("unable to open serial port: {0}")]
    Open(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(name = "rtu-master-client")]
#[command(about = "A command line program for making Modbus RTU master requests")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Path of the serial port (e.g. /dev/ttyUSB0 or COM3)")]
    port: String,

    #[arg(long, default_value_t = 19200, help = "Baud rate of the serial port")]
    baud: u32,

    #[arg(long, value_enum, default_value_t = ParityArg::Even, help = "Parity of the serial port")]
    parity: ParityArg,

    #[arg(long, value_enum, default_value_t = StopBitsArg::One, help = "Number of stop bits")]
    stop_bits: StopBitsArg,

    #[arg(long, value_enum, default_value_t = DataBitsArg::Eight, help = "Number of data bits")]
    data_bits: DataBitsArg,

    #[arg(short = 'i', long, default_value = "1", help = "Address of the Modbus slave (1 to 247)")]
    slave: u8,

    #[arg(long, default_value_t = 1000, help = "Response timeout in milliseconds")]
    timeout_ms: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, help = "Number of retries after a timeout or corrupted reply")]
    retries: usize,

    #[arg(short = 'p', long, help = "Optional polling period in milliseconds")]
    period: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, ValueEnum)]
enum ParityArg {
    None,
    Odd,
    Even,
}

#[derive(Copy, Clone, ValueEnum)]
enum StopBitsArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

#[derive(Copy, Clone, ValueEnum)]
enum DataBitsArg {
    #[value(name = "7")]
    Seven,
    #[value(name = "8")]
    Eight,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "rhr", about = "read holding registers")]
    ReadHoldingRegisters(ReadArgs),

    #[command(name = "rir", about = "read input registers")]
    ReadInputRegisters(ReadArgs),

    #[command(name = "wsr", about = "write single register")]
    WriteSingleRegister(WriteSingleRegisterArgs),

    #[command(name = "wmr", about = "write multiple registers")]
    WriteMultipleRegisters(WriteMultipleRegistersArgs),
}

#[derive(Args)]
struct ReadArgs {
    #[arg(short = 's', long, help = "the starting address")]
    start: u16,

    #[arg(short = 'q', long, help = "quantity of values")]
    quantity: u16,
}

#[derive(Args)]
struct WriteSingleRegisterArgs {
    #[arg(short = 'i', long, help = "the address of the register")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the register")]
    value: u16,
}

#[derive(Args)]
struct WriteMultipleRegistersArgs {
    #[arg(short = 's', long, help = "the starting address of the registers")]
    start: u16,

    #[arg(
        short = 'v',
        long,
        help = "the values of the registers specified as a comma delimited list (e.g. 1,4,7)"
    )]
    values: String,
}

impl From<ParityArg> for serial::Parity {
    fn from(value: ParityArg) -> Self {
        match value {
            ParityArg::None => serial::Parity::None,
            ParityArg::Odd => serial::Parity::Odd,
            ParityArg::Even => serial::Parity::Even,
        }
    }
}

impl From<StopBitsArg> for serial::StopBits {
    fn from(value: StopBitsArg) -> Self {
        match value {
            StopBitsArg::One => serial::StopBits::One,
            StopBitsArg::Two => serial::StopBits::Two,
        }
    }
}

impl From<DataBitsArg> for serial::DataBits {
    fn from(value: DataBitsArg) -> Self {
        match value {
            DataBitsArg::Seven => serial::DataBits::Seven,
            DataBitsArg::Eight => serial::DataBits::Eight,
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    if let Err(ref e) = run().await {
        println!("error: {e}");
    }

    Ok(())
}

async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    let settings = SerialSettings {
        baud_rate: cli.baud,
        data_bits: cli.data_bits.into(),
        stop_bits: cli.stop_bits.into(),
        parity: cli.parity.into(),
        ..SerialSettings::default()
    };

    let slave = SlaveAddress::new(cli.slave)?;
    let port = serial::open(&cli.port, settings)?;
    let policy = ExchangePolicy::new(
        Duration::from_millis(cli.timeout_ms),
        cli.retries,
        MAX_RESPONSE_LENGTH,
    )
    .with_decode_level(AppDecodeLevel::DataValues.into());

    let channel = spawn_rtu_client_task(port, policy, 1);

    match cli.period {
        None => run_command(&cli.command, &channel, slave).await,
        Some(period_ms) => {
            let period = Duration::from_millis(period_ms);
            loop {
                // keep polling through failures on a shared line
                if let Err(err) = run_command(&cli.command, &channel, slave).await {
                    tracing::warn!("{}", err);
                }
                tokio::time::sleep(period).await
            }
        }
    }
}

async fn run_command(command: &Command, channel: &Channel, slave: SlaveAddress) -> Result<(), Error> {
    match command {
        Command::ReadHoldingRegisters(args) => {
            let range = AddressRange::try_from(args.start, args.quantity)?;
            for x in channel.read_holding_registers(slave, range).await? {
                println!("index: {} value: {}", x.index, x.value)
            }
        }
        Command::ReadInputRegisters(args) => {
            let range = AddressRange::try_from(args.start, args.quantity)?;
            for x in channel.read_input_registers(slave, range).await? {
                println!("index: {} value: {}", x.index, x.value)
            }
        }
        Command::WriteSingleRegister(args) => {
            let echo = channel
                .write_single_register(slave, Indexed::new(args.index, args.value))
                .await?;
            println!("wrote index: {} value: {}", echo.index, echo.value);
        }
        Command::WriteMultipleRegisters(args) => {
            let values = parse_register_values(&args.values)?;
            let write_multiple = WriteMultiple::from(args.start, values)?;
            let range = channel
                .write_multiple_registers(slave, write_multiple)
                .await?;
            println!("wrote {} registers starting at {}", range.count, range.start);
        }
    }
    Ok(())
}

fn parse_register_values(values_str: &str) -> Result<Vec<u16>, ParseIntError> {
    let mut values: Vec<u16> = Vec::new();
    for value in values_str.split(',') {
        values.push(u16::from_str(value.trim())?);
    }
    Ok(values)
}

/// adds the standard meaning to device exceptions
fn describe(err: &ExchangeError) -> String {
    match err.exception_code() {
        Some(code) => format!("{err} ({})", ExceptionCode::from(code)),
        None => err.to_string(),
    }
}
