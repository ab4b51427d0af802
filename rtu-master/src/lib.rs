//! An async implementation of a [Modbus](http://modbus.org/) RTU master
//! using [Tokio](https://docs.rs/tokio) and Rust's `async/await` syntax.
//!
//! # Features
//!
//! * Panic-free parsing
//! * CRC-16/MODBUS computed from a precomputed table
//! * Every failure is classified: timeout, CRC mismatch, address mismatch,
//!   malformed frame, device exception or transport failure
//! * Configurable retries on timeouts and corrupted replies
//! * Cloneable client [`Channel`](client::Channel) that serializes requests from many tasks
//!   onto one serial line
//! * Protocol decoding at multiple levels via [`tracing`](https://docs.rs/tracing)
//!
//! # Supported Functions
//!
//! * Read Holding Registers (0x03)
//! * Read Input Registers (0x04)
//! * Write Single Register (0x06)
//! * Write Multiple Registers (0x10)
//!
//! # Example
//!
//! Periodically poll some holding registers over a serial port
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use rtu_master::client::spawn_rtu_client_task;
//! use rtu_master::serial::{open, SerialSettings};
//! use rtu_master::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let port = open("/dev/ttyUSB0", SerialSettings::default())?;
//!     let policy = ExchangePolicy::new(
//!         Duration::from_secs(1),
//!         DEFAULT_MAX_RETRIES,
//!         MAX_RESPONSE_LENGTH,
//!     );
//!     let channel = spawn_rtu_client_task(port, policy, 16);
//!
//!     let slave = SlaveAddress::new(1)?;
//!     let range = AddressRange::try_from(0, 10)?;
//!
//!     loop {
//!         match channel.read_holding_registers(slave, range).await {
//!             Ok(values) => {
//!                 for x in values {
//!                     println!("index: {} value: {}", x.index, x.value)
//!                 }
//!             }
//!             Err(err) => println!("error: {err}"),
//!         }
//!
//!         tokio::time::sleep(Duration::from_secs(3)).await
//!     }
//! }
//! ```

pub use crate::common::function::FunctionCode;
pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::*;
pub use crate::exchange::*;
pub use crate::pdu::{Request, Response};
pub use crate::transport::*;
pub use crate::types::*;

pub mod checksum;
/// Client API
pub mod client;
pub mod frame;
/// Serial port transport
#[cfg(feature = "serial")]
pub mod serial;

// only the serial tests use tokio-test
#[cfg(all(test, not(feature = "serial")))]
use tokio_test as _;

// internal modules
mod common;
mod constants;
mod decode;
mod error;
mod exception;
mod exchange;
#[cfg(test)]
mod mock;
mod pdu;
mod transport;
mod types;
