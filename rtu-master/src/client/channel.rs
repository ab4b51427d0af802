use tokio::sync::{mpsc, oneshot};

use crate::client::message::{Command, RequestMessage};
use crate::common::function::FunctionCode;
use crate::decode::DecodeLevel;
use crate::error::{ExchangeError, FrameParseError};
use crate::pdu::{Request, Response};
use crate::types::{AddressRange, Indexed, SlaveAddress, WriteMultiple};

/// Async handle used to make requests on a serial line owned by a client task
///
/// Handles are cheap to clone. Requests from every clone are queued and
/// executed one at a time, so any number of tasks can share one line.
#[derive(Debug, Clone)]
pub struct Channel {
    tx: mpsc::Sender<Command>,
}

impl Channel {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    /// Send any supported request and wait for its outcome
    pub async fn execute(
        &self,
        slave: SlaveAddress,
        request: Request,
    ) -> Result<Response, ExchangeError> {
        let (tx, rx) = oneshot::channel::<Result<Response, ExchangeError>>();
        self.tx
            .send(Command::Request(RequestMessage::new(slave, request, tx)))
            .await?;
        rx.await?
    }

    /// Read holding registers from the slave
    pub async fn read_holding_registers(
        &self,
        slave: SlaveAddress,
        range: AddressRange,
    ) -> Result<Vec<Indexed<u16>>, ExchangeError> {
        match self
            .execute(slave, Request::ReadHoldingRegisters(range))
            .await?
        {
            Response::ReadHoldingRegisters(values) => Ok(values),
            other => Err(unexpected(FunctionCode::ReadHoldingRegisters, &other)),
        }
    }

    /// Read input registers from the slave
    pub async fn read_input_registers(
        &self,
        slave: SlaveAddress,
        range: AddressRange,
    ) -> Result<Vec<Indexed<u16>>, ExchangeError> {
        match self
            .execute(slave, Request::ReadInputRegisters(range))
            .await?
        {
            Response::ReadInputRegisters(values) => Ok(values),
            other => Err(unexpected(FunctionCode::ReadInputRegisters, &other)),
        }
    }

    /// Write a single register on the slave, returning the echo
    pub async fn write_single_register(
        &self,
        slave: SlaveAddress,
        value: Indexed<u16>,
    ) -> Result<Indexed<u16>, ExchangeError> {
        match self
            .execute(slave, Request::WriteSingleRegister(value))
            .await?
        {
            Response::WriteSingleRegister(echo) => Ok(echo),
            other => Err(unexpected(FunctionCode::WriteSingleRegister, &other)),
        }
    }

    /// Write a contiguous block of registers on the slave, returning the echoed range
    pub async fn write_multiple_registers(
        &self,
        slave: SlaveAddress,
        request: WriteMultiple<u16>,
    ) -> Result<AddressRange, ExchangeError> {
        match self
            .execute(slave, Request::WriteMultipleRegisters(request))
            .await?
        {
            Response::WriteMultipleRegisters(range) => Ok(range),
            other => Err(unexpected(FunctionCode::WriteMultipleRegisters, &other)),
        }
    }

    /// Change the decoding applied to subsequent requests
    pub async fn set_decode_level(&self, level: DecodeLevel) -> Result<(), ExchangeError> {
        self.tx.send(Command::SetDecodeLevel(level)).await?;
        Ok(())
    }
}

fn unexpected(expected: FunctionCode, actual: &Response) -> ExchangeError {
    ExchangeError::MalformedFrame(FrameParseError::UnexpectedFunction {
        actual: actual.function().get_value(),
        expected: expected.get_value(),
        error: expected.as_error(),
    })
}
