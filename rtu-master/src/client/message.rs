use tokio::sync::oneshot;

use crate::decode::DecodeLevel;
use crate::error::ExchangeError;
use crate::pdu::{Request, Response};
use crate::types::SlaveAddress;

pub(crate) enum Command {
    Request(RequestMessage),
    SetDecodeLevel(DecodeLevel),
}

/// All of the information the client task needs to process a request
pub(crate) struct RequestMessage {
    pub(crate) slave: SlaveAddress,
    pub(crate) request: Request,
    reply: oneshot::Sender<Result<Response, ExchangeError>>,
}

impl RequestMessage {
    pub(crate) fn new(
        slave: SlaveAddress,
        request: Request,
        reply: oneshot::Sender<Result<Response, ExchangeError>>,
    ) -> Self {
        Self {
            slave,
            request,
            reply,
        }
    }

    pub(crate) fn complete(self, result: Result<Response, ExchangeError>) {
        // the caller may have stopped waiting
        self.reply.send(result).ok();
    }
}
