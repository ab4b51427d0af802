use tokio::sync::mpsc;

use crate::client::message::{Command, RequestMessage};
use crate::exchange::{execute, ExchangePolicy};
use crate::transport::Transport;

/// Owns the transport and runs exchanges one at a time
pub(crate) struct ClientTask<T> {
    rx: mpsc::Receiver<Command>,
    transport: T,
    policy: ExchangePolicy,
}

impl<T> ClientTask<T>
where
    T: Transport,
{
    pub(crate) fn new(rx: mpsc::Receiver<Command>, transport: T, policy: ExchangePolicy) -> Self {
        Self {
            rx,
            transport,
            policy,
        }
    }

    /// Process commands until every [`Channel`](crate::client::Channel) is dropped
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Request(request) => self.run_one_request(request).await,
                Command::SetDecodeLevel(level) => {
                    tracing::info!("decode level changed to {:?}", level);
                    self.policy.decode = level;
                }
            }
        }

        tracing::info!("all channel handles dropped, client task exiting");
    }

    async fn run_one_request(&mut self, message: RequestMessage) {
        let result = execute(
            message.slave,
            &message.request,
            &mut self.transport,
            &self.policy,
        )
        .await;
        message.complete(result);
    }
}
