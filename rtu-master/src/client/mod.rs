use std::future::Future;

pub use channel::Channel;

use crate::exchange::ExchangePolicy;
use crate::transport::Transport;

mod channel;
mod message;
mod task;

/// Spawn a task onto the current tokio runtime that owns `transport`
///
/// The task exits once every clone of the returned [`Channel`] is dropped.
///
/// * `transport` - line the task will exchange frames on
/// * `policy` - timeout, retry, and logging parameters for every exchange
/// * `max_queued_requests` - requests that may wait while another is in progress, at least 1
///
/// Must be called from within a tokio runtime.
pub fn spawn_rtu_client_task<T>(
    transport: T,
    policy: ExchangePolicy,
    max_queued_requests: usize,
) -> Channel
where
    T: Transport + 'static,
{
    let (channel, task) = create_rtu_client_task(transport, policy, max_queued_requests);
    tokio::spawn(task);
    channel
}

/// Create the client task future and its [`Channel`] without spawning it
///
/// Useful when the caller manages its own runtime or wants to await the task.
/// A `max_queued_requests` of 0 is treated as 1.
pub fn create_rtu_client_task<T>(
    transport: T,
    policy: ExchangePolicy,
    max_queued_requests: usize,
) -> (Channel, impl Future<Output = ()> + Send + 'static)
where
    T: Transport + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(max_queued_requests.max(1));
    let task = task::ClientTask::new(rx, transport, policy);
    (Channel::new(tx), task.run())
}
