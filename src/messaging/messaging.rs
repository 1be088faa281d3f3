use std::fmt::Debug;
use std::net::SocketAddr;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tracing::error;

use crate::messaging::messages::WildfireMessage;

/// Size of receive buffers - comfortably larger than the largest valid datagram
pub const RECV_BUF_SIZE: usize = 2048;

/// The sending side of messaging, abstracted so that protocol logic can be tested without
///  a network.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageSender: Debug + Send + Sync + 'static {
    /// Sending is fire-and-forget at the transport level: failures are logged, and it is up
    ///  to the protocol to detect loss through missing acknowledgements.
    async fn send(&self, to: SocketAddr, msg: &WildfireMessage) {
        if let Err(e) = self.try_send(to, msg).await {
            error!("error sending {:?} to {:?}: {}", msg.message_type(), to, e);
        }
    }

    async fn try_send(&self, to: SocketAddr, msg: &WildfireMessage) -> anyhow::Result<()>;
}
