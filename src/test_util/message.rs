use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::messaging::messages::WildfireMessage;
use crate::messaging::messaging::MessageSender;

pub fn test_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Records every message instead of sending it, for verification in order of sending
#[derive(Debug, Default)]
pub struct TrackingMockMessageSender {
    tracker: Arc<RwLock<Vec<(SocketAddr, WildfireMessage)>>>,
}
impl TrackingMockMessageSender {
    pub fn new() -> Self {
        Default::default()
    }

    /// removes and returns all messages recorded so far
    pub async fn sent_messages(&self) -> Vec<(SocketAddr, WildfireMessage)> {
        std::mem::take(&mut *self.tracker.write().await)
    }

    pub async fn assert_message_sent(&self, to: SocketAddr, message: WildfireMessage) {
        let mut lock = self.tracker.write().await;
        if lock.is_empty() {
            panic!("no message was sent, expected {:?}", message);
        }

        let (actual_to, actual_msg) = lock.remove(0);
        assert_eq!(actual_msg, message);
        assert_eq!(actual_to, to);
    }

    pub async fn assert_no_remaining_messages(&self) {
        let lock = self.tracker.read().await;
        assert!(lock.is_empty(), "unexpected messages: {:?}", *lock);
    }
}

#[async_trait]
impl MessageSender for TrackingMockMessageSender {
    async fn try_send(&self, to: SocketAddr, msg: &WildfireMessage) -> anyhow::Result<()> {
        self.tracker.write().await.push((to, msg.clone()));
        Ok(())
    }
}
