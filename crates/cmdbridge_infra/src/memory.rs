use anyhow::anyhow;
use async_trait::async_trait;
use cmdbridge_domain::MessageSink;
use tokio::sync::mpsc;

/// In-process message channel backed by an unbounded mpsc queue.
pub struct MemoryChannel<M> {
    sender: mpsc::UnboundedSender<M>,
}

impl<M> Clone for MemoryChannel<M> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<M: Send + 'static> MemoryChannel<M> {
    /// Creates the posting half and the receiving half of a channel.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<M>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl<M: Send + 'static> MessageSink<M> for MemoryChannel<M> {
    async fn post(&self, message: M) -> anyhow::Result<()> {
        self.sender
            .send(message)
            .map_err(|_| anyhow!("Message channel receiver was dropped"))
    }
}
