use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Broadcast-backed event bus. Every handler sees every event.
#[derive(Clone)]
pub struct EventBus<E: Clone + Send + 'static> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        tracing::debug!(capacity, "📬️ Event bus initialized");
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many will receive it.
    pub fn publish(&self, event: E) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("📬️ Event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Run `handler` for every event until the bus is dropped.
    ///
    /// Each invocation runs in its own task so a panicking handler is logged
    /// and the consumer carries on with the next event.
    pub fn spawn_handler(&self, name: &'static str, handler: Handler<E>) -> JoinHandle<()> {
        let mut receiver = self.subscribe();

        tokio::spawn(async move {
            tracing::debug!(consumer = name, "📬️ Starting event handler");

            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let handler = Arc::clone(&handler);
                        let job = tokio::spawn(async move { (handler)(event).await });
                        if let Err(e) = job.await {
                            tracing::error!(consumer = name, error = %e, "📬️ Event handler failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(consumer = name, skipped, "📬️ Event handler lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            tracing::debug!(consumer = name, "📬️ Event handler has shut down");
        })
    }
}
