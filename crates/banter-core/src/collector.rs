use crate::event::{ClientEvent, EventReceiver};
use crate::message::Message;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;

#[derive(Clone, Copy, Debug)]
pub struct CollectorOptions {
    /// Idle window after which collection ends.
    pub idle_ms: u64,
    pub max_matches: Option<usize>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            idle_ms: 10_000,
            max_matches: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorEnd {
    Idle,
    Limit,
    Closed,
}

/// Gathers new messages in one chat that pass a caller-supplied filter.
/// Lagged event frames are skipped, not treated as a stop.
pub struct MessageCollector {
    rx: EventReceiver,
    chat_id: String,
    filter: Box<dyn Fn(&Message) -> bool + Send>,
    options: CollectorOptions,
    matched: usize,
}

impl MessageCollector {
    pub fn new(
        rx: EventReceiver,
        chat_id: impl Into<String>,
        filter: impl Fn(&Message) -> bool + Send + 'static,
        options: CollectorOptions,
    ) -> Self {
        Self {
            rx,
            chat_id: chat_id.into(),
            filter: Box::new(filter),
            options,
            matched: 0,
        }
    }

    /// Next matching message, or the reason collection ended.
    pub async fn next(&mut self) -> Result<Message, CollectorEnd> {
        if let Some(limit) = self.options.max_matches {
            if self.matched >= limit {
                return Err(CollectorEnd::Limit);
            }
        }
        loop {
            let event = match timeout(Duration::from_millis(self.options.idle_ms), self.rx.recv())
                .await
            {
                Err(_) => return Err(CollectorEnd::Idle),
                Ok(Err(RecvError::Closed)) => return Err(CollectorEnd::Closed),
                Ok(Err(RecvError::Lagged(_))) => continue,
                Ok(Ok(event)) => event,
            };
            if let ClientEvent::MessageCreate(message) = event {
                if message.chat_id == self.chat_id && (self.filter)(&message) {
                    self.matched += 1;
                    return Ok(message);
                }
            }
        }
    }

    /// Runs until the collector ends, returning everything it matched.
    pub async fn collect(mut self) -> (Vec<Message>, CollectorEnd) {
        let mut messages = Vec::new();
        loop {
            match self.next().await {
                Ok(message) => messages.push(message),
                Err(end) => return (messages, end),
            }
        }
    }
}
