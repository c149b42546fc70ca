//! Subscriptions: route inbound events to registered handlers.

use crate::channels::error::{ChannelError, HandlerError};
use crate::channels::inbound::{EventKind, InboundEvent, OutboundReply};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// How long replies still in flight may take once the inbound side has closed.
pub const DELIVERY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts replies into the workspace.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Connector id (e.g. "slack").
    fn id(&self) -> &str;
    /// Post a reply, threaded when `reply.thread_ts` is set.
    async fn post_reply(&self, reply: &OutboundReply) -> Result<(), ChannelError>;
    /// Post plain text to a channel.
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), ChannelError> {
        self.post_reply(&OutboundReply::new(channel, text)).await
    }
}

/// Callback for one kind of inbound event, in two steps. `prepare` decides the reply and runs
/// in arrival order; `deliver` posts it and may overlap with later events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn prepare(&self, event: &InboundEvent) -> Result<Option<OutboundReply>, HandlerError>;
    async fn deliver(&self, reply: OutboundReply) -> Result<(), HandlerError>;
}

/// A reply prepared for an event, waiting to be posted by its handler.
pub struct PendingReply {
    handler: Arc<dyn EventHandler>,
    reply: OutboundReply,
}

impl PendingReply {
    pub fn reply(&self) -> &OutboundReply {
        &self.reply
    }

    /// Post the reply. Failures are logged and swallowed.
    pub async fn deliver(self) {
        let channel = self.reply.channel.clone();
        if let Err(e) = self.handler.deliver(self.reply).await {
            log::warn!("dispatch: reply to {} not delivered: {}", channel, e);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Mention,
    Channel(String),
    Direct,
}

impl Filter {
    fn accepts(&self, event: &InboundEvent) -> bool {
        match self {
            Filter::Mention => event.kind == EventKind::Mention,
            Filter::Channel(id) => event.kind == EventKind::Message && &event.channel == id,
            Filter::Direct => event.is_direct(),
        }
    }
}

struct Subscription {
    filter: Filter,
    handler: Arc<dyn EventHandler>,
}

/// Registered handlers in registration order. Built once, then shared read-only.
#[derive(Default)]
pub struct Subscriptions {
    subs: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `handler` once per mention event.
    pub fn on_mention(&mut self, handler: Arc<dyn EventHandler>) {
        self.subs.push(Subscription {
            filter: Filter::Mention,
            handler,
        });
    }

    /// Invoke `handler` for message events in `channel_id` only.
    pub fn on_message(&mut self, channel_id: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.subs.push(Subscription {
            filter: Filter::Channel(channel_id.into()),
            handler,
        });
    }

    /// Invoke `handler` for direct (im) messages to the bot.
    pub fn on_direct_message(&mut self, handler: Arc<dyn EventHandler>) {
        self.subs.push(Subscription {
            filter: Filter::Direct,
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Prepare every handler whose filter accepts the event, in registration order.
    /// Handler errors are logged and swallowed. Returns how many handlers ran and the replies
    /// they produced.
    pub fn route(&self, event: &InboundEvent) -> (usize, Vec<PendingReply>) {
        let mut ran = 0;
        let mut pending = Vec::new();
        for sub in self.subs.iter().filter(|s| s.filter.accepts(event)) {
            ran += 1;
            match sub.handler.prepare(event) {
                Ok(Some(reply)) => pending.push(PendingReply {
                    handler: sub.handler.clone(),
                    reply,
                }),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "dispatch: handler failed for {:?} in {}: {}",
                    event.kind,
                    event.channel,
                    e
                ),
            }
        }
        if ran == 0 {
            log::debug!("dispatch: no subscription for {:?} in {}", event.kind, event.channel);
        }
        (ran, pending)
    }

    /// Route the event and post its replies one after another. Returns how many handlers ran.
    pub async fn dispatch(&self, event: &InboundEvent) -> usize {
        let (ran, pending) = self.route(event);
        for reply in pending {
            reply.deliver().await;
        }
        ran
    }
}

/// Receive events until the sender side closes. Events are routed in arrival order on the
/// dispatcher task; each reply is posted on its own task so a slow send only delays that reply.
/// In-flight replies get [`DELIVERY_DRAIN_TIMEOUT`] to finish once the inbound side closes.
pub fn spawn_dispatcher(
    subscriptions: Arc<Subscriptions>,
    mut inbound_rx: mpsc::Receiver<InboundEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut deliveries = JoinSet::new();
        loop {
            tokio::select! {
                event = inbound_rx.recv() => {
                    let Some(event) = event else { break };
                    let (_, pending) = subscriptions.route(&event);
                    for reply in pending {
                        deliveries.spawn(reply.deliver());
                    }
                }
                Some(res) = deliveries.join_next(), if !deliveries.is_empty() => {
                    if let Err(e) = res {
                        log::warn!("dispatch: delivery task failed: {}", e);
                    }
                }
            }
        }
        log::debug!(
            "dispatch: inbound channel closed, {} replies in flight",
            deliveries.len()
        );
        let drained = tokio::time::timeout(DELIVERY_DRAIN_TIMEOUT, async {
            while let Some(res) = deliveries.join_next().await {
                if let Err(e) = res {
                    log::warn!("dispatch: delivery task failed: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            log::warn!("dispatch: dropping {} undelivered replies", deliveries.len());
        }
    })
}
