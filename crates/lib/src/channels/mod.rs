//! Workspace messaging (Slack).
//!
//! The Slack connector turns Socket Mode envelopes into [`InboundEvent`]s and posts replies.
//! [`Subscriptions`] route each event to the handlers registered for it.

mod dispatch;
mod error;
mod inbound;
mod slack;

pub use dispatch::{
    spawn_dispatcher, EventHandler, PendingReply, ReplySender, Subscriptions,
    DELIVERY_DRAIN_TIMEOUT,
};
pub use error::{ChannelError, HandlerError};
pub use inbound::{EventKind, InboundEvent, OutboundReply};
pub use slack::{inbound_from_payload, SlackChannel, SocketEnvelope};
