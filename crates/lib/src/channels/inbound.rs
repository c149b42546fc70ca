//! Events received from the workspace and replies sent back to it.

/// Which workspace subscription produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The bot account was mentioned (`app_mention`).
    Mention,
    /// A plain channel or direct message (`message`).
    Message,
}

/// An event from the workspace. Never stored; handlers only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub user: String,
    pub text: String,
    pub channel: String,
    /// Message timestamp; used as the thread anchor for replies.
    pub ts: String,
    /// Slack channel type ("channel", "group", "im", ...) when the event carries one.
    pub channel_type: Option<String>,
}

impl InboundEvent {
    /// True for messages sent to the bot in a one-to-one conversation.
    pub fn is_direct(&self) -> bool {
        self.kind == EventKind::Message && self.channel_type.as_deref() == Some("im")
    }
}

/// A reply to post into a channel, optionally threaded under the triggering message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub text: String,
    pub channel: String,
    pub thread_ts: Option<String>,
}

impl OutboundReply {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel: channel.into(),
            thread_ts: None,
        }
    }

    /// Reply in the event's channel, threaded under the event's message.
    pub fn in_thread_of(event: &InboundEvent, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel: event.channel.clone(),
            thread_ts: Some(event.ts.clone()),
        }
    }
}
