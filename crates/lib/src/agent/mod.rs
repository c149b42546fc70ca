//! Agent persona: turns inbound text into a reply and posts it back through the workspace.
//!
//! Replies are rule-based (see [`ReplyPolicy`]); each event is handled on its own with no
//! conversation memory. Mentions and direct messages always get an answer; messages in the
//! c-suite channel only when the c-suite keywords match.

mod policy;

pub use policy::{ReplyPolicy, ReplyRule, MESSAGE_PLACEHOLDER};

use crate::channels::{
    EventHandler, HandlerError, InboundEvent, OutboundReply, ReplySender, Subscriptions,
};
use crate::config::{self, Config};
use crate::roster::Persona;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyword sets and the channel the agent watches.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Keywords selecting the strategic reply for mentions and direct messages.
    pub keywords: Vec<String>,
    /// Keywords that make the agent speak up in the c-suite channel.
    pub csuite_keywords: Vec<String>,
    /// When None, channel messages are not subscribed to.
    pub csuite_channel: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let agents = config::AgentsConfig::default();
        Self {
            keywords: agents.keywords,
            csuite_keywords: agents.csuite_keywords,
            csuite_channel: None,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keywords: config.agents.keywords.clone(),
            csuite_keywords: config.agents.csuite_keywords.clone(),
            csuite_channel: config::resolve_csuite_channel(config),
        }
    }
}

/// Greeting template for a persona; `{message}` is filled with the inbound text.
pub fn greeting_reply(persona: &Persona) -> String {
    format!(
        "Hello! I am the {}. Thank you for your message: \"{}\"",
        persona.name, MESSAGE_PLACEHOLDER
    )
}

/// Reply used when a strategy keyword matches.
pub fn strategic_reply(persona: &Persona) -> String {
    format!(
        "I see we're discussing strategy. As {}, I'm here to help with strategic decisions.",
        persona.title()
    )
}

pub struct Agent {
    persona: Persona,
    policy: ReplyPolicy,
    csuite_policy: ReplyPolicy,
    csuite_channel: Option<String>,
    sender: Arc<dyn ReplySender>,
}

impl Agent {
    pub fn new(persona: Persona, settings: AgentSettings, sender: Arc<dyn ReplySender>) -> Self {
        let strategic = strategic_reply(&persona);
        let policy = ReplyPolicy::new()
            .with_rule(ReplyRule::new(&settings.keywords, strategic.clone()))
            .with_fallback(greeting_reply(&persona));
        let csuite_policy =
            ReplyPolicy::new().with_rule(ReplyRule::new(&settings.csuite_keywords, strategic));
        Self {
            persona,
            policy,
            csuite_policy,
            csuite_channel: settings.csuite_channel,
            sender,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn csuite_channel(&self) -> Option<&str> {
        self.csuite_channel.as_deref()
    }

    /// Reply for a mention or direct message: strategic reply on a keyword match, greeting otherwise.
    pub fn process_message(&self, text: &str) -> String {
        self.policy.respond(text).unwrap_or_default()
    }

    /// Reply for a c-suite channel message, or None when no c-suite keyword matches.
    pub fn csuite_reply(&self, text: &str) -> Option<String> {
        self.csuite_policy.respond(text)
    }

    /// Reply to a mention, threaded on the event. Blank text is rejected.
    pub fn mention_reply(&self, event: &InboundEvent) -> Result<OutboundReply, HandlerError> {
        log::info!("{}: mention from {}: {}", self.persona.id, event.user, event.text);
        self.threaded_reply(event)
    }

    /// Reply to a c-suite channel message; None outside that channel or without a keyword match.
    pub fn csuite_message_reply(&self, event: &InboundEvent) -> Option<OutboundReply> {
        if self.csuite_channel() != Some(event.channel.as_str()) {
            return None;
        }
        log::info!("{}: c-suite message: {}", self.persona.id, event.text);
        let text = self.csuite_reply(&event.text)?;
        Some(OutboundReply::in_thread_of(event, text))
    }

    /// Reply to a direct message. Blank text is rejected.
    pub fn direct_message_reply(
        &self,
        event: &InboundEvent,
    ) -> Result<OutboundReply, HandlerError> {
        log::info!("{}: direct message from {}", self.persona.id, event.user);
        self.threaded_reply(event)
    }

    fn threaded_reply(&self, event: &InboundEvent) -> Result<OutboundReply, HandlerError> {
        if event.text.trim().is_empty() {
            return Err(HandlerError::Rejected(format!(
                "empty message from {} in {}",
                event.user, event.channel
            )));
        }
        Ok(OutboundReply::in_thread_of(event, self.process_message(&event.text)))
    }

    async fn post(&self, reply: &OutboundReply) -> Result<(), HandlerError> {
        self.sender.post_reply(reply).await?;
        log::debug!(
            "{}: reply posted to {} via {}",
            self.persona.id,
            reply.channel,
            self.sender.id()
        );
        Ok(())
    }

    pub async fn handle_mention(&self, event: &InboundEvent) -> Result<(), HandlerError> {
        let reply = self.mention_reply(event)?;
        self.post(&reply).await
    }

    /// Answers only in the configured c-suite channel and only on a keyword match.
    /// Returns whether a reply was sent.
    pub async fn handle_csuite_message(&self, event: &InboundEvent) -> Result<bool, HandlerError> {
        let Some(reply) = self.csuite_message_reply(event) else {
            return Ok(false);
        };
        self.post(&reply).await?;
        Ok(true)
    }

    pub async fn handle_direct_message(&self, event: &InboundEvent) -> Result<(), HandlerError> {
        let reply = self.direct_message_reply(event)?;
        self.post(&reply).await
    }

    /// Register mention, c-suite channel and direct message handlers.
    pub fn subscribe(self: &Arc<Self>, subscriptions: &mut Subscriptions) {
        subscriptions.on_mention(Arc::new(AgentRoute {
            agent: self.clone(),
            route: Route::Mention,
        }));
        match self.csuite_channel() {
            Some(channel) => subscriptions.on_message(
                channel,
                Arc::new(AgentRoute {
                    agent: self.clone(),
                    route: Route::Csuite,
                }),
            ),
            None => log::warn!(
                "{}: no c-suite channel configured; channel messages will be ignored",
                self.persona.id
            ),
        }
        subscriptions.on_direct_message(Arc::new(AgentRoute {
            agent: self.clone(),
            route: Route::Direct,
        }));
    }
}

#[derive(Debug, Clone, Copy)]
enum Route {
    Mention,
    Csuite,
    Direct,
}

struct AgentRoute {
    agent: Arc<Agent>,
    route: Route,
}

#[async_trait]
impl EventHandler for AgentRoute {
    fn prepare(&self, event: &InboundEvent) -> Result<Option<OutboundReply>, HandlerError> {
        match self.route {
            Route::Mention => self.agent.mention_reply(event).map(Some),
            Route::Csuite => Ok(self.agent.csuite_message_reply(event)),
            Route::Direct => self.agent.direct_message_reply(event).map(Some),
        }
    }

    async fn deliver(&self, reply: OutboundReply) -> Result<(), HandlerError> {
        self.agent.post(&reply).await
    }
}
