//! Agent handlers wired through subscriptions, with a recording reply sender in place of Slack.

use async_trait::async_trait;
use csuite::agent::{Agent, AgentSettings};
use csuite::channels::{
    ChannelError, EventKind, InboundEvent, OutboundReply, ReplySender, Subscriptions,
};
use csuite::roster;
use std::sync::Arc;
use tokio::sync::Mutex;

const CSUITE: &str = "test-channel";

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<OutboundReply>>,
    fail: bool,
}

#[async_trait]
impl ReplySender for RecordingSender {
    fn id(&self) -> &str {
        "recording"
    }

    async fn post_reply(&self, reply: &OutboundReply) -> Result<(), ChannelError> {
        if self.fail {
            return Err(ChannelError::Send("transport down".to_string()));
        }
        self.sent.lock().await.push(reply.clone());
        Ok(())
    }
}

fn settings() -> AgentSettings {
    AgentSettings {
        csuite_channel: Some(CSUITE.to_string()),
        ..AgentSettings::default()
    }
}

fn wired(sender: Arc<RecordingSender>) -> (Arc<Agent>, Subscriptions) {
    let agent = Arc::new(Agent::new(roster::find("ceo").unwrap(), settings(), sender));
    let mut subs = Subscriptions::new();
    agent.subscribe(&mut subs);
    (agent, subs)
}

fn message(channel: &str, text: &str) -> InboundEvent {
    InboundEvent {
        kind: EventKind::Message,
        user: "U12345".to_string(),
        text: text.to_string(),
        channel: channel.to_string(),
        ts: "12345.678".to_string(),
        channel_type: Some("channel".to_string()),
    }
}

fn mention(text: &str) -> InboundEvent {
    InboundEvent {
        kind: EventKind::Mention,
        channel_type: None,
        ..message("C12345", text)
    }
}

#[tokio::test]
async fn mention_gets_greeting_in_thread() {
    let sender = Arc::new(RecordingSender::default());
    let (_agent, subs) = wired(sender.clone());

    subs.dispatch(&mention("Test mention")).await;

    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel, "C12345");
    assert_eq!(sent[0].thread_ts.as_deref(), Some("12345.678"));
    assert!(sent[0].text.contains("Hello! I am the CEO Agent"));
}

#[tokio::test]
async fn csuite_strategy_message_gets_strategic_reply() {
    let sender = Arc::new(RecordingSender::default());
    let (_agent, subs) = wired(sender.clone());

    subs.dispatch(&message(CSUITE, "Let's discuss strategy")).await;

    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("I see we're discussing strategy"));
    assert!(sent[0].text.contains("strategic decisions"));
    assert_eq!(sent[0].thread_ts.as_deref(), Some("12345.678"));
}

#[tokio::test]
async fn csuite_replies_only_for_matching_channel_and_keyword() {
    let cases = [
        (CSUITE, "Let's discuss strategy", true),
        (CSUITE, "Time for a DECISION", true),
        (CSUITE, "Lunch at noon?", false),
        ("C-other", "Let's discuss strategy", false),
        ("C-other", "a decision", false),
    ];
    for (channel, text, expect_reply) in cases {
        let sender = Arc::new(RecordingSender::default());
        let (agent, _) = wired(sender.clone());
        let replied = agent
            .handle_csuite_message(&message(channel, text))
            .await
            .unwrap();
        assert_eq!(replied, expect_reply, "{} / {}", channel, text);
        assert_eq!(sender.sent.lock().await.len(), expect_reply as usize);
    }
}

#[tokio::test]
async fn direct_message_is_answered() {
    let sender = Arc::new(RecordingSender::default());
    let (_agent, subs) = wired(sender.clone());
    let dm = InboundEvent {
        channel_type: Some("im".to_string()),
        ..message("D777", "what's our strategy?")
    };

    assert_eq!(subs.dispatch(&dm).await, 1);
    let sent = sender.sent.lock().await;
    assert_eq!(sent[0].channel, "D777");
    assert!(sent[0].text.contains("strategic decisions"));
}

#[tokio::test]
async fn without_csuite_channel_only_mentions_and_dms_subscribe() {
    let sender = Arc::new(RecordingSender::default());
    let agent = Arc::new(Agent::new(
        roster::find("ceo").unwrap(),
        AgentSettings::default(),
        sender.clone(),
    ));
    let mut subs = Subscriptions::new();
    agent.subscribe(&mut subs);

    assert_eq!(subs.len(), 2);
    assert_eq!(subs.dispatch(&message(CSUITE, "strategy")).await, 0);
    assert!(sender.sent.lock().await.is_empty());
}

#[tokio::test]
async fn send_failure_is_reported_and_swallowed_by_dispatch() {
    let sender = Arc::new(RecordingSender {
        fail: true,
        ..Default::default()
    });
    let (agent, subs) = wired(sender.clone());

    assert!(agent.handle_mention(&mention("hello")).await.is_err());
    assert_eq!(subs.dispatch(&mention("hello")).await, 1);
    assert_eq!(subs.dispatch(&message(CSUITE, "strategy")).await, 1);
}

#[tokio::test]
async fn custom_keywords_replace_the_defaults() {
    let sender = Arc::new(RecordingSender::default());
    let agent = Agent::new(
        roster::find("ceo").unwrap(),
        AgentSettings {
            keywords: vec!["roadmap".to_string()],
            csuite_keywords: vec!["strategy".to_string()],
            csuite_channel: Some(CSUITE.to_string()),
        },
        sender,
    );
    assert!(agent.process_message("Roadmap review").contains("strategic decisions"));
    assert!(agent.process_message("strategy").starts_with("Hello!"));
    assert!(agent.csuite_reply("a decision").is_none());
}

#[tokio::test]
async fn blank_direct_message_is_not_answered() {
    let sender = Arc::new(RecordingSender::default());
    let (_agent, subs) = wired(sender.clone());
    let dm = InboundEvent {
        channel_type: Some("im".to_string()),
        ..message("D777", "  ")
    };

    assert_eq!(subs.dispatch(&dm).await, 1);
    assert!(sender.sent.lock().await.is_empty());
}
