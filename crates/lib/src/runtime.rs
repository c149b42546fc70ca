//! Agent runtime: connect to Slack, wire the persona's subscriptions, run until shutdown.

use crate::agent::{Agent, AgentSettings};
use crate::channels::{spawn_dispatcher, InboundEvent, SlackChannel, Subscriptions};
use crate::config::{self, Config};
use crate::roster;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

const INBOUND_CAPACITY: usize = 64;

/// Run the configured persona against Slack. Blocks until shutdown (e.g. Ctrl+C).
/// Fails when the persona is unknown or the Slack session cannot be established.
pub async fn run_agent(config: Config) -> Result<()> {
    let persona_id = config::resolve_active_persona(&config);
    let persona = roster::find(&persona_id)
        .with_context(|| format!("unknown agent persona: {}", persona_id))?;

    if config::resolve_slack_signing_secret(&config).is_some() {
        log::debug!("slack signing secret configured (unused in socket mode)");
    }
    if config::resolve_model_api_key(&config).is_some() {
        log::debug!("model api key configured (replies are rule-based)");
    }

    let slack = Arc::new(SlackChannel::new(
        config::resolve_slack_bot_token(&config),
        config::resolve_slack_app_token(&config),
    ));
    let socket_url = slack
        .connect()
        .await
        .context("failed to initialize slack app")?;
    log::info!("slack app initialized successfully");

    let agent = Arc::new(Agent::new(
        persona,
        AgentSettings::from_config(&config),
        slack.clone(),
    ));
    let mut subscriptions = Subscriptions::new();
    agent.subscribe(&mut subscriptions);
    log::info!(
        "{} started with {} subscription(s)",
        agent.persona().name,
        subscriptions.len()
    );
    if let Some(channel) = agent.csuite_channel() {
        log::info!("watching c-suite channel {}", channel);
    }

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(INBOUND_CAPACITY);
    let dispatcher = spawn_dispatcher(Arc::new(subscriptions), inbound_rx);
    let inbound = slack.clone().start_inbound(socket_url, inbound_tx);

    shutdown_signal().await;
    slack.stop();
    let _ = inbound.await;
    // Inbound side is closed; the dispatcher finishes in-flight replies before returning.
    let _ = dispatcher.await;
    log::info!("{} stopped", agent.persona().name);
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}
