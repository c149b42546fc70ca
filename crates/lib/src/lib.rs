//! C-suite agents core library: Slack channel, rule-based agent personas, and the dashboard API
//! used by the `csuite` CLI.

pub mod agent;
pub mod channels;
pub mod config;
pub mod dashboard;
pub mod roster;
pub mod runtime;
