//! Dashboard API: agent roster and chat message relay over HTTP.
//!
//! JSON in/out, no auth. Messages live in a [`MessageRepository`] injected into the router state;
//! the default is in-memory and lost on restart.

mod server;
mod store;

pub use server::{router, run_dashboard, serve, DashboardState};
pub use store::{
    ChatMessage, ConversationMessage, InMemoryMessageRepository, MessageIds, MessageRepository,
    MessageScope, NewMessage,
};
