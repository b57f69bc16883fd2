//! Core of the chatdesk LLM client.
//!
//! Holds the conversation state machine, its persistence, the composer that
//! assembles outgoing turns and the orchestrator that sends them to a remote
//! model provider. Front ends (the CLI in this workspace) only wire these
//! pieces together and render their output.

pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod settings;

pub use error::{ChatError, ChatResult};
pub use models::{
    AppendOutcome, Attachment, Conversation, ConversationsStore, Message, MessageComposer,
    NotificationLog, Role, SharedConversationsStore, Turn,
};
pub use services::{DispatchOutcome, DispatchState, GatewayClient, LlmGateway, RequestOrchestrator};
pub use settings::{ChatSettings, ProviderType};
