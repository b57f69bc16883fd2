use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::gateway::{ChatMessage, LlmGateway};
use crate::error::{ChatError, ChatResult};
use crate::models::{Attachment, Message, NotificationLog, SharedConversationsStore, Turn};

/// Progress of the latest dispatch, observable while it runs
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    Dispatching,
    Succeeded,
    Failed(String),
}

impl DispatchState {
    pub fn is_busy(&self) -> bool {
        matches!(self, DispatchState::Dispatching)
    }
}

/// Which gateway entry point a dispatch used
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallShape {
    Text,
    Multimodal { media_count: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchOutcome {
    pub conversation_id: String,
    pub created_conversation: bool,
    pub reply: String,
    pub call: CallShape,
}

/// Split attachments into those sent to the model and the rest
pub fn partition_attachments(attachments: &[Attachment]) -> (Vec<Attachment>, Vec<Attachment>) {
    attachments.iter().cloned().partition(|a| a.is_media())
}

/// Sends user turns to the gateway and records the replies.
///
/// `dispatch` takes `&mut self`, so one orchestrator never has two requests
/// in flight.
pub struct RequestOrchestrator {
    store: SharedConversationsStore,
    gateway: Arc<dyn LlmGateway>,
    notifications: NotificationLog,
    state: Arc<Mutex<DispatchState>>,
}

impl RequestOrchestrator {
    pub fn new(
        store: SharedConversationsStore,
        gateway: Arc<dyn LlmGateway>,
        notifications: NotificationLog,
    ) -> Self {
        Self {
            store,
            gateway,
            notifications,
            state: Arc::new(Mutex::new(DispatchState::Idle)),
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state.lock().clone()
    }

    /// Handle for observing the state from elsewhere
    pub fn state_handle(&self) -> Arc<Mutex<DispatchState>> {
        self.state.clone()
    }

    pub fn store(&self) -> &SharedConversationsStore {
        &self.store
    }

    /// Append the turn to the current conversation, ask the gateway for a
    /// reply and append that to the same conversation.
    ///
    /// The user message stays in the conversation when the request fails.
    pub async fn dispatch(&mut self, turn: Turn) -> ChatResult<DispatchOutcome> {
        if turn.content().trim().is_empty() && turn.attachments().is_empty() {
            return Err(ChatError::EmptyTurn);
        }

        let (content, attachments) = turn.into_parts();
        let (media, other) = partition_attachments(&attachments);
        if !other.is_empty() {
            debug!(
                count = other.len(),
                "Attachments without media type are kept for display only"
            );
        }

        // Lock is released before the request is awaited
        let (append, history) = {
            let mut store = self.store.lock();
            let append = store.append_message(Message::user(content, attachments));
            let history: Vec<ChatMessage> = store
                .get(&append.conversation_id)
                .map(|c| c.messages().iter().map(ChatMessage::from).collect())
                .unwrap_or_default();
            (append, history)
        };

        *self.state.lock() = DispatchState::Dispatching;
        info!(
            conversation_id = %append.conversation_id,
            provider = %self.gateway.provider().display_name(),
            media = media.len(),
            "Dispatching message"
        );

        let (call, result) = if media.is_empty() {
            (CallShape::Text, self.gateway.send_text(&history).await)
        } else {
            (
                CallShape::Multimodal {
                    media_count: media.len(),
                },
                self.gateway.send_multimodal(&history, &media).await,
            )
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                let err = ChatError::from(e);
                error!(conversation_id = %append.conversation_id, error = %err, "Request failed");
                self.notifications
                    .error("Failed to get a response", err.to_string());
                *self.state.lock() = DispatchState::Failed(err.to_string());
                return Err(err);
            }
        };

        // The conversation may have been deleted while the request was in flight
        let stored = self
            .store
            .lock()
            .append_to(&append.conversation_id, Message::assistant(reply.clone()));
        if let Err(e) = stored {
            debug!(conversation_id = %append.conversation_id, error = %e, "Dropping reply");
        }

        *self.state.lock() = DispatchState::Succeeded;
        Ok(DispatchOutcome {
            conversation_id: append.conversation_id,
            created_conversation: append.created_conversation,
            reply,
            call,
        })
    }
}
