pub mod attachment_validation;
pub mod gateway;
pub mod orchestrator;
pub mod speech;
pub mod title;

pub use gateway::{ChatMessage, GatewayClient, GatewayError, LlmGateway};
pub use orchestrator::{CallShape, DispatchOutcome, DispatchState, RequestOrchestrator};
pub use speech::{SpeechAvailability, SpeechError, SpeechRecognizer, transcribe_utterance};
