//! Speech-to-text as an optional capability.
//!
//! A recognizer may simply not exist on a platform; callers check
//! [`SpeechRecognizer::detect`] and hide voice input instead of failing.

use std::collections::VecDeque;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechAvailability {
    Available,
    Unavailable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech recognition is not supported on this platform")]
    NotSupported,

    #[error("Speech recognition failed: {0}")]
    Recognition(String),
}

/// Text fragments of one utterance; ends when the utterance does
pub type TranscriptStream = BoxStream<'static, Result<String, SpeechError>>;

pub trait SpeechRecognizer: Send + Sync {
    fn detect(&self) -> SpeechAvailability;

    /// Start listening for one utterance. May be called again after it ends.
    fn start(&self) -> Result<TranscriptStream, SpeechError>;

    fn stop(&self);
}

/// Recognizer for platforms without speech input
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn detect(&self) -> SpeechAvailability {
        SpeechAvailability::Unavailable
    }

    fn start(&self) -> Result<TranscriptStream, SpeechError> {
        Err(SpeechError::NotSupported)
    }

    fn stop(&self) {}
}

/// Recognizer that "hears" pre-recorded utterances, one per `start`.
///
/// Used for tests and for typing a transcript in the terminal.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    utterances: Mutex<VecDeque<Vec<Result<String, SpeechError>>>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_utterance<I, S>(&self, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.utterances
            .lock()
            .push_back(fragments.into_iter().map(|f| Ok(f.into())).collect());
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.utterances
            .lock()
            .push_back(vec![Err(SpeechError::Recognition(message.into()))]);
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn detect(&self) -> SpeechAvailability {
        SpeechAvailability::Available
    }

    fn start(&self) -> Result<TranscriptStream, SpeechError> {
        let fragments = self.utterances.lock().pop_front().unwrap_or_default();
        Ok(stream::iter(fragments).boxed())
    }

    fn stop(&self) {
        self.utterances.lock().clear();
    }
}

/// Listen for one utterance and join its fragments.
///
/// Returns `None` when nothing but whitespace was heard.
pub async fn transcribe_utterance(
    recognizer: &dyn SpeechRecognizer,
) -> Result<Option<String>, SpeechError> {
    if recognizer.detect() == SpeechAvailability::Unavailable {
        return Err(SpeechError::NotSupported);
    }

    let mut fragments = recognizer.start()?;
    let mut transcript = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !transcript.is_empty() {
            transcript.push(' ');
        }
        transcript.push_str(fragment);
    }

    debug!(chars = transcript.len(), "Utterance transcribed");
    Ok((!transcript.is_empty()).then_some(transcript))
}
