use thiserror::Error;

/// Errors that can occur while routing a dialog turn.
///
/// All of these are recovered at the router boundary: the transport only ever
/// sees a rejected webhook call (for [`BridgeError::MalformedPayload`]) or a
/// graceful spoken fallback, never a crash.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The inbound payload could not be turned into a [`crate::turn::Turn`].
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// An answer or continuation referenced a conversation with no live session.
    #[error("no live session for conversation {conversation_id}")]
    UnknownConversation { conversation_id: String },

    /// The answer violated a structural rule of the platform response format.
    #[error("conflicting content: {0}")]
    ConflictingContent(String),

    /// The consumer produced no answer within the configured wait window.
    #[error("no answer for conversation {conversation_id} within {waited_ms} ms")]
    AnswerTimeout {
        conversation_id: String,
        waited_ms: u64,
    },

    /// The consumer failed while producing an answer for a turn.
    #[error("consumer failed on turn {turn_id} of conversation {conversation_id}: {message}")]
    ConsumerFailure {
        conversation_id: String,
        turn_id: String,
        message: String,
    },
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> BridgeError {
        BridgeError::MalformedPayload(err.to_string())
    }
}
