//! The normalized reply a consumer hands back for a turn.
//!
//! Content kinds are a tagged union so the synthesizer can match on them
//! exhaustively. The rich-content slots of [`RichReply`] are the one place
//! the type system cannot enforce mutual exclusion; they are validated before
//! anything is built for the wire.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

use crate::error::BridgeError;

/// A spoken fragment: either plain text-to-speech or speech markup, detected
/// by the `<speak>` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Speech {
    Text(String),
    Markup(String),
}

impl Speech {
    pub const MARKUP_SENTINEL: &'static str = "<speak>";

    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with(Self::MARKUP_SENTINEL) {
            Speech::Markup(text)
        } else {
            Speech::Text(text)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Speech::Text(t) | Speech::Markup(t) => t,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageSpec {
    pub url: String,
    /// Read aloud on surfaces that cannot display the image.
    pub alt_text: String,
}

impl ImageSpec {
    pub fn new(url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt_text: alt_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CardButton {
    pub title: String,
    pub url: String,
}

/// How a card image should be letterboxed or cropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageDisplay {
    Default,
    White,
    Cropped,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Card {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub image: Option<ImageSpec>,
    pub buttons: Vec<CardButton>,
    pub display: Option<ImageDisplay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BrowseItem {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image: Option<ImageSpec>,
    pub footer: Option<String>,
}

/// One voice-selectable option. The key comes back verbatim on the answering
/// turn; synonyms widen what the voice matcher accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionItem {
    pub key: String,
    pub title: String,
    pub synonyms: Vec<String>,
    pub description: Option<String>,
    pub image: Option<ImageSpec>,
}

impl SelectionItem {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            synonyms: Vec::new(),
            description: None,
            image: None,
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum SelectionDisplay {
    #[default]
    List,
    Carousel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionList {
    pub title: Option<String>,
    pub items: Vec<SelectionItem>,
    pub display: SelectionDisplay,
}

/// Speech plus at most one rich content kind. Setting more than one slot is
/// a [`BridgeError::ConflictingContent`] at synthesis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RichReply {
    pub speech: Speech,
    pub card: Option<Card>,
    pub image: Option<ImageSpec>,
    pub browse_carousel: Option<Vec<BrowseItem>>,
    pub carousel: Option<SelectionList>,
}

impl RichReply {
    pub fn new(speech: impl Into<String>) -> Self {
        Self {
            speech: Speech::new(speech),
            card: None,
            image: None,
            browse_carousel: None,
            carousel: None,
        }
    }

    pub fn with_card(mut self, card: Card) -> Self {
        self.card = Some(card);
        self
    }

    pub fn with_image(mut self, image: ImageSpec) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_browse_carousel(mut self, items: Vec<BrowseItem>) -> Self {
        self.browse_carousel = Some(items);
        self
    }

    pub fn with_carousel(mut self, carousel: SelectionList) -> Self {
        self.carousel = Some(carousel);
        self
    }

    /// At most one of the rich content slots may be set.
    pub fn validate(&self) -> Result<(), BridgeError> {
        let populated = [
            self.card.is_some(),
            self.image.is_some(),
            self.browse_carousel.is_some(),
            self.carousel.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if populated > 1 {
            return Err(BridgeError::ConflictingContent(
                "at most one of card, image, browse carousel or carousel per turn".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionPrompt {
    pub speech: Speech,
    pub list: SelectionList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DateTimePrompt {
    /// Asked first, e.g. "When should I schedule it?".
    pub initial: String,
    /// Asked when only the date is still missing.
    pub date: Option<String>,
    /// Asked when only the time is still missing.
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfirmationPrompt {
    pub question: String,
}

/// The scopes a consumer can ask the platform to unlock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Name,
    DeviceCoarseLocation,
    DevicePreciseLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PermissionPrompt {
    /// Why the permission is being requested, spoken before the platform's
    /// own consent question.
    pub context: Option<String>,
    pub permissions: Vec<Permission>,
}

/// What the consumer wants said or shown this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum AnswerPayload {
    Speech(Speech),
    Rich(Box<RichReply>),
    Selection(SelectionPrompt),
    DateTime(DateTimePrompt),
    Confirmation(ConfirmationPrompt),
    Permission(PermissionPrompt),
}

/// The consumer's normalized reply to one [`crate::turn::Turn`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Answer {
    pub payload: AnswerPayload,
    /// `true` ends the dialog after this reply; `false` keeps listening.
    pub close_conversation: bool,
    /// Stored by the platform and echoed on the next turn of this
    /// conversation. Never interpreted by the bridge.
    pub dialog_state: Option<Value>,
    /// Tappable follow-up chips; only valid while the conversation stays open.
    pub suggestions: Vec<String>,
}

impl Answer {
    fn with_payload(payload: AnswerPayload, close_conversation: bool) -> Self {
        Self {
            payload,
            close_conversation,
            dialog_state: None,
            suggestions: Vec::new(),
        }
    }

    /// A spoken reply that keeps the conversation open.
    pub fn ask(text: impl Into<String>) -> Self {
        Self::with_payload(AnswerPayload::Speech(Speech::new(text)), false)
    }

    /// A spoken reply that ends the conversation.
    pub fn tell(text: impl Into<String>) -> Self {
        Self::with_payload(AnswerPayload::Speech(Speech::new(text)), true)
    }

    pub fn rich(reply: RichReply, close_conversation: bool) -> Self {
        Self::with_payload(AnswerPayload::Rich(Box::new(reply)), close_conversation)
    }

    pub fn selection(speech: impl Into<String>, list: SelectionList) -> Self {
        Self::with_payload(
            AnswerPayload::Selection(SelectionPrompt {
                speech: Speech::new(speech),
                list,
            }),
            false,
        )
    }

    pub fn ask_datetime(prompt: DateTimePrompt) -> Self {
        Self::with_payload(AnswerPayload::DateTime(prompt), false)
    }

    pub fn ask_confirmation(question: impl Into<String>) -> Self {
        Self::with_payload(
            AnswerPayload::Confirmation(ConfirmationPrompt {
                question: question.into(),
            }),
            false,
        )
    }

    pub fn ask_permission(context: Option<String>, permissions: Vec<Permission>) -> Self {
        Self::with_payload(
            AnswerPayload::Permission(PermissionPrompt {
                context,
                permissions,
            }),
            false,
        )
    }

    pub fn with_dialog_state(mut self, state: Value) -> Self {
        self.dialog_state = Some(state);
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }
}
