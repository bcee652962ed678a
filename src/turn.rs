use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

use crate::wire::intents;

/// Why an inbound turn occurred.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnIntent {
    /// Conversation entry point.
    Main,
    /// Free-form user utterance.
    Text,
    /// The user said nothing within the platform's listening window.
    NoInput,
    /// The user asked to stop.
    Cancel,
    /// Answer to a date/time prompt.
    Datetime,
    /// Answer to a yes/no confirmation prompt.
    Confirmation,
    /// Answer to a selection list or carousel.
    Selection,
    /// Answer to a permission request.
    Permission,
    /// Answer to a place/location prompt.
    Place,
    /// Anything we do not recognize; treated as free text.
    Fallback,
}

impl TurnIntent {
    /// Maps a platform intent name onto the canonical tag. Unknown names land
    /// on [`TurnIntent::Fallback`].
    pub fn from_wire(intent: &str) -> Self {
        match intent {
            intents::MAIN => TurnIntent::Main,
            intents::TEXT => TurnIntent::Text,
            intents::NO_INPUT => TurnIntent::NoInput,
            intents::CANCEL => TurnIntent::Cancel,
            intents::DATETIME => TurnIntent::Datetime,
            intents::CONFIRMATION => TurnIntent::Confirmation,
            intents::OPTION => TurnIntent::Selection,
            intents::PERMISSION => TurnIntent::Permission,
            intents::PLACE => TurnIntent::Place,
            _ => TurnIntent::Fallback,
        }
    }
}

/// The typed value a turn carried, when the platform parsed one for us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum TurnValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(DialogDateTime),
    Place(DialogPlace),
    Structured(Value),
}

impl TurnValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TurnValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TurnValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// A possibly partial calendar answer: the platform may hand us a date, a
/// time, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DialogDateTime {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl DialogDateTime {
    /// Collapses into a full timestamp when the date part is present; a
    /// missing time defaults to midnight.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        self.date
            .map(|d| d.and_time(self.time.unwrap_or_else(|| NaiveTime::MIN)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DialogPlace {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One normalized inbound dialog event. Exactly one `Turn` exists per webhook
/// call, and it is immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Turn {
    /// Generated id, for correlating log lines about this turn.
    pub id: String,
    /// Stable for the life of the conversation, supplied by the platform.
    pub conversation_id: String,
    pub is_new_conversation: bool,
    pub intent: TurnIntent,
    /// The user's utterance as heard, when there was one.
    pub raw_input: Option<String>,
    /// The typed argument matching `intent`, when the platform parsed one.
    pub value: Option<TurnValue>,
    /// Consumer-owned continuation state, echoed verbatim turn-to-turn.
    pub dialog_state: Option<Value>,
    pub user_id: Option<String>,
    pub locale: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(conversation_id: &str, intent: TurnIntent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            is_new_conversation: false,
            intent,
            raw_input: None,
            value: None,
            dialog_state: None,
            user_id: None,
            locale: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_raw_input(mut self, raw_input: &str) -> Self {
        self.raw_input = Some(raw_input.to_string());
        self
    }

    pub fn with_value(mut self, value: TurnValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_dialog_state(mut self, state: Value) -> Self {
        self.dialog_state = Some(state);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_from_wire() {
        assert_eq!(TurnIntent::from_wire("actions.intent.MAIN"), TurnIntent::Main);
        assert_eq!(TurnIntent::from_wire("actions.intent.TEXT"), TurnIntent::Text);
        assert_eq!(
            TurnIntent::from_wire("actions.intent.CONFIRMATION"),
            TurnIntent::Confirmation
        );
        assert_eq!(
            TurnIntent::from_wire("actions.intent.OPTION"),
            TurnIntent::Selection
        );
        assert_eq!(
            TurnIntent::from_wire("something.else.entirely"),
            TurnIntent::Fallback
        );
    }

    #[test]
    fn test_intent_display() {
        assert_eq!(TurnIntent::NoInput.to_string(), "NO_INPUT");
        assert_eq!(TurnIntent::Main.to_string(), "MAIN");
    }

    #[test]
    fn test_turn_builder() {
        let turn = Turn::new("abc", TurnIntent::Text)
            .with_raw_input("hello")
            .with_value(TurnValue::Text("hello".into()));
        assert_eq!(turn.conversation_id, "abc");
        assert_eq!(turn.raw_input.as_deref(), Some("hello"));
        assert_eq!(turn.value.as_ref().and_then(|v| v.as_text()), Some("hello"));
        assert!(!turn.id.is_empty());
    }

    #[test]
    fn test_dialog_datetime_to_naive() {
        let full = DialogDateTime {
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
            time: NaiveTime::from_hms_opt(14, 30, 0),
        };
        let naive = full.to_naive().unwrap();
        assert_eq!(naive.format("%Y-%m-%d %H:%M").to_string(), "2024-06-01 14:30");

        let date_only = DialogDateTime {
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
            time: None,
        };
        assert_eq!(
            date_only.to_naive().unwrap().time(),
            NaiveTime::MIN
        );

        let time_only = DialogDateTime {
            date: None,
            time: NaiveTime::from_hms_opt(9, 0, 0),
        };
        assert!(time_only.to_naive().is_none());
    }
}
