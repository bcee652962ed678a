//! Turns a raw webhook payload into a canonical [`Turn`].
//!
//! Pure and total: no session state is consulted, nothing suspends. A payload
//! that cannot be normalized is a [`BridgeError::MalformedPayload`] and the
//! transport is expected to reject the call.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;

use crate::error::BridgeError;
use crate::turn::{DialogDateTime, DialogPlace, Turn, TurnIntent, TurnValue};
use crate::wire::{ConversationType, WebhookRequest, WireArgument, WireDateTime, WireLocation};

/// Parses a raw JSON payload and normalizes it.
pub fn normalize_value(payload: &Value) -> Result<Turn, BridgeError> {
    let request: WebhookRequest = serde_json::from_value(payload.clone())?;
    normalize(&request)
}

/// Normalizes an already-parsed webhook request into a [`Turn`].
pub fn normalize(request: &WebhookRequest) -> Result<Turn, BridgeError> {
    let conversation = request
        .conversation
        .as_ref()
        .ok_or_else(|| BridgeError::MalformedPayload("missing conversation".into()))?;
    let conversation_id = conversation
        .conversation_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BridgeError::MalformedPayload("missing conversation id".into()))?;
    let input = request
        .inputs
        .first()
        .ok_or_else(|| BridgeError::MalformedPayload("no inputs".into()))?;

    let intent = input
        .intent
        .as_deref()
        .map(TurnIntent::from_wire)
        .unwrap_or(TurnIntent::Fallback);

    let raw_input = input
        .raw_inputs
        .iter()
        .find_map(|r| r.query.clone().filter(|q| !q.is_empty()));

    let dialog_state = conversation
        .conversation_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(parse_token);

    Ok(Turn {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: conversation_id.to_string(),
        is_new_conversation: conversation.kind == Some(ConversationType::New),
        intent,
        value: select_argument(intent, &input.arguments),
        raw_input,
        dialog_state,
        user_id: request.user.as_ref().and_then(|u| u.user_id.clone()),
        locale: request.user.as_ref().and_then(|u| u.locale.clone()),
        received_at: Utc::now(),
    })
}

/// The token is consumer state we serialized ourselves; anything that is not
/// JSON is kept as an opaque string.
fn parse_token(token: &str) -> Value {
    serde_json::from_str(token).unwrap_or_else(|_| Value::String(token.to_string()))
}

/// Picks the argument value for this turn. The intent tells us which field to
/// expect; when it does not match (or the intent is free-form) we fall back
/// to scanning each argument for the first populated field.
fn select_argument(intent: TurnIntent, arguments: &[WireArgument]) -> Option<TurnValue> {
    let preferred = arguments.iter().find_map(|arg| match intent {
        TurnIntent::Confirmation => arg.bool_value.map(TurnValue::Bool),
        TurnIntent::Datetime => arg.datetime_value.as_ref().map(datetime_value),
        TurnIntent::Place => arg.place_value.as_ref().map(place_value),
        TurnIntent::Permission => arg.bool_value.map(TurnValue::Bool),
        TurnIntent::Selection => arg
            .text_value
            .clone()
            .filter(|t| !t.is_empty())
            .map(TurnValue::Text),
        _ => None,
    });
    preferred.or_else(|| arguments.iter().find_map(argument_value))
}

/// First non-empty of: integer, float, boolean, datetime, place, extension,
/// structured, text.
fn argument_value(arg: &WireArgument) -> Option<TurnValue> {
    if let Some(raw) = arg.int_value.as_deref() {
        if let Ok(n) = raw.parse::<i64>() {
            return Some(TurnValue::Integer(n));
        }
    }
    if let Some(f) = arg.float_value {
        return Some(TurnValue::Float(f));
    }
    if let Some(b) = arg.bool_value {
        return Some(TurnValue::Bool(b));
    }
    if let Some(dt) = arg.datetime_value.as_ref() {
        return Some(datetime_value(dt));
    }
    if let Some(place) = arg.place_value.as_ref() {
        return Some(place_value(place));
    }
    if let Some(ext) = arg.extension.as_ref().filter(|v| !v.is_null()) {
        return Some(TurnValue::Structured(ext.clone()));
    }
    if let Some(structured) = arg.structured_value.as_ref().filter(|v| !v.is_null()) {
        return Some(TurnValue::Structured(structured.clone()));
    }
    if let Some(text) = arg
        .text_value
        .as_deref()
        .or(arg.raw_text.as_deref())
        .filter(|t| !t.is_empty())
    {
        return Some(TurnValue::Text(text.to_string()));
    }
    None
}

fn datetime_value(wire: &WireDateTime) -> TurnValue {
    TurnValue::DateTime(DialogDateTime {
        date: wire
            .date
            .and_then(|d| NaiveDate::from_ymd_opt(d.year, d.month, d.day)),
        time: wire
            .time
            .and_then(|t| NaiveTime::from_hms_opt(t.hours, t.minutes, t.seconds)),
    })
}

fn place_value(wire: &WireLocation) -> TurnValue {
    TurnValue::Place(DialogPlace {
        name: wire.name.clone(),
        address: wire.formatted_address.clone(),
        latitude: wire.coordinates.map(|c| c.latitude),
        longitude: wire.coordinates.map(|c| c.longitude),
    })
}
