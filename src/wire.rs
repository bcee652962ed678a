//! Serde model of the assistant platform's conversation webhook format.
//!
//! Nothing outside this module and the normalizer/synthesizer pair needs to
//! know these shapes; the rest of the crate works on [`crate::turn::Turn`]
//! and [`crate::answer::Answer`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire names of the intents this bridge distinguishes.
pub mod intents {
    pub const MAIN: &str = "actions.intent.MAIN";
    pub const TEXT: &str = "actions.intent.TEXT";
    pub const NO_INPUT: &str = "actions.intent.NO_INPUT";
    pub const CANCEL: &str = "actions.intent.CANCEL";
    pub const DATETIME: &str = "actions.intent.DATETIME";
    pub const CONFIRMATION: &str = "actions.intent.CONFIRMATION";
    pub const OPTION: &str = "actions.intent.OPTION";
    pub const PERMISSION: &str = "actions.intent.PERMISSION";
    pub const PLACE: &str = "actions.intent.PLACE";
}

/// Type urls for the helper-intent value specs.
pub mod spec_types {
    pub const OPTION: &str = "type.googleapis.com/google.actions.v2.OptionValueSpec";
    pub const DATETIME: &str = "type.googleapis.com/google.actions.v2.DateTimeValueSpec";
    pub const CONFIRMATION: &str = "type.googleapis.com/google.actions.v2.ConfirmationValueSpec";
    pub const PERMISSION: &str = "type.googleapis.com/google.actions.v2.PermissionValueSpec";
}

// ---------------------------------------------------------------------------
// Inbound: one webhook call per dialog turn
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookRequest {
    pub user: Option<AssistantUser>,
    pub conversation: Option<WireConversation>,
    pub inputs: Vec<WireInput>,
    pub is_in_sandbox: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantUser {
    pub user_id: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireConversation {
    pub conversation_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ConversationType>,
    /// Opaque state echoed back to us on every turn of the conversation.
    pub conversation_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ConversationType {
    #[serde(rename = "TYPE_UNSPECIFIED")]
    #[default]
    Unspecified,
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "ACTIVE")]
    Active,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireInput {
    pub intent: Option<String>,
    pub raw_inputs: Vec<RawInput>,
    pub arguments: Vec<WireArgument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInput {
    pub input_type: Option<String>,
    pub query: Option<String>,
}

/// One typed argument of an inbound input. Exactly which value field is
/// populated depends on the intent that produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireArgument {
    pub name: Option<String>,
    pub raw_text: Option<String>,
    pub text_value: Option<String>,
    pub bool_value: Option<bool>,
    /// int64 travels as a decimal string on the wire.
    pub int_value: Option<String>,
    pub float_value: Option<f64>,
    pub datetime_value: Option<WireDateTime>,
    pub place_value: Option<WireLocation>,
    pub extension: Option<Value>,
    pub structured_value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireDateTime {
    pub date: Option<WireDate>,
    pub time: Option<WireTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireTime {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireLocation {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub place_id: Option<String>,
    pub coordinates: Option<WireLatLng>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireLatLng {
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Outbound: exactly one response per webhook call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AppResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_token: Option<String>,
    pub expect_user_response: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_inputs: Option<Vec<ExpectedInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_response: Option<FinalResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpectedInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_prompt: Option<InputPrompt>,
    pub possible_intents: Vec<ExpectedIntent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InputPrompt {
    pub rich_initial_prompt: RichResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FinalResponse {
    pub rich_response: RichResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RichResponse {
    pub items: Vec<ResponseItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<WireSuggestion>,
}

/// One item of a rich response; serializes to a single-key object, e.g.
/// `{"simpleResponse": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ResponseItem {
    SimpleResponse(SimpleResponse),
    BasicCard(WireBasicCard),
    CarouselBrowse(WireCarouselBrowse),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SimpleResponse {
    /// Plain text-to-speech; mutually exclusive with `ssml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_to_speech: Option<String>,
    /// Speech markup; mutually exclusive with `text_to_speech`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireSuggestion {
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireBasicCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<WireImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<WireButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_display_options: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireImage {
    pub url: String,
    pub accessibility_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireButton {
    pub title: String,
    pub open_url_action: OpenUrlAction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenUrlAction {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCarouselBrowse {
    pub items: Vec<WireBrowseItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireBrowseItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<WireImage>,
    pub open_url_action: OpenUrlAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

/// Tells the platform which intent we expect the next turn to carry, plus the
/// value spec for helper intents (selection, datetime, confirmation,
/// permission).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpectedIntent {
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_value_data: Option<Value>,
}

impl ExpectedIntent {
    pub fn plain(intent: &str) -> Self {
        Self {
            intent: intent.to_string(),
            input_value_data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Helper-intent value specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionValueSpec {
    #[serde(rename = "@type")]
    pub type_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_select: Option<WireListSelect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carousel_select: Option<WireCarouselSelect>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireListSelect {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<WireSelectItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCarouselSelect {
    pub items: Vec<WireSelectItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WireSelectItem {
    pub option_info: OptionInfo,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<WireImage>,
}

/// The key is what comes back in the option answer; synonyms give the voice
/// matcher something to work with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionInfo {
    pub key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DateTimeValueSpec {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub dialog_spec: DateTimeDialogSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DateTimeDialogSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_datetime_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_date_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfirmationValueSpec {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub dialog_spec: ConfirmationDialogSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfirmationDialogSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_confirmation_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionValueSpec {
    #[serde(rename = "@type")]
    pub type_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opt_context: Option<String>,
    pub permissions: Vec<String>,
}
