//! Converts an [`Answer`] into the platform's nested response structure.
//!
//! Pure function of its input: structural violations come back as
//! [`BridgeError::ConflictingContent`] before any wire content is built, so a
//! bad answer never reaches the transport half-encoded.

use serde_json::Value;

use crate::answer::{
    Answer, AnswerPayload, BrowseItem, Card, ConfirmationPrompt, DateTimePrompt, ImageSpec,
    PermissionPrompt, RichReply, SelectionDisplay, SelectionItem, SelectionList, SelectionPrompt,
    Speech,
};
use crate::error::BridgeError;
use crate::wire::{
    intents, spec_types, AppResponse, ConfirmationDialogSpec, ConfirmationValueSpec,
    DateTimeDialogSpec, DateTimeValueSpec, ExpectedInput, ExpectedIntent, FinalResponse,
    InputPrompt, OpenUrlAction, OptionInfo, OptionValueSpec, PermissionValueSpec, ResponseItem,
    RichResponse, SimpleResponse, WireBasicCard, WireBrowseItem, WireButton, WireCarouselBrowse,
    WireCarouselSelect, WireImage, WireListSelect, WireSelectItem, WireSuggestion,
};

/// Builds the wire response for one answer.
pub fn synthesize(answer: &Answer) -> Result<AppResponse, BridgeError> {
    if answer.close_conversation && !answer.suggestions.is_empty() {
        return Err(BridgeError::ConflictingContent(
            "suggestions are not allowed on a closing response".into(),
        ));
    }

    let (items, expected_intents) = match &answer.payload {
        AnswerPayload::Speech(speech) => (
            vec![simple_item(speech)],
            vec![ExpectedIntent::plain(intents::TEXT)],
        ),
        AnswerPayload::Rich(reply) => build_rich(reply, answer.close_conversation)?,
        AnswerPayload::Selection(prompt) => build_selection(prompt, answer.close_conversation)?,
        AnswerPayload::DateTime(prompt) => {
            require_open(answer.close_conversation, "a date/time prompt")?;
            (Vec::new(), vec![datetime_intent(prompt)?])
        }
        AnswerPayload::Confirmation(prompt) => {
            require_open(answer.close_conversation, "a confirmation prompt")?;
            (Vec::new(), vec![confirmation_intent(prompt)?])
        }
        AnswerPayload::Permission(prompt) => {
            require_open(answer.close_conversation, "a permission request")?;
            (Vec::new(), vec![permission_intent(prompt)?])
        }
    };

    let rich_response = RichResponse {
        items,
        suggestions: answer
            .suggestions
            .iter()
            .map(|title| WireSuggestion {
                title: title.clone(),
            })
            .collect(),
    };

    let conversation_token = token_for(answer.dialog_state.as_ref())?;

    if answer.close_conversation {
        Ok(AppResponse {
            conversation_token,
            expect_user_response: false,
            expected_inputs: None,
            final_response: Some(FinalResponse { rich_response }),
        })
    } else {
        let input_prompt = if rich_response.items.is_empty() && rich_response.suggestions.is_empty()
        {
            // helper prompts carry their own question in the value spec
            None
        } else {
            Some(InputPrompt {
                rich_initial_prompt: rich_response,
            })
        };
        Ok(AppResponse {
            conversation_token,
            expect_user_response: true,
            expected_inputs: Some(vec![ExpectedInput {
                input_prompt,
                possible_intents: expected_intents,
            }]),
            final_response: None,
        })
    }
}

/// A terminal plain-speech response, used for the fallback utterances.
pub fn closing_speech(text: &str) -> AppResponse {
    AppResponse {
        conversation_token: None,
        expect_user_response: false,
        expected_inputs: None,
        final_response: Some(FinalResponse {
            rich_response: RichResponse {
                items: vec![simple_item(&Speech::new(text))],
                suggestions: Vec::new(),
            },
        }),
    }
}

fn require_open(close_conversation: bool, what: &str) -> Result<(), BridgeError> {
    if close_conversation {
        return Err(BridgeError::ConflictingContent(format!(
            "{what} cannot be attached to a closing response"
        )));
    }
    Ok(())
}

/// The dialog state travels as a JSON string inside the conversation token.
fn token_for(dialog_state: Option<&Value>) -> Result<Option<String>, BridgeError> {
    match dialog_state {
        Some(state) => Ok(Some(serde_json::to_string(state)?)),
        None => Ok(None),
    }
}

fn simple_item(speech: &Speech) -> ResponseItem {
    let simple = match speech {
        Speech::Text(text) => SimpleResponse {
            text_to_speech: Some(text.clone()),
            ssml: None,
            display_text: Some(text.clone()),
        },
        Speech::Markup(markup) => SimpleResponse {
            text_to_speech: None,
            ssml: Some(markup.clone()),
            display_text: None,
        },
    };
    ResponseItem::SimpleResponse(simple)
}

fn build_rich(
    reply: &RichReply,
    close_conversation: bool,
) -> Result<(Vec<ResponseItem>, Vec<ExpectedIntent>), BridgeError> {
    reply.validate()?;

    let mut items = vec![simple_item(&reply.speech)];
    let mut expected = vec![ExpectedIntent::plain(intents::TEXT)];

    if let Some(card) = reply.card.as_ref() {
        items.push(ResponseItem::BasicCard(card_item(card)));
    }
    if let Some(image) = reply.image.as_ref() {
        // the platform has no standalone image item; an image travels on a
        // card of its own
        items.push(ResponseItem::BasicCard(WireBasicCard {
            image: Some(wire_image(image)),
            ..Default::default()
        }));
    }
    if let Some(browse) = reply.browse_carousel.as_ref() {
        items.push(ResponseItem::CarouselBrowse(WireCarouselBrowse {
            items: browse.iter().map(browse_item).collect(),
        }));
    }
    if let Some(carousel) = reply.carousel.as_ref() {
        require_open(close_conversation, "an option carousel")?;
        expected = vec![option_intent(carousel)?];
    }

    Ok((items, expected))
}

fn build_selection(
    prompt: &SelectionPrompt,
    close_conversation: bool,
) -> Result<(Vec<ResponseItem>, Vec<ExpectedIntent>), BridgeError> {
    require_open(close_conversation, "a selection prompt")?;
    Ok((
        vec![simple_item(&prompt.speech)],
        vec![option_intent(&prompt.list)?],
    ))
}

fn card_item(card: &Card) -> WireBasicCard {
    WireBasicCard {
        title: card.title.clone(),
        subtitle: card.subtitle.clone(),
        formatted_text: card.body.clone(),
        image: card.image.as_ref().map(wire_image),
        buttons: card
            .buttons
            .iter()
            .map(|button| WireButton {
                title: button.title.clone(),
                open_url_action: OpenUrlAction {
                    url: button.url.clone(),
                },
            })
            .collect(),
        image_display_options: card.display.map(|d| d.to_string()),
    }
}

fn wire_image(image: &ImageSpec) -> WireImage {
    WireImage {
        url: image.url.clone(),
        accessibility_text: image.alt_text.clone(),
    }
}

fn browse_item(item: &BrowseItem) -> WireBrowseItem {
    WireBrowseItem {
        title: item.title.clone(),
        description: item.description.clone(),
        image: item.image.as_ref().map(wire_image),
        open_url_action: OpenUrlAction {
            url: item.url.clone(),
        },
        footer: item.footer.clone(),
    }
}

fn select_item(item: &SelectionItem) -> WireSelectItem {
    WireSelectItem {
        option_info: OptionInfo {
            key: item.key.clone(),
            synonyms: item.synonyms.clone(),
        },
        title: item.title.clone(),
        description: item.description.clone(),
        image: item.image.as_ref().map(wire_image),
    }
}

fn option_intent(list: &SelectionList) -> Result<ExpectedIntent, BridgeError> {
    if list.items.is_empty() {
        return Err(BridgeError::ConflictingContent(
            "a selection prompt needs at least one item".into(),
        ));
    }
    let items: Vec<WireSelectItem> = list.items.iter().map(select_item).collect();
    let spec = match list.display {
        SelectionDisplay::List => OptionValueSpec {
            type_url: spec_types::OPTION.to_string(),
            list_select: Some(WireListSelect {
                title: list.title.clone(),
                items,
            }),
            carousel_select: None,
        },
        SelectionDisplay::Carousel => OptionValueSpec {
            type_url: spec_types::OPTION.to_string(),
            list_select: None,
            carousel_select: Some(WireCarouselSelect { items }),
        },
    };
    Ok(ExpectedIntent {
        intent: intents::OPTION.to_string(),
        input_value_data: Some(serde_json::to_value(spec)?),
    })
}

fn datetime_intent(prompt: &DateTimePrompt) -> Result<ExpectedIntent, BridgeError> {
    let spec = DateTimeValueSpec {
        type_url: spec_types::DATETIME.to_string(),
        dialog_spec: DateTimeDialogSpec {
            request_datetime_text: Some(prompt.initial.clone()),
            request_date_text: prompt.date.clone(),
            request_time_text: prompt.time.clone(),
        },
    };
    Ok(ExpectedIntent {
        intent: intents::DATETIME.to_string(),
        input_value_data: Some(serde_json::to_value(spec)?),
    })
}

fn confirmation_intent(prompt: &ConfirmationPrompt) -> Result<ExpectedIntent, BridgeError> {
    let spec = ConfirmationValueSpec {
        type_url: spec_types::CONFIRMATION.to_string(),
        dialog_spec: ConfirmationDialogSpec {
            request_confirmation_text: Some(prompt.question.clone()),
        },
    };
    Ok(ExpectedIntent {
        intent: intents::CONFIRMATION.to_string(),
        input_value_data: Some(serde_json::to_value(spec)?),
    })
}

fn permission_intent(prompt: &PermissionPrompt) -> Result<ExpectedIntent, BridgeError> {
    if prompt.permissions.is_empty() {
        return Err(BridgeError::ConflictingContent(
            "a permission request needs at least one permission".into(),
        ));
    }
    let spec = PermissionValueSpec {
        type_url: spec_types::PERMISSION.to_string(),
        opt_context: prompt.context.clone(),
        permissions: prompt.permissions.iter().map(|p| p.to_string()).collect(),
    };
    Ok(ExpectedIntent {
        intent: intents::PERMISSION.to_string(),
        input_value_data: Some(serde_json::to_value(spec)?),
    })
}
