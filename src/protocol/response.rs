use crate::protocol::back::BackResponse;
use crate::protocol::front::{FrontResponse, FrontResponseBlock};
use crate::protocol::mapping::{back_finish_to_front_stop, back_usage_to_front};
use crate::util::generated_message_id;

/// Translate a complete upstream response into a Front response.
///
/// `front_model` is the model the caller asked for, never the resolved
/// upstream model.
#[must_use]
pub fn translate_response(response: BackResponse, front_model: &str) -> FrontResponse {
    let BackResponse { id, choices, usage } = response;
    let choice = choices.into_iter().next().unwrap_or_default();

    let text = choice
        .message
        .and_then(|message| message.content)
        .unwrap_or_default();

    let id = match id {
        Some(id) if !id.is_empty() => id,
        _ => generated_message_id(),
    };

    FrontResponse::assistant(
        id,
        front_model.to_string(),
        vec![FrontResponseBlock::Text { text }],
        Some(back_finish_to_front_stop(choice.finish_reason.as_deref())),
        back_usage_to_front(usage.as_ref()),
    )
}
