use crate::error::BridgeError;
use crate::protocol::back::{BackContent, BackMessage, BackRequest};
use crate::protocol::content::{convert_blocks, convert_content};
use crate::protocol::front::{FrontRequest, FrontSystem};
use crate::protocol::mapping::front_role_to_back;
use crate::routing::ModelResolver;

/// Build the upstream chat-completion request for a Front request.
///
/// The returned request carries the resolved upstream model; callers keep
/// `request.model` for the response side.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRequest`] when `model` is absent or empty.
pub fn translate_request(
    request: &FrontRequest,
    resolver: &ModelResolver,
) -> Result<BackRequest, BridgeError> {
    let model = request
        .model
        .as_deref()
        .filter(|model| !model.is_empty())
        .ok_or_else(|| BridgeError::InvalidRequest("model is required".to_string()))?;

    // --- messages ---
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system.as_ref().filter(|system| !system.is_empty()) {
        messages.push(BackMessage {
            role: "system",
            content: system_content(system),
        });
    }
    for msg in &request.messages {
        messages.push(BackMessage {
            role: front_role_to_back(msg.role),
            content: convert_content(&msg.content),
        });
    }

    Ok(BackRequest {
        model: resolver.resolve(model).to_string(),
        messages,
        max_tokens: request.max_tokens,
        stream: request.stream,
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop_sequences.clone(),
    })
}

fn system_content(system: &FrontSystem) -> BackContent {
    match system {
        FrontSystem::Text(text) => BackContent::Text(text.clone()),
        FrontSystem::Blocks(blocks) => BackContent::Parts(convert_blocks(blocks)),
    }
}
