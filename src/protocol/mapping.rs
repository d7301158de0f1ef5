use super::back::BackUsage;
use super::front::{FrontRole, FrontStopReason, FrontUsage};

// ---------------------------------------------------------------------------
// Role mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn front_role_to_back(role: FrontRole) -> &'static str {
    match role {
        FrontRole::System => "system",
        FrontRole::User => "user",
        FrontRole::Assistant => "assistant",
    }
}

// ---------------------------------------------------------------------------
// Stop reason mappings
// ---------------------------------------------------------------------------

/// Map an upstream `finish_reason` onto the Front stop reason.
///
/// Total and two-valued: only `"length"` means the token budget ran out.
#[must_use]
pub fn back_finish_to_front_stop(finish_reason: Option<&str>) -> FrontStopReason {
    match finish_reason {
        Some("length") => FrontStopReason::MaxTokens,
        _ => FrontStopReason::EndTurn,
    }
}

// ---------------------------------------------------------------------------
// Usage mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn back_usage_to_front(usage: Option<&BackUsage>) -> FrontUsage {
    usage.map_or_else(FrontUsage::default, |usage| FrontUsage {
        input_tokens: usage.prompt_tokens.unwrap_or(0),
        output_tokens: usage.completion_tokens.unwrap_or(0),
    })
}
