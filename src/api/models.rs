use std::sync::Arc;

use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, SecondsFormat};

use crate::config::{ModelRule, ModelsSource};
use crate::error::{into_axum_response, BridgeError};
use crate::protocol::back::BackModelList;
use crate::protocol::front::{FrontModelInfo, FrontModelList};
use crate::state::AppState;

/// `created_at` for entries without an upstream timestamp.
pub const STATIC_CREATED_AT: &str = "2024-01-01T00:00:00Z";

/// List models in the Front shape, from the rule table or the upstream.
pub async fn handler(state: Arc<AppState>) -> Response {
    match list_models(&state).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => into_axum_response(&err),
    }
}

async fn list_models(state: &AppState) -> Result<FrontModelList, BridgeError> {
    match state.config.models.source {
        ModelsSource::Static => Ok(static_models(state.resolver.rules())),
        ModelsSource::Upstream => {
            let response = state.transport.get_models().await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| BridgeError::Transport(format!("Failed to read models body: {e}")))?;
            let list: BackModelList = serde_json::from_slice(&body)?;
            Ok(upstream_models(list))
        }
    }
}

/// One entry per rule prefix, in rule order.
#[must_use]
pub fn static_models(rules: &[ModelRule]) -> FrontModelList {
    FrontModelList::from_models(
        rules
            .iter()
            .map(|rule| model_info(rule.prefix.clone(), STATIC_CREATED_AT.to_string()))
            .collect(),
    )
}

#[must_use]
pub fn upstream_models(list: BackModelList) -> FrontModelList {
    FrontModelList::from_models(
        list.data
            .into_iter()
            .map(|model| {
                let created_at = model
                    .created
                    .and_then(rfc3339_from_unix)
                    .unwrap_or_else(|| STATIC_CREATED_AT.to_string());
                model_info(model.id, created_at)
            })
            .collect(),
    )
}

fn model_info(id: String, created_at: String) -> FrontModelInfo {
    FrontModelInfo {
        display_name: id.clone(),
        id,
        type_: "model".to_string(),
        created_at,
    }
}

fn rfc3339_from_unix(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}
