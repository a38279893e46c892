use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters accepted when subscribing to a channel's event stream.
/// Both are optional: the server substitutes "anonymous" for a missing name
/// and generates a fresh user id when none is supplied.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct SubscribeParams {
    pub(crate) user_name: Option<String>,
    pub(crate) user_id: Option<String>,
}

/// Body of a publish request. `content` and `sender` default to empty
/// strings when absent so that the domain validation (not a deserialization
/// rejection) decides the response.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublishParams {
    #[serde(default)]
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) sender: String,
    pub(crate) id: Option<String>,
    pub(crate) timestamp: Option<String>,
    /// Channel id as claimed by the body; the path segment always wins.
    pub(crate) channel_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_params_default_missing_content_and_sender() {
        let params: PublishParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.content, "");
        assert_eq!(params.sender, "");
        assert!(params.id.is_none());
    }

    #[test]
    fn publish_params_use_camel_case_keys() {
        let params: PublishParams = serde_json::from_value(serde_json::json!({
            "content": "hi",
            "sender": "ada",
            "channelId": "random"
        }))
        .unwrap();
        assert_eq!(params.channel_id.as_deref(), Some("random"));
    }
}
