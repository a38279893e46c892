use serde::Deserialize;
use utoipa::ToSchema;

/// One administrative request against the channel catalog. Which of the
/// optional fields are required depends on the action; the controller
/// rejects a request whose action is missing its fields.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdminParams {
    pub(crate) action: AdminAction,
    pub(crate) channel_id: Option<String>,
    pub(crate) channel_name: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) user_name: Option<String>,
}

/// The admin action verbs, spelled in camelCase on the wire. An unknown
/// verb fails deserialization and surfaces as a 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) enum AdminAction {
    CreateChannel,
    DeleteChannel,
    JoinChannel,
    LeaveChannel,
    GetChannels,
    GetChannelUsers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_deserialize_from_camel_case() {
        let params: AdminParams = serde_json::from_value(json!({
            "action": "createChannel",
            "channelId": "random",
            "channelName": "Random"
        }))
        .unwrap();
        assert_eq!(params.action, AdminAction::CreateChannel);
        assert_eq!(params.channel_id.as_deref(), Some("random"));
    }

    #[test]
    fn unknown_action_is_a_deserialization_error() {
        let result = serde_json::from_value::<AdminParams>(json!({ "action": "dropTables" }));
        assert!(result.is_err());
    }
}
