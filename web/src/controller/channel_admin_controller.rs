use crate::params::channel_admin::{AdminAction, AdminParams};
use crate::{AppState, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use domain::User;
use serde_json::{json, Value};

use log::*;

/// POST an administrative action against the channel catalog
///
/// Validation problems (missing fields, unknown action) are 400s; a
/// well-formed action aimed at something that does not exist answers
/// `{"success": false}` instead.
#[utoipa::path(
    post,
    path = "/channel-admin",
    request_body = AdminParams,
    responses(
        (status = 200, description = "Action performed; body carries a success flag and the action's payload"),
        (status = 400, description = "Unknown action or missing required fields")
    )
)]
pub async fn admin(
    State(app_state): State<AppState>,
    payload: Result<Json<AdminParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(params) =
        payload.map_err(|rejection| domain::Error::validation(rejection.body_text()))?;

    debug!("POST channel-admin action: {params:?}");

    let response = match params.action {
        AdminAction::CreateChannel => create_channel(&app_state, params).await?,
        AdminAction::DeleteChannel => delete_channel(&app_state, params).await?,
        AdminAction::JoinChannel => join_channel(&app_state, params).await?,
        AdminAction::LeaveChannel => leave_channel(&app_state, params).await?,
        AdminAction::GetChannels => get_channels(&app_state).await,
        AdminAction::GetChannelUsers => get_channel_users(&app_state, params)?,
    };

    Ok(Json(response))
}

async fn create_channel(app_state: &AppState, params: AdminParams) -> Result<Value, Error> {
    let channel_id = require(params.channel_id, "channelId")?;
    let channel_name = require(params.channel_name, "channelName")?;

    let channel = app_state
        .directory
        .create_channel(&app_state.publisher, &channel_id, &channel_name)
        .await;

    Ok(json!({ "success": true, "channel": channel }))
}

async fn delete_channel(app_state: &AppState, params: AdminParams) -> Result<Value, Error> {
    let channel_id = require(params.channel_id, "channelId")?;

    let deleted = app_state
        .directory
        .delete_channel(&app_state.publisher, &channel_id)
        .await;
    if deleted {
        // Drop the presence records wholesale; the users were not
        // individually removed, the whole channel went away.
        app_state.presence.remove_channel(&channel_id);
    }

    Ok(json!({ "success": deleted }))
}

async fn join_channel(app_state: &AppState, params: AdminParams) -> Result<Value, Error> {
    let channel_id = require(params.channel_id, "channelId")?;
    let user_id = require(params.user_id, "userId")?;
    let user_name = params
        .user_name
        .unwrap_or_else(|| "anonymous".to_string());

    if !app_state.directory.contains(&channel_id).await {
        return Ok(json!({ "success": false }));
    }

    let joined = app_state
        .presence
        .join(
            &app_state.directory,
            &app_state.publisher,
            &channel_id,
            User::new(user_id, user_name),
        )
        .await;
    if !joined {
        debug!("Join was a no-op; the user is already in channel {channel_id}");
    }

    let channel = app_state.directory.get_channel(&channel_id).await;
    let users = app_state.presence.list_users(&channel_id);

    Ok(json!({ "success": true, "channel": channel, "users": users }))
}

async fn leave_channel(app_state: &AppState, params: AdminParams) -> Result<Value, Error> {
    let channel_id = require(params.channel_id, "channelId")?;
    let user_id = require(params.user_id, "userId")?;

    let left = app_state
        .presence
        .leave(
            &app_state.directory,
            &app_state.publisher,
            &channel_id,
            &user_id,
        )
        .await;

    Ok(json!({ "success": left.is_some() }))
}

async fn get_channels(app_state: &AppState) -> Value {
    json!({ "success": true, "channels": app_state.directory.list_channels().await })
}

fn get_channel_users(app_state: &AppState, params: AdminParams) -> Result<Value, Error> {
    let channel_id = require(params.channel_id, "channelId")?;
    Ok(json!({ "success": true, "users": app_state.presence.list_users(&channel_id) }))
}

fn require(value: Option<String>, name: &str) -> Result<String, Error> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| domain::Error::validation(format!("{name} is required")).into())
}
