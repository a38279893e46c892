use crate::params::channel::PublishParams;
use crate::{AppState, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use domain::{DomainEvent, Message};
use serde_json::json;

use log::*;

/// POST publish a message to a channel's live subscribers
#[utoipa::path(
    post,
    path = "/channels/{channel_id}",
    params(
        ("channel_id" = String, Path, description = "Channel to publish to")
    ),
    request_body = PublishParams,
    responses(
        (status = 200, description = "Message accepted and broadcast", body = Message),
        (status = 400, description = "Missing content or sender, or malformed JSON")
    )
)]
pub async fn publish(
    State(app_state): State<AppState>,
    Path(channel_id): Path<String>,
    payload: Result<Json<PublishParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(params) =
        payload.map_err(|rejection| domain::Error::validation(rejection.body_text()))?;

    debug!("POST message to channel {channel_id}: {params:?}");

    if let Some(body_channel_id) = &params.channel_id {
        if body_channel_id != &channel_id {
            debug!("Body channelId {body_channel_id} overridden by path channel {channel_id}");
        }
    }

    let message = Message::compose(
        &channel_id,
        params.content,
        params.sender,
        params.id,
        params.timestamp,
    )?;

    // The stream fan-out happens in the event handler; by the time this
    // request is answered every live subscriber has been offered the frame.
    app_state
        .publisher
        .publish(DomainEvent::MessagePosted {
            channel_id,
            message: message.clone(),
        })
        .await;

    Ok(Json(json!({ "success": true, "message": message })))
}
