use crate::params::channel::SubscribeParams;
use crate::AppState;
use async_stream::stream;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use domain::User;
use log::*;
use sse::{ChannelSink, ChannelStreamSession};
use std::convert::Infallible;
use uuid::Uuid;

/// GET subscribe to a channel's event stream.
///
/// The response never completes on its own: it opens with a `connect`
/// snapshot, then carries every broadcast for the channel (plus periodic
/// pings) until the client disconnects.
#[utoipa::path(
    get,
    path = "/channels/{channel_id}",
    params(
        ("channel_id" = String, Path, description = "Channel to subscribe to"),
        SubscribeParams
    ),
    responses(
        (status = 200, description = "text/event-stream of channel events, starting with a connect snapshot")
    )
)]
pub(crate) async fn subscribe(
    State(app_state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(params): Query<SubscribeParams>,
) -> Response {
    let user_id = params.user_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let user_name = params
        .user_name
        .unwrap_or_else(|| "anonymous".to_string());
    debug!("Establishing event stream for {user_name} ({user_id}) on channel {channel_id}");

    let (sink, mut rx) = ChannelSink::new();
    let session = ChannelStreamSession::open(
        app_state.session_context(),
        &channel_id,
        Some(User::new(user_id, user_name)),
        sink,
    )
    .await;

    // The session rides inside the body stream: when the client disconnects
    // axum drops the stream, the session drops with it, and the teardown
    // (deregister, presence leave, keep-alive cancel) runs from there.
    let stream = stream! {
        while let Some(frame) = rx.recv().await {
            yield Ok::<_, Infallible>(frame.into_bytes());
        }
        session.close().await;
    };

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream));

    match response {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to build the event stream response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
