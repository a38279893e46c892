use crate::{
    controller::{channel_admin_controller, channel_controller, health_check_controller},
    middleware, params, stream, AppState,
};
use axum::{
    http::{header, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, options, post},
    Json, Router,
};

use utoipa::OpenApi;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Chat Relay API"
        ),
        paths(
            stream::handler::subscribe,
            channel_controller::publish,
            channel_admin_controller::admin,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                domain::Channel,
                domain::Message,
                domain::User,
                params::channel::PublishParams,
                params::channel_admin::AdminParams,
                params::channel_admin::AdminAction,
            )
        ),
        tags(
            (name = "chat_relay", description = "Channel subscribe/publish API over Server-Sent Events")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(channel_routes(app_state.clone()))
        .merge(channel_admin_routes(app_state.clone()))
        .merge(health_routes())
        .merge(api_docs_routes())
        .layer(from_fn_with_state(app_state, middleware::cors::decorate))
}

fn channel_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/channels/:channel_id", get(stream::handler::subscribe))
        .route("/channels/:channel_id", post(channel_controller::publish))
        .route("/channels/:channel_id", options(preflight))
        .with_state(app_state)
}

fn channel_admin_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/channel-admin", post(channel_admin_controller::admin))
        .route("/channel-admin", options(preflight))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn api_docs_routes() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_document))
}

/// Answers CORS preflight for the channel endpoints. The Allow-Origin header
/// is appended by the CORS middleware like on every other response; browsers
/// may cache this verdict for a day.
async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use domain::DEFAULT_CHANNEL_ID;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use service::config::Config;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_app() -> (AppState, Router) {
        let app_state = AppState::new(service::AppState::new(Config::default()));
        app_state
            .directory
            .create_channel(&app_state.publisher, DEFAULT_CHANNEL_ID, "General")
            .await;
        let router = define_routes(app_state.clone());
        (app_state, router)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Reads frames off a streaming body until one parses to the wanted event
    /// type. Join traffic can precede the connect snapshot on a fresh
    /// subscription, so tests skip what they are not looking for.
    async fn next_event_of_type(body: &mut Body, event_type: &str) -> Value {
        for _ in 0..10 {
            let frame = tokio::time::timeout(Duration::from_secs(1), body.frame())
                .await
                .expect("timed out waiting for an event frame")
                .expect("stream ended before the expected event")
                .expect("stream errored");
            let bytes = frame.into_data().expect("expected a data frame");
            let text = std::str::from_utf8(&bytes).unwrap();
            let payload = text
                .strip_prefix("data: ")
                .and_then(|t| t.strip_suffix("\n\n"))
                .unwrap_or_else(|| panic!("not an SSE frame: {text:?}"));
            let event: Value = serde_json::from_str(payload).unwrap();
            if event["type"] == event_type {
                return event;
            }
        }
        panic!("no {event_type} event arrived within 10 frames");
    }

    #[tokio::test]
    async fn health_check_returns_healthy_with_cors_decoration() {
        let (_app_state, app) = test_app().await;

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"healthy");
    }

    #[tokio::test]
    async fn openapi_document_lists_the_channel_paths() {
        let (_app_state, app) = test_app().await;

        let response = app
            .oneshot(get_request("/api-docs/openapi.json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = json_body(response).await;
        assert!(document["paths"]["/channels/{channel_id}"].is_object());
        assert!(document["paths"]["/channel-admin"].is_object());
    }

    #[tokio::test]
    async fn publish_without_sender_is_rejected() {
        let (_app_state, app) = test_app().await;

        let response = app
            .oneshot(post_json("/channels/general", json!({"content": "hello"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "content and sender are required");
    }

    #[tokio::test]
    async fn publish_with_malformed_json_is_rejected() {
        let (_app_state, app) = test_app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/channels/general")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn subscribing_then_publishing_delivers_the_message_frame() -> anyhow::Result<()> {
        let (_app_state, app) = test_app().await;

        let response = app
            .clone()
            .oneshot(get_request("/channels/general?userName=Ada&userId=u-ada"))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-transform"
        );

        let mut body = response.into_body();
        let connect = next_event_of_type(&mut body, "connect").await;
        assert_eq!(connect["channelId"], "general");
        assert_eq!(connect["currentUser"]["id"], "u-ada");
        assert_eq!(connect["connectionCount"], 1);

        let ack = app
            .oneshot(post_json(
                "/channels/general",
                json!({"content": "hello", "sender": "Ada"}),
            ))
            .await?;
        assert_eq!(ack.status(), StatusCode::OK);
        let ack_body = json_body(ack).await;
        assert_eq!(ack_body["success"], true);
        assert_eq!(ack_body["message"]["content"], "hello");
        assert!(ack_body["message"]["id"].is_string());
        assert!(ack_body["message"]["timestamp"].is_string());

        let message = next_event_of_type(&mut body, "message").await;
        assert_eq!(message["data"]["content"], "hello");
        assert_eq!(message["data"]["sender"], "Ada");

        Ok(())
    }

    #[tokio::test]
    async fn dropping_the_subscription_cleans_up_the_connection() {
        let (app_state, app) = test_app().await;

        let response = app
            .oneshot(get_request("/channels/general?userName=Ada&userId=u-ada"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app_state.registry.count_for("general"), 1);
        assert_eq!(app_state.presence.user_count("general"), 1);

        drop(response);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(app_state.registry.count_for("general"), 0);
        assert_eq!(app_state.presence.user_count("general"), 0);
    }

    #[tokio::test]
    async fn admin_create_channel_returns_and_lists_the_channel() {
        let (_app_state, app) = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "createChannel", "channelId": "random", "channelName": "Random"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["channel"]["id"], "random");
        assert_eq!(body["channel"]["userCount"], 0);

        let response = app
            .oneshot(post_json("/channel-admin", json!({"action": "getChannels"})))
            .await
            .unwrap();
        let body = json_body(response).await;
        let ids: Vec<&str> = body["channels"]
            .as_array()
            .unwrap()
            .iter()
            .map(|channel| channel["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["general", "random"]);
    }

    #[tokio::test]
    async fn admin_create_channel_requires_a_channel_name() {
        let (_app_state, app) = test_app().await;

        let response = app
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "createChannel", "channelId": "random"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "channelName is required");
    }

    #[tokio::test]
    async fn admin_unknown_action_is_rejected() {
        let (_app_state, app) = test_app().await;

        let response = app
            .oneshot(post_json("/channel-admin", json!({"action": "formatDisk"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_delete_answers_success_false_for_missing_or_default_channels() {
        let (_app_state, app) = test_app().await;

        for channel_id in ["general", "no-such-channel"] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/channel-admin",
                    json!({"action": "deleteChannel", "channelId": channel_id}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["success"], false, "channel {channel_id}");
        }
    }

    #[tokio::test]
    async fn admin_join_then_leave_tracks_presence_and_user_count() {
        let (app_state, app) = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "joinChannel", "channelId": "general", "userId": "u1", "userName": "Ada"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["channel"]["userCount"], 1);
        assert_eq!(body["users"][0]["id"], "u1");

        let response = app
            .clone()
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "getChannelUsers", "channelId": "general"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "leaveChannel", "channelId": "general", "userId": "u1"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(app_state.presence.user_count("general"), 0);

        let response = app
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "leaveChannel", "channelId": "general", "userId": "u1"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn admin_join_of_an_unknown_channel_answers_success_false() {
        let (_app_state, app) = test_app().await;

        let response = app
            .oneshot(post_json(
                "/channel-admin",
                json!({"action": "joinChannel", "channelId": "ghost", "userId": "u1"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn options_preflight_answers_no_content_with_cors_headers() {
        let (_app_state, app) = test_app().await;

        for uri in ["/channels/general", "/channel-admin"] {
            let request = Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::NO_CONTENT, "uri {uri}");
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_MAX_AGE],
                "86400"
            );
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
                "*"
            );
        }
    }
}
