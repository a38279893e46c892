use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Appends `Access-Control-Allow-Origin` to every response that flows through
/// the router so browser clients on other origins can consume the API and the
/// event streams. Preflight requests are answered by the explicit `OPTIONS`
/// handlers; this middleware only decorates.
pub(crate) async fn decorate(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = allowed_origin(
        &app_state.service.config.allowed_origins,
        request.headers().get(header::ORIGIN),
    );

    let mut response = next.run(request).await;
    if let Some(value) = allowed {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    response
}

/// Picks the `Access-Control-Allow-Origin` value for a request: `*` when the
/// configuration allows any origin, otherwise the request's own `Origin`
/// echoed back when it is on the configured list.
fn allowed_origin(
    allowed_origins: &[String],
    request_origin: Option<&HeaderValue>,
) -> Option<HeaderValue> {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return Some(HeaderValue::from_static("*"));
    }

    let origin = request_origin?;
    let origin_str = origin.to_str().ok()?;
    allowed_origins
        .iter()
        .any(|allowed| allowed == origin_str)
        .then(|| origin.clone())
}
