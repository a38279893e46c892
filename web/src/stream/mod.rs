//! Event-stream (SSE) endpoints.
//!
//! This module contains only the Axum handler for the subscribe endpoint.
//! The core streaming infrastructure (connection registry, broadcaster,
//! session lifecycle) lives in the `sse` crate so it can be exercised
//! without an HTTP server in front of it.

pub(crate) mod handler;
