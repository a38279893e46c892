use anyhow::Result;
use colored::*;
use std::time::Duration;
use uuid::Uuid;

use crate::api_client::ApiClient;
use crate::output::TestResult;
use crate::sse_client::{Connection, TestUser};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn test_connection(
    channel_id: &str,
    user1: &TestUser,
    user2: &TestUser,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let mut result = TestResult::new("connection");
    println!("\n{} Verifying connect snapshots...", "→".blue());

    let connect1 = sse1.wait_for_event("connect", EVENT_TIMEOUT).await?;
    result.check(
        "user 1 snapshot names the subscribed channel",
        connect1.data["channelId"].as_str() == Some(channel_id),
    );
    result.check(
        "user 1 snapshot carries its own identity",
        connect1.data["currentUser"]["id"].as_str() == Some(user1.user_id.as_str()),
    );

    let connect2 = sse2.wait_for_event("connect", EVENT_TIMEOUT).await?;
    result.check(
        "user 2 snapshot names the subscribed channel",
        connect2.data["channelId"].as_str() == Some(channel_id),
    );
    result.check(
        "user 2 snapshot carries its own identity",
        connect2.data["currentUser"]["id"].as_str() == Some(user2.user_id.as_str()),
    );

    // The two subscriptions race, but whichever registered second counted
    // both connections in its snapshot.
    let count1 = connect1.data["connectionCount"].as_u64().unwrap_or(0);
    let count2 = connect2.data["connectionCount"].as_u64().unwrap_or(0);
    result.check(
        "the later snapshot counts both connections",
        count1.max(count2) >= 2,
    );

    Ok(result)
}

pub async fn test_message_broadcast(
    channel_id: &str,
    sender: &TestUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let mut result = TestResult::new("message-broadcast");
    println!("\n{} Publishing a message to {}...", "→".blue(), channel_id);

    let content = format!("integration check {}", Uuid::new_v4());
    let ack = api_client
        .publish_message(channel_id, &sender.user_name, &content)
        .await?;
    result.check(
        "publish was acknowledged with a message id",
        ack["id"].is_string(),
    );

    let event1 = sse1.wait_for_event("message", EVENT_TIMEOUT).await?;
    result.check(
        "subscriber 1 received the message",
        event1.data["data"]["content"].as_str() == Some(content.as_str()),
    );

    let event2 = sse2.wait_for_event("message", EVENT_TIMEOUT).await?;
    result.check(
        "subscriber 2 received the message",
        event2.data["data"]["content"].as_str() == Some(content.as_str()),
    );

    Ok(result)
}

pub async fn test_channel_lifecycle(
    api_client: &ApiClient,
    sse1: &mut Connection,
) -> Result<TestResult> {
    let mut result = TestResult::new("channel-lifecycle");
    let channel_id = format!("it-{}", &Uuid::new_v4().to_string()[..8]);
    println!("\n{} Creating channel {}...", "→".blue(), channel_id);

    let channel = api_client.create_channel(&channel_id, "Integration").await?;
    result.check(
        "create answered with the channel",
        channel["id"].as_str() == Some(channel_id.as_str()),
    );

    let created = sse1.wait_for_event("channel-created", EVENT_TIMEOUT).await?;
    let created_listed = created.data["channels"]
        .as_array()
        .map_or(false, |channels| {
            channels
                .iter()
                .any(|c| c["id"].as_str() == Some(channel_id.as_str()))
        });
    result.check(
        "subscribers saw channel-created listing the new channel",
        created_listed,
    );

    let channels = api_client.get_channels().await?;
    result.check(
        "getChannels lists the new channel",
        channels
            .iter()
            .any(|c| c["id"].as_str() == Some(channel_id.as_str())),
    );

    println!("{} Deleting channel {}...", "→".blue(), channel_id);
    let deleted = api_client.delete_channel(&channel_id).await?;
    result.check("delete answered success", deleted);

    let deleted_event = sse1.wait_for_event("channel-deleted", EVENT_TIMEOUT).await?;
    let still_listed = deleted_event.data["channels"]
        .as_array()
        .map_or(true, |channels| {
            channels
                .iter()
                .any(|c| c["id"].as_str() == Some(channel_id.as_str()))
        });
    result.check(
        "subscribers saw channel-deleted without the channel",
        !still_listed,
    );

    Ok(result)
}

pub async fn test_presence_roster(
    channel_id: &str,
    api_client: &ApiClient,
    sse1: &mut Connection,
) -> Result<TestResult> {
    let mut result = TestResult::new("presence-roster");
    let visitor = TestUser::new("Visitor");
    println!(
        "\n{} Joining {} as {}...",
        "→".blue(),
        channel_id,
        visitor.user_name
    );

    let joined = api_client.join_channel(channel_id, &visitor).await?;
    let in_roster = joined["users"].as_array().map_or(false, |users| {
        users
            .iter()
            .any(|u| u["id"].as_str() == Some(visitor.user_id.as_str()))
    });
    result.check("join listed the visitor in the roster", in_roster);

    // The setup subscriptions emitted join events of their own; skip any
    // user-event that is not about the visitor.
    let join_event = wait_for_user_event(sse1, &visitor.user_id).await?;
    result.check(
        "subscribers saw the join user-event",
        join_event.data["event"]["type"].as_str() == Some("join"),
    );

    let users = api_client.get_channel_users(channel_id).await?;
    result.check(
        "getChannelUsers lists the visitor",
        users
            .iter()
            .any(|u| u["id"].as_str() == Some(visitor.user_id.as_str())),
    );

    println!("{} Leaving {}...", "→".blue(), channel_id);
    let left = api_client.leave_channel(channel_id, &visitor.user_id).await?;
    result.check("leave answered success", left);

    let leave_event = wait_for_user_event(sse1, &visitor.user_id).await?;
    result.check(
        "subscribers saw the leave user-event",
        leave_event.data["event"]["type"].as_str() == Some("leave"),
    );

    Ok(result)
}

/// Waits for the next user-event about `user_id`, skipping presence traffic
/// from the other test connections.
async fn wait_for_user_event(
    connection: &mut Connection,
    user_id: &str,
) -> Result<crate::sse_client::Event> {
    let deadline = std::time::Instant::now() + EVENT_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        if remaining.is_zero() {
            anyhow::bail!("Timeout waiting for a user-event about {}", user_id);
        }
        let event = connection.wait_for_event("user-event", remaining).await?;
        if event.data["event"]["user"]["id"].as_str() == Some(user_id) {
            return Ok(event);
        }
    }
}
