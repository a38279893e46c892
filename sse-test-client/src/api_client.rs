use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::sse_client::TestUser;

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach the relay")?;

        if !response.status().is_success() {
            anyhow::bail!("Health check failed: {}", response.status());
        }

        Ok(())
    }

    pub async fn publish_message(
        &self,
        channel_id: &str,
        sender: &str,
        content: &str,
    ) -> Result<Value> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "content": content,
                "sender": sender,
            }))
            .send()
            .await
            .context("Failed to publish message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Failed to publish: {} - Response: {}", status, body);
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;
        expect_success(&api_response)?;

        Ok(api_response["message"].clone())
    }

    pub async fn create_channel(&self, channel_id: &str, channel_name: &str) -> Result<Value> {
        let response = self
            .admin(json!({
                "action": "createChannel",
                "channelId": channel_id,
                "channelName": channel_name,
            }))
            .await?;
        expect_success(&response)?;

        Ok(response["channel"].clone())
    }

    pub async fn delete_channel(&self, channel_id: &str) -> Result<bool> {
        let response = self
            .admin(json!({
                "action": "deleteChannel",
                "channelId": channel_id,
            }))
            .await?;

        Ok(response["success"].as_bool().unwrap_or(false))
    }

    pub async fn join_channel(&self, channel_id: &str, user: &TestUser) -> Result<Value> {
        let response = self
            .admin(json!({
                "action": "joinChannel",
                "channelId": channel_id,
                "userId": user.user_id,
                "userName": user.user_name,
            }))
            .await?;
        expect_success(&response)?;

        Ok(response)
    }

    pub async fn leave_channel(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let response = self
            .admin(json!({
                "action": "leaveChannel",
                "channelId": channel_id,
                "userId": user_id,
            }))
            .await?;

        Ok(response["success"].as_bool().unwrap_or(false))
    }

    pub async fn get_channels(&self) -> Result<Vec<Value>> {
        let response = self.admin(json!({ "action": "getChannels" })).await?;
        expect_success(&response)?;

        response["channels"]
            .as_array()
            .cloned()
            .context("No channels array in response")
    }

    pub async fn get_channel_users(&self, channel_id: &str) -> Result<Vec<Value>> {
        let response = self
            .admin(json!({
                "action": "getChannelUsers",
                "channelId": channel_id,
            }))
            .await?;
        expect_success(&response)?;

        response["users"]
            .as_array()
            .cloned()
            .context("No users array in response")
    }

    async fn admin(&self, body: Value) -> Result<Value> {
        let url = format!("{}/channel-admin", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send admin action")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Admin action failed: {} - Response: {}", status, text);
        }

        response.json().await.context("Failed to parse admin response")
    }
}

fn expect_success(response: &Value) -> Result<()> {
    if response["success"].as_bool() != Some(true) {
        anyhow::bail!("Server answered success=false: {}", response);
    }
    Ok(())
}
