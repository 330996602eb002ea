// ABOUTME: HTTP implementation of the config store boundary against the internal API server.
// ABOUTME: Create succeeds only on 201, reads only on 200; anything else is a store failure.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::store::{ConfigStore, StoreError, StoreResult};
use crate::types::{ChannelRecord, DailyMeeting, Member, PredefinedReply};

/// Client for the internal config API server.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_created<T: serde::Serialize>(&self, path: &str, body: &T) -> StoreResult<()> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Failed(e.to_string()))?;
        if resp.status() != StatusCode::CREATED {
            return Err(StoreError::Failed(format!(
                "POST {} returned {}",
                path,
                resp.status()
            )));
        }
        Ok(())
    }

    async fn get_ok<T: for<'de> Deserialize<'de>>(&self, path: &str) -> StoreResult<T> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| StoreError::Failed(e.to_string()))?;
        if resp.status() != StatusCode::OK {
            return Err(StoreError::Failed(format!(
                "GET {} returned {}",
                path,
                resp.status()
            )));
        }
        resp.json().await.map_err(|e| StoreError::Failed(e.to_string()))
    }
}

#[derive(Deserialize)]
struct Deleted {
    deleted: usize,
}

#[async_trait]
impl ConfigStore for ApiClient {
    async fn create_channel(&self, channel: &ChannelRecord) -> StoreResult<()> {
        self.post_created("/channels", channel).await
    }

    async fn add_member(&self, member: &Member) -> StoreResult<()> {
        self.post_created("/members", member).await
    }

    async fn delete_member(&self, channel_id: &str, member_id: &str) -> StoreResult<()> {
        let path = format!("/members/{}/{}", channel_id, member_id);
        let resp = self
            .http
            .delete(self.url(&path))
            .send()
            .await
            .map_err(|e| StoreError::Failed(e.to_string()))?;
        match resp.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(StoreError::Failed(format!(
                "DELETE {} returned {}",
                path, status
            ))),
        }
    }

    async fn list_members(&self, channel_id: &str) -> StoreResult<Vec<Member>> {
        self.get_ok(&format!("/members/{}", channel_id)).await
    }

    async fn put_daily_meeting(&self, meeting: &DailyMeeting) -> StoreResult<()> {
        self.post_created("/dailymeetings", meeting).await
    }

    async fn list_daily_meetings(&self) -> StoreResult<Vec<DailyMeeting>> {
        self.get_ok("/dailymeetings").await
    }

    async fn add_reply(&self, reply: &PredefinedReply) -> StoreResult<()> {
        self.post_created("/replies", reply).await
    }

    async fn list_replies(&self, channel_id: &str) -> StoreResult<Vec<PredefinedReply>> {
        self.get_ok(&format!("/replies/{}", channel_id)).await
    }

    async fn delete_replies(&self, channel_id: &str, question: u8) -> StoreResult<usize> {
        let path = format!("/replies/{}/{}", channel_id, question);
        let resp = self
            .http
            .delete(self.url(&path))
            .send()
            .await
            .map_err(|e| StoreError::Failed(e.to_string()))?;
        if resp.status() != StatusCode::OK {
            return Err(StoreError::Failed(format!(
                "DELETE {} returned {}",
                path,
                resp.status()
            )));
        }
        let body: Deleted = resp.json().await.map_err(|e| StoreError::Failed(e.to_string()))?;
        Ok(body.deleted)
    }
}
