//! Room metadata lookup.
//!
//! Before connecting, the session resolves the requested identifier (which
//! may be a short vanity id) into the room's canonical numeric id through
//! the room-info HTTP API. The lookup sits behind [`RoomInfoProvider`] so a
//! session can be run against a fixed [`RoomInfo`] or a mock server.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{LiveError, Result};
use crate::handler::BoxFuture;

/// Default base URL of the room-info API.
pub const ROOM_INFO_API_BASE: &str = "https://api.live.bilibili.com";

/// Path of the room-info endpoint, relative to the API base.
pub const ROOM_INFO_PATH: &str = "/xlive/web-room/v1/index/getInfoByRoom";

const USER_AGENT: &str = concat!("bililive-client/", env!("CARGO_PKG_VERSION"));

/// Broadcasting status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "i64")]
pub enum LiveStatus {
    Offline,
    Online,
    /// Any other status (the API uses 2 for replays).
    Other,
}

impl From<i64> for LiveStatus {
    fn from(value: i64) -> Self {
        match value {
            0 => LiveStatus::Offline,
            1 => LiveStatus::Online,
            _ => LiveStatus::Other,
        }
    }
}

/// Metadata of one live room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomInfo {
    /// Streamer's user id.
    pub uid: u64,
    /// Canonical room id, used for authentication.
    pub room_id: u64,
    /// Short vanity id, 0 if the room has none.
    pub short_id: u64,
    pub title: String,
    pub description: String,
    pub live_status: LiveStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub live_start_time: DateTime<Utc>,
}

impl RoomInfo {
    /// Check if the room is broadcasting.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live_status == LiveStatus::Online
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RoomData {
    room_info: RoomInfo,
}

/// Source of room metadata.
pub trait RoomInfoProvider: Send + Sync + 'static {
    /// Look up the room with the given (canonical or short) id.
    fn room_info(&self, room_id: u64) -> BoxFuture<'_, Result<RoomInfo>>;
}

/// [`RoomInfoProvider`] backed by the room-info HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRoomInfoProvider {
    client: reqwest::Client,
    api_base: String,
}

impl HttpRoomInfoProvider {
    /// Create a provider for the public API.
    pub fn new() -> Self {
        Self::with_api_base(ROOM_INFO_API_BASE)
    }

    /// Create a provider for another API base (a mirror or a mock server).
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// API base in use.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetch the room's metadata.
    ///
    /// A non-zero application status code means the room does not exist.
    pub async fn fetch(&self, room_id: u64) -> Result<RoomInfo> {
        let url = format!("{}{}", self.api_base, ROOM_INFO_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("room_id", room_id)])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let body: ApiResponse = response.json().await?;
        if body.code != 0 {
            tracing::debug!(room_id, code = body.code, "room-info lookup rejected");
            return Err(LiveError::RoomNotFound(room_id));
        }

        let data = body.data.ok_or_else(|| {
            LiveError::Protocol(format!("room-info response for {} has no data", room_id))
        })?;
        let data: RoomData = serde_json::from_value(data)?;
        Ok(data.room_info)
    }
}

impl Default for HttpRoomInfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomInfoProvider for HttpRoomInfoProvider {
    fn room_info(&self, room_id: u64) -> BoxFuture<'_, Result<RoomInfo>> {
        Box::pin(self.fetch(room_id))
    }
}

/// Provider that always returns the same metadata.
#[derive(Debug, Clone)]
pub struct StaticRoomInfo(pub RoomInfo);

impl RoomInfoProvider for StaticRoomInfo {
    fn room_info(&self, _room_id: u64) -> BoxFuture<'_, Result<RoomInfo>> {
        let info = self.0.clone();
        Box::pin(async move { Ok(info) })
    }
}
