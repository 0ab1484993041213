//! Thin REST client for the room API.
//!
//! Mirrors the server routes one-to-one; every method returns the decoded
//! payload or a typed error carrying the server's error message.

use coinsketch_core::protocol::{
    CreateRoomResponse, DeleteRoomRequest, HostRequest, JoinRoomRequest, JoinRoomResponse,
    LeaveRequest, StartRoundRequest, UploadResponse,
};
use coinsketch_core::room::{Coin, Room};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /api/coins`
    pub async fn coins(&self) -> Result<Vec<Coin>, ApiClientError> {
        let resp = self
            .http
            .get(format!("{}/api/coins", self.base_url))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `POST /api/rooms`
    pub async fn create_room(&self) -> Result<Room, ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/rooms", self.base_url))
            .send()
            .await?;
        let body: CreateRoomResponse = Self::check(resp).await?.json().await?;
        Ok(body.room)
    }

    /// `POST /api/rooms/join`
    pub async fn join_room(
        &self,
        room_code: &str,
        client_id: &str,
        name: Option<&str>,
    ) -> Result<JoinRoomResponse, ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/rooms/join", self.base_url))
            .json(&JoinRoomRequest {
                room_code: room_code.to_string(),
                client_id: client_id.to_string(),
                name: name.map(str::to_string),
            })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `POST /api/rooms/{code}/start` — optionally carrying the picked coin.
    pub async fn start_round(
        &self,
        code: &str,
        client_id: &str,
        coin: Option<Coin>,
    ) -> Result<Room, ApiClientError> {
        self.round_action(code, "start", client_id, coin).await
    }

    /// `POST /api/rooms/{code}/next-round`
    pub async fn next_round(
        &self,
        code: &str,
        client_id: &str,
        coin: Option<Coin>,
    ) -> Result<Room, ApiClientError> {
        self.round_action(code, "next-round", client_id, coin).await
    }

    /// `POST /api/rooms/{code}/lobby`
    pub async fn back_to_lobby(&self, code: &str, client_id: &str) -> Result<Room, ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/rooms/{code}/lobby", self.base_url))
            .json(&HostRequest {
                client_id: client_id.to_string(),
            })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `POST /api/rooms/{code}/leave`
    pub async fn leave_room(&self, code: &str, client_id: &str) -> Result<(), ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/rooms/{code}/leave", self.base_url))
            .json(&LeaveRequest {
                client_id: client_id.to_string(),
            })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// `POST /api/delete-room`
    pub async fn delete_room(&self, room_id: &str) -> Result<(), ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/delete-room", self.base_url))
            .json(&DeleteRoomRequest {
                room_id: room_id.to_string(),
            })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// `POST /api/rooms/{code}/submit` — raw image bytes in the body.
    pub async fn submit_drawing(
        &self,
        code: &str,
        client_id: &str,
        image: Vec<u8>,
    ) -> Result<UploadResponse, ApiClientError> {
        let resp = self
            .http
            .post(format!(
                "{}/api/rooms/{code}/submit?client_id={client_id}",
                self.base_url
            ))
            .body(image)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `POST /api/upload` — raw image bytes in the body.
    pub async fn upload(&self, image: Vec<u8>) -> Result<UploadResponse, ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/upload", self.base_url))
            .body(image)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn round_action(
        &self,
        code: &str,
        action: &str,
        client_id: &str,
        coin: Option<Coin>,
    ) -> Result<Room, ApiClientError> {
        let resp = self
            .http
            .post(format!("{}/api/rooms/{code}/{action}", self.base_url))
            .json(&StartRoundRequest {
                client_id: client_id.to_string(),
                coin,
            })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Surface non-2xx responses as typed errors with the server's message.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error")?.as_str().map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string());
        Err(ApiClientError::Status { status, message })
    }
}
