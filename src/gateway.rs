use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

pub mod types;

use types::{
    Channel, ChannelPatch, NewChannel, NewRecording, Recording, RecordingFilter, RecordingPatch,
    TimeConversion,
};

/// Thin client over the backend's REST surface. The backend owns channels,
/// recordings, and every lifecycle transition; this side only reads and
/// submits.
#[derive(Clone)]
pub struct GatewayClient {
    base: String,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend answered with a non-success status. The message is the
    /// response body's `detail` field verbatim, or `HTTP <status>` when the
    /// body is unparseable.
    #[error("{0}")]
    Rejected(String),
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GatewayClient {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    // Channels

    pub async fn list_channels(&self) -> Result<Vec<Channel>, GatewayError> {
        let response = self.http.get(self.url("/api/channels")).send().await?;
        decode(response).await
    }

    pub async fn get_channel(&self, id: &str) -> Result<Channel, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("/api/channels/{id}")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_channel(&self, channel: &NewChannel) -> Result<Channel, GatewayError> {
        info!(name = %channel.name, "creating channel");
        let response = self
            .http
            .post(self.url("/api/channels"))
            .json(channel)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_channel(
        &self,
        id: &str,
        patch: &ChannelPatch,
    ) -> Result<Channel, GatewayError> {
        info!(id = id, "updating channel");
        let response = self
            .http
            .put(self.url(&format!("/api/channels/{id}")))
            .json(patch)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete_channel(&self, id: &str) -> Result<(), GatewayError> {
        info!(id = id, "deleting channel");
        let response = self
            .http
            .delete(self.url(&format!("/api/channels/{id}")))
            .send()
            .await?;
        confirm(response).await
    }

    pub async fn list_timezone_names(&self) -> Result<Vec<String>, GatewayError> {
        let response = self
            .http
            .get(self.url("/api/channels/timezones/list"))
            .send()
            .await?;
        decode(response).await
    }

    // Recordings

    pub async fn list_recordings(
        &self,
        filter: &RecordingFilter,
    ) -> Result<Vec<Recording>, GatewayError> {
        let response = self
            .http
            .get(self.url("/api/recordings"))
            .query(&filter.to_query())
            .send()
            .await?;
        decode(response).await
    }

    pub async fn get_recording(&self, id: &str) -> Result<Recording, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("/api/recordings/{id}")))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_recording(
        &self,
        recording: &NewRecording,
    ) -> Result<Recording, GatewayError> {
        info!(channel_id = %recording.channel_id, title = %recording.title, "creating recording");
        let response = self
            .http
            .post(self.url("/api/recordings"))
            .json(recording)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_recording(
        &self,
        id: &str,
        patch: &RecordingPatch,
    ) -> Result<Recording, GatewayError> {
        info!(id = id, "updating recording");
        let response = self
            .http
            .put(self.url(&format!("/api/recordings/{id}")))
            .json(patch)
            .send()
            .await?;
        decode(response).await
    }

    /// Remove a recording. The backend cancels an in-progress recording
    /// instead of deleting the row; either way the confirmation is empty.
    pub async fn delete_recording(&self, id: &str) -> Result<(), GatewayError> {
        info!(id = id, "deleting recording");
        let response = self
            .http
            .delete(self.url(&format!("/api/recordings/{id}")))
            .send()
            .await?;
        confirm(response).await
    }

    pub async fn convert_recording_time(&self, id: &str) -> Result<TimeConversion, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("/api/recordings/{id}/convert-time")))
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Rejected(rejection_detail(status, &body)));
    }
    Ok(response.json::<T>().await?)
}

/// Successful mutations that answer 204 carry no body to decode.
async fn confirm(response: Response) -> Result<(), GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Rejected(rejection_detail(status, &body)));
    }
    Ok(())
}

/// The backend reports failures as `{"detail": "..."}`. Pass the detail
/// through untouched; anything else becomes a bare `HTTP <status>`.
fn rejection_detail(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Detail {
        detail: String,
    }

    match serde_json::from_str::<Detail>(body) {
        Ok(parsed) => parsed.detail,
        Err(_) => format!("HTTP {}", status.as_u16()),
    }
}
