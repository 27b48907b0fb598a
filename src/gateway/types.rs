use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::RecordingStatus;
use crate::timezone::{self, TimeError};

/// A broadcast channel as the backend stores it. `timezone` is the channel's
/// home IANA zone, immutable metadata used only to interpret and display
/// times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub m3u8_url: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewChannel {
    pub name: String,
    pub m3u8_url: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m3u8_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// A scheduled recording. Times are canonical UTC instants; the backend
/// optionally embeds the owning channel in list/detail responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub channel: Option<Channel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRecording {
    pub channel_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Backend-computed rendering of a recording's interval: channel-local
/// labels plus the canonical instants. Authoritative for display; the local
/// engine should agree with it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConversion {
    pub channel_timezone: String,
    pub channel_start_time: String,
    pub channel_end_time: String,
    pub utc_start_time: DateTime<Utc>,
    pub utc_end_time: DateTime<Utc>,
}

impl TimeConversion {
    /// Whether the local engine renders the same channel-local labels the
    /// backend did. The backend's values stay authoritative for display; a
    /// `false` here means one of the two conversion paths has a defect.
    pub fn agrees_with_local_engine(&self) -> Result<bool, TimeError> {
        let start = timezone::format_in_zone(self.utc_start_time, &self.channel_timezone)?;
        let end = timezone::format_in_zone(self.utc_end_time, &self.channel_timezone)?;
        Ok(start == self.channel_start_time && end == self.channel_end_time)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFilter {
    pub channel_id: Option<String>,
    pub status: Option<RecordingStatus>,
}

impl RecordingFilter {
    pub fn status(status: RecordingStatus) -> Self {
        Self {
            channel_id: None,
            status: Some(status),
        }
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(channel_id) = &self.channel_id {
            pairs.push(("channel_id", channel_id.clone()));
        }
        if let Some(status) = self.status {
            // serde gives the lowercase wire name, quoted; trim the quotes.
            let wire = serde_json::to_string(&status).unwrap_or_default();
            pairs.push(("status", wire.trim_matches('"').to_string()));
        }
        pairs
    }
}
