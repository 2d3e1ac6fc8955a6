#![allow(dead_code)]
use serde::Deserialize;

/// Paged list envelope used by the Tidal v1 list endpoints.
///
/// `total_number_of_items` is not trusted for loop termination; the fetch
/// loops stop on an empty page instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub total_number_of_items: Option<u32>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// A track as returned inside playlist and favorites listings.
#[derive(Debug, Clone, Deserialize)]
pub struct TidalTrack {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
}

/// Favorites entries wrap the track together with the date it was favorited.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteItem {
    #[serde(default)]
    pub created: Option<String>,
    pub item: TidalTrack,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalPlaylist {
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub number_of_tracks: Option<u32>,
}

/// `GET /v1/sessions` payload describing who the access token belongs to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalSessionInfo {
    pub user_id: u64,
    pub country_code: String,
}

/// Device authorization grant, step one of the login flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the login link expires.
    pub expires_in: u64,
    /// Polling interval in seconds.
    pub interval: u64,
}

/// Token endpoint success payload, for both the device-code poll and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
}

/// Token endpoint failure payload. `authorization_pending` is the normal
/// "user has not clicked the link yet" case while polling.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
