use std::time::Duration;

use color_eyre::eyre::{OptionExt, Result, WrapErr};
use reqwest::{Method, StatusCode};

use crate::model::TrackId;
use crate::ports::tidal::{ApiPlaylist, ApiTrack, CollectionSource, MutationClient};
use crate::tidal_rs::types::{
    FavoriteItem, Page, TidalPlaylist, TidalSessionInfo, TidalTrack,
};

const API_BASE: &str = "https://api.tidal.com/v1";

/// Page size for the internally paginated list endpoints (playlists and
/// playlist tracks). Favorites paging is driven by the caller instead.
const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Tidal rejected the access token")]
    Unauthorized,
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse session response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Authenticated Tidal API client. Implements both port traits; the services
/// only ever see those.
pub struct TidalClient {
    client: reqwest::Client,
    access_token: String,
    user_id: u64,
    country_code: String,
}

impl TidalClient {
    /// Verify the access token against `GET /v1/sessions` and resolve the user
    /// handle behind it. This is the only call made before any collection is
    /// touched, so a dead token fails the run before any mutation.
    pub async fn connect(access_token: String) -> Result<Self, AuthError> {
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{API_BASE}/sessions"))
            .bearer_auth(&access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(AuthError::FailedToSendRequest)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized);
        }
        let response = response
            .error_for_status()
            .map_err(AuthError::FailedToSendRequest)?;

        let info: TidalSessionInfo = response
            .json()
            .await
            .map_err(AuthError::FailedToParseResponse)?;
        tracing::info!(user_id = info.user_id, country = %info.country_code, "authenticated");

        Ok(Self {
            client,
            access_token,
            user_id: info.user_id,
            country_code: info.country_code,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .query(&[("countryCode", self.country_code.as_str())])
            .timeout(Duration::from_secs(10))
    }

    /// Playlist mutations must echo the playlist's current ETag back in an
    /// `If-None-Match` header, so every mutation is preceded by this lookup.
    async fn playlist_etag(&self, uuid: &str) -> Result<String> {
        let response = self
            .request(Method::GET, &format!("playlists/{uuid}"))
            .send()
            .await?
            .error_for_status()?;

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or_eyre("Playlist response carried no ETag header")?;
        Ok(etag)
    }

    async fn playlist_tracks_page(
        &self,
        uuid: &str,
        offset: u32,
    ) -> Result<Page<TidalTrack>> {
        self.request(Method::GET, &format!("playlists/{uuid}/tracks"))
            .query(&[
                ("limit", LIST_PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("Failed to deserialize playlist tracks page")
    }
}

fn to_api_track(track: TidalTrack) -> ApiTrack {
    ApiTrack {
        id: TrackId(track.id),
        title: track.title,
    }
}

fn to_api_playlist(playlist: TidalPlaylist) -> ApiPlaylist {
    ApiPlaylist {
        uuid: playlist.uuid,
        name: playlist.title,
        description: playlist.description,
        track_count: playlist.number_of_tracks,
    }
}

#[async_trait::async_trait]
impl CollectionSource for TidalClient {
    async fn favorites_page(&self, limit: u32, offset: u32) -> Result<Vec<ApiTrack>> {
        let page: Page<FavoriteItem> = self
            .request(
                Method::GET,
                &format!("users/{}/favorites/tracks", self.user_id),
            )
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .query(&[("order", "DATE"), ("orderDirection", "ASC")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("Failed to deserialize favorites page")?;

        Ok(page
            .items
            .into_iter()
            .map(|entry| to_api_track(entry.item))
            .collect())
    }

    async fn list_playlists(&self) -> Result<Vec<ApiPlaylist>> {
        let mut all = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let page: Page<TidalPlaylist> = self
                .request(Method::GET, &format!("users/{}/playlists", self.user_id))
                .query(&[
                    ("limit", LIST_PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await
                .wrap_err("Failed to deserialize playlists page")?;

            if page.items.is_empty() {
                break;
            }
            offset += page.items.len() as u32;
            all.extend(page.items.into_iter().map(to_api_playlist));
        }

        Ok(all)
    }

    async fn playlist_tracks(&self, playlist: &ApiPlaylist) -> Result<Vec<ApiTrack>> {
        let mut all = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let page = self.playlist_tracks_page(&playlist.uuid, offset).await?;
            if page.items.is_empty() {
                break;
            }
            offset += page.items.len() as u32;
            all.extend(page.items.into_iter().map(to_api_track));
        }

        Ok(all)
    }
}

#[async_trait::async_trait]
impl MutationClient for TidalClient {
    async fn create_playlist(&self, name: &str, description: &str) -> Result<ApiPlaylist> {
        let playlist: TidalPlaylist = self
            .request(Method::POST, &format!("users/{}/playlists", self.user_id))
            .form(&[("title", name), ("description", description)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("Failed to deserialize created playlist")?;

        Ok(to_api_playlist(playlist))
    }

    async fn add_tracks(&self, playlist: &ApiPlaylist, ids: &[TrackId]) -> Result<()> {
        let etag = self.playlist_etag(&playlist.uuid).await?;
        let track_ids = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        self.request(Method::POST, &format!("playlists/{}/items", playlist.uuid))
            .header(reqwest::header::IF_NONE_MATCH, etag)
            .form(&[
                ("trackIds", track_ids.as_str()),
                ("onArtifactNotFound", "SKIP"),
                ("onDupes", "SKIP"),
            ])
            .send()
            .await?
            .error_for_status()
            .wrap_err("Failed to add tracks to playlist")?;

        Ok(())
    }

    async fn remove_track(&self, playlist: &ApiPlaylist, id: TrackId) -> Result<()> {
        let etag = self.playlist_etag(&playlist.uuid).await?;

        self.request(
            Method::DELETE,
            &format!("playlists/{}/tracks/{id}", playlist.uuid),
        )
        .header(reqwest::header::IF_NONE_MATCH, etag)
        .send()
        .await?
        .error_for_status()
        .wrap_err("Failed to remove track from playlist")?;

        Ok(())
    }
}
