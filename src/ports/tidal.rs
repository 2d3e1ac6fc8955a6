use color_eyre::eyre::Result;

use crate::model::TrackId;

/// Decoupled representation of a Tidal track from the API.
#[derive(Debug, Clone)]
pub struct ApiTrack {
    pub id: TrackId,
    pub title: Option<String>,
}

/// Decoupled representation of a Tidal playlist from the API.
#[derive(Debug, Clone)]
pub struct ApiPlaylist {
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub track_count: Option<u32>,
}

/// Port trait for reading the account's collections.
///
/// Implementations live in `tidal_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CollectionSource: Send + Sync {
    /// One page of the user's favorite tracks, ordered by date added ascending.
    /// An empty page means the collection is exhausted.
    async fn favorites_page(&self, limit: u32, offset: u32) -> Result<Vec<ApiTrack>>;

    async fn list_playlists(&self) -> Result<Vec<ApiPlaylist>>;

    /// The complete track list of one playlist (pagination handled internally).
    async fn playlist_tracks(&self, playlist: &ApiPlaylist) -> Result<Vec<ApiTrack>>;
}

/// Port trait for mutating the account's playlists.
///
/// Additions accept an id batch (the caller enforces the API's batch limit);
/// removal is single-item only because Tidal offers no batch removal.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MutationClient: Send + Sync {
    async fn create_playlist(&self, name: &str, description: &str) -> Result<ApiPlaylist>;

    async fn add_tracks(&self, playlist: &ApiPlaylist, ids: &[TrackId]) -> Result<()>;

    async fn remove_track(&self, playlist: &ApiPlaylist, id: TrackId) -> Result<()>;
}
