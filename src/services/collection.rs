use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};

use crate::model::TrackSet;
use crate::ports::tidal::{ApiPlaylist, ApiTrack, CollectionSource};

/// How the paginated fetch behaves.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Items requested per page.
    pub page_size: u32,
    /// Pause between page requests, a courtesy to the API. Zero disables it.
    pub page_pause: Duration,
    /// Extra attempts per page after the first failure.
    pub page_retries: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("favorites page at offset {offset} failed: {message}")]
    Transient { offset: u32, message: String },
    #[error("favorites page at offset {offset} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        offset: u32,
        attempts: u32,
        last_error: String,
    },
}

/// Reads complete, deduplicated track-id sets out of the paginated Tidal
/// collections.
pub struct CollectionService<'a, C: CollectionSource> {
    source: &'a C,
    options: FetchOptions,
}

impl<'a, C: CollectionSource> CollectionService<'a, C> {
    pub fn new(source: &'a C, options: FetchOptions) -> Self {
        Self { source, options }
    }

    /// Fetch every favorite track, regardless of how many there are.
    ///
    /// Pages with an offset cursor advanced by the number of items actually
    /// returned. Only a zero-length page ends the loop; a short non-empty page
    /// does not (the API does not report a reliable total). Duplicates across
    /// pages are dropped after the fact, first occurrence wins.
    pub async fn fetch_favorites(&self) -> Result<TrackSet, FetchError> {
        let mut all = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let page = self.page_with_retry(offset).await?;
            if page.is_empty() {
                break;
            }
            offset += page.len() as u32;
            all.extend(page);

            if !self.options.page_pause.is_zero() {
                tokio::time::sleep(self.options.page_pause).await;
            }
        }

        let favorites: TrackSet = all.into_iter().map(|track| track.id).collect();
        tracing::debug!(total = favorites.len(), "fetched favorite tracks");
        Ok(favorites)
    }

    async fn page_with_retry(&self, offset: u32) -> Result<Vec<ApiTrack>, FetchError> {
        let attempts = self.options.page_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.fetch_page(offset).await {
                Ok(page) => return Ok(page),
                Err(transient) => {
                    tracing::warn!(attempt, attempts, %transient, "favorites page fetch failed");
                    last_error = transient.to_string();
                }
            }
        }

        Err(FetchError::Exhausted {
            offset,
            attempts,
            last_error,
        })
    }

    async fn fetch_page(&self, offset: u32) -> Result<Vec<ApiTrack>, FetchError> {
        self.source
            .favorites_page(self.options.page_size, offset)
            .await
            .map_err(|error| FetchError::Transient {
                offset,
                message: format!("{error:#}"),
            })
    }

    /// Union of track ids across every playlist except the managed one, which
    /// must not feed its own predicate. Also returns the managed playlist's
    /// handle when it already exists, so the caller can reconcile against it
    /// without listing playlists twice.
    pub async fn playlist_union(
        &self,
        exclude_name: &str,
    ) -> Result<(TrackSet, Option<ApiPlaylist>)> {
        let playlists = self
            .source
            .list_playlists()
            .await
            .wrap_err("Failed to list playlists")?;
        tracing::info!(count = playlists.len(), "found playlists");

        let mut managed = None;
        let mut union = TrackSet::new();

        for playlist in playlists {
            if playlist.name == exclude_name {
                if managed.is_none() {
                    managed = Some(playlist);
                } else {
                    tracing::warn!(
                        name = exclude_name,
                        uuid = %playlist.uuid,
                        "multiple playlists share the managed name; using the first"
                    );
                }
                continue;
            }

            let tracks = self
                .source
                .playlist_tracks(&playlist)
                .await
                .wrap_err_with(|| {
                    format!("Failed to fetch tracks of playlist '{}'", playlist.name)
                })?;
            union.extend(tracks.into_iter().map(|track| track.id));
        }

        tracing::debug!(total = union.len(), "aggregated playlist tracks");
        Ok((union, managed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackId;
    use crate::ports::tidal::MockCollectionSource;

    fn track(id: u64) -> ApiTrack {
        ApiTrack {
            id: TrackId(id),
            title: None,
        }
    }

    fn playlist(uuid: &str, name: &str) -> ApiPlaylist {
        ApiPlaylist {
            uuid: uuid.into(),
            name: name.into(),
            description: None,
            track_count: None,
        }
    }

    fn options() -> FetchOptions {
        FetchOptions {
            page_size: 2,
            page_pause: Duration::ZERO,
            page_retries: 0,
        }
    }

    #[tokio::test]
    async fn test_fetch_favorites_dedups_across_pages() {
        // Pages [1,2], [2,3], [] => {1,2,3}, terminating on the empty page.
        let mut source = MockCollectionSource::new();
        source
            .expect_favorites_page()
            .returning(|_, offset| match offset {
                0 => Ok(vec![track(1), track(2)]),
                2 => Ok(vec![track(2), track(3)]),
                _ => Ok(vec![]),
            });

        let service = CollectionService::new(&source, options());
        let favorites = service.fetch_favorites().await.unwrap();

        assert_eq!(
            favorites.iter().collect::<Vec<_>>(),
            vec![TrackId(1), TrackId(2), TrackId(3)]
        );
    }

    #[tokio::test]
    async fn test_fetch_favorites_continues_past_short_page() {
        // A page shorter than page_size but non-empty must not end the loop.
        let mut source = MockCollectionSource::new();
        source
            .expect_favorites_page()
            .returning(|_, offset| match offset {
                0 => Ok(vec![track(1)]),
                1 => Ok(vec![track(2), track(3)]),
                _ => Ok(vec![]),
            });

        let service = CollectionService::new(&source, options());
        let favorites = service.fetch_favorites().await.unwrap();

        assert_eq!(favorites.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_favorites_empty_collection() {
        let mut source = MockCollectionSource::new();
        source
            .expect_favorites_page()
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let service = CollectionService::new(&source, options());
        let favorites = service.fetch_favorites().await.unwrap();

        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_favorites_retries_failed_page() {
        let mut source = MockCollectionSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_favorites_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(color_eyre::eyre::eyre!("connection reset")));
        source
            .expect_favorites_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![track(7)]));
        source
            .expect_favorites_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));

        let service = CollectionService::new(
            &source,
            FetchOptions {
                page_retries: 2,
                ..options()
            },
        );
        let favorites = service.fetch_favorites().await.unwrap();

        assert_eq!(favorites.iter().collect::<Vec<_>>(), vec![TrackId(7)]);
    }

    #[tokio::test]
    async fn test_fetch_favorites_exhausts_after_bounded_retries() {
        let mut source = MockCollectionSource::new();
        source
            .expect_favorites_page()
            .times(3)
            .returning(|_, _| Err(color_eyre::eyre::eyre!("boom")));

        let service = CollectionService::new(
            &source,
            FetchOptions {
                page_retries: 2,
                ..options()
            },
        );
        let error = service.fetch_favorites().await.unwrap_err();

        match error {
            FetchError::Exhausted {
                offset, attempts, ..
            } => {
                assert_eq!(offset, 0);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_playlist_union_excludes_managed_playlist() {
        let mut source = MockCollectionSource::new();
        source.expect_list_playlists().returning(|| {
            Ok(vec![
                playlist("a", "Road Trip"),
                playlist("b", "Orphaned Tracks"),
                playlist("c", "Gym"),
            ])
        });
        source
            .expect_playlist_tracks()
            .withf(|playlist: &ApiPlaylist| playlist.name != "Orphaned Tracks")
            .returning(|playlist| match playlist.uuid.as_str() {
                "a" => Ok(vec![track(1), track(2)]),
                "c" => Ok(vec![track(2), track(5)]),
                other => panic!("unexpected playlist {other}"),
            });

        let service = CollectionService::new(&source, options());
        let (union, managed) = service.playlist_union("Orphaned Tracks").await.unwrap();

        assert_eq!(
            union.iter().collect::<Vec<_>>(),
            vec![TrackId(1), TrackId(2), TrackId(5)]
        );
        assert_eq!(managed.unwrap().uuid, "b");
    }

    #[tokio::test]
    async fn test_playlist_union_without_managed_playlist() {
        let mut source = MockCollectionSource::new();
        source
            .expect_list_playlists()
            .returning(|| Ok(vec![playlist("a", "Road Trip")]));
        source
            .expect_playlist_tracks()
            .returning(|_| Ok(vec![track(9)]));

        let service = CollectionService::new(&source, options());
        let (union, managed) = service.playlist_union("Orphaned Tracks").await.unwrap();

        assert_eq!(union.len(), 1);
        assert!(managed.is_none());
    }
}
