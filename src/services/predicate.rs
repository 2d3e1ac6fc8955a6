use clap::ValueEnum;

use crate::model::TrackSet;

/// The set-membership predicate that defines what belongs in the managed
/// playlist. The two rules are mirror images of each other; everything else
/// about a run is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Rule {
    /// Favorited tracks that sit in no other playlist ("orphans").
    FavoritesNotInPlaylists,
    /// Playlist tracks that were never favorited.
    PlaylistsNotInFavorites,
}

impl Rule {
    /// Pure set difference; the result keeps the left operand's order.
    pub fn evaluate(self, favorites: &TrackSet, playlist_union: &TrackSet) -> TrackSet {
        match self {
            Rule::FavoritesNotInPlaylists => favorites.difference(playlist_union),
            Rule::PlaylistsNotInFavorites => playlist_union.difference(favorites),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackId;

    fn set(ids: &[u64]) -> TrackSet {
        ids.iter().map(|&id| TrackId(id)).collect()
    }

    #[test]
    fn test_favorites_not_in_playlists() {
        // favorites = {1,2,3}, playlists = {2} => desired = {1,3}
        let favorites = set(&[1, 2, 3]);
        let playlists = set(&[2]);

        let desired = Rule::FavoritesNotInPlaylists.evaluate(&favorites, &playlists);
        assert_eq!(desired.iter().collect::<Vec<_>>(), vec![TrackId(1), TrackId(3)]);
    }

    #[test]
    fn test_playlists_not_in_favorites() {
        let favorites = set(&[1, 2, 3]);
        let playlists = set(&[2, 4, 5]);

        let desired = Rule::PlaylistsNotInFavorites.evaluate(&favorites, &playlists);
        assert_eq!(desired.iter().collect::<Vec<_>>(), vec![TrackId(4), TrackId(5)]);
    }

    #[test]
    fn test_empty_playlist_union_keeps_all_favorites() {
        // A missing managed playlist excludes nothing.
        let favorites = set(&[1, 2]);
        let playlists = TrackSet::new();

        let desired = Rule::FavoritesNotInPlaylists.evaluate(&favorites, &playlists);
        assert_eq!(desired, favorites);
    }
}
