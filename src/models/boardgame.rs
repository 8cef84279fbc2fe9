use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A board game in the catalog
///
/// Mirrors the document stored in the search backend. `categories` is kept
/// as the raw comma-separated string the catalog feed delivers; use
/// [`Boardgame::category_set`] wherever the labels matter as a set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Boardgame {
    /// Unique catalog identifier
    pub id: i64,
    pub title: String,
    pub description: String,
    pub min_players: i32,
    pub max_players: i32,
    /// Shortest typical play time in minutes
    pub play_time_min: i32,
    /// Longest typical play time in minutes
    pub play_time_max: i32,
    /// Comma-separated category labels, e.g. "Strategy, War"
    pub categories: String,
    /// Average user rating on a 0-5 scale
    pub rating_avg: f64,
    pub rating_count: i64,
    /// Accumulated popularity, adjusted on every recorded user action
    pub popularity_score: f64,
    pub image_url: String,
}

impl Boardgame {
    /// Parses `categories` into a set of trimmed, non-empty labels
    ///
    /// Duplicates and whitespace-only entries are dropped. An empty or
    /// all-whitespace `categories` string yields an empty set.
    pub fn category_set(&self) -> BTreeSet<&str> {
        parse_categories(&self.categories)
    }

    /// True when the given player count fits this game's supported range
    pub fn supports_players(&self, count: i32) -> bool {
        self.min_players <= count && count <= self.max_players
    }

    /// True when the given play time falls within this game's range
    pub fn fits_play_time(&self, minutes: i32) -> bool {
        self.play_time_min <= minutes && minutes <= self.play_time_max
    }
}

/// Splits a comma-separated label string into a set of trimmed labels
fn parse_categories(raw: &str) -> BTreeSet<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with_categories(categories: &str) -> Boardgame {
        Boardgame {
            id: 1,
            title: "Test Game".to_string(),
            description: String::new(),
            min_players: 2,
            max_players: 4,
            play_time_min: 30,
            play_time_max: 60,
            categories: categories.to_string(),
            rating_avg: 0.0,
            rating_count: 0,
            popularity_score: 0.0,
            image_url: String::new(),
        }
    }

    #[test]
    fn test_category_set_trims_and_drops_empty() {
        let game = game_with_categories(" Strategy , War,, ,Economic ");
        let set = game.category_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains("Strategy"));
        assert!(set.contains("War"));
        assert!(set.contains("Economic"));
    }

    #[test]
    fn test_category_set_dedupes() {
        let game = game_with_categories("War,War, War");
        assert_eq!(game.category_set().len(), 1);
    }

    #[test]
    fn test_category_set_empty_string() {
        let game = game_with_categories("");
        assert!(game.category_set().is_empty());
    }

    #[test]
    fn test_supports_players_bounds_inclusive() {
        let game = game_with_categories("Party");
        assert!(game.supports_players(2));
        assert!(game.supports_players(4));
        assert!(!game.supports_players(1));
        assert!(!game.supports_players(5));
    }

    #[test]
    fn test_fits_play_time_bounds_inclusive() {
        let game = game_with_categories("Party");
        assert!(game.fits_play_time(30));
        assert!(game.fits_play_time(60));
        assert!(!game.fits_play_time(29));
        assert!(!game.fits_play_time(61));
    }
}
