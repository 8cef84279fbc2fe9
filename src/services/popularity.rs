//! Popularity scoring
//!
//! Two mechanisms keep `popularity_score` current. Every recorded
//! action applies an incremental weighted delta to its game's stored
//! score. Independently, a batch recompute aggregates the full action
//! log and rebuilds each game's score from rating average and
//! like/favorite/view counts, each normalized by the maximum across
//! games so the leader of a component scores 1.0 for it.

use std::collections::BTreeMap;

use crate::models::{ActionType, UserAction};

const RATING_COMPONENT: f64 = 0.4;
const LIKE_COMPONENT: f64 = 0.2;
const FAVORITE_COMPONENT: f64 = 0.2;
const VIEW_COMPONENT: f64 = 0.2;

/// Per-action-type multipliers for incremental popularity deltas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularityWeights {
    pub like: f64,
    pub view: f64,
    pub play: f64,
    pub rate: f64,
    pub favorite: f64,
}

impl Default for PopularityWeights {
    fn default() -> Self {
        Self {
            like: 2.0,
            view: 0.5,
            play: 1.5,
            rate: 1.0,
            favorite: 2.5,
        }
    }
}

impl PopularityWeights {
    /// Score delta one action applies to its boardgame
    pub fn delta(&self, action: &UserAction) -> f64 {
        let weight = match action.action_type {
            ActionType::Like => self.like,
            ActionType::View => self.view,
            ActionType::Play => self.play,
            ActionType::Rate => self.rate,
            ActionType::Favorite => self.favorite,
        };
        weight * action.action_value
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct GameStats {
    rating_sum: f64,
    rating_count: u32,
    like_count: u32,
    favorite_count: u32,
    view_count: u32,
}

impl GameStats {
    fn rating_avg(&self) -> f64 {
        if self.rating_count > 0 {
            self.rating_sum / self.rating_count as f64
        } else {
            0.0
        }
    }
}

/// Recomputes popularity scores for every game the action log mentions
///
/// Only games with at least one counted action appear in the result;
/// play actions and actions with unparseable ids are ignored, so games
/// absent from the map keep their stored score.
pub fn batch_popularity_scores(actions: &[UserAction]) -> BTreeMap<i64, f64> {
    let mut stats: BTreeMap<i64, GameStats> = BTreeMap::new();

    for action in actions {
        let Some(id) = action.boardgame_ref() else {
            continue;
        };

        match action.action_type {
            ActionType::Rate => {
                let entry = stats.entry(id).or_default();
                entry.rating_sum += action.action_value;
                entry.rating_count += 1;
            }
            ActionType::Like => stats.entry(id).or_default().like_count += 1,
            ActionType::Favorite => stats.entry(id).or_default().favorite_count += 1,
            ActionType::View => stats.entry(id).or_default().view_count += 1,
            ActionType::Play => {}
        }
    }

    let max_rating_avg = stats.values().map(GameStats::rating_avg).fold(0.0, f64::max);
    let max_like = stats.values().map(|s| s.like_count).max().unwrap_or(0);
    let max_favorite = stats.values().map(|s| s.favorite_count).max().unwrap_or(0);
    let max_view = stats.values().map(|s| s.view_count).max().unwrap_or(0);

    let normalize = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

    stats
        .iter()
        .map(|(id, s)| {
            let score = normalize(s.rating_avg(), max_rating_avg) * RATING_COMPONENT
                + normalize(s.like_count as f64, max_like as f64) * LIKE_COMPONENT
                + normalize(s.favorite_count as f64, max_favorite as f64) * FAVORITE_COMPONENT
                + normalize(s.view_count as f64, max_view as f64) * VIEW_COMPONENT;
            (*id, score)
        })
        .collect()
}
