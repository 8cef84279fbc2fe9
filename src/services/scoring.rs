//! Recommendation scoring core
//!
//! Pure functions over an in-memory catalog: a user's action history is
//! distilled into a preference profile, every candidate game is scored
//! against that profile, and the candidates are ranked. Nothing here
//! touches the backend, which keeps the whole pipeline testable with
//! plain fixtures.
//!
//! Container choice is deliberate: catalog and profile use ordered maps
//! and sets so score accumulation and ranking iterate in a stable order
//! and equal inputs always produce identical output.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ActionType, Boardgame, UserAction};

/// Tunable weights for every scoring component
///
/// Injected at service construction; tests substitute deterministic
/// values to isolate individual terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Preference credit for a like action
    pub like: f64,
    /// Preference credit for a favorite action
    pub favorite: f64,
    /// Scales a rate action's value/5 preference credit
    pub rating_multiplier: f64,
    /// Scales the shared-category fraction of a candidate
    pub category_match: f64,
    /// Flat bonus when a preferred player count fits the candidate
    pub player_count_match: f64,
    /// Flat bonus when a preferred play time fits the candidate
    pub play_time_match: f64,
    /// Scales the candidate's rating_avg/5 term
    pub rating_avg: f64,
    /// Scales the candidate's popularity_score/100 term
    pub popularity: f64,
    /// Scales similarity-weighted preference contributions
    pub similarity_impact: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            like: 1.0,
            favorite: 2.0,
            rating_multiplier: 0.5,
            category_match: 3.0,
            player_count_match: 0.2,
            play_time_match: 0.2,
            rating_avg: 1.0,
            popularity: 0.0,
            similarity_impact: 2.0,
        }
    }
}

/// Aggregated view of what a user seems to enjoy
///
/// `preference_scores` keys every boardgame the user has interacted
/// with, including view/play actions that carry no weight of their
/// own; keyed games are never recommended back to the user.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PreferenceProfile {
    pub categories: BTreeSet<String>,
    pub player_counts: BTreeSet<i32>,
    pub play_times: BTreeSet<i32>,
    pub preference_scores: BTreeMap<i64, f64>,
}

/// Builds a [`PreferenceProfile`] from a user's action history
pub struct PreferenceExtractor<'a> {
    catalog: &'a BTreeMap<i64, Boardgame>,
    weights: &'a ScoringWeights,
}

impl<'a> PreferenceExtractor<'a> {
    pub fn new(catalog: &'a BTreeMap<i64, Boardgame>, weights: &'a ScoringWeights) -> Self {
        Self { catalog, weights }
    }

    /// Folds the action history into a profile
    ///
    /// Actions referencing a boardgame absent from the catalog are
    /// skipped with a warning; they contribute nothing. A supplied
    /// category override replaces derived categories entirely but
    /// leaves the player-count and play-time sets untouched.
    pub fn extract(
        &self,
        actions: &[UserAction],
        category_override: Option<&[String]>,
    ) -> PreferenceProfile {
        let mut profile = PreferenceProfile::default();

        if let Some(categories) = category_override {
            profile.categories = categories
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }

        for action in actions {
            let Some(id) = action.boardgame_ref() else {
                tracing::warn!(
                    boardgame_id = %action.boardgame_id,
                    "Action references an unparseable boardgame id, skipping"
                );
                continue;
            };
            let Some(boardgame) = self.catalog.get(&id) else {
                tracing::warn!(
                    boardgame_id = id,
                    "Action references a boardgame missing from the catalog, skipping"
                );
                continue;
            };

            if matches!(action.action_type, ActionType::Like | ActionType::Favorite) {
                if category_override.is_none() {
                    profile
                        .categories
                        .extend(boardgame.category_set().iter().map(|c| c.to_string()));
                }

                profile.player_counts.insert(boardgame.min_players);
                profile.player_counts.insert(boardgame.max_players);
                profile.play_times.insert(boardgame.play_time_min);
                profile.play_times.insert(boardgame.play_time_max);
            }

            let entry = profile.preference_scores.entry(id).or_insert(0.0);
            match action.action_type {
                ActionType::Like => *entry += self.weights.like,
                ActionType::Favorite => *entry += self.weights.favorite,
                ActionType::Rate if action.action_value > 0.0 => {
                    *entry += self.weights.rating_multiplier * (action.action_value / 5.0);
                }
                _ => {}
            }
        }

        profile
    }
}

/// Jaccard index over the two games' category sets
///
/// Symmetric, bounded in [0, 1], and exactly 0 when either set is
/// empty or no category is shared.
pub fn category_similarity(a: &Boardgame, b: &Boardgame) -> f64 {
    let set_a = a.category_set();
    let set_b = b.category_set();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    intersection as f64 / union as f64
}

/// Scores a candidate boardgame against a preference profile
pub struct BoardgameScorer<'a> {
    catalog: &'a BTreeMap<i64, Boardgame>,
    profile: &'a PreferenceProfile,
    weights: &'a ScoringWeights,
}

impl<'a> BoardgameScorer<'a> {
    pub fn new(
        catalog: &'a BTreeMap<i64, Boardgame>,
        profile: &'a PreferenceProfile,
        weights: &'a ScoringWeights,
    ) -> Self {
        Self {
            catalog,
            profile,
            weights,
        }
    }

    /// Sums the characteristic-match terms and the similarity-weighted
    /// contribution of every interacted game
    pub fn score(&self, candidate: &Boardgame) -> f64 {
        let mut score = 0.0;

        let candidate_categories = candidate.category_set();
        if !candidate_categories.is_empty() && !self.profile.categories.is_empty() {
            let matching = candidate_categories
                .iter()
                .filter(|c| self.profile.categories.contains(**c))
                .count();
            if matching > 0 {
                // The smaller set bounds the overlap; floored at one so
                // the fraction stays defined.
                let denominator = candidate_categories
                    .len()
                    .min(self.profile.categories.len())
                    .max(1);
                score += self.weights.category_match * (matching as f64 / denominator as f64);
            }
        }

        if self
            .profile
            .player_counts
            .iter()
            .any(|count| candidate.supports_players(*count))
        {
            score += self.weights.player_count_match;
        }

        if self
            .profile
            .play_times
            .iter()
            .any(|minutes| candidate.fits_play_time(*minutes))
        {
            score += self.weights.play_time_match;
        }

        if candidate.rating_avg > 0.0 {
            score += self.weights.rating_avg * (candidate.rating_avg / 5.0);
        }

        if candidate.popularity_score > 0.0 {
            score += self.weights.popularity * (candidate.popularity_score / 100.0);
        }

        for (interacted_id, preference) in &self.profile.preference_scores {
            if let Some(interacted) = self.catalog.get(interacted_id) {
                score += category_similarity(candidate, interacted)
                    * preference
                    * self.weights.similarity_impact;
            }
        }

        score
    }
}

/// Ranks every candidate the user has not interacted with
///
/// Highest score first; equal scores fall back to boardgame id
/// ascending so the ordering is stable across runs.
pub fn rank_recommendations(
    catalog: &BTreeMap<i64, Boardgame>,
    profile: &PreferenceProfile,
    weights: &ScoringWeights,
    limit: usize,
) -> Vec<Boardgame> {
    let scorer = BoardgameScorer::new(catalog, profile, weights);

    let mut scored: Vec<(f64, &Boardgame)> = catalog
        .values()
        .filter(|bg| !profile.preference_scores.contains_key(&bg.id))
        .map(|bg| (scorer.score(bg), bg))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, bg)| bg.clone())
        .collect()
}

/// Top `limit` games by stored popularity, id ascending on ties
pub fn top_by_popularity(games: &[Boardgame], limit: usize) -> Vec<Boardgame> {
    let mut sorted: Vec<&Boardgame> = games.iter().collect();
    sorted.sort_by(|a, b| {
        b.popularity_score
            .partial_cmp(&a.popularity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    sorted.into_iter().take(limit).cloned().collect()
}
