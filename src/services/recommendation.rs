//! Recommendation and catalog service
//!
//! One facade owns the backend handle, the scoring configuration and
//! the in-memory catalog snapshot; it is constructed once at startup
//! and shared by reference across request handlers. Methods return
//! typed results and leave degradation decisions (snapshot fallback,
//! empty lists) to the transport layer. The single exception is the
//! popularity update that follows a recorded action: the action write
//! already succeeded, so a failed update is logged and dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{Boardgame, UserAction},
    search::{mappings, SearchBackend, SearchQueryBuilder},
    services::{
        popularity::{batch_popularity_scores, PopularityWeights},
        scoring::{rank_recommendations, PreferenceExtractor, ScoringWeights},
    },
};

/// Upper bound for catalog and action-log scans; matches the backend's
/// default max result window
const SCAN_LIMIT: i64 = 10_000;

/// One search result: the stored boardgame plus relevance metadata
///
/// Score and highlights are presentation data attached for the caller;
/// they play no part in ranking.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredBoardgame {
    #[serde(flatten)]
    pub boardgame: Boardgame,
    #[serde(rename = "_search_score", skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
    #[serde(rename = "_highlights", skip_serializing_if = "Option::is_none")]
    pub highlights: Option<std::collections::HashMap<String, Vec<String>>>,
}

pub struct RecommendationService {
    backend: Arc<dyn SearchBackend>,
    boardgame_index: String,
    user_action_index: String,
    weights: ScoringWeights,
    popularity_weights: PopularityWeights,
    /// Last catalog successfully read from or written to the backend
    snapshot: RwLock<Vec<Boardgame>>,
}

impl RecommendationService {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        boardgame_index: String,
        user_action_index: String,
    ) -> Self {
        Self::with_weights(
            backend,
            boardgame_index,
            user_action_index,
            ScoringWeights::default(),
            PopularityWeights::default(),
        )
    }

    pub fn with_weights(
        backend: Arc<dyn SearchBackend>,
        boardgame_index: String,
        user_action_index: String,
        weights: ScoringWeights,
        popularity_weights: PopularityWeights,
    ) -> Self {
        Self {
            backend,
            boardgame_index,
            user_action_index,
            weights,
            popularity_weights,
            snapshot: RwLock::new(Vec::new()),
        }
    }

    /// Creates both indices when missing
    ///
    /// Each creation body registers a stable `<index>_alias` alias next
    /// to its mappings, so fresh indices are immediately addressable.
    pub async fn ensure_indices(&self) -> AppResult<()> {
        let boardgame_alias = format!("{}_alias", self.boardgame_index);
        let user_action_alias = format!("{}_alias", self.user_action_index);

        if !self.backend.index_exists(&self.boardgame_index).await? {
            self.backend
                .create_index(
                    &self.boardgame_index,
                    &mappings::boardgame_index_body(&boardgame_alias),
                )
                .await?;
        }

        if !self.backend.index_exists(&self.user_action_index).await? {
            self.backend
                .create_index(
                    &self.user_action_index,
                    &mappings::user_action_index_body(&user_action_alias),
                )
                .await?;
        }

        Ok(())
    }

    /// Validates and persists one user action, then applies its
    /// popularity delta to the referenced boardgame
    pub async fn add_user_action(&self, action: &UserAction) -> AppResult<()> {
        action.validate()?;

        let body = serde_json::to_value(action).map_err(|e| AppError::Internal(e.to_string()))?;
        self.backend
            .index_document(&self.user_action_index, None, &body)
            .await?;

        tracing::info!(
            user_id = %action.user_id,
            boardgame_id = %action.boardgame_id,
            action_type = %action.action_type,
            "User action recorded"
        );

        if let Err(e) = self.apply_popularity_delta(action).await {
            tracing::warn!(
                boardgame_id = %action.boardgame_id,
                error = %e,
                "Popularity update skipped"
            );
        }

        Ok(())
    }

    /// Read-modify-write of the stored popularity score; not atomic,
    /// concurrent deltas to the same game can lose increments
    async fn apply_popularity_delta(&self, action: &UserAction) -> AppResult<()> {
        let source = self
            .backend
            .get_document(&self.boardgame_index, &action.boardgame_id)
            .await?;
        let mut boardgame: Boardgame = serde_json::from_value(source)
            .map_err(|e| AppError::SearchBackend(format!("stored boardgame is malformed: {}", e)))?;

        boardgame.popularity_score += self.popularity_weights.delta(action);

        let body =
            serde_json::to_value(&boardgame).map_err(|e| AppError::Internal(e.to_string()))?;
        self.backend
            .index_document(&self.boardgame_index, Some(&action.boardgame_id), &body)
            .await
    }

    /// Newest-first action history of one user
    pub async fn get_user_actions(&self, user_id: &str) -> AppResult<Vec<UserAction>> {
        self.fetch_actions("user_id", user_id).await
    }

    /// Newest-first actions recorded against one boardgame
    pub async fn get_boardgame_actions(&self, boardgame_id: &str) -> AppResult<Vec<UserAction>> {
        self.fetch_actions("boardgame_id", boardgame_id).await
    }

    async fn fetch_actions(&self, field: &str, value: &str) -> AppResult<Vec<UserAction>> {
        let body = json!({
            "query": { "term": { field: value } },
            "size": SCAN_LIMIT,
            "sort": [ { "action_time": { "order": "desc" } } ]
        });

        let response = self.backend.search(&self.user_action_index, &body).await?;
        Ok(response.sources())
    }

    /// Full catalog scan; refreshes the snapshot on success
    pub async fn all_boardgames(&self) -> AppResult<Vec<Boardgame>> {
        let body = json!({ "query": { "match_all": {} }, "size": SCAN_LIMIT });
        let response = self.backend.search(&self.boardgame_index, &body).await?;
        let boardgames: Vec<Boardgame> = response.sources();

        *self.snapshot.write().await = boardgames.clone();

        tracing::info!(count = boardgames.len(), "Catalog fetched");
        Ok(boardgames)
    }

    /// Copy of the last known catalog, for degraded read paths
    pub async fn snapshot(&self) -> Vec<Boardgame> {
        self.snapshot.read().await.clone()
    }

    /// Upserts catalog entries one document at a time, continuing past
    /// per-item failures; returns the number indexed
    ///
    /// The snapshot is replaced only when every item was acknowledged.
    pub async fn update_boardgames(&self, boardgames: &[Boardgame]) -> AppResult<usize> {
        let mut indexed = 0usize;

        for boardgame in boardgames {
            let body = serde_json::to_value(boardgame)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            let id = boardgame.id.to_string();

            match self
                .backend
                .index_document(&self.boardgame_index, Some(&id), &body)
                .await
            {
                Ok(()) => indexed += 1,
                Err(e) => {
                    tracing::error!(
                        boardgame_id = boardgame.id,
                        error = %e,
                        "Failed to upsert boardgame"
                    );
                }
            }
        }

        if indexed == boardgames.len() {
            *self.snapshot.write().await = boardgames.to_vec();
            tracing::info!(count = indexed, "Catalog upsert completed");
            Ok(indexed)
        } else {
            Err(AppError::SearchBackend(format!(
                "catalog upsert indexed {} of {} boardgames",
                indexed,
                boardgames.len()
            )))
        }
    }

    /// Builds the user's preference profile and ranks the catalog
    /// against it
    ///
    /// Callers may supply the action history and a category override;
    /// otherwise the history is fetched from the backend.
    pub async fn get_recommendations(
        &self,
        user_id: &str,
        limit: usize,
        actions: Option<Vec<UserAction>>,
        categories: Option<Vec<String>>,
    ) -> AppResult<Vec<Boardgame>> {
        let actions = match actions {
            Some(actions) => actions,
            None => self.get_user_actions(user_id).await?,
        };
        let catalog = self.all_boardgames().await?;

        let recommendations =
            self.recommend_within(catalog, &actions, categories.as_deref(), limit);

        tracing::info!(
            user_id = %user_id,
            actions = actions.len(),
            results = recommendations.len(),
            "Recommendations generated"
        );
        Ok(recommendations)
    }

    /// Pure ranking over an already-loaded catalog; the handler's
    /// snapshot fallback calls this directly
    pub fn recommend_within(
        &self,
        catalog: Vec<Boardgame>,
        actions: &[UserAction],
        categories: Option<&[String]>,
        limit: usize,
    ) -> Vec<Boardgame> {
        let by_id: BTreeMap<i64, Boardgame> =
            catalog.into_iter().map(|bg| (bg.id, bg)).collect();

        let profile = PreferenceExtractor::new(&by_id, &self.weights).extract(actions, categories);
        rank_recommendations(&by_id, &profile, &self.weights, limit)
    }

    /// Top games by stored popularity score
    pub async fn get_popular_boardgames(&self, limit: i64) -> AppResult<Vec<Boardgame>> {
        let body = json!({
            "size": limit.max(0),
            "sort": [ { "popularity_score": { "order": "desc" } } ]
        });

        let response = self.backend.search(&self.boardgame_index, &body).await?;
        Ok(response.sources())
    }

    /// Rebuilds every mentioned game's popularity score from the full
    /// action log; returns the number of games written back
    pub async fn recompute_popularity(&self) -> AppResult<usize> {
        let body = json!({ "query": { "match_all": {} }, "size": SCAN_LIMIT });
        let response = self.backend.search(&self.user_action_index, &body).await?;
        let actions: Vec<UserAction> = response.sources();

        let scores = batch_popularity_scores(&actions);
        if scores.is_empty() {
            return Ok(0);
        }

        let catalog = self.all_boardgames().await?;
        let mut updated = 0usize;

        for mut boardgame in catalog {
            let Some(score) = scores.get(&boardgame.id) else {
                continue;
            };
            boardgame.popularity_score = *score;

            let body = serde_json::to_value(&boardgame)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            let id = boardgame.id.to_string();

            match self
                .backend
                .index_document(&self.boardgame_index, Some(&id), &body)
                .await
            {
                Ok(()) => updated += 1,
                Err(e) => {
                    tracing::error!(
                        boardgame_id = boardgame.id,
                        error = %e,
                        "Failed to write recomputed popularity score"
                    );
                }
            }
        }

        tracing::info!(updated = updated, "Popularity recompute completed");
        Ok(updated)
    }

    /// Runs a built search and attaches each hit's relevance metadata
    pub async fn search_boardgames(
        &self,
        query: &SearchQueryBuilder,
    ) -> AppResult<Vec<ScoredBoardgame>> {
        let body = query.build();
        let response = self.backend.search(&self.boardgame_index, &body).await?;

        let results: Vec<ScoredBoardgame> = response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| {
                let boardgame: Boardgame = serde_json::from_value(hit.source).ok()?;
                Some(ScoredBoardgame {
                    boardgame,
                    search_score: hit.score,
                    highlights: hit.highlight,
                })
            })
            .collect();

        tracing::info!(results = results.len(), "Search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;
    use crate::search::{MockSearchBackend, SearchResponse};
    use chrono::Utc;
    use serde_json::Value;

    fn create_test_boardgame(id: i64, categories: &str) -> Boardgame {
        Boardgame {
            id,
            title: format!("Game {}", id),
            description: "A test game".to_string(),
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

    fn create_test_action(boardgame_id: &str, action_type: ActionType, value: f64) -> UserAction {
        UserAction {
            user_id: "user-1".to_string(),
            boardgame_id: boardgame_id.to_string(),
            action_type,
            action_value: value,
            action_detail: None,
            action_time: Utc::now(),
        }
    }

    fn create_test_service(backend: MockSearchBackend) -> RecommendationService {
        RecommendationService::new(
            Arc::new(backend),
            "boardgame".to_string(),
            "user_action".to_string(),
        )
    }

    fn response_of<T: Serialize>(items: &[T]) -> SearchResponse {
        let hits: Vec<Value> = items
            .iter()
            .map(|item| json!({ "_source": serde_json::to_value(item).unwrap() }))
            .collect();
        serde_json::from_value(json!({ "hits": { "hits": hits } })).unwrap()
    }

    #[tokio::test]
    async fn test_add_user_action_rejects_invalid_before_backend() {
        // No expectations: any backend call would panic the mock.
        let service = create_test_service(MockSearchBackend::new());
        let action = create_test_action("1", ActionType::Rate, 7.0);

        let result = service.add_user_action(&action).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_user_action_indexes_and_applies_popularity_delta() {
        let mut backend = MockSearchBackend::new();

        backend
            .expect_index_document()
            .withf(|index, id, _| index == "user_action" && id.is_none())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let stored = serde_json::to_value(create_test_boardgame(1, "Strategy")).unwrap();
        backend
            .expect_get_document()
            .withf(|index, id| index == "boardgame" && id == "1")
            .times(1)
            .returning(move |_, _| Ok(stored.clone()));

        // Like delta is 2.0 * 1.0 on top of the stored score.
        backend
            .expect_index_document()
            .withf(|index, id, body| {
                index == "boardgame"
                    && *id == Some("1")
                    && (body["popularity_score"].as_f64().unwrap_or(f64::NAN) - 2.0).abs() < 1e-9
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = create_test_service(backend);
        let action = create_test_action("1", ActionType::Like, 1.0);

        assert!(service.add_user_action(&action).await.is_ok());
    }

    #[tokio::test]
    async fn test_add_user_action_survives_popularity_failure() {
        let mut backend = MockSearchBackend::new();

        backend
            .expect_index_document()
            .withf(|index, _, _| index == "user_action")
            .times(1)
            .returning(|_, _, _| Ok(()));
        backend
            .expect_get_document()
            .times(1)
            .returning(|_, _| Err(AppError::NotFound("document 9 in index boardgame".into())));

        let service = create_test_service(backend);
        let action = create_test_action("9", ActionType::Play, 1.0);

        assert!(service.add_user_action(&action).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_recommendations_excludes_interacted_games() {
        let mut backend = MockSearchBackend::new();

        let actions = vec![create_test_action("1", ActionType::Like, 1.0)];
        let action_response = response_of(&actions);
        backend
            .expect_search()
            .withf(|index, _| index == "user_action")
            .returning(move |_, _| Ok(action_response.clone()));

        let catalog = vec![
            create_test_boardgame(1, "Strategy,War"),
            create_test_boardgame(2, "War"),
            create_test_boardgame(3, "Party"),
        ];
        let catalog_response = response_of(&catalog);
        backend
            .expect_search()
            .withf(|index, body| index == "boardgame" && body["query"]["match_all"].is_object())
            .returning(move |_, _| Ok(catalog_response.clone()));

        let service = create_test_service(backend);
        let recommendations = service
            .get_recommendations("user-1", 10, None, None)
            .await
            .unwrap();

        assert!(recommendations.iter().all(|bg| bg.id != 1));
        assert_eq!(recommendations.first().map(|bg| bg.id), Some(2));
    }

    #[tokio::test]
    async fn test_get_recommendations_uses_supplied_actions_without_fetch() {
        let mut backend = MockSearchBackend::new();

        // Only the catalog scan may hit the backend.
        let catalog = vec![
            create_test_boardgame(1, "Strategy"),
            create_test_boardgame(2, "Strategy"),
        ];
        let catalog_response = response_of(&catalog);
        backend
            .expect_search()
            .withf(|index, _| index == "boardgame")
            .times(1)
            .returning(move |_, _| Ok(catalog_response.clone()));

        let service = create_test_service(backend);
        let supplied = vec![create_test_action("1", ActionType::Favorite, 1.0)];
        let recommendations = service
            .get_recommendations("user-1", 10, Some(supplied), None)
            .await
            .unwrap();

        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].id, 2);
    }

    #[tokio::test]
    async fn test_update_boardgames_refreshes_snapshot() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_index_document()
            .withf(|index, id, _| index == "boardgame" && id.is_some())
            .times(2)
            .returning(|_, _, _| Ok(()));

        let service = create_test_service(backend);
        let catalog = vec![
            create_test_boardgame(1, "Strategy"),
            create_test_boardgame(2, "Party"),
        ];

        let indexed = service.update_boardgames(&catalog).await.unwrap();
        assert_eq!(indexed, 2);
        assert_eq!(service.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_boardgames_partial_failure_keeps_snapshot() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_index_document()
            .withf(|_, id, _| *id == Some("1"))
            .returning(|_, _, _| Ok(()));
        backend
            .expect_index_document()
            .withf(|_, id, _| *id == Some("2"))
            .returning(|_, _, _| Err(AppError::SearchBackend("boom".into())));

        let service = create_test_service(backend);
        let catalog = vec![
            create_test_boardgame(1, "Strategy"),
            create_test_boardgame(2, "Party"),
        ];

        let result = service.update_boardgames(&catalog).await;
        assert!(matches!(result, Err(AppError::SearchBackend(_))));
        assert!(service.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_popular_requests_popularity_sort() {
        let mut backend = MockSearchBackend::new();

        let catalog = vec![create_test_boardgame(1, "Strategy")];
        let catalog_response = response_of(&catalog);
        backend
            .expect_search()
            .withf(|index, body| {
                index == "boardgame"
                    && body["size"] == 5
                    && body["sort"][0]["popularity_score"]["order"] == "desc"
            })
            .times(1)
            .returning(move |_, _| Ok(catalog_response.clone()));

        let service = create_test_service(backend);
        let popular = service.get_popular_boardgames(5).await.unwrap();
        assert_eq!(popular.len(), 1);
    }

    #[tokio::test]
    async fn test_recompute_popularity_writes_mentioned_games_only() {
        let mut backend = MockSearchBackend::new();

        let actions = vec![create_test_action("1", ActionType::Like, 1.0)];
        let action_response = response_of(&actions);
        backend
            .expect_search()
            .withf(|index, _| index == "user_action")
            .times(1)
            .returning(move |_, _| Ok(action_response.clone()));

        let catalog = vec![
            create_test_boardgame(1, "Strategy"),
            create_test_boardgame(2, "Party"),
        ];
        let catalog_response = response_of(&catalog);
        backend
            .expect_search()
            .withf(|index, _| index == "boardgame")
            .times(1)
            .returning(move |_, _| Ok(catalog_response.clone()));

        // Only game 1 appears in the action log; game 2 keeps its score.
        backend
            .expect_index_document()
            .withf(|index, id, body| {
                index == "boardgame"
                    && *id == Some("1")
                    && (body["popularity_score"].as_f64().unwrap_or(f64::NAN) - 0.2).abs() < 1e-9
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = create_test_service(backend);
        let updated = service.recompute_popularity().await.unwrap();
        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn test_search_boardgames_attaches_relevance_metadata() {
        let mut backend = MockSearchBackend::new();

        let game = serde_json::to_value(create_test_boardgame(7, "Strategy")).unwrap();
        let raw = json!({
            "hits": { "hits": [{
                "_score": 7.5,
                "_source": game,
                "highlight": { "title": ["<mark>Game 7</mark>"] }
            }]}
        });
        let response: SearchResponse = serde_json::from_value(raw).unwrap();
        backend
            .expect_search()
            .withf(|index, _| index == "boardgame")
            .returning(move |_, _| Ok(response.clone()));

        let service = create_test_service(backend);
        let query = SearchQueryBuilder::new().with_text("Game");
        let results = service.search_boardgames(&query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].boardgame.id, 7);
        assert_eq!(results[0].search_score, Some(7.5));
        assert_eq!(
            results[0].highlights.as_ref().unwrap()["title"],
            vec!["<mark>Game 7</mark>".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ensure_indices_creates_missing_with_aliases() {
        let mut backend = MockSearchBackend::new();

        backend
            .expect_index_exists()
            .withf(|index| index == "boardgame")
            .times(1)
            .returning(|_| Ok(false));
        backend
            .expect_index_exists()
            .withf(|index| index == "user_action")
            .times(1)
            .returning(|_| Ok(true));
        backend
            .expect_create_index()
            .withf(|index, body| {
                index == "boardgame" && body["aliases"]["boardgame_alias"].is_object()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = create_test_service(backend);
        assert!(service.ensure_indices().await.is_ok());
    }

    #[test]
    fn test_scored_boardgame_wire_shape() {
        let scored = ScoredBoardgame {
            boardgame: create_test_boardgame(7, "Strategy"),
            search_score: Some(7.5),
            highlights: None,
        };

        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["_search_score"], 7.5);
        assert!(value.get("_highlights").is_none());
    }
}
