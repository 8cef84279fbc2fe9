//! Dynamic search query construction
//!
//! Builds the boolean query body sent to the search backend from the
//! optional text, category, and range parameters of a search request.
//! Text and category conditions are scored with per-strategy boosts;
//! numeric range conditions sit in filter context so they constrain
//! results without contributing to relevance. When no condition is
//! supplied at all the query collapses to match-all, which combined
//! with the fixed sort order surfaces popular games by default.

use serde::Deserialize;
use serde_json::{json, Map, Value};

/// How multiple clauses of one condition combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryLogic {
    And,
    Or,
}

/// Assembles a full search request body from optional filters
///
/// Defaults mirror the request wire format: ten results, first page,
/// OR between text strategies, AND between category labels.
#[derive(Debug, Clone)]
pub struct SearchQueryBuilder {
    search_query: Option<String>,
    player_count: Option<i64>,
    play_time: Option<i64>,
    categories: Vec<String>,
    limit: i64,
    page: i64,
    search_logic: QueryLogic,
    category_logic: QueryLogic,
}

impl Default for SearchQueryBuilder {
    fn default() -> Self {
        Self {
            search_query: None,
            player_count: None,
            play_time: None,
            categories: Vec::new(),
            limit: 10,
            page: 1,
            search_logic: QueryLogic::Or,
            category_logic: QueryLogic::And,
        }
    }
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn with_player_count(mut self, count: i64) -> Self {
        self.player_count = Some(count);
        self
    }

    pub fn with_play_time(mut self, minutes: i64) -> Self {
        self.play_time = Some(minutes);
        self
    }

    /// Adds category labels, normalized and deduplicated; labels that
    /// normalize to nothing are dropped
    pub fn with_categories<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in labels {
            if let Some(label) = normalize_label(raw.as_ref()) {
                if !self.categories.contains(&label) {
                    self.categories.push(label);
                }
            }
        }
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn with_search_logic(mut self, logic: QueryLogic) -> Self {
        self.search_logic = logic;
        self
    }

    pub fn with_category_logic(mut self, logic: QueryLogic) -> Self {
        self.category_logic = logic;
        self
    }

    /// First hit index for the requested page, clamped at zero
    pub fn offset(&self) -> i64 {
        ((self.page - 1) * self.limit).max(0)
    }

    /// The boolean query alone, without pagination or sort
    pub fn query(&self) -> Value {
        let mut must: Vec<Value> = Vec::new();
        let mut should: Vec<Value> = Vec::new();
        let mut filter: Vec<Value> = Vec::new();

        if let Some(text) = self
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let clauses = text_clauses(text);
            match self.search_logic {
                // Alternative strategies, at least one must hit.
                QueryLogic::Or => should.extend(clauses),
                // Required condition satisfied by any one strategy;
                // demanding all four at once would exclude everything.
                QueryLogic::And => must.push(json!({
                    "bool": {
                        "should": clauses,
                        "minimum_should_match": 1
                    }
                })),
            }
        }

        if !self.categories.is_empty() {
            let groups: Vec<Value> = self.categories.iter().map(|l| category_group(l)).collect();
            match self.category_logic {
                QueryLogic::And => must.extend(groups),
                QueryLogic::Or => must.push(json!({
                    "bool": {
                        "should": groups,
                        "minimum_should_match": 1
                    }
                })),
            }
        }

        if let Some(count) = self.player_count.filter(|c| *c > 0) {
            filter.push(json!({ "range": { "min_players": { "lte": count } } }));
            filter.push(json!({ "range": { "max_players": { "gte": count } } }));
        }

        if let Some(minutes) = self.play_time.filter(|m| *m > 0) {
            filter.push(json!({ "range": { "play_time_min": { "lte": minutes } } }));
            filter.push(json!({ "range": { "play_time_max": { "gte": minutes } } }));
        }

        if must.is_empty() && should.is_empty() && filter.is_empty() {
            return json!({ "match_all": {} });
        }

        let mut bool_body = Map::new();
        if !must.is_empty() {
            bool_body.insert("must".to_string(), Value::Array(must));
        }
        if !should.is_empty() {
            bool_body.insert("should".to_string(), Value::Array(should));
            bool_body.insert("minimum_should_match".to_string(), json!(1));
        }
        if !filter.is_empty() {
            bool_body.insert("filter".to_string(), Value::Array(filter));
        }

        json!({ "bool": bool_body })
    }

    /// Complete request body: query, pagination, sort, and highlighting
    pub fn build(&self) -> Value {
        json!({
            "query": self.query(),
            "size": self.limit.max(0),
            "from": self.offset(),
            "sort": [
                { "_score": { "order": "desc" } },
                { "popularity_score": { "order": "desc", "missing": "_last" } },
                { "rating_avg": { "order": "desc", "missing": "_last" } },
                { "id": { "order": "asc" } }
            ],
            "highlight": {
                "fields": {
                    "title": {
                        "pre_tags": ["<mark>"],
                        "post_tags": ["</mark>"],
                        "fragment_size": 150
                    },
                    "description": {
                        "pre_tags": ["<mark>"],
                        "post_tags": ["</mark>"],
                        "fragment_size": 150,
                        "number_of_fragments": 1
                    }
                }
            }
        })
    }
}

/// Strips whitespace and stray list formatting from a raw label and
/// lowercases it; returns None when nothing remains
fn normalize_label(raw: &str) -> Option<String> {
    let label = raw
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '"' | '\''))
        .trim()
        .to_lowercase();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Title-matching strategies, strongest boost first: exact phrase,
/// fuzzy match, substring, prefix
fn text_clauses(text: &str) -> Vec<Value> {
    let lower = text.to_lowercase();
    vec![
        json!({
            "match_phrase": {
                "title": { "query": text, "boost": 5 }
            }
        }),
        json!({
            "match": {
                "title": { "query": text, "fuzziness": "AUTO", "boost": 4 }
            }
        }),
        json!({
            "wildcard": {
                "title": {
                    "value": format!("*{}*", lower),
                    "boost": 3,
                    "case_insensitive": true
                }
            }
        }),
        json!({
            "prefix": {
                "title": {
                    "value": lower,
                    "boost": 2,
                    "case_insensitive": true
                }
            }
        }),
    ]
}

/// One label's alternatives, any of which satisfies the label
fn category_group(label: &str) -> Value {
    json!({
        "bool": {
            "should": [
                {
                    "term": {
                        "categories.keyword": { "value": label, "boost": 5 }
                    }
                },
                {
                    "match_phrase": {
                        "categories": { "query": label, "boost": 4 }
                    }
                },
                {
                    "match": {
                        "categories": { "query": label, "fuzziness": "AUTO", "boost": 3 }
                    }
                },
                {
                    "wildcard": {
                        "categories.keyword": {
                            "value": format!("*{}*", label),
                            "boost": 2,
                            "case_insensitive": true
                        }
                    }
                }
            ],
            "minimum_should_match": 1
        }
    })
}
