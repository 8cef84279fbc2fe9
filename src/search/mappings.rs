//! Index definitions for the catalog and action-log indices
//!
//! Each body bundles settings, field mappings, and a stable alias so a
//! freshly created index is immediately addressable under the name the
//! rest of the service queries. Title search relies on three subfields:
//! a lowercase keyword for exact matching, an edge-friendly ngram field
//! for partial input, and a completion field for suggest queries.

use serde_json::{json, Value};

/// Create-index body for the boardgame catalog
pub fn boardgame_index_body(alias: &str) -> Value {
    json!({
        "aliases": {
            alias: {}
        },
        "settings": {
            "analysis": {
                "normalizer": {
                    "lowercase_normalizer": {
                        "type": "custom",
                        "filter": ["lowercase", "asciifolding"]
                    }
                },
                "analyzer": {
                    "search_analyzer": {
                        "tokenizer": "standard",
                        "filter": ["lowercase", "asciifolding", "stop"]
                    },
                    "ngram_analyzer": {
                        "tokenizer": "ngram_tokenizer",
                        "filter": ["lowercase", "asciifolding"]
                    }
                },
                "tokenizer": {
                    "ngram_tokenizer": {
                        "type": "ngram",
                        "min_gram": 1,
                        "max_gram": 3,
                        "token_chars": ["letter", "digit"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "title": {
                    "type": "text",
                    "analyzer": "search_analyzer",
                    "fields": {
                        "keyword": {
                            "type": "keyword",
                            "normalizer": "lowercase_normalizer"
                        },
                        "ngram": {
                            "type": "text",
                            "analyzer": "ngram_analyzer"
                        },
                        "suggest": {
                            "type": "completion"
                        }
                    }
                },
                "description": {
                    "type": "text",
                    "analyzer": "search_analyzer"
                },
                "min_players": { "type": "integer" },
                "max_players": { "type": "integer" },
                "play_time_min": { "type": "integer" },
                "play_time_max": { "type": "integer" },
                "categories": {
                    "type": "text",
                    "analyzer": "search_analyzer",
                    "fields": {
                        "keyword": {
                            "type": "keyword",
                            "normalizer": "lowercase_normalizer"
                        }
                    }
                },
                "rating_avg": { "type": "float" },
                "rating_count": { "type": "integer" },
                "popularity_score": { "type": "float" },
                "image_url": {
                    "type": "keyword",
                    "index": false
                },
                "created_at": {
                    "type": "date",
                    "format": "strict_date_optional_time||epoch_millis"
                },
                "updated_at": {
                    "type": "date",
                    "format": "strict_date_optional_time||epoch_millis"
                }
            }
        }
    })
}

/// Create-index body for the user action log
pub fn user_action_index_body(alias: &str) -> Value {
    json!({
        "aliases": {
            alias: {}
        },
        "settings": {
            "analysis": {
                "normalizer": {
                    "lowercase_normalizer": {
                        "type": "custom",
                        "filter": ["lowercase", "asciifolding"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "user_id": { "type": "keyword" },
                "boardgame_id": { "type": "keyword" },
                "action_type": {
                    "type": "keyword",
                    "normalizer": "lowercase_normalizer"
                },
                "action_value": {
                    "type": "float",
                    "null_value": 0
                },
                "action_detail": {
                    "type": "text",
                    "analyzer": "standard",
                    "index": true
                },
                "action_time": {
                    "type": "date",
                    "format": "strict_date_optional_time||epoch_millis"
                },
                "session_id": { "type": "keyword" },
                "ip_address": { "type": "ip" },
                "user_agent": {
                    "type": "text",
                    "index": false
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boardgame_body_carries_alias_and_analyzers() {
        let body = boardgame_index_body("boardgame_alias");

        assert!(body["aliases"]["boardgame_alias"].is_object());
        assert_eq!(
            body["settings"]["analysis"]["tokenizer"]["ngram_tokenizer"]["max_gram"],
            3
        );
        assert_eq!(
            body["mappings"]["properties"]["title"]["fields"]["keyword"]["normalizer"],
            "lowercase_normalizer"
        );
    }

    #[test]
    fn test_image_url_is_stored_but_not_indexed() {
        let body = boardgame_index_body("boardgame_alias");
        assert_eq!(body["mappings"]["properties"]["image_url"]["index"], false);
    }

    #[test]
    fn test_user_action_body_keeps_analytics_fields() {
        let body = user_action_index_body("user_action_alias");

        assert!(body["aliases"]["user_action_alias"].is_object());
        assert_eq!(body["mappings"]["properties"]["ip_address"]["type"], "ip");
        assert_eq!(
            body["mappings"]["properties"]["action_type"]["normalizer"],
            "lowercase_normalizer"
        );
    }
}
