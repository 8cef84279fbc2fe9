use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Kind of interaction a user had with a board game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Like,
    View,
    Play,
    Rate,
    Favorite,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Like => "like",
            ActionType::View => "view",
            ActionType::Play => "play",
            ActionType::Rate => "rate",
            ActionType::Favorite => "favorite",
        }
    }
}

impl Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validation failures for an incoming user action
#[derive(Debug, Error, PartialEq)]
pub enum ActionValidationError {
    #[error("rate value must be within 1-5, got {0}")]
    RatingOutOfRange(f64),

    #[error("{action} actions must carry value 1, got {value}")]
    UnitValueRequired { action: ActionType, value: f64 },
}

/// A single recorded user interaction
///
/// Immutable once persisted. `boardgame_id` is stored as the keyword string
/// the backend indexes; it is resolved against `Boardgame::id` by integer
/// parse when a preference profile is built and is not enforced at write
/// time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAction {
    pub user_id: String,
    pub boardgame_id: String,
    pub action_type: ActionType,
    /// Rating score (1-5) for `rate`, 1 for `like`/`view`/`play`
    pub action_value: f64,
    /// Review message or other free-form detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_detail: Option<String>,
    #[serde(default = "default_action_time")]
    pub action_time: DateTime<Utc>,
}

fn default_action_time() -> DateTime<Utc> {
    Utc::now()
}

impl UserAction {
    /// Checks the action_value invariant for this action's type
    ///
    /// `rate` requires a value in [1, 5]; `like`, `view` and `play` require
    /// exactly 1; `favorite` is unconstrained. Runs before any backend
    /// write so a rejected action has no side effects.
    pub fn validate(&self) -> Result<(), ActionValidationError> {
        match self.action_type {
            ActionType::Rate => {
                if !(1.0..=5.0).contains(&self.action_value) {
                    return Err(ActionValidationError::RatingOutOfRange(self.action_value));
                }
            }
            ActionType::Like | ActionType::View | ActionType::Play => {
                if self.action_value != 1.0 {
                    return Err(ActionValidationError::UnitValueRequired {
                        action: self.action_type,
                        value: self.action_value,
                    });
                }
            }
            ActionType::Favorite => {}
        }
        Ok(())
    }

    /// Parses `boardgame_id` into the catalog's integer id space
    ///
    /// Returns `None` for malformed references, which callers treat the
    /// same as a reference to a game missing from the catalog.
    pub fn boardgame_ref(&self) -> Option<i64> {
        self.boardgame_id.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: ActionType, value: f64) -> UserAction {
        UserAction {
            user_id: "u1".to_string(),
            boardgame_id: "42".to_string(),
            action_type,
            action_value: value,
            action_detail: None,
            action_time: Utc::now(),
        }
    }

    #[test]
    fn test_rate_bounds_accepted() {
        assert!(action(ActionType::Rate, 1.0).validate().is_ok());
        assert!(action(ActionType::Rate, 5.0).validate().is_ok());
        assert!(action(ActionType::Rate, 3.5).validate().is_ok());
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        assert_eq!(
            action(ActionType::Rate, 0.9).validate(),
            Err(ActionValidationError::RatingOutOfRange(0.9))
        );
        assert!(action(ActionType::Rate, 5.1).validate().is_err());
        assert!(action(ActionType::Rate, -1.0).validate().is_err());
    }

    #[test]
    fn test_unit_actions_require_value_one() {
        assert!(action(ActionType::Like, 1.0).validate().is_ok());
        assert!(action(ActionType::View, 1.0).validate().is_ok());
        assert!(action(ActionType::Play, 1.0).validate().is_ok());

        assert!(action(ActionType::Like, 2.0).validate().is_err());
        assert!(action(ActionType::View, 0.0).validate().is_err());
        assert!(action(ActionType::Play, 1.5).validate().is_err());
    }

    #[test]
    fn test_favorite_value_unconstrained() {
        assert!(action(ActionType::Favorite, 1.0).validate().is_ok());
        assert!(action(ActionType::Favorite, 7.0).validate().is_ok());
        assert!(action(ActionType::Favorite, 0.0).validate().is_ok());
    }

    #[test]
    fn test_action_type_serde_lowercase() {
        let json = serde_json::to_string(&ActionType::Favorite).unwrap();
        assert_eq!(json, "\"favorite\"");

        let parsed: ActionType = serde_json::from_str("\"rate\"").unwrap();
        assert_eq!(parsed, ActionType::Rate);
    }

    #[test]
    fn test_action_time_defaults_when_missing() {
        let json = r#"{
            "user_id": "u1",
            "boardgame_id": "42",
            "action_type": "like",
            "action_value": 1.0
        }"#;

        let parsed: UserAction = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.action_type, ActionType::Like);
        assert!(parsed.action_detail.is_none());
        // action_time filled in by the default
        assert!(parsed.action_time <= Utc::now());
    }

    #[test]
    fn test_boardgame_ref_parses_integer_ids() {
        assert_eq!(action(ActionType::Like, 1.0).boardgame_ref(), Some(42));

        let mut bad = action(ActionType::Like, 1.0);
        bad.boardgame_id = "not-a-number".to_string();
        assert_eq!(bad.boardgame_ref(), None);
    }
}
