//! Business logic: the scoring core and the backend-facing facade

pub mod popularity;
pub mod recommendation;
pub mod scoring;

pub use recommendation::{RecommendationService, ScoredBoardgame};
