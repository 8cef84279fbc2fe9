mod boardgame;
mod user_action;

pub use boardgame::Boardgame;
pub use user_action::{ActionType, ActionValidationError, UserAction};
