//! Search and advanced filters for the cross-board "my cards" view.
//!
//! Filtering runs in memory over the cards one user is assigned to.

pub mod error;
pub mod evaluate;
pub mod types;
pub mod user_cards;

pub use error::FilterError;
pub use evaluate::{evaluate, matches_search};
pub use types::*;
pub use user_cards::{arrange_user_cards, UserCardPage};
