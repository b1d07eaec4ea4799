//! Lume Feed - client-side profile feed for Lume dating app
//!
//! This library owns the swipeable profile stack: it loads a batch of
//! candidate profiles, resolves their pictures concurrently, merges the
//! results into a single observable view state and processes swipe,
//! dialog and messaging actions.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{FeedError, FeedMachine, FeedOptions};
pub use models::{
    DialogState, FeedContentState, FeedStats, Match, PictureSlot, Profile, ProfileCard, ViewState,
};
pub use services::{
    Collaborators, MessageService, PictureResolver, ProfileSource, ServiceError, SwipeService,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let state = ViewState::default();
        assert_eq!(state.content, FeedContentState::Loading);
        assert_eq!(FeedStats::of(&state).cards, 0);
    }
}
