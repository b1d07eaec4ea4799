//! Pure view state transitions
//!
//! Each function takes the current state by mutable reference and reports
//! whether it changed anything, so it can run inside an atomic
//! read-modify-publish step and only notify observers on real changes.

use crate::models::{DialogState, FeedContentState, Match, Profile, ProfileCard, ViewState};

/// Enter `Loading` under a fresh generation and return that generation
pub fn begin_load(state: &mut ViewState) -> u64 {
    state.generation += 1;
    state.content = FeedContentState::Loading;
    state.generation
}

/// Publish a fetched batch as `Success` with every slot pending
///
/// Discarded when a newer load started since `generation` was issued.
pub fn publish_batch(state: &mut ViewState, generation: u64, profiles: Vec<Profile>) -> bool {
    if state.generation != generation {
        return false;
    }

    state.content = FeedContentState::Success(build_cards(profiles));
    true
}

/// Publish a failed batch fetch as `Error`
pub fn publish_error(state: &mut ViewState, generation: u64, message: String) -> bool {
    if state.generation != generation {
        return false;
    }

    state.content = FeedContentState::Error(message);
    true
}

pub fn build_cards(profiles: Vec<Profile>) -> Vec<ProfileCard> {
    profiles.into_iter().map(ProfileCard::new).collect()
}

/// Merge one resolved picture into the current state
///
/// Only the targeted slot is touched. Results from an older generation, for
/// a profile no longer in the stack, or while the content is not `Success`
/// are stale and dropped.
pub fn merge_picture(
    state: &mut ViewState,
    generation: u64,
    profile_id: &str,
    index: usize,
    url: &str,
) -> bool {
    if state.generation != generation {
        return false;
    }

    let FeedContentState::Success(cards) = &mut state.content else {
        return false;
    };

    let mut changed = false;
    for card in cards.iter_mut().filter(|card| card.id() == profile_id) {
        changed |= card.resolve_slot(index, url.to_string());
    }
    changed
}

/// Remove the visually topmost card (the last one)
pub fn drop_top_card(state: &mut ViewState) -> Option<ProfileCard> {
    match &mut state.content {
        FeedContentState::Success(cards) => cards.pop(),
        FeedContentState::Loading | FeedContentState::Error(_) => None,
    }
}

/// Show the new match dialog for a liked card
///
/// Picture URLs come from whichever of the caller's copy and the card as it
/// currently sits in the stack has more resolved slots. The stack copy can be
/// ahead of the caller's (more merges landed) or behind it (a reload reset its
/// slots to pending); a dismissed card falls back to the caller's copy.
pub fn open_match_dialog(state: &mut ViewState, new_match: Match, card: &ProfileCard) {
    let card_urls = card.picture_urls();
    let picture_urls = match state
        .content
        .cards()
        .and_then(|cards| cards.iter().find(|current| current.id() == card.id()))
        .map(ProfileCard::picture_urls)
    {
        Some(current_urls) if current_urls.len() >= card_urls.len() => current_urls,
        _ => card_urls,
    };

    state.dialog = DialogState::NewMatchDialog {
        new_match,
        picture_urls,
    };
}

pub fn close_dialog(state: &mut ViewState) -> bool {
    if state.dialog == DialogState::NoDialog {
        return false;
    }

    state.dialog = DialogState::NoDialog;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PictureSlot;

    fn profile(id: &str, pictures: usize) -> Profile {
        Profile {
            id: id.to_string(),
            name: format!("User {}", id),
            age: 27,
            picture_names: (0..pictures).map(|i| format!("{}-pic{}", id, i)).collect(),
        }
    }

    fn loaded(profiles: Vec<Profile>) -> ViewState {
        let mut state = ViewState::default();
        let generation = begin_load(&mut state);
        assert!(publish_batch(&mut state, generation, profiles));
        state
    }

    #[test]
    fn test_begin_load_keeps_dialog() {
        let mut state = loaded(vec![profile("1", 1)]);
        let card = state.content.cards().unwrap()[0].clone();
        open_match_dialog(&mut state, test_match("1"), &card);

        let generation = begin_load(&mut state);
        assert_eq!(generation, 2);
        assert_eq!(state.content, FeedContentState::Loading);
        assert!(matches!(state.dialog, DialogState::NewMatchDialog { .. }));
    }

    #[test]
    fn test_stale_batch_is_discarded() {
        let mut state = ViewState::default();
        let first = begin_load(&mut state);
        let second = begin_load(&mut state);

        assert!(!publish_batch(&mut state, first, vec![profile("old", 1)]));
        assert!(!publish_error(&mut state, first, "late failure".into()));
        assert_eq!(state.content, FeedContentState::Loading);
        assert!(publish_batch(&mut state, second, vec![profile("new", 1)]));
    }

    #[test]
    fn test_merge_touches_only_target_slot() {
        let mut state = loaded(vec![profile("1", 2), profile("2", 1)]);
        assert!(merge_picture(&mut state, 1, "1", 1, "https://img/1b"));

        let cards = state.content.cards().unwrap();
        assert_eq!(cards[0].slots()[0], PictureSlot::Pending("1-pic0".into()));
        assert_eq!(cards[0].slots()[1], PictureSlot::Resolved("https://img/1b".into()));
        assert_eq!(cards[1].slots()[0], PictureSlot::Pending("2-pic0".into()));
    }

    #[test]
    fn test_merge_drops_unknown_profile_and_wrong_generation() {
        let mut state = loaded(vec![profile("1", 1)]);
        let before = state.clone();

        assert!(!merge_picture(&mut state, 1, "9", 0, "https://img/x"));
        assert!(!merge_picture(&mut state, 0, "1", 0, "https://img/x"));
        assert!(!merge_picture(&mut state, 1, "1", 5, "https://img/x"));
        assert_eq!(state, before);
    }

    #[test]
    fn test_merge_while_loading_is_dropped() {
        let mut state = ViewState::default();
        let generation = begin_load(&mut state);
        assert!(!merge_picture(&mut state, generation, "1", 0, "https://img/x"));
    }

    #[test]
    fn test_drop_top_card_outside_success() {
        let mut state = ViewState::default();
        assert!(drop_top_card(&mut state).is_none());
        state.content = FeedContentState::Error("boom".into());
        assert!(drop_top_card(&mut state).is_none());
    }

    #[test]
    fn test_match_dialog_uses_current_card() {
        let mut state = loaded(vec![profile("1", 2)]);
        let stale_copy = state.content.cards().unwrap()[0].clone();
        merge_picture(&mut state, 1, "1", 0, "https://img/1a");

        open_match_dialog(&mut state, test_match("1"), &stale_copy);
        match &state.dialog {
            DialogState::NewMatchDialog { picture_urls, .. } => {
                assert_eq!(picture_urls, &vec!["https://img/1a".to_string()]);
            }
            DialogState::NoDialog => panic!("dialog not opened"),
        }

        assert!(close_dialog(&mut state));
        assert!(!close_dialog(&mut state));
    }

    fn test_match(profile_id: &str) -> Match {
        Match {
            id: "m1".to_string(),
            profile_id: profile_id.to_string(),
            matched_at: chrono::Utc::now(),
        }
    }
}
