use serde::{Deserialize, Serialize};

/// Candidate profile as delivered by the profile source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub age: u8,
    #[serde(rename = "pictureNames", default)]
    pub picture_names: Vec<String>,
}

/// Mutual like formed by the swipe service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(rename = "profileId")]
    pub profile_id: String,
    #[serde(rename = "matchedAt")]
    pub matched_at: chrono::DateTime<chrono::Utc>,
}

/// Message sent to a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "matchId")]
    pub match_id: String,
    pub text: String,
    #[serde(rename = "sentAt")]
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

/// One picture position within a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum PictureSlot {
    /// Not resolved yet, holds the picture name placeholder
    Pending(String),
    /// Display URL
    Resolved(String),
}

impl PictureSlot {
    pub fn url(&self) -> Option<&str> {
        match self {
            PictureSlot::Pending(_) => None,
            PictureSlot::Resolved(url) => Some(url),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, PictureSlot::Resolved(_))
    }
}

/// A profile paired with its picture slots, as shown in the swipe stack
///
/// `slots` always has the same length and order as `profile.picture_names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCard {
    pub profile: Profile,
    slots: Vec<PictureSlot>,
}

impl ProfileCard {
    /// Build a card with every slot pending
    pub fn new(profile: Profile) -> Self {
        let slots = profile
            .picture_names
            .iter()
            .map(|name| PictureSlot::Pending(name.clone()))
            .collect();

        Self { profile, slots }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn slots(&self) -> &[PictureSlot] {
        &self.slots
    }

    /// Resolved picture URLs in slot order, pending slots skipped
    pub fn picture_urls(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|slot| slot.url().map(str::to_string))
            .collect()
    }

    /// Replace a pending slot with its resolved URL
    ///
    /// Returns false when the index is out of range or the slot was already
    /// resolved; a slot is written at most once.
    pub fn resolve_slot(&mut self, index: usize, url: String) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if !slot.is_resolved() => {
                *slot = PictureSlot::Resolved(url);
                true
            }
            _ => false,
        }
    }
}

/// Content half of the view state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum FeedContentState {
    Loading,
    /// Cards in stack order, the last one is the visually topmost
    Success(Vec<ProfileCard>),
    Error(String),
}

impl FeedContentState {
    pub fn cards(&self) -> Option<&[ProfileCard]> {
        match self {
            FeedContentState::Success(cards) => Some(cards),
            FeedContentState::Loading | FeedContentState::Error(_) => None,
        }
    }
}

/// Modal dialog half of the view state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum DialogState {
    NoDialog,
    NewMatchDialog {
        #[serde(rename = "match")]
        new_match: Match,
        #[serde(rename = "pictureUrls")]
        picture_urls: Vec<String>,
    },
}

/// Externally observable snapshot of the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub dialog: DialogState,
    pub content: FeedContentState,
    /// Load generation that produced `content`
    pub generation: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            dialog: DialogState::NoDialog,
            content: FeedContentState::Loading,
            generation: 0,
        }
    }
}

/// Slot summary of a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStats {
    pub cards: usize,
    pub pending_slots: usize,
    pub resolved_slots: usize,
}

impl FeedStats {
    pub fn of(state: &ViewState) -> Self {
        let Some(cards) = state.content.cards() else {
            return Self::default();
        };

        let resolved_slots = cards
            .iter()
            .flat_map(|card| card.slots())
            .filter(|slot| slot.is_resolved())
            .count();
        let total_slots: usize = cards.iter().map(|card| card.slots().len()).sum();

        Self {
            cards: cards.len(),
            pending_slots: total_slots - resolved_slots,
            resolved_slots,
        }
    }
}
