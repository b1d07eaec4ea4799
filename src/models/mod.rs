// Model exports
pub mod domain;
pub mod requests;

pub use domain::{
    DialogState, FeedContentState, FeedStats, Match, Message, PictureSlot, Profile, ProfileCard,
    ViewState,
};
pub use requests::{SendMessageRequest, MAX_MESSAGE_LEN};
