use serde::{Deserialize, Serialize};
use validator::Validate;

/// Longest message text accepted for a match, mirrored in the `text` validator
pub const MAX_MESSAGE_LEN: u64 = 1000;

/// Request to send a message to a match
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "match_id", rename = "matchId")]
    pub match_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

impl SendMessageRequest {
    pub fn new(match_id: &str, text: &str) -> Self {
        Self {
            match_id: match_id.to_string(),
            text: text.to_string(),
        }
    }
}
