// Collaborator contracts and implementations
pub mod appwrite;
pub mod cache;
pub mod mock;

pub use appwrite::{AppwritePictureResolver, AppwriteStorage};
pub use cache::{CachingPictureResolver, CacheKey, CacheStats};
pub use mock::{MockMessageService, MockPictureResolver, MockProfileSource, MockSwipeService};

use crate::models::{Match, Profile};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by feed collaborators
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Supplies the ordered batch of candidate profiles
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profiles(&self) -> Result<Vec<Profile>, ServiceError>;
}

/// Resolves a profile picture name to a display URL
#[async_trait]
pub trait PictureResolver: Send + Sync {
    async fn resolve(&self, profile_id: &str, picture_name: &str) -> Result<String, ServiceError>;
}

/// Records like/pass decisions
#[async_trait]
pub trait SwipeService: Send + Sync {
    /// Record a like; returns the match when the like was mutual
    async fn like(&self, profile: &Profile) -> Result<Option<Match>, ServiceError>;

    async fn pass(&self, profile: &Profile) -> Result<(), ServiceError>;
}

/// Delivers messages to matches
#[async_trait]
pub trait MessageService: Send + Sync {
    async fn send(&self, match_id: &str, text: &str) -> Result<(), ServiceError>;
}

/// The set of collaborators a feed machine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub profiles: Arc<dyn ProfileSource>,
    pub pictures: Arc<dyn PictureResolver>,
    pub swipes: Arc<dyn SwipeService>,
    pub messages: Arc<dyn MessageService>,
}

impl Collaborators {
    /// In-memory collaborators serving the demo data set
    pub fn demo() -> Self {
        Self {
            profiles: Arc::new(MockProfileSource::demo()),
            pictures: Arc::new(MockPictureResolver::demo()),
            swipes: Arc::new(MockSwipeService::new()),
            messages: Arc::new(MockMessageService::new()),
        }
    }
}
