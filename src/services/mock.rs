// In-memory collaborators
//
// Serve the demo data set and stand in for real backends in tests. Every
// mock records the calls it receives so tests can assert on them.

use super::{MessageService, PictureResolver, ProfileSource, ServiceError, SwipeService};
use crate::models::{Match, Message, Profile};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Picture URLs handed out by the demo resolver
pub const DEMO_PICTURE_URLS: [&str; 8] = [
    "https://cdn.lume.app/demo/profile-1.jpg",
    "https://cdn.lume.app/demo/profile-2.jpg",
    "https://cdn.lume.app/demo/profile-3.jpg",
    "https://cdn.lume.app/demo/profile-4.jpg",
    "https://cdn.lume.app/demo/profile-5.jpg",
    "https://cdn.lume.app/demo/profile-6.jpg",
    "https://cdn.lume.app/demo/profile-7.jpg",
    "https://cdn.lume.app/demo/profile-8.jpg",
];

const DEMO_NAMES: [&str; 8] = [
    "Daniel", "Felipe", "Ana", "Gilmar", "Marilia", "Andre", "Camilla", "Maria",
];

/// The eight demo profiles, one picture each
pub fn demo_profiles() -> Vec<Profile> {
    DEMO_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| Profile {
            id: (i + 1).to_string(),
            name: name.to_string(),
            age: 27,
            picture_names: vec![format!("profile{}", i + 1)],
        })
        .collect()
}

// =============================================================================
// Profile source
// =============================================================================

pub struct MockProfileSource {
    profiles: Arc<Mutex<Vec<Profile>>>,
    failure: Arc<Mutex<Option<String>>>,
    fetch_count: Arc<Mutex<usize>>,
}

impl MockProfileSource {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: Arc::new(Mutex::new(profiles)),
            failure: Arc::new(Mutex::new(None)),
            fetch_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn demo() -> Self {
        Self::new(demo_profiles())
    }

    /// Make every following fetch fail with the given message
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Replace the batch served by following fetches and clear any failure
    pub fn set_profiles(&self, profiles: Vec<Profile>) {
        *self.profiles.lock().unwrap() = profiles;
        *self.failure.lock().unwrap() = None;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }
}

#[async_trait]
impl ProfileSource for MockProfileSource {
    async fn fetch_profiles(&self) -> Result<Vec<Profile>, ServiceError> {
        *self.fetch_count.lock().unwrap() += 1;

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ServiceError::Unavailable(message));
        }

        Ok(self.profiles.lock().unwrap().clone())
    }
}

// =============================================================================
// Picture resolver
// =============================================================================

pub struct MockPictureResolver {
    urls: HashMap<(String, String), String>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockPictureResolver {
    pub fn new() -> Self {
        Self {
            urls: HashMap::new(),
            failing: HashSet::new(),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Resolver for the demo profiles, assigning the demo URLs by position
    pub fn demo() -> Self {
        demo_profiles()
            .into_iter()
            .enumerate()
            .fold(Self::new(), |resolver, (i, profile)| {
                let url = DEMO_PICTURE_URLS[i % DEMO_PICTURE_URLS.len()];
                profile
                    .picture_names
                    .iter()
                    .fold(resolver, |resolver, name| resolver.with_url(&profile.id, name, url))
            })
    }

    pub fn with_url(mut self, profile_id: &str, picture_name: &str, url: &str) -> Self {
        self.urls
            .insert((profile_id.to_string(), picture_name.to_string()), url.to_string());
        self
    }

    /// Fail every resolution of this picture name
    pub fn with_failure(mut self, picture_name: &str) -> Self {
        self.failing.insert(picture_name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All (profile id, picture name) pairs requested so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockPictureResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PictureResolver for MockPictureResolver {
    async fn resolve(&self, profile_id: &str, picture_name: &str) -> Result<String, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((profile_id.to_string(), picture_name.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(picture_name) {
            return Err(ServiceError::Unavailable(format!(
                "picture {} unavailable",
                picture_name
            )));
        }

        self.urls
            .get(&(profile_id.to_string(), picture_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "picture {} of profile {}",
                    picture_name, profile_id
                ))
            })
    }
}

// =============================================================================
// Swipe service
// =============================================================================

pub struct MockSwipeService {
    mutual: Arc<Mutex<HashSet<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    likes: Arc<Mutex<Vec<String>>>,
    passes: Arc<Mutex<Vec<String>>>,
}

impl MockSwipeService {
    pub fn new() -> Self {
        Self {
            mutual: Arc::new(Mutex::new(HashSet::new())),
            failure: Arc::new(Mutex::new(None)),
            likes: Arc::new(Mutex::new(Vec::new())),
            passes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Likes of this profile form a match
    pub fn with_mutual_like(self, profile_id: &str) -> Self {
        self.mutual.lock().unwrap().insert(profile_id.to_string());
        self
    }

    /// Make decisions fail until `recover` is called
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn likes(&self) -> Vec<String> {
        self.likes.lock().unwrap().clone()
    }

    pub fn passes(&self) -> Vec<String> {
        self.passes.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), ServiceError> {
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(ServiceError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

impl Default for MockSwipeService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwipeService for MockSwipeService {
    async fn like(&self, profile: &Profile) -> Result<Option<Match>, ServiceError> {
        self.check_failure()?;
        self.likes.lock().unwrap().push(profile.id.clone());

        if !self.mutual.lock().unwrap().contains(&profile.id) {
            return Ok(None);
        }

        Ok(Some(Match {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile.id.clone(),
            matched_at: chrono::Utc::now(),
        }))
    }

    async fn pass(&self, profile: &Profile) -> Result<(), ServiceError> {
        self.check_failure()?;
        self.passes.lock().unwrap().push(profile.id.clone());
        Ok(())
    }
}

// =============================================================================
// Message service
// =============================================================================

pub struct MockMessageService {
    sent: Arc<Mutex<Vec<Message>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockMessageService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockMessageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageService for MockMessageService {
    async fn send(&self, match_id: &str, text: &str) -> Result<(), ServiceError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ServiceError::Unavailable(message));
        }

        self.sent.lock().unwrap().push(Message {
            match_id: match_id.to_string(),
            text: text.to_string(),
            sent_at: chrono::Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_resolver_covers_demo_profiles() {
        let resolver = MockPictureResolver::demo();
        for (i, profile) in demo_profiles().iter().enumerate() {
            let url = resolver
                .resolve(&profile.id, &profile.picture_names[0])
                .await
                .unwrap();
            assert_eq!(url, DEMO_PICTURE_URLS[i]);
        }
        assert_eq!(resolver.calls().len(), 8);
    }

    #[tokio::test]
    async fn test_resolver_failure_and_unknown() {
        let resolver = MockPictureResolver::new()
            .with_url("1", "a", "https://img/a")
            .with_failure("a");
        assert!(matches!(
            resolver.resolve("1", "a").await,
            Err(ServiceError::Unavailable(_))
        ));
        assert!(matches!(
            resolver.resolve("1", "b").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_swipe_service_mutual_like() {
        let swipes = MockSwipeService::new().with_mutual_like("2");
        let profiles = demo_profiles();

        assert!(swipes.like(&profiles[0]).await.unwrap().is_none());
        let new_match = swipes.like(&profiles[1]).await.unwrap().unwrap();
        assert_eq!(new_match.profile_id, "2");
        swipes.pass(&profiles[2]).await.unwrap();

        assert_eq!(swipes.likes(), vec!["1".to_string(), "2".to_string()]);
        assert_eq!(swipes.passes(), vec!["3".to_string()]);
    }

    #[tokio::test]
    async fn test_profile_source_failure_clears_on_set() {
        let source = MockProfileSource::demo();
        source.fail_with("offline");
        assert!(source.fetch_profiles().await.is_err());

        source.set_profiles(demo_profiles()[..2].to_vec());
        assert_eq!(source.fetch_profiles().await.unwrap().len(), 2);
        assert_eq!(source.fetch_count(), 2);
    }
}
