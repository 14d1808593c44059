//! Collaborator boundary for user profiles.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

/// Read-only view of one user's taste data.
///
/// Persistence of favorites and history is owned by the profile collaborator;
/// this crate only consumes it.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Favorite-genre multiset in first-seen order. Repetition encodes
    /// strength of preference. Empty for unknown users.
    async fn favorite_genres(&self, user_id: &str) -> Vec<String>;

    /// Ids that must never appear in recommendations for this user.
    async fn excluded_ids(&self, user_id: &str) -> HashSet<u64>;
}

#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub favorite_genres: Vec<String>,
    pub excluded_ids: HashSet<u64>,
}

/// In-memory [`ProfileStore`] used by the binary and the test harness.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, user_id: impl Into<String>, profile: UserProfile) {
        self.profiles.write().insert(user_id.into(), profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn favorite_genres(&self, user_id: &str) -> Vec<String> {
        self.profiles
            .read()
            .get(user_id)
            .map(|p| p.favorite_genres.clone())
            .unwrap_or_default()
    }

    async fn excluded_ids(&self, user_id: &str) -> HashSet<u64> {
        self.profiles
            .read()
            .get(user_id)
            .map(|p| p.excluded_ids.clone())
            .unwrap_or_default()
    }
}
