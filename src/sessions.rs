//! In-process session registry for the HTTP server.
//!
//! The registry is bounded two ways: sessions idle for longer than the
//! configured TTL are dropped, and once `max_sessions` is reached the least
//! recently used session makes room for a new one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use docqa_core::session::Session;

pub type SharedSession = Arc<Mutex<Session>>;

struct Entry {
    session: SharedSession,
    last_used: Instant,
}

/// Maps session ids to sessions.
///
/// Each session sits behind its own mutex, so questions within a session
/// run one at a time while different sessions proceed concurrently.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Entry>>,
    max_turns: usize,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(max_turns: usize, max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    /// Look up `id`, creating the session if it is missing or expired. With
    /// no id a fresh uuid is assigned. Returns the id actually used.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, SharedSession) {
        let id = match id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);

        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_used = now;
            return (id, entry.session.clone());
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(session = %oldest, "session registry full; evicting least recently used");
                sessions.remove(&oldest);
            }
        }

        let session = Arc::new(Mutex::new(Session::new(id.clone(), self.max_turns)));
        sessions.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                last_used: now,
            },
        );
        (id, session)
    }

    /// Existing, unexpired session. Refreshes its idle timer.
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);
        sessions.get_mut(id).map(|entry| {
            entry.last_used = now;
            entry.session.clone()
        })
    }

    /// Drop a session. Returns `false` if it did not exist.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, e| now.duration_since(e.last_used) <= self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "dropped idle sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_same_id_returns_same_session() {
        let registry = SessionRegistry::new(5, 10, HOUR);
        let (id, a) = registry.get_or_create(Some("alice")).await;
        assert_eq!(id, "alice");
        a.lock().await.memory_mut().append("q", "a");

        let (_, b) = registry.get_or_create(Some("alice")).await;
        assert_eq!(b.lock().await.memory().len(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_id_gets_fresh_session() {
        let registry = SessionRegistry::new(5, 10, HOUR);
        let (first, _) = registry.get_or_create(None).await;
        let (second, _) = registry.get_or_create(Some("  ")).await;
        assert_ne!(first, second);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_and_removable() {
        let registry = SessionRegistry::new(5, 10, HOUR);
        let (_, a) = registry.get_or_create(Some("a")).await;
        registry.get_or_create(Some("b")).await;
        a.lock().await.memory_mut().append("q", "a");

        let b = registry.get("b").await.unwrap();
        assert!(b.lock().await.memory().is_empty());

        assert!(registry.remove("a").await);
        assert!(!registry.remove("a").await);
        assert!(registry.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_full_registry_evicts_least_recently_used() {
        let registry = SessionRegistry::new(5, 2, HOUR);
        registry.get_or_create(Some("a")).await;
        registry.get_or_create(Some("b")).await;
        // Touch "a" so "b" becomes the oldest
        assert!(registry.get("a").await.is_some());

        registry.get_or_create(Some("c")).await;
        assert_eq!(registry.len().await, 2);
        assert!(registry.get("b").await.is_none());
        assert!(registry.get("a").await.is_some());
        assert!(registry.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_stateless_requests_stay_bounded() {
        let registry = SessionRegistry::new(5, 8, HOUR);
        for _ in 0..100 {
            registry.get_or_create(None).await;
        }
        assert_eq!(registry.len().await, 8);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let registry = SessionRegistry::new(5, 10, Duration::from_millis(50));
        let (_, a) = registry.get_or_create(Some("a")).await;
        a.lock().await.memory_mut().append("q", "a");

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(registry.get("a").await.is_none());
        assert_eq!(registry.len().await, 0);
        let (_, fresh) = registry.get_or_create(Some("a")).await;
        assert!(fresh.lock().await.memory().is_empty());
    }
}
