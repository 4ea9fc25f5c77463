//! Per-chat checkout sessions.
//!
//! Each chat gets one session guarded by its own mutex, so two updates from
//! the same buyer are applied in sequence while different buyers never block
//! each other. The store is bounded: idle sessions expire after a TTL and the
//! oldest session is evicted when the capacity cap is hit. Session loss is
//! harmless, the buyer just lands back in `Idle`.

use crate::entities::PaymentMethod;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Where a chat currently is in the conversation. Every state that needs
/// context carries it, so a stale callback can never be applied against the
/// wrong course.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    /// Waiting for the buyer to type the access password
    AwaitingPassword,
    /// A course listing is on screen
    ViewingCourses,
    /// Payment method buttons are on screen for this course
    SelectingPayment { course_id: i32 },
    /// Waiting for a search query
    Searching,
    /// Waiting for a proof-of-payment photo for this course and method
    AwaitingProof {
        course_id: i32,
        method: PaymentMethod,
    },
    /// Waiting for a gift card code for this course
    AwaitingGiftCode { course_id: i32 },
    /// Waiting for the text of a course request
    AwaitingCourseRequest,
}

/// Mutable per-chat conversation data.
#[derive(Debug, Default)]
pub struct Session {
    pub state: CheckoutState,
    /// Set once the password gate has been passed (or when no gate exists)
    pub verified: bool,
}

struct Entry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Bounded map of chat id to session.
pub struct SessionStore {
    inner: Mutex<HashMap<i64, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Returns the session for a chat, creating a fresh one when none exists
    /// or the old one has expired. Touches the entry's eviction clock.
    pub async fn get(&self, chat_id: i64) -> Arc<Mutex<Session>> {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        map.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);

        if let Some(entry) = map.get_mut(&chat_id) {
            entry.last_seen = now;
            return Arc::clone(&entry.session);
        }

        if map.len() >= self.capacity {
            let oldest = map
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            if let Some(id) = oldest {
                map.remove(&id);
            }
        }

        let session = Arc::new(Mutex::new(Session::default()));
        map.insert(
            chat_id,
            Entry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        session
    }

    /// Number of live sessions, for the startup log and tests.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_persist_state_per_chat() {
        let store = SessionStore::new(Duration::from_secs(60), 100);

        {
            let session = store.get(1).await;
            session.lock().await.state = CheckoutState::Searching;
        }
        {
            let session = store.get(2).await;
            assert_eq!(session.lock().await.state, CheckoutState::Idle);
        }

        let session = store.get(1).await;
        assert_eq!(session.lock().await.state, CheckoutState::Searching);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_sessions_reset() {
        let store = SessionStore::new(Duration::ZERO, 100);

        {
            let session = store.get(1).await;
            let mut session = session.lock().await;
            session.state = CheckoutState::AwaitingCourseRequest;
            session.verified = true;
        }

        // TTL of zero expires the entry immediately, so the next lookup
        // starts over
        let session = store.get(1).await;
        let session = session.lock().await;
        assert_eq!(session.state, CheckoutState::Idle);
        assert!(!session.verified);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = SessionStore::new(Duration::from_secs(60), 2);

        store.get(1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get(2).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touch 1 so 2 becomes the oldest
        store.get(1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        store.get(3).await;
        let map_len = store.len().await;
        assert_eq!(map_len, 2);

        // Chat 2 was evicted; a fresh session comes back
        {
            let session = store.get(2).await;
            assert_eq!(session.lock().await.state, CheckoutState::Idle);
        }
    }
}
