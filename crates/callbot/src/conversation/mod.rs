//! Process-wide store of call sessions keyed by Twilio call SID
//!
//! Sessions are created lazily on the first webhook for a call. The map is
//! shared by all requests; each session sits behind its own async mutex so
//! the turns of one call run one at a time while different calls proceed
//! in parallel.

mod session;

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use session::{CallSession, CallStatus};

use crate::{
    brain::{ChatProvider, ChatSession},
    persona::Persona,
};

pub type SharedSession = Arc<Mutex<CallSession>>;

pub struct ConversationStore {
    sessions: DashMap<String, SharedSession>,
    provider: Arc<dyn ChatProvider>,
    pick_persona: fn() -> Persona,
}

impl ConversationStore {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            sessions: DashMap::new(),
            provider,
            pick_persona: Persona::random,
        }
    }

    /// Replace the random persona choice, e.g. to pin a persona in tests
    pub fn with_persona_picker(mut self, pick: fn() -> Persona) -> Self {
        self.pick_persona = pick;
        self
    }

    /// Fetch the session for a call, creating it on first sight.
    ///
    /// The boolean is `true` when this call created the session.
    pub fn get_or_create(&self, call_sid: &str) -> (SharedSession, bool) {
        if let Some(existing) = self.sessions.get(call_sid) {
            return (existing.value().clone(), false);
        }

        let mut created = false;
        let session = self
            .sessions
            .entry(call_sid.to_string())
            .or_insert_with(|| {
                created = true;
                let persona = (self.pick_persona)();
                tracing::info!("New call {} playing the {} persona", call_sid, persona);
                let chat = ChatSession::start(self.provider.clone(), persona.prompt());
                Arc::new(Mutex::new(CallSession::new(call_sid, persona, chat)))
            })
            .value()
            .clone();

        (session, created)
    }

    /// Lock the current session for a call, creating it if needed.
    ///
    /// A session evicted while this waited for its lock is no longer in the
    /// store; the lock is then retried on the session that replaced it so
    /// turns are never recorded into a detached session.
    pub async fn lock_or_create(&self, call_sid: &str) -> (OwnedMutexGuard<CallSession>, bool) {
        let mut created_any = false;
        loop {
            let (session, created) = self.get_or_create(call_sid);
            created_any |= created;

            let guard = session.clone().lock_owned().await;
            let current = self
                .sessions
                .get(call_sid)
                .is_some_and(|entry| Arc::ptr_eq(entry.value(), &session));
            if current {
                return (guard, created_any);
            }

            tracing::debug!("Session for {} was replaced while waiting, retrying", call_sid);
        }
    }

    pub fn get(&self, call_sid: &str) -> Option<SharedSession> {
        self.sessions.get(call_sid).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, call_sid: &str) -> bool {
        self.sessions.contains_key(call_sid)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions whose call has not reached a final status. A session locked
    /// mid-turn counts as active.
    pub fn active_calls(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .map(|s| !s.status.is_finished())
                    .unwrap_or(true)
            })
            .count()
    }

    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }

    /// Drop sessions idle for longer than `max_idle`. Sessions in the middle
    /// of a turn are skipped. Returns the evicted call SIDs.
    pub fn evict_idle(&self, max_idle: chrono::Duration) -> Vec<String> {
        let cutoff = Utc::now() - max_idle;
        let is_stale = |session: &SharedSession| {
            session
                .try_lock()
                .map(|s| s.last_activity < cutoff)
                .unwrap_or(false)
        };

        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| is_stale(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter(|sid| {
                self.sessions
                    .remove_if(sid, |_, session| is_stale(session))
                    .is_some()
            })
            .inspect(|sid| tracing::info!("Evicted idle call session {}", sid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::brain::{ChatMessage, ProviderError};

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
            Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(EchoProvider))
    }

    #[tokio::test]
    async fn test_session_created_once_per_call() {
        let store = store();

        let (first, created) = store.get_or_create("CA1");
        assert!(created);
        let (second, created_again) = store.get_or_create("CA1");
        assert!(!created_again);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_session_is_seeded_with_its_persona_prompt() {
        let store = store().with_persona_picker(|| Persona::Asian);

        let (session, _) = store.get_or_create("CA1");
        let session = session.lock().await;

        assert_eq!(session.persona, Persona::Asian);
        assert_eq!(session.chat.history(), &[ChatMessage::user(Persona::Asian.prompt())]);
        assert!(session.transcript.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creation_yields_single_session() {
        let store = Arc::new(store());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_or_create("CA-shared").1 })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_idle_removes_only_stale_sessions() {
        let store = store();
        let (stale, _) = store.get_or_create("CA-old");
        store.get_or_create("CA-new");

        stale.lock().await.last_activity = Utc::now() - chrono::Duration::minutes(90);

        let evicted = store.evict_idle(chrono::Duration::minutes(30));

        assert_eq!(evicted, vec!["CA-old".to_string()]);
        assert!(!store.contains("CA-old"));
        assert!(store.contains("CA-new"));
    }

    #[tokio::test]
    async fn test_evict_idle_skips_sessions_mid_turn() {
        let store = store();
        let (session, _) = store.get_or_create("CA-busy");
        let mut guard = session.lock().await;
        guard.last_activity = Utc::now() - chrono::Duration::minutes(90);

        assert!(store.evict_idle(chrono::Duration::minutes(30)).is_empty());
        drop(guard);
        assert_eq!(store.evict_idle(chrono::Duration::minutes(30)).len(), 1);
    }

    #[tokio::test]
    async fn test_active_calls_excludes_finished_sessions() {
        let store = store();
        assert!(store.is_empty());

        let (done, _) = store.get_or_create("CA-done");
        store.get_or_create("CA-live");
        done.lock().await.status = CallStatus::Completed;

        assert_eq!(store.len(), 2);
        assert_eq!(store.active_calls(), 1);

        // A call busy in a turn is still active
        let _busy = done.lock().await;
        assert_eq!(store.active_calls(), 2);
    }

    #[tokio::test]
    async fn test_lock_or_create_follows_replaced_session() {
        let store = Arc::new(store());
        let (original, _) = store.get_or_create("CA1");
        let held = original.lock().await;

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let (guard, created) = store.lock_or_create("CA1").await;
                (OwnedMutexGuard::mutex(&guard).clone(), created)
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // Evicted while the waiter is queued on its lock
        store.sessions.remove("CA1");
        drop(held);

        let (locked, created) = waiter.await.unwrap();
        assert!(created);

        let current = store.get("CA1").unwrap();
        assert!(Arc::ptr_eq(&locked, &current));
        assert!(!Arc::ptr_eq(&locked, &original));
        assert!(!store.lock_or_create("CA1").await.1);
    }
}
