use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

struct Session<S> {
    value: S,
    touched: Instant,
}

/// Per-user session values with idle expiry.
///
/// An entry untouched for longer than `ttl` reads as absent and is dropped by the
/// next [`SessionTable::evict_expired`] sweep. Dropping a cart this way is the same
/// as cancelling it: nothing shared is held while a cart is open.
pub struct SessionTable<S> {
    sessions: Arc<Mutex<HashMap<i64, Session<S>>>>,
    ttl: Duration,
}

impl<S: Send + 'static> SessionTable<S> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, session: &Session<S>, now: Instant) -> bool {
        now.duration_since(session.touched) < self.ttl
    }

    /// Stores `value` for `user_id`, replacing whatever was there.
    pub async fn insert(&self, user_id: i64, value: S) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            user_id,
            Session {
                value,
                touched: Instant::now(),
            },
        );
    }

    /// Removes and returns the live session of `user_id`.
    pub async fn take(&self, user_id: i64) -> Option<S> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.remove(&user_id)?;
        if self.is_live(&session, Instant::now()) {
            Some(session.value)
        } else {
            log::debug!("Session of user {} expired", user_id);
            None
        }
    }

    /// Runs `f` on the live session of `user_id` and refreshes its idle timer.
    pub async fn with<R>(&self, user_id: i64, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        let live = sessions.get(&user_id).map(|session| self.is_live(session, now))?;
        if !live {
            sessions.remove(&user_id);
            return None;
        }
        let session = sessions.get_mut(&user_id)?;
        session.touched = now;
        Some(f(&mut session.value))
    }

    pub async fn contains(&self, user_id: i64) -> bool {
        self.with(user_id, |_| ()).await.is_some()
    }

    /// Drops the session of `user_id`, returning whether a live one existed.
    pub async fn remove(&self, user_id: i64) -> bool {
        self.take(user_id).await.is_some()
    }

    /// Drops every idle session and returns how many went.
    pub async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, session| now.duration_since(session.touched) < self.ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            log::info!("Evicted {} idle session(s)", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Runs [`SessionTable::evict_expired`] every `interval` until the runtime stops.
    pub fn spawn_cleanup_task(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.evict_expired().await;
            }
        })
    }
}

impl<S: Clone + Send + 'static> SessionTable<S> {
    /// Copy of the live session of `user_id`, without touching its timer.
    pub async fn get(&self, user_id: i64) -> Option<S> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&user_id)
            .filter(|session| self.is_live(session, Instant::now()))
            .map(|session| session.value.clone())
    }
}
