use crate::config::UpstreamSettings;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared application state for HTTP handlers.
///
/// The upstream credential lives here for the life of the process, read-only
/// after startup. It is attached to upstream connections server-side and is
/// never visible to clients.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamSettings>,
    pub api_key: Arc<str>,
    active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(upstream: UpstreamSettings, api_key: String) -> Self {
        Self {
            upstream: Arc::new(upstream),
            api_key: Arc::from(api_key),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn session_started(&self) {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn session_ended(&self) {
        self.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }
}
