//! Call session registry
//!
//! Tracks active calls, enforces the concurrent-call cap, and expires calls
//! whose transport went quiet without a proper stop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::ServerError;

struct ActiveCall {
    started_at: Instant,
    last_activity: RwLock<Instant>,
}

impl ActiveCall {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }
}

/// Registry of active calls
pub struct SessionManager {
    calls: RwLock<HashMap<String, Arc<ActiveCall>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    /// Create a registry with the given cap and idle expiry
    pub fn new(max_sessions: usize, session_timeout: Duration) -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval: Duration::from_secs(60),
        }
    }

    /// Register a call; fails when the cap is reached
    pub fn begin(&self, id: &str) -> Result<(), ServerError> {
        let mut calls = self.calls.write();

        if calls.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut calls);
            if calls.len() >= self.max_sessions {
                return Err(ServerError::Session("max concurrent calls reached".to_string()));
            }
        }

        calls.insert(id.to_string(), Arc::new(ActiveCall::new()));
        tracing::info!(session = %id, active = calls.len(), "Call registered");
        Ok(())
    }

    /// Record activity on a call
    pub fn touch(&self, id: &str) {
        if let Some(call) = self.calls.read().get(id) {
            *call.last_activity.write() = Instant::now();
        }
    }

    /// Remove a call
    pub fn end(&self, id: &str) {
        let mut calls = self.calls.write();
        if let Some(call) = calls.remove(id) {
            tracing::info!(
                session = %id,
                duration_s = call.started_at.elapsed().as_secs(),
                "Call ended"
            );
        }
    }

    /// Number of active calls
    pub fn count(&self) -> usize {
        self.calls.read().len()
    }

    /// Drop calls idle past the timeout
    pub fn cleanup_expired(&self) {
        let mut calls = self.calls.write();
        self.cleanup_expired_internal(&mut calls);
    }

    fn cleanup_expired_internal(&self, calls: &mut HashMap<String, Arc<ActiveCall>>) {
        let timeout = self.session_timeout;
        let expired: Vec<String> = calls
            .iter()
            .filter(|(_, call)| call.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            calls.remove(&id);
            tracing::info!(session = %id, "Expired idle call");
        }
    }

    /// Start a background task that periodically drops expired calls.
    ///
    /// Returns a shutdown sender for the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let before = manager.count();
                        manager.cleanup_expired();
                        let after = manager.count();
                        if before != after {
                            tracing::info!(removed = before - after, remaining = after, "Session cleanup");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
