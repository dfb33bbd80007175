//! Application-wide signal bus for save triggers and exit guards.
//!
//! Two kinds of platform signal reach the autosave coordinator:
//!
//! - "save before navigate": published by navigation code whenever the user
//!   leaves the current view. Built on `tokio::sync::broadcast`; publishing
//!   with no subscribers is a no-op.
//! - "before unload": the host asks, right before exiting, whether anything
//!   would be lost. Registered unload guards answer synchronously and the
//!   host decides whether to show a confirmation prompt.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Prompt text used when an unload guard reports unsaved work.
pub const UNSAVED_CHANGES_MESSAGE: &str =
    "You have unsaved changes. Are you sure you want to leave?";

/// Signals broadcast to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppSignal {
    /// Persist the current draft now; the user is navigating away.
    SaveBeforeNavigate,
}

/// Answer to a "before unload" query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadDecision {
    /// Nothing would be lost, exit silently.
    Allow,
    /// Ask the user to confirm before exiting.
    Prompt { message: String },
}

impl UnloadDecision {
    pub fn should_prompt(&self) -> bool {
        matches!(self, UnloadDecision::Prompt { .. })
    }
}

/// Handle returned by [`SignalBus::register_unload_guard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnloadGuardId(Uuid);

/// Returns `true` when exiting now would lose work.
pub type UnloadGuard = Arc<dyn Fn() -> bool + Send + Sync>;

/// Multi-consumer signal bus.
///
/// Cloning the bus shares both the broadcast channel and the guard registry.
#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<AppSignal>,
    guards: Arc<DashMap<UnloadGuardId, UnloadGuard>>,
}

impl SignalBus {
    /// Create a new bus with the given broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            guards: Arc::new(DashMap::new()),
        }
    }

    /// Create a new subscriber that will receive all future signals.
    pub fn subscribe(&self) -> broadcast::Receiver<AppSignal> {
        self.sender.subscribe()
    }

    /// Ask every subscriber to save immediately.
    pub fn publish_save_before_navigate(&self) {
        let _ = self.sender.send(AppSignal::SaveBeforeNavigate);
    }

    /// Register a guard consulted by [`SignalBus::before_unload`].
    pub fn register_unload_guard(&self, guard: UnloadGuard) -> UnloadGuardId {
        let id = UnloadGuardId(Uuid::now_v7());
        self.guards.insert(id, guard);
        id
    }

    /// Remove a guard. No-op if it was already removed.
    pub fn unregister_unload_guard(&self, id: UnloadGuardId) {
        self.guards.remove(&id);
    }

    /// Consult all guards. Any guard reporting unsaved work yields a prompt.
    pub fn before_unload(&self) -> UnloadDecision {
        let guards: Vec<UnloadGuard> = self.guards.iter().map(|g| Arc::clone(g.value())).collect();
        if guards.iter().any(|guard| guard()) {
            UnloadDecision::Prompt {
                message: UNSAVED_CHANGES_MESSAGE.to_string(),
            }
        } else {
            UnloadDecision::Allow
        }
    }

    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("receiver_count", &self.sender.receiver_count())
            .field("guard_count", &self.guards.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn publish_and_subscribe_delivers_signal() {
        let bus = SignalBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish_save_before_navigate();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, AppSignal::SaveBeforeNavigate);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = SignalBus::new(16);
        bus.publish_save_before_navigate();
        bus.publish_save_before_navigate();
    }

    #[test]
    fn clone_shares_channel_and_guards() {
        let bus = SignalBus::new(16);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.publish_save_before_navigate();
        assert!(rx.try_recv().is_ok());

        bus2.register_unload_guard(Arc::new(|| true));
        assert_eq!(bus.guard_count(), 1);
    }

    #[test]
    fn before_unload_allows_without_guards() {
        let bus = SignalBus::new(16);
        assert_eq!(bus.before_unload(), UnloadDecision::Allow);
    }

    #[test]
    fn before_unload_prompts_when_any_guard_reports_unsaved() {
        let bus = SignalBus::new(16);
        bus.register_unload_guard(Arc::new(|| false));
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dirty);
        bus.register_unload_guard(Arc::new(move || flag.load(Ordering::SeqCst)));

        assert!(!bus.before_unload().should_prompt());

        dirty.store(true, Ordering::SeqCst);
        let decision = bus.before_unload();
        assert_eq!(
            decision,
            UnloadDecision::Prompt {
                message: UNSAVED_CHANGES_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn unregister_removes_guard() {
        let bus = SignalBus::new(16);
        let id = bus.register_unload_guard(Arc::new(|| true));
        assert!(bus.before_unload().should_prompt());

        bus.unregister_unload_guard(id);
        assert_eq!(bus.before_unload(), UnloadDecision::Allow);

        // Second removal is harmless.
        bus.unregister_unload_guard(id);
    }

    #[test]
    fn debug_impl() {
        let bus = SignalBus::new(16);
        let _rx = bus.subscribe();
        let debug = format!("{bus:?}");
        assert!(debug.contains("SignalBus"));
        assert!(debug.contains("receiver_count"));
    }
}
