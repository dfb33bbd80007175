//! Draft autosave coordinator.
//!
//! `DraftAutosave` keeps a stored copy of the draft being edited roughly in
//! sync with the in-memory copy:
//!
//! - a periodic ticker (5 s local, 60 s cloud) saves when the form answers
//!   differ from the last successful save
//! - "save before navigate" signals trigger an immediate save
//! - an unload guard tells the host whether exiting would lose work
//!
//! Saves are serialized by an in-flight flag. A request that arrives while a
//! write is outstanding is dropped, not queued; the next tick picks up any
//! remaining delta. The baseline fingerprints only advance after the storage
//! write succeeds. Hosts call [`DraftAutosave::flush`] before exiting so an
//! outstanding write is awaited instead of cut off.
//!
//! Content updates (`update_form_data`, `update_wizard_state`) only rebind
//! the shared snapshot the ticker reads. The ticker itself is restarted only
//! when a session parameter changes: adapter, draft id, ready, loading, or
//! storage mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use gutachtomat_types::config::AutosaveConfig;
use gutachtomat_types::draft::{DraftId, FormData, WizardState};
use gutachtomat_types::error::StorageError;
use gutachtomat_types::storage::StorageMode;

use super::fingerprint::{Baseline, Fingerprint};
use super::signal::{AppSignal, SignalBus, UnloadGuardId};
use crate::storage::DraftStore;

// ---------------------------------------------------------------------------
// Public configuration and results
// ---------------------------------------------------------------------------

/// Save lifecycle callbacks.
///
/// All methods default to no-ops. They run on the task performing the save
/// and must not block.
pub trait SaveListener: Send + Sync {
    fn on_save_start(&self, _draft_id: &DraftId) {}
    fn on_save_complete(&self, _draft_id: &DraftId) {}
    fn on_save_error(&self, _draft_id: &DraftId, _error: &StorageError) {}
}

/// Cadence and timeout settings for a coordinator.
#[derive(Debug, Clone)]
pub struct AutosaveOptions {
    pub storage_mode: StorageMode,
    pub local_interval: Duration,
    pub cloud_interval: Duration,
    /// Upper bound on one storage write. `None` waits indefinitely.
    pub save_timeout: Option<Duration>,
}

impl AutosaveOptions {
    /// Default intervals for `storage_mode`, no save timeout.
    pub fn new(storage_mode: StorageMode) -> Self {
        Self {
            storage_mode,
            local_interval: StorageMode::Local.default_save_interval(),
            cloud_interval: StorageMode::Cloud.default_save_interval(),
            save_timeout: None,
        }
    }

    pub fn from_config(config: &AutosaveConfig, storage_mode: StorageMode) -> Self {
        Self {
            storage_mode,
            local_interval: config.interval_for(StorageMode::Local),
            cloud_interval: config.interval_for(StorageMode::Cloud),
            save_timeout: config.save_timeout(),
        }
    }

    pub fn with_save_timeout(mut self, save_timeout: Option<Duration>) -> Self {
        self.save_timeout = save_timeout;
        self
    }

    /// Ticker period for the current storage mode. A zero interval falls
    /// back to the mode's default.
    pub fn interval(&self) -> Duration {
        let interval = match self.storage_mode {
            StorageMode::Local => self.local_interval,
            StorageMode::Cloud => self.cloud_interval,
        };
        if interval.is_zero() {
            self.storage_mode.default_save_interval()
        } else {
            interval
        }
    }
}

/// Everything needed to attach a coordinator.
pub struct AutosaveParams<S> {
    pub adapter: Option<Arc<S>>,
    pub draft_id: Option<DraftId>,
    pub form_data: FormData,
    pub wizard_state: WizardState,
    pub is_ready: bool,
    pub is_loading: bool,
    pub options: AutosaveOptions,
    pub listener: Option<Arc<dyn SaveListener>>,
}

impl<S> AutosaveParams<S> {
    /// Ready, not loading, empty content.
    pub fn new(adapter: Arc<S>, draft_id: DraftId, options: AutosaveOptions) -> Self {
        Self {
            adapter: Some(adapter),
            draft_id: Some(draft_id),
            form_data: FormData::empty(),
            wizard_state: WizardState::default(),
            is_ready: true,
            is_loading: false,
            options,
            listener: None,
        }
    }

    pub fn loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    pub fn with_content(mut self, form_data: FormData, wizard_state: WizardState) -> Self {
        self.form_data = form_data;
        self.wizard_state = wizard_state;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SaveListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

/// Result of one `save()` call.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
    Failed(StorageError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Why a save did not reach the storage adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Detached,
    /// No adapter or draft id, not ready, or still loading.
    Inactive,
    InFlight,
    Unchanged,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct Session<S> {
    adapter: Option<Arc<S>>,
    draft_id: Option<DraftId>,
    form_data: FormData,
    wizard_state: WizardState,
    is_ready: bool,
    is_loading: bool,
    options: AutosaveOptions,
    baseline: Option<Baseline>,
    /// Bumped whenever adapter or draft id change, so a save that started in
    /// an earlier session cannot overwrite the new session's baseline.
    generation: u64,
    /// Set after an adapter swap: the new backend has not seen this content,
    /// so the next save writes even if the fingerprints match.
    needs_write: bool,
}

impl<S> Session<S> {
    fn is_active(&self) -> bool {
        self.adapter.is_some() && self.draft_id.is_some() && self.is_ready && !self.is_loading
    }

    fn has_unsaved_changes(&self) -> bool {
        if self.is_loading {
            return false;
        }
        match &self.baseline {
            Some(baseline) => {
                Fingerprint::form_only(&self.form_data) != baseline.form_only
            }
            None => false,
        }
    }

    fn capture_baseline(&mut self) {
        self.baseline = Some(Baseline::capture(&self.form_data, &self.wizard_state));
    }

    fn restart(&mut self) {
        self.generation += 1;
        self.needs_write = false;
        if self.is_loading {
            self.baseline = None;
        } else {
            self.capture_baseline();
        }
    }
}

struct Shared<S> {
    session: Mutex<Session<S>>,
    /// `true` while a write is outstanding. Waiters subscribe to it.
    in_flight: watch::Sender<bool>,
    detached: AtomicBool,
    listener: Option<Arc<dyn SaveListener>>,
}

/// Clears the in-flight flag on drop, including when the save future is
/// cancelled mid-write.
struct InFlightGuard<'a>(&'a watch::Sender<bool>);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a watch::Sender<bool>) -> Option<Self> {
        let acquired = flag.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        acquired.then(|| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl<S: DraftStore + 'static> Shared<S> {
    fn session(&self) -> MutexGuard<'_, Session<S>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_unsaved_changes(&self) -> bool {
        self.session().has_unsaved_changes()
    }

    fn notify(&self, f: impl FnOnce(&dyn SaveListener)) {
        if let Some(listener) = &self.listener {
            f(listener.as_ref());
        }
    }

    async fn save(&self) -> SaveOutcome {
        if self.detached.load(Ordering::Acquire) {
            return SaveOutcome::Skipped(SkipReason::Detached);
        }

        let (adapter, draft_id, form_data, wizard_state, generation, save_timeout) = {
            let session = self.session();
            let (Some(adapter), Some(draft_id)) = (session.adapter.clone(), session.draft_id)
            else {
                return SaveOutcome::Skipped(SkipReason::Inactive);
            };
            if !session.is_ready || session.is_loading {
                return SaveOutcome::Skipped(SkipReason::Inactive);
            }
            (
                adapter,
                draft_id,
                session.form_data.clone(),
                session.wizard_state.clone(),
                session.generation,
                session.options.save_timeout,
            )
        };

        let Some(_in_flight) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::trace!(draft_id = %draft_id, "save already in flight, skipping");
            return SaveOutcome::Skipped(SkipReason::InFlight);
        };

        let candidate = Baseline::capture(&form_data, &wizard_state);
        let unchanged = {
            let session = self.session();
            !session.needs_write
                && session
                    .baseline
                    .as_ref()
                    .is_some_and(|baseline| baseline.combined == candidate.combined)
        };
        if unchanged {
            return SaveOutcome::Skipped(SkipReason::Unchanged);
        }

        tracing::debug!(draft_id = %draft_id, "saving draft");
        self.notify(|l| l.on_save_start(&draft_id));

        let write = adapter.save_draft(&draft_id, &form_data, &wizard_state);
        let result = match save_timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .unwrap_or(Err(StorageError::Timeout(limit))),
            None => write.await,
        };

        match result {
            Ok(()) => {
                {
                    let mut session = self.session();
                    if session.generation == generation {
                        session.baseline = Some(candidate);
                        session.needs_write = false;
                    }
                }
                tracing::debug!(draft_id = %draft_id, "draft saved");
                self.notify(|l| l.on_save_complete(&draft_id));
                SaveOutcome::Saved
            }
            Err(error) => {
                tracing::warn!(draft_id = %draft_id, error = %error, "draft save failed, will retry");
                self.notify(|l| l.on_save_error(&draft_id, &error));
                SaveOutcome::Failed(error)
            }
        }
    }

    /// Wait until no write is outstanding, then save what is still unsaved.
    async fn flush(&self) -> SaveOutcome {
        let mut idle = self.in_flight.subscribe();
        loop {
            // The sender lives in `self`, so the channel stays open.
            let _ = idle.wait_for(|busy| !*busy).await;
            match self.save().await {
                // Another trigger won the race; wait for that one too.
                SaveOutcome::Skipped(SkipReason::InFlight) => continue,
                outcome => return outcome,
            }
        }
    }

    /// Fire-and-forget save on a separate task.
    fn spawn_save(self: &Arc<Self>, trigger: &'static str) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = shared.save().await;
            tracing::trace!(trigger, ?outcome, "triggered save finished");
        });
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

fn spawn_ticker<S: DraftStore + 'static>(
    shared: &Arc<Shared<S>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let shared = Arc::clone(shared);
    // First check one full period after start, not immediately.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if shared.has_unsaved_changes() {
                        shared.spawn_save("interval");
                    }
                }
            }
        }
    });
}

fn spawn_navigation_listener<S: DraftStore + 'static>(
    shared: Arc<Shared<S>>,
    mut signals: broadcast::Receiver<AppSignal>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                signal = signals.recv() => match signal {
                    Ok(AppSignal::SaveBeforeNavigate) => shared.spawn_save("navigation"),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "navigation signals lagged");
                        shared.spawn_save("navigation");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}

// ---------------------------------------------------------------------------
// DraftAutosave
// ---------------------------------------------------------------------------

/// Autosave session for one draft.
///
/// Created with [`DraftAutosave::attach`]; stopped by [`DraftAutosave::detach`]
/// or by dropping it. Must be attached from within a Tokio runtime.
pub struct DraftAutosave<S: DraftStore + 'static> {
    shared: Arc<Shared<S>>,
    signals: SignalBus,
    guard_id: Option<UnloadGuardId>,
    shutdown: CancellationToken,
    ticker: Option<CancellationToken>,
}

impl<S: DraftStore + 'static> DraftAutosave<S> {
    /// Start an autosave session.
    ///
    /// Registers the unload guard and the navigation listener on `signals`,
    /// and starts the ticker if the session is active. When attached with
    /// `is_loading = false` the current content becomes the baseline.
    pub fn attach(params: AutosaveParams<S>, signals: &SignalBus) -> Self {
        let mut session = Session {
            adapter: params.adapter,
            draft_id: params.draft_id,
            form_data: params.form_data,
            wizard_state: params.wizard_state,
            is_ready: params.is_ready,
            is_loading: params.is_loading,
            options: params.options,
            baseline: None,
            generation: 0,
            needs_write: false,
        };
        if !session.is_loading {
            session.capture_baseline();
        }
        let draft_id = session.draft_id;

        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            in_flight: watch::channel(false).0,
            detached: AtomicBool::new(false),
            listener: params.listener,
        });

        let weak = Arc::downgrade(&shared);
        let guard_id = signals.register_unload_guard(Arc::new(move || {
            weak.upgrade()
                .is_some_and(|shared| shared.has_unsaved_changes())
        }));

        let shutdown = CancellationToken::new();
        spawn_navigation_listener(
            Arc::clone(&shared),
            signals.subscribe(),
            shutdown.child_token(),
        );

        let mut autosave = Self {
            shared,
            signals: signals.clone(),
            guard_id: Some(guard_id),
            shutdown,
            ticker: None,
        };
        autosave.restart_ticker();

        tracing::debug!(draft_id = ?draft_id, "autosave attached");
        autosave
    }

    /// Attempt one save now.
    pub async fn save(&self) -> SaveOutcome {
        self.shared.save().await
    }

    /// Wait for any in-flight save to finish, then save remaining changes.
    ///
    /// Call before exiting the host: unlike [`save`](Self::save) this never
    /// returns while a write is still outstanding.
    pub async fn flush(&self) -> SaveOutcome {
        self.shared.flush().await
    }

    /// Whether the form answers differ from the last successful save.
    ///
    /// Always `false` while loading or before a baseline exists. Wizard
    /// navigation alone never counts as unsaved.
    pub fn has_unsaved_changes(&self) -> bool {
        self.shared.has_unsaved_changes()
    }

    /// Replace the current form answers. Does not restart the ticker.
    pub fn update_form_data(&self, form_data: FormData) {
        self.shared.session().form_data = form_data;
    }

    /// Replace the current wizard state. Does not restart the ticker.
    pub fn update_wizard_state(&self, wizard_state: WizardState) {
        self.shared.session().wizard_state = wizard_state;
    }

    pub fn form_data(&self) -> FormData {
        self.shared.session().form_data.clone()
    }

    pub fn wizard_state(&self) -> WizardState {
        self.shared.session().wizard_state.clone()
    }

    /// Update the loading flag.
    ///
    /// The `true -> false` transition records the current content as the
    /// baseline without saving it.
    pub fn set_loading(&mut self, is_loading: bool) {
        {
            let mut session = self.shared.session();
            if session.is_loading == is_loading {
                return;
            }
            let finished_loading = session.is_loading && !is_loading;
            session.is_loading = is_loading;
            if finished_loading {
                session.capture_baseline();
                tracing::debug!(draft_id = ?session.draft_id, "baseline initialized after load");
            }
        }
        self.restart_ticker();
    }

    pub fn set_ready(&mut self, is_ready: bool) {
        {
            let mut session = self.shared.session();
            if session.is_ready == is_ready {
                return;
            }
            session.is_ready = is_ready;
        }
        self.restart_ticker();
    }

    pub fn set_storage_mode(&mut self, storage_mode: StorageMode) {
        {
            let mut session = self.shared.session();
            if session.options.storage_mode == storage_mode {
                return;
            }
            session.options.storage_mode = storage_mode;
        }
        self.restart_ticker();
    }

    /// Swap the storage adapter.
    ///
    /// The unsaved-changes baseline is kept, but the next save writes the
    /// current content to the new adapter regardless of fingerprints.
    pub fn set_adapter(&mut self, adapter: Option<Arc<S>>) {
        {
            let mut session = self.shared.session();
            let changed = match (&session.adapter, &adapter) {
                (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
                (None, None) => false,
                _ => true,
            };
            if !changed {
                return;
            }
            session.adapter = adapter;
            session.generation += 1;
            session.needs_write = session.adapter.is_some();
        }
        self.restart_ticker();
    }

    /// Switch to another draft. Starts a new session.
    pub fn set_draft_id(&mut self, draft_id: Option<DraftId>) {
        {
            let mut session = self.shared.session();
            if session.draft_id == draft_id {
                return;
            }
            session.draft_id = draft_id;
            session.restart();
        }
        self.restart_ticker();
    }

    /// Current ticker period, or `None` while the session is inactive.
    pub fn save_interval(&self) -> Option<Duration> {
        self.ticker
            .as_ref()
            .map(|_| self.shared.session().options.interval())
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.shared.session().options.storage_mode
    }

    /// Stop the ticker and unregister from the signal bus.
    ///
    /// A save already in flight is left to finish; no new saves start.
    pub fn detach(mut self) {
        self.teardown();
    }

    fn restart_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        if self.shared.detached.load(Ordering::Acquire) {
            return;
        }

        let (active, period) = {
            let session = self.shared.session();
            (session.is_active(), session.options.interval())
        };
        if !active {
            tracing::trace!("autosave session inactive, ticker stopped");
            return;
        }

        let cancel = self.shutdown.child_token();
        spawn_ticker(&self.shared, period, cancel.clone());
        self.ticker = Some(cancel);
        tracing::debug!(period_ms = period.as_millis() as u64, "autosave ticker started");
    }

    fn teardown(&mut self) {
        if self.shared.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.cancel();
        self.ticker = None;
        if let Some(guard_id) = self.guard_id.take() {
            self.signals.unregister_unload_guard(guard_id);
        }
        tracing::debug!("autosave detached");
    }
}

impl<S: DraftStore + 'static> Drop for DraftAutosave<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<S: DraftStore + 'static> std::fmt::Debug for DraftAutosave<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.shared.session();
        f.debug_struct("DraftAutosave")
            .field("draft_id", &session.draft_id)
            .field("storage_mode", &session.options.storage_mode)
            .field("is_ready", &session.is_ready)
            .field("is_loading", &session.is_loading)
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}
