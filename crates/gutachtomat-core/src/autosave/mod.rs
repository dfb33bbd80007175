//! Draft autosave: change fingerprints, platform signals, and the
//! coordinator that ties them to a `DraftStore`.

pub mod coordinator;
pub mod fingerprint;
pub mod signal;

pub use coordinator::{
    AutosaveOptions, AutosaveParams, DraftAutosave, SaveListener, SaveOutcome, SkipReason,
};
pub use fingerprint::{Baseline, Fingerprint};
pub use signal::{AppSignal, SignalBus, UnloadDecision, UnloadGuardId, UNSAVED_CHANGES_MESSAGE};
