//! Per-worker runtime: the configuration, the storage mirror and the one live
//! chain session behind `handle_request`.
//!
//! Uses `thread_local!` + `RefCell` for safe mutable access in single-threaded
//! WASM. The worker keeps the module alive, so the session survives across
//! requests for the whole page visit. The page hydrates the storage mirror
//! from `localStorage` on load, and every write is echoed back to the page as
//! a `localStorage.setItem` script (see `routes::chain`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::FuseConfig;
use crate::error::{FuseError, StorageError};
use crate::game::ids::is_well_formed;
use crate::game::session::{ChainSession, SessionEvent};
use crate::game::store::MemoryStorage;

pub type Session = ChainSession<MemoryStorage>;

thread_local! {
    static CONFIG: RefCell<FuseConfig> = RefCell::new(FuseConfig::default());
    static STORAGE: MemoryStorage = MemoryStorage::new();
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
    static EVENTS: Rc<RefCell<Vec<SessionEvent>>> = Rc::default();
}

/// Current configuration (cloned).
pub fn config() -> FuseConfig {
    CONFIG.with(|c| c.borrow().clone())
}

/// Replace the configuration from JSON. On error the old one stays active.
pub fn configure(json: &str) -> Result<(), FuseError> {
    let config = FuseConfig::from_json(json)?;
    tracing::debug!(?config, "configuration replaced");
    CONFIG.with(|c| *c.borrow_mut() = config);
    Ok(())
}

/// Initial transition for a page load. `record` is whatever the page found in
/// `localStorage` for `link_id`; it is mirrored before the session opens.
/// When the page reports storage as unavailable the mirror rejects writes, so
/// the session runs degraded from the start.
pub fn load(link_id: Option<&str>, record: Option<&str>, storage_available: bool) {
    let config = config();
    let link_id = link_id.map(str::trim).filter(|id| !id.is_empty());
    STORAGE.with(|s| s.set_disabled(!storage_available));
    if let (Some(id), Some(raw)) = (link_id, record) {
        if storage_available && is_well_formed(id) && !raw.trim().is_empty() {
            STORAGE.with(|s| s.hydrate(&format!("{}{}", config.storage_prefix, id), raw));
        }
    }
    let session = new_session(&config, link_id);
    SESSION.with(|s| *s.borrow_mut() = Some(session));
}

/// The page could not write to `localStorage`. Stop mirroring writes for the
/// rest of the visit and tell the player their progress is memory-only.
pub fn storage_failed(reason: &str) {
    STORAGE.with(|s| s.set_disabled(true));
    let reason = match reason.trim() {
        "" => "unknown error",
        r => r,
    };
    with_session(|s| s.report_storage_failure(StorageError::Rejected(reason.to_string())));
}

/// Run `f` against the live session, opening one under a minted id if the
/// page never called [`load`].
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&mut Session) -> R,
{
    SESSION.with(|s| {
        let mut slot = s.borrow_mut();
        let session = slot.get_or_insert_with(|| new_session(&config(), None));
        f(session)
    })
}

/// Take every session event raised since the last drain.
pub fn drain_events() -> Vec<SessionEvent> {
    EVENTS.with(|e| e.borrow_mut().drain(..).collect())
}

/// Forget the session, the mirror contents, pending events and configuration.
pub fn reset_app() {
    SESSION.with(|s| *s.borrow_mut() = None);
    STORAGE.with(MemoryStorage::clear);
    EVENTS.with(|e| e.borrow_mut().clear());
    CONFIG.with(|c| *c.borrow_mut() = FuseConfig::default());
}

fn new_session(config: &FuseConfig, link_id: Option<&str>) -> Session {
    let storage = STORAGE.with(MemoryStorage::clone);
    let mut session = ChainSession::open(storage, config, link_id);
    let sink = EVENTS.with(Rc::clone);
    sink.borrow_mut().clear();
    session.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    session
}
