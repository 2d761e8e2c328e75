//! Chain session controller — the Setup → Compose → Reveal state machine.
//!
//! A [`ChainSession`] owns its store, its current chain and its id source.
//! Nothing is global, so tests (or two tabs simulated in one process) can run
//! independent sessions side by side, optionally over one shared storage area.
//!
//! Every user action does at most one read-modify-write on the current chain.
//! Storage failures never fail an action: the session keeps playing in memory
//! and raises a [`Notice`] instead.
//!
//! The view layer either polls [`ChainSession::view`] or subscribes to
//! [`SessionEvent`]s.

use crate::config::FuseConfig;
use crate::error::{FuseError, StorageError, ValidationError};
use crate::game::chain::{Appended, Chain, LINE_LIMIT};
use crate::game::ids::{IdMinter, is_well_formed};
use crate::game::share::{self, ImageRenderer, ShareOutcome};
use crate::game::store::{ChainStore, Storage, StoredRecord};

/// Which screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Compose,
    Reveal,
}

/// What the view layer gets to draw for the active phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View<'a> {
    Setup,
    Compose {
        last_line: Option<&'a str>,
        turn: usize,
        count: usize,
        limit: usize,
    },
    Reveal {
        prompt: &'a str,
        lines: &'a [String],
    },
}

/// Notifications for subscribers. Delivered synchronously, in order, after
/// the action that caused them has finished mutating the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged { from: Phase, to: Phase },
    /// The shareable id changed (minted on load, or a new chain).
    IdChanged { id: String },
    Persisted(StoredRecord),
    PersistFailed(StorageError),
    /// The chain just received its last line.
    Locked,
}

/// Non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Progress is kept in memory only and will be lost on reload.
    StorageDegraded(StorageError),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::StorageDegraded(e) => format!(
                "Progress can't be saved on this device ({e}). You can keep playing, but a reload will lose it."
            ),
        }
    }
}

type Listener = Box<dyn FnMut(&SessionEvent)>;

pub struct ChainSession<S> {
    store: ChainStore<S>,
    chain: Chain,
    phase: Phase,
    ids: IdMinter,
    minted: bool,
    notice: Option<Notice>,
    listeners: Vec<Listener>,
    pending: Vec<SessionEvent>,
}

impl<S> std::fmt::Debug for ChainSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSession")
            .field("chain", &self.chain)
            .field("phase", &self.phase)
            .field("minted", &self.minted)
            .field("notice", &self.notice)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S: Storage> ChainSession<S> {
    /// Initial transition. Uses `link_id` when it is a plausible id, otherwise
    /// mints a fresh one, then resumes whatever the store holds for it.
    pub fn open(storage: S, config: &FuseConfig, link_id: Option<&str>) -> Self {
        Self::open_with(storage, config, link_id, IdMinter::from_entropy(config.id_length))
    }

    /// [`open`](Self::open) with an explicit id source.
    pub fn open_with(storage: S, config: &FuseConfig, link_id: Option<&str>, mut ids: IdMinter) -> Self {
        let store = ChainStore::new(storage, config.storage_prefix.clone());
        let (id, minted) = match link_id.map(str::trim).filter(|id| is_well_formed(id)) {
            Some(id) => (id.to_string(), false),
            None => (ids.mint(), true),
        };
        let chain = store.get(&id).unwrap_or_else(|| Chain::empty(id.clone()));
        let phase = phase_of(&chain);
        tracing::debug!(%id, minted, ?phase, "chain session opened");

        let mut session = Self {
            store,
            chain,
            phase,
            ids,
            minted,
            notice: None,
            listeners: Vec::new(),
            pending: Vec::new(),
        };
        if minted {
            session.pending.push(SessionEvent::IdChanged { id });
        }
        session
    }

    /// Register a listener. If nobody has subscribed yet, the latest id change
    /// (such as a minted id on open) is replayed to it; other unobserved
    /// events are dropped.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) {
        self.listeners.push(Box::new(listener));
        self.flush();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn id(&self) -> &str {
        self.chain.id()
    }

    /// True when the current id was minted rather than taken from a link.
    pub fn id_was_minted(&self) -> bool {
        self.minted
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn store(&self) -> &ChainStore<S> {
        &self.store
    }

    pub fn view(&self) -> View<'_> {
        match self.phase {
            Phase::Setup => View::Setup,
            Phase::Compose => View::Compose {
                last_line: self.chain.last_line(),
                turn: self.chain.turn(),
                count: self.chain.lines().len(),
                limit: LINE_LIMIT,
            },
            Phase::Reveal => View::Reveal {
                prompt: self.chain.prompt(),
                lines: self.chain.lines(),
            },
        }
    }

    /// Setup → Compose.
    pub fn submit_prompt(&mut self, prompt: &str) -> Result<Phase, FuseError> {
        self.expect_phase(Phase::Setup, "submit a prompt")?;
        let chain = Chain::started(self.chain.id(), prompt)?;
        self.chain = chain;
        self.persist();
        self.transition(Phase::Compose);
        self.flush();
        Ok(self.phase)
    }

    /// Compose → Compose, or Compose → Reveal on the last line.
    pub fn submit_line(&mut self, line: &str) -> Result<Phase, FuseError> {
        if self.chain.is_locked() {
            return Err(ValidationError::ChainLocked.into());
        }
        self.expect_phase(Phase::Compose, "add a line")?;
        match self.chain.append(line)? {
            Appended::Continue { turn } => {
                tracing::debug!(id = self.chain.id(), turn, "line added");
                self.persist();
            }
            Appended::Locked => {
                tracing::debug!(id = self.chain.id(), "chain locked");
                self.persist();
                self.transition(Phase::Reveal);
                self.pending.push(SessionEvent::Locked);
            }
        }
        self.flush();
        Ok(self.phase)
    }

    /// Abandon the current chain and start over under a fresh id. The old
    /// record stays in storage under its own key.
    pub fn start_new(&mut self) -> Phase {
        let id = self.ids.mint_other_than(self.chain.id());
        tracing::debug!(old = self.chain.id(), new = %id, "starting new chain");
        self.chain = Chain::empty(id.clone());
        self.minted = true;
        self.persist();
        self.pending.push(SessionEvent::IdChanged { id });
        self.transition(Phase::Setup);
        self.flush();
        self.phase
    }

    /// Reveal only: render the finished chain for sharing. Never mutates.
    pub fn share(&self, renderer: &mut dyn ImageRenderer) -> Result<ShareOutcome, FuseError> {
        self.expect_phase(Phase::Reveal, "share")?;
        Ok(share::export(&self.chain, renderer))
    }

    /// Record a write failure noticed outside the store, such as the page's
    /// `localStorage` refusing a record the mirror already accepted. Play
    /// continues in memory.
    pub fn report_storage_failure(&mut self, error: StorageError) {
        tracing::warn!(id = self.chain.id(), %error, "storage failure reported; continuing in memory");
        self.notice = Some(Notice::StorageDegraded(error.clone()));
        self.pending.push(SessionEvent::PersistFailed(error));
        self.flush();
    }

    /// Draw from this session's random source, e.g. for surprise prompts.
    pub fn rng(&mut self) -> &mut IdMinter {
        &mut self.ids
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), ValidationError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ValidationError::WrongPhase {
                phase: self.phase,
                action,
            })
        }
    }

    fn persist(&mut self) {
        match self.store.put(&self.chain) {
            Ok(record) => self.pending.push(SessionEvent::Persisted(record)),
            Err(e) => {
                tracing::warn!(id = self.chain.id(), error = %e, "could not persist chain; continuing in memory");
                self.notice = Some(Notice::StorageDegraded(e.clone()));
                self.pending.push(SessionEvent::PersistFailed(e));
            }
        }
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        self.phase = to;
        if from != to {
            self.pending.push(SessionEvent::PhaseChanged { from, to });
        }
    }

    fn flush(&mut self) {
        if self.listeners.is_empty() {
            // Keep only the latest id for a late subscriber.
            let latest = self
                .pending
                .drain(..)
                .rev()
                .find(|e| matches!(e, SessionEvent::IdChanged { .. }));
            self.pending.extend(latest);
            return;
        }
        for event in self.pending.drain(..) {
            for listener in self.listeners.iter_mut() {
                listener(&event);
            }
        }
    }
}

/// Phase implied by a chain read from storage (or a blank one).
fn phase_of(chain: &Chain) -> Phase {
    if chain.is_locked() {
        Phase::Reveal
    } else if chain.is_started() {
        Phase::Compose
    } else {
        Phase::Setup
    }
}
