//! Game module — the chain entity, its store, and the session state machine
//! that drives a single visit.
//!
//! Everything here is plain Rust with no browser dependency; `app` is the
//! only piece that keeps per-worker state for the WASM entry point.

pub mod app;
pub mod chain;
pub mod ids;
pub mod prompts;
pub mod session;
pub mod share;
pub mod store;
