//! Fuse in-browser WASM server.
//!
//! Exports `handle_request(method, path, query, body)` for the worker bridge
//! to call. Uses `matchit` for URL routing — the same router engine that
//! powers Axum.
//!
//! Fuse is a party game: one visitor starts a chain with a prompt, shares the
//! link, and each recipient adds one line. After ten lines the chain locks and
//! the whole story is revealed. Chains live only in the visitor's browser
//! storage; a link opened on another device starts its own local chain.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod game;
pub mod routes;

pub use config::FuseConfig;
pub use error::{ExportUnavailable, FuseError, StorageError, ValidationError};
pub use game::chain::{Chain, LINE_LIMIT};
pub use game::session::{ChainSession, Phase, SessionEvent, View};
pub use game::store::{ChainStore, MemoryStorage, Storage};

/// Process an HTTP-like request and return an HTML fragment.
///
/// Called from JavaScript (Web Worker) via wasm-bindgen.
///
/// # Arguments
/// * `method` — HTTP method (e.g., "GET", "POST")
/// * `path`   — URL path (e.g., "/api/chain/line")
/// * `query`  — Query string (e.g., "?network=x")
/// * `body`   — Request body (e.g., POST form data). Empty string for GET requests.
///
/// # Returns
/// An HTML string fragment suitable for HTMX to swap into the DOM. The
/// `/api/chain/text` and `/api/chain/state` routes return plain text and JSON.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    let mut router = matchit::Router::new();

    router.insert("/api/chain/load", "chain_load").ok();
    router.insert("/api/chain/view", "chain_view").ok();
    router.insert("/api/chain/start", "chain_start").ok();
    router.insert("/api/chain/line", "chain_line").ok();
    router.insert("/api/chain/new", "chain_new").ok();
    router.insert("/api/chain/share", "chain_share").ok();
    router.insert("/api/chain/text", "chain_text").ok();
    router.insert("/api/chain/social", "chain_social").ok();
    router.insert("/api/chain/link", "chain_link").ok();
    router.insert("/api/chain/surprise", "chain_surprise").ok();
    router.insert("/api/chain/chars", "chain_chars").ok();
    router.insert("/api/chain/state", "chain_state").ok();
    router.insert("/api/chain/storage-failed", "chain_storage_failed").ok();

    tracing::debug!(method, path, "request");

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("chain_view", "GET") => routes::chain::handle_view_get(query),
            ("chain_share", "GET") => routes::chain::handle_share_get(query),
            ("chain_text", "GET") => routes::chain::handle_text_get(query),
            ("chain_social", "GET") => routes::chain::handle_social_get(query),
            ("chain_link", "GET") => routes::chain::handle_link_get(query),
            ("chain_surprise", "GET") => routes::chain::handle_surprise_get(query),
            ("chain_chars", "GET") => routes::chain::handle_chars_get(query),
            ("chain_state", "GET") => routes::chain::handle_state_get(query),

            ("chain_load", "POST") => routes::chain::handle_load_post(body),
            ("chain_start", "POST") => routes::chain::handle_start_post(body),
            ("chain_line", "POST") => routes::chain::handle_line_post(body),
            ("chain_new", "POST") => routes::chain::handle_new_post(body),
            ("chain_storage_failed", "POST") => routes::chain::handle_storage_failed_post(body),

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

/// Replace the runtime configuration from a JSON document.
///
/// Returns `"ok"`, or `"error: …"` with the previous configuration still in
/// effect.
#[wasm_bindgen]
pub fn configure(json: &str) -> String {
    match game::app::configure(json) {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    }
}

fn not_found() -> String {
    r#"<span class="text-red-600">404 — route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-red-600">405 — method not allowed</span>"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::app::reset_app;

    #[test]
    fn returns_404_for_unknown_route() {
        let html = handle_request("GET", "/api/nonexistent", "", "");
        assert!(html.contains("404"));
    }

    #[test]
    fn returns_405_for_wrong_method() {
        assert!(handle_request("POST", "/api/chain/share", "", "").contains("405"));
        assert!(handle_request("GET", "/api/chain/line", "", "").contains("405"));
    }

    #[test]
    fn routes_chain_load() {
        reset_app();
        let html = handle_request("POST", "/api/chain/load", "", "c=ROOM42");
        assert!(html.contains("start-panel"));
        assert!(html.contains("ROOM42"));
        reset_app();
    }

    #[test]
    fn routes_chain_start_and_line() {
        reset_app();
        handle_request("POST", "/api/chain/load", "", "c=ROOM42");
        let html = handle_request("POST", "/api/chain/start", "", "prompt=Tell+a+story");
        assert!(html.contains("play-panel"));
        let html = handle_request("POST", "/api/chain/line", "", "line=Hello");
        assert!(html.contains("Previous line: Hello"));
        reset_app();
    }

    #[test]
    fn routes_chain_chars() {
        let html = handle_request("GET", "/api/chain/chars", "?line=abc", "");
        assert!(html.contains("77"));
    }

    #[test]
    fn routes_chain_state() {
        reset_app();
        handle_request("POST", "/api/chain/load", "", "c=ROOM42");
        let json = handle_request("GET", "/api/chain/state", "", "");
        assert!(json.contains(r#""id":"ROOM42""#));
        reset_app();
    }

    #[test]
    fn routes_chain_storage_failed() {
        reset_app();
        handle_request("POST", "/api/chain/load", "", "c=ROOM42");
        handle_request("POST", "/api/chain/start", "", "prompt=Tell+a+story");
        let html = handle_request("POST", "/api/chain/storage-failed", "", "reason=SecurityError");
        assert!(html.contains("Progress can"));
        assert!(handle_request("GET", "/api/chain/storage-failed", "", "").contains("405"));
        reset_app();
    }

    #[test]
    fn configure_reports_errors() {
        reset_app();
        assert_eq!(configure(r#"{"soft_line_max":60}"#), "ok");
        assert!(configure("{").starts_with("error: "));
        let html = handle_request("GET", "/api/chain/chars", "?line=", "");
        assert!(html.contains(">60<"));
        reset_app();
    }
}
