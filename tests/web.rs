//! Smoke test for the exported entry points on wasm32.
//! Run with `wasm-pack test --node`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn load_start_and_add_a_line() {
    let html = fuse_server::handle_request("POST", "/api/chain/load", "", "c=WASM01");
    assert!(html.contains("start-panel"));
    let html = fuse_server::handle_request("POST", "/api/chain/start", "", "prompt=Hi");
    assert!(html.contains("localStorage.setItem"));
    let html = fuse_server::handle_request("POST", "/api/chain/line", "", "line=Hello");
    assert!(html.contains("Previous line: Hello"));
}

#[wasm_bindgen_test]
fn minted_ids_work_under_wasm() {
    let html = fuse_server::handle_request("POST", "/api/chain/new", "", "");
    assert!(html.contains("history.replaceState"));
}
