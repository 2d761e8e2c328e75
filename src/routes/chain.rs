//! `/api/chain/*` routes — the Fuse story chain: setup, compose, reveal and
//! sharing.
//!
//! Every state-changing handler re-renders the whole `#fuse-app` panel and
//! appends scripts for whatever the session reported while handling the
//! request: `localStorage` write-through, URL rewrites for new ids, and the
//! lock celebration.

use crate::config::FuseConfig;
use crate::error::FuseError;
use crate::game::app::{self, Session};
use crate::game::prompts;
use crate::game::session::{Notice, SessionEvent, View};
use crate::game::share::{
    self, ImageArtifact, NoImageRenderer, ScriptImageRenderer, ShareOutcome, SocialNetwork,
    TEXT_FALLBACK_NOTICE, js_string,
};
use crate::routes::util::{escape_html, get_param, parse_form_body, parse_query};

const FIRST_LINE_HINT: &str = "You’re first — set the tone.";

// ── POST /api/chain/load ───────────────────────────────────────────

/// Handle POST /api/chain/load
/// Body params:
///   - c={id}          → chain id from the page link (optional)
///   - record={json}   → what localStorage holds for that id (optional)
///   - storage=off     → localStorage is unavailable on this page
///
/// Runs the initial transition and returns the active view.
pub fn handle_load_post(body: &str) -> String {
    let params = parse_form_body(body);
    let link_id = get_param(&params, "c");
    let record = get_param(&params, "record");
    let storage_available = get_param(&params, "storage") != Some("off");
    app::load(link_id, record, storage_available);
    respond(None)
}

// ── GET /api/chain/view ────────────────────────────────────────────

pub fn handle_view_get(_query: &str) -> String {
    respond(None)
}

// ── POST /api/chain/start ──────────────────────────────────────────

/// Handle POST /api/chain/start
/// Body: prompt={text}
pub fn handle_start_post(body: &str) -> String {
    let params = parse_form_body(body);
    let prompt = get_param(&params, "prompt").unwrap_or("");
    let result = app::with_session(|s| s.submit_prompt(prompt));
    respond(result.err())
}

// ── POST /api/chain/line ───────────────────────────────────────────

/// Handle POST /api/chain/line
/// Body: line={text}
pub fn handle_line_post(body: &str) -> String {
    let params = parse_form_body(body);
    let line = get_param(&params, "line").unwrap_or("");
    let result = app::with_session(|s| s.submit_line(line));
    respond(result.err())
}

// ── POST /api/chain/new ────────────────────────────────────────────

pub fn handle_new_post(_body: &str) -> String {
    app::with_session(|s| s.start_new());
    respond(None)
}

// ── POST /api/chain/storage-failed ─────────────────────────────────

/// Handle POST /api/chain/storage-failed
/// Body: reason={text}
///
/// Sent by the write-through script when `localStorage.setItem` throws.
/// Re-renders the panel with the degraded-storage notice.
pub fn handle_storage_failed_post(body: &str) -> String {
    let params = parse_form_body(body);
    app::storage_failed(get_param(&params, "reason").unwrap_or(""));
    respond(None)
}

// ── GET /api/chain/share ───────────────────────────────────────────

/// Handle GET /api/chain/share
/// Returns an image export script, or the plain-text fallback with a notice.
pub fn handle_share_get(_query: &str) -> String {
    let config = app::config();
    let mut renderer = ScriptImageRenderer::new(config.image_module.clone(), "card");
    match app::with_session(|s| s.share(&mut renderer)) {
        Ok(ShareOutcome::Image { artifact: ImageArtifact::Script(js), .. }) => {
            let mut h = String::with_capacity(js.len() + 128);
            h.push_str(r#"<span class="text-sm text-slate-500">Preparing image…</span>"#);
            h.push_str(&js);
            h
        }
        Ok(ShareOutcome::Image { artifact: ImageArtifact::DataUrl(url), .. }) => format!(
            r#"<a href="{}" download="{}" class="underline text-sm">Download image</a>"#,
            escape_html(&url),
            share::IMAGE_FILE_NAME
        ),
        Ok(ShareOutcome::TextFallback { text, .. }) => render_text_fallback(&text),
        Err(e) => render_error(&e),
    }
}

fn render_text_fallback(text: &str) -> String {
    let mut h = String::with_capacity(text.len() * 2 + 256);
    h.push_str(&format!(
        r#"<p class="text-sm text-amber-700">{}</p>"#,
        TEXT_FALLBACK_NOTICE
    ));
    h.push_str(&format!(
        r#"<pre class="whitespace-pre-wrap text-sm">{}</pre>"#,
        escape_html(text)
    ));
    h.push_str(&format!(
        "<script>try{{navigator.clipboard.writeText({})}}catch(e){{}}</script>",
        js_string(text)
    ));
    h
}

// ── GET /api/chain/text ────────────────────────────────────────────

/// Handle GET /api/chain/text
/// Returns the plain-text export of a finished chain (not HTML).
pub fn handle_text_get(_query: &str) -> String {
    match app::with_session(|s| s.share(&mut NoImageRenderer)) {
        Ok(outcome) => outcome.text().to_string(),
        Err(e) => render_error(&e),
    }
}

// ── GET /api/chain/social ──────────────────────────────────────────

/// Handle GET /api/chain/social?network={x|whatsapp}
/// Returns a share anchor. Never touches the chain.
pub fn handle_social_get(query: &str) -> String {
    let params = parse_query(query);
    let Some(network) = get_param(&params, "network").and_then(SocialNetwork::from_param) else {
        return r#"<span class="text-red-600">Unknown network</span>"#.to_string();
    };
    match app::with_session(|s| s.share(&mut NoImageRenderer)) {
        Ok(outcome) => render_social_anchor(network, outcome.text()),
        Err(e) => render_error(&e),
    }
}

fn render_social_anchor(network: SocialNetwork, text: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank" rel="noopener" class="underline text-sm">{}</a>"#,
        escape_html(&share::social_share_url(network, text)),
        network.label()
    )
}

// ── GET /api/chain/link ────────────────────────────────────────────

pub fn handle_link_get(_query: &str) -> String {
    let config = app::config();
    let id = app::with_session(|s| s.id().to_string());
    render_share_link(&config, &id)
}

fn render_share_link(config: &FuseConfig, id: &str) -> String {
    format!(
        r#"<a id="share-link" href="{}" class="underline text-sm">Share Link</a>"#,
        escape_html(&share::chain_link(config, id))
    )
}

// ── GET /api/chain/surprise ────────────────────────────────────────

/// Handle GET /api/chain/surprise
/// Returns the prompt input pre-filled with a random surprise prompt.
pub fn handle_surprise_get(_query: &str) -> String {
    let prompt = app::with_session(|s| prompts::surprise(s.rng()));
    render_prompt_input(prompt)
}

fn render_prompt_input(value: &str) -> String {
    format!(
        r#"<input type="text" name="prompt" id="prompt-input" value="{}" placeholder="Start with a short prompt" class="w-full border rounded px-2 py-1">"#,
        escape_html(value)
    )
}

// ── GET /api/chain/chars ───────────────────────────────────────────

/// Handle GET /api/chain/chars?line={text}
/// Characters left against the soft maximum. Advisory only.
pub fn handle_chars_get(query: &str) -> String {
    let params = parse_query(query);
    let line = get_param(&params, "line").unwrap_or("");
    render_chars_left(share::chars_left(line, app::config().soft_line_max))
}

fn render_chars_left(left: i64) -> String {
    let class = if left < 0 { "text-red-600" } else { "text-slate-500" };
    format!(r#"<span id="chars-left" class="text-xs {class}">{left}</span>"#)
}

// ── GET /api/chain/state ───────────────────────────────────────────

/// Handle GET /api/chain/state
/// Returns the current chain record as JSON.
pub fn handle_state_get(_query: &str) -> String {
    app::with_session(|s| serde_json::to_string(s.chain()).unwrap_or_else(|_| "{}".to_string()))
}

// ── Rendering ──────────────────────────────────────────────────────

/// Render the session, then append scripts for the events it raised.
fn respond(error: Option<FuseError>) -> String {
    let config = app::config();
    let mut html = app::with_session(|s| {
        let notice = s.take_notice();
        render_app(s, &config, error.as_ref(), notice.as_ref())
    });
    html.push_str(&render_event_scripts(&config, &app::drain_events()));
    html
}

fn render_app(
    s: &Session,
    config: &FuseConfig,
    error: Option<&FuseError>,
    notice: Option<&Notice>,
) -> String {
    let mut h = String::with_capacity(2048);
    h.push_str(r#"<div id="fuse-app" class="max-w-xl mx-auto p-4">"#);
    h.push_str(&format!(
        r#"<p id="chain-badge" class="text-xs text-slate-500 mb-2">Your unique chain ID: <strong id="chain-id">{}</strong> • Share with friends to build together</p>"#,
        escape_html(s.id())
    ));
    h.push_str(r#"<div class="flex gap-3 mb-3">"#);
    h.push_str(&render_share_link(config, s.id()));
    h.push_str(r##"<button hx-post="/api/chain/new" hx-target="#fuse-app" hx-swap="outerHTML" class="underline text-sm">New Chain</button>"##);
    h.push_str("</div>");

    if let Some(notice) = notice {
        h.push_str(&format!(
            r#"<p class="bg-amber-100 text-amber-800 text-sm rounded p-2 mb-3" role="status">{}</p>"#,
            escape_html(&notice.message())
        ));
    }
    if let Some(err) = error {
        h.push_str(&render_error(err));
    }

    match s.view() {
        View::Setup => h.push_str(&render_setup()),
        View::Compose {
            last_line,
            turn,
            count,
            limit,
        } => h.push_str(&render_compose(config, last_line, turn, count, limit)),
        View::Reveal { prompt, lines } => h.push_str(&render_reveal(prompt, lines)),
    }
    h.push_str("</div>");
    h
}

fn render_error(err: &FuseError) -> String {
    format!(
        r#"<p class="text-red-600 text-sm mb-2" role="alert">{}</p>"#,
        escape_html(&err.to_string())
    )
}

fn render_setup() -> String {
    let mut h = String::with_capacity(1024);
    h.push_str(r#"<section id="start-panel">"#);
    h.push_str(r##"<form hx-post="/api/chain/start" hx-target="#fuse-app" hx-swap="outerHTML">"##);
    h.push_str(r#"<div id="prompt-field" class="mb-2">"#);
    h.push_str(&render_prompt_input(""));
    h.push_str("</div>");
    h.push_str(r##"<button type="button" hx-get="/api/chain/surprise" hx-target="#prompt-field" class="text-sm underline mr-3">Surprise me</button>"##);
    h.push_str(r#"<button type="submit" class="bg-slate-900 text-white font-bold py-2 px-4 rounded">Start Chain</button>"#);
    h.push_str("</form></section>");
    h
}

fn render_compose(
    config: &FuseConfig,
    last_line: Option<&str>,
    turn: usize,
    count: usize,
    limit: usize,
) -> String {
    let mut h = String::with_capacity(1536);
    h.push_str(r#"<section id="play-panel">"#);
    let previous = match last_line {
        Some(line) => format!("Previous line: {}", escape_html(line)),
        None => FIRST_LINE_HINT.to_string(),
    };
    h.push_str(&format!(
        r#"<p id="last-line" class="italic mb-2">{previous}</p>"#
    ));
    h.push_str(&format!(
        r#"<p class="text-sm mb-2">Line <span id="turn-num">{turn}</span></p>"#
    ));
    h.push_str(r##"<form hx-post="/api/chain/line" hx-target="#fuse-app" hx-swap="outerHTML">"##);
    h.push_str(r##"<input type="text" name="line" id="line-input" placeholder="Add one line" autocomplete="off" hx-get="/api/chain/chars" hx-trigger="input changed" hx-target="#chars-left" hx-swap="outerHTML" class="w-full border rounded px-2 py-1">"##);
    h.push_str(r#"<p class="text-xs mb-2">"#);
    h.push_str(&render_chars_left(config.soft_line_max as i64));
    h.push_str(" characters left</p>");
    h.push_str(r#"<button type="submit" class="bg-slate-900 text-white font-bold py-2 px-4 rounded">Add Line</button>"#);
    h.push_str("</form>");
    h.push_str(&format!(
        r#"<p id="progress" class="text-xs text-slate-500 mt-2">{count} / {limit} lines</p>"#
    ));
    h.push_str("</section>");
    h
}

fn render_reveal(prompt: &str, lines: &[String]) -> String {
    let mut h = String::with_capacity(2048);
    h.push_str(r#"<section id="reveal-panel">"#);
    h.push_str(r#"<div id="card" class="rounded-lg border p-4 mb-3">"#);
    let prompt = if prompt.is_empty() { "(no prompt)" } else { prompt };
    h.push_str(&format!(
        r#"<p id="prompt-text" class="font-bold mb-2">{}</p>"#,
        escape_html(prompt)
    ));
    h.push_str(r#"<ol id="lines-list" class="list-decimal pl-5">"#);
    for line in lines {
        h.push_str(&format!("<li>{}</li>", escape_html(line)));
    }
    h.push_str("</ol></div>");
    h.push_str(r#"<div class="flex flex-wrap gap-3">"#);
    h.push_str(r##"<button hx-get="/api/chain/share" hx-target="#share-result" class="bg-slate-900 text-white font-bold py-2 px-4 rounded">Share Image</button>"##);
    h.push_str(r##"<button hx-get="/api/chain/social?network=x" hx-target="#share-result" class="underline text-sm">Share on X</button>"##);
    h.push_str(r##"<button hx-get="/api/chain/social?network=whatsapp" hx-target="#share-result" class="underline text-sm">Share on WhatsApp</button>"##);
    h.push_str(r##"<button hx-post="/api/chain/new" hx-target="#fuse-app" hx-swap="outerHTML" class="underline text-sm">Play Again</button>"##);
    h.push_str("</div>");
    h.push_str(r#"<div id="share-result" class="mt-3"></div>"#);
    h.push_str("</section>");
    h
}

fn render_event_scripts(config: &FuseConfig, events: &[SessionEvent]) -> String {
    let mut h = String::new();
    for event in events {
        match event {
            SessionEvent::Persisted(record) => h.push_str(&format!(
                "<script>try{{localStorage.setItem({},{})}}catch(e){{console.warn('[fuse] could not save chain',e);htmx.ajax('POST','/api/chain/storage-failed',{{values:{{reason:String((e&&e.name)||e)}},target:'#fuse-app',swap:'outerHTML'}})}}</script>",
                js_string(&record.key),
                js_string(&record.json)
            )),
            SessionEvent::IdChanged { id } => h.push_str(&format!(
                r#"<script>(function(){{var u=new URL(location.href);u.searchParams.set({},{});history.replaceState({{}},"",u.toString());}})();</script>"#,
                js_string(&config.link_param),
                js_string(id)
            )),
            SessionEvent::Locked if !config.confetti_module.is_empty() => h.push_str(&format!(
                r#"<script>(function(){{var s=document.createElement('script');s.src={};s.onload=function(){{if(window.confetti){{confetti({{particleCount:120,spread:75,origin:{{y:0.6}}}});}}}};document.head.appendChild(s);}})();</script>"#,
                js_string(&config.confetti_module)
            )),
            _ => {}
        }
    }
    h
}
