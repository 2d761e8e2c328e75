//! Sharing a finished chain: plain text, rendered image, social links, and
//! the shareable chain link itself.
//!
//! Image rendering is an injected capability. When it is missing or fails, the
//! share falls back to plain text and says so.

use url::Url;
use url::form_urlencoded;

use crate::config::FuseConfig;
use crate::error::ExportUnavailable;
use crate::game::chain::Chain;

/// Shown when the image path could not be used.
pub const TEXT_FALLBACK_NOTICE: &str = "Image fallback: chain copied to clipboard.";

/// File name offered for image downloads.
pub const IMAGE_FILE_NAME: &str = "fuse-chain.png";

/// Something produced by an image renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageArtifact {
    /// A script the page runs to render and download the reveal card.
    Script(String),
    /// An already rendered image.
    DataUrl(String),
}

/// Renders the reveal view of a chain as an image.
pub trait ImageRenderer {
    fn render(&mut self, chain: &Chain) -> Result<ImageArtifact, ExportUnavailable>;
}

/// A renderer that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImageRenderer;

impl ImageRenderer for NoImageRenderer {
    fn render(&mut self, _chain: &Chain) -> Result<ImageArtifact, ExportUnavailable> {
        Err(ExportUnavailable::new("no image renderer configured"))
    }
}

/// Renders via an ES module loaded in the page (`html-to-image`). The page
/// script itself falls back to the clipboard if the module cannot be loaded.
#[derive(Debug, Clone)]
pub struct ScriptImageRenderer {
    module: String,
    element_id: String,
}

impl ScriptImageRenderer {
    pub fn new(module: impl Into<String>, element_id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            element_id: element_id.into(),
        }
    }
}

impl ImageRenderer for ScriptImageRenderer {
    fn render(&mut self, chain: &Chain) -> Result<ImageArtifact, ExportUnavailable> {
        if self.module.is_empty() {
            return Err(ExportUnavailable::new("image module disabled"));
        }
        let module = js_string(&self.module);
        let element = js_string(&self.element_id);
        let text = js_string(&chain.plain_text());
        let notice = js_string(TEXT_FALLBACK_NOTICE);
        let file = js_string(IMAGE_FILE_NAME);
        Ok(ImageArtifact::Script(format!(
            r#"<script>
(function() {{
  import({module})
    .then(function(h) {{ return h.toPng(document.getElementById({element}), {{ pixelRatio: 2 }}); }})
    .then(function(url) {{
      var a = document.createElement('a');
      a.href = url;
      a.download = {file};
      a.click();
    }})
    .catch(function() {{
      navigator.clipboard.writeText({text});
      alert({notice});
    }});
}})();
</script>"#
        )))
    }
}

/// Encode `s` as a JS string literal that is safe inside a `<script>` tag.
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s)
        .map(|quoted| quoted.replace('<', "\\u003c"))
        .unwrap_or_else(|_| "\"\"".to_string())
}

/// Result of a share action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Image { artifact: ImageArtifact, text: String },
    TextFallback { text: String, reason: ExportUnavailable },
}

impl ShareOutcome {
    /// Plain-text rendering, present either way.
    pub fn text(&self) -> &str {
        match self {
            ShareOutcome::Image { text, .. } | ShareOutcome::TextFallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ShareOutcome::TextFallback { .. })
    }
}

/// Share `chain`, preferring an image and falling back to plain text.
pub fn export(chain: &Chain, renderer: &mut dyn ImageRenderer) -> ShareOutcome {
    let text = chain.plain_text();
    match renderer.render(chain) {
        Ok(artifact) => ShareOutcome::Image { artifact, text },
        Err(reason) => {
            tracing::warn!(id = chain.id(), %reason, "image export unavailable; using text");
            ShareOutcome::TextFallback { text, reason }
        }
    }
}

/// Where a social-share link points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialNetwork {
    X,
    WhatsApp,
}

impl SocialNetwork {
    pub fn from_param(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" | "twitter" => Some(SocialNetwork::X),
            "whatsapp" | "wa" => Some(SocialNetwork::WhatsApp),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SocialNetwork::X => "Share on X",
            SocialNetwork::WhatsApp => "Share on WhatsApp",
        }
    }

    fn intent_base(self) -> &'static str {
        match self {
            SocialNetwork::X => "https://x.com/intent/post?text=",
            SocialNetwork::WhatsApp => "https://wa.me/?text=",
        }
    }
}

/// Link whose `text` query parameter carries the URL-encoded `text`.
pub fn social_share_url(network: SocialNetwork, text: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
    format!("{}{}", network.intent_base(), encoded)
}

/// Shareable link that opens chain `id`. Other query parameters on the
/// configured page URL are preserved.
pub fn chain_link(config: &FuseConfig, id: &str) -> String {
    let relative = || {
        let encoded: String = form_urlencoded::Serializer::new(String::new())
            .append_pair(&config.link_param, id)
            .finish();
        format!("?{encoded}")
    };
    let Some(page) = config.page_url.as_deref() else {
        return relative();
    };
    let Ok(mut url) = Url::parse(page) else {
        return relative();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != config.link_param.as_str())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(&config.link_param, id);
    }
    url.to_string()
}

/// Characters left against the advisory maximum. Negative when over.
pub fn chars_left(line: &str, soft_max: usize) -> i64 {
    soft_max as i64 - line.chars().count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished() -> Chain {
        let mut c = Chain::started("ABC123", "Once upon a time").unwrap();
        c.append("A cat appeared").unwrap();
        c.append("It could talk").unwrap();
        c
    }

    struct FixedRenderer;

    impl ImageRenderer for FixedRenderer {
        fn render(&mut self, _chain: &Chain) -> Result<ImageArtifact, ExportUnavailable> {
            Ok(ImageArtifact::DataUrl("data:image/png;base64,AAAA".into()))
        }
    }

    #[test]
    fn export_with_renderer_returns_image_and_text() {
        let outcome = export(&finished(), &mut FixedRenderer);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.text(), "Once upon a time\n1. A cat appeared\n2. It could talk");
    }

    #[test]
    fn export_without_renderer_falls_back_to_text() {
        let outcome = export(&finished(), &mut NoImageRenderer);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.text(), finished().plain_text());
    }

    #[test]
    fn script_renderer_embeds_text_fallback() {
        let mut r = ScriptImageRenderer::new("https://cdn.example/h2i.js", "card");
        let ImageArtifact::Script(js) = r.render(&finished()).unwrap() else {
            panic!("expected script");
        };
        assert!(js.contains("toPng"));
        assert!(js.contains(IMAGE_FILE_NAME));
        assert!(js.contains(r#""Once upon a time\n1. A cat appeared\n2. It could talk""#));
        assert!(js.contains("navigator.clipboard.writeText"));
    }

    #[test]
    fn script_renderer_disabled_when_module_empty() {
        let mut r = ScriptImageRenderer::new("", "card");
        assert!(r.render(&finished()).is_err());
    }

    #[test]
    fn js_string_cannot_close_the_script_tag() {
        let s = js_string("</script><b>");
        assert!(!s.contains('<'));
        assert_eq!(s, r#""\u003c/script>\u003cb>""#);
    }

    #[test]
    fn social_url_carries_encoded_text() {
        let url = social_share_url(SocialNetwork::X, "Once upon\n1. A & B");
        assert_eq!(url, "https://x.com/intent/post?text=Once+upon%0A1.+A+%26+B");
        let wa = social_share_url(SocialNetwork::WhatsApp, "hi");
        assert_eq!(wa, "https://wa.me/?text=hi");
    }

    #[test]
    fn social_network_params() {
        assert_eq!(SocialNetwork::from_param("X"), Some(SocialNetwork::X));
        assert_eq!(SocialNetwork::from_param("whatsapp"), Some(SocialNetwork::WhatsApp));
        assert_eq!(SocialNetwork::from_param("myspace"), None);
    }

    #[test]
    fn relative_chain_link() {
        let config = FuseConfig::default();
        assert_eq!(chain_link(&config, "ABC123"), "?c=ABC123");
    }

    #[test]
    fn absolute_chain_link_replaces_old_id() {
        let config = FuseConfig {
            page_url: Some("https://fuse.example/play?c=OLD&ref=home".into()),
            ..FuseConfig::default()
        };
        assert_eq!(
            chain_link(&config, "NEW123"),
            "https://fuse.example/play?ref=home&c=NEW123"
        );
    }

    #[test]
    fn chars_left_counts_characters_not_bytes() {
        assert_eq!(chars_left("", 80), 80);
        assert_eq!(chars_left("héllo", 80), 75);
        assert_eq!(chars_left(&"x".repeat(90), 80), -10);
    }
}
