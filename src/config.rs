//! Runtime configuration, pushed in from the page as JSON.

use serde::{Deserialize, Serialize};

use crate::error::FuseError;

/// Tunables for a Fuse deployment. Every field has a default, so the page only
/// needs to send what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    /// Prefix for storage keys; the chain id is appended.
    pub storage_prefix: String,
    /// Length of minted chain identifiers.
    pub id_length: usize,
    /// Advisory maximum for a contributed line. Not enforced.
    pub soft_line_max: usize,
    /// Query parameter carrying the chain id in shareable links.
    pub link_param: String,
    /// Absolute page URL used to build shareable links. Relative `?c=ID` links
    /// are produced when unset.
    pub page_url: Option<String>,
    /// ES module used for image export. Empty disables image export.
    pub image_module: String,
    /// Script used for the lock celebration. Empty disables it.
    pub confetti_module: String,
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            storage_prefix: "fuse_chain_".into(),
            id_length: 6,
            soft_line_max: 80,
            link_param: "c".into(),
            page_url: None,
            image_module: "https://cdn.jsdelivr.net/npm/html-to-image@1.11.11/+esm".into(),
            confetti_module:
                "https://cdn.jsdelivr.net/npm/canvas-confetti@1.9.3/dist/confetti.browser.min.js"
                    .into(),
        }
    }
}

impl FuseConfig {
    pub const MIN_ID_LENGTH: usize = 4;
    pub const MAX_ID_LENGTH: usize = 16;

    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, FuseError> {
        let config: FuseConfig =
            serde_json::from_str(json).map_err(|e| FuseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FuseError> {
        if !(Self::MIN_ID_LENGTH..=Self::MAX_ID_LENGTH).contains(&self.id_length) {
            return Err(FuseError::Config(format!(
                "id_length must be between {} and {}, got {}",
                Self::MIN_ID_LENGTH,
                Self::MAX_ID_LENGTH,
                self.id_length
            )));
        }
        if self.storage_prefix.is_empty() {
            return Err(FuseError::Config("storage_prefix must not be empty".into()));
        }
        if self.link_param.is_empty() {
            return Err(FuseError::Config("link_param must not be empty".into()));
        }
        if let Some(ref page) = self.page_url {
            url::Url::parse(page)
                .map_err(|e| FuseError::Config(format!("page_url {page:?}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_game() {
        let c = FuseConfig::default();
        assert_eq!(c.storage_prefix, "fuse_chain_");
        assert_eq!(c.id_length, 6);
        assert_eq!(c.soft_line_max, 80);
        assert_eq!(c.link_param, "c");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = FuseConfig::from_json(r#"{"soft_line_max":120}"#).unwrap();
        assert_eq!(c.soft_line_max, 120);
        assert_eq!(c.id_length, 6);
    }

    #[test]
    fn rejects_out_of_range_id_length() {
        let err = FuseConfig::from_json(r#"{"id_length":2}"#).unwrap_err();
        assert!(matches!(err, FuseError::Config(_)));
    }

    #[test]
    fn rejects_relative_page_url() {
        let err = FuseConfig::from_json(r#"{"page_url":"/fuse"}"#).unwrap_err();
        assert!(err.to_string().contains("page_url"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(FuseConfig::from_json("not json {{{").is_err());
    }
}
